// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Masking tool application: frame logic and the controller that drives it.
//!
//! ```text
//!   Action ──► Controller ──► edit a copy of State ──► AppLogic::set_state
//!                  │                                         │
//!                  └── Presets (maskcomp_presets)            ▼
//!                                         runtime calls, layer view rebuild
//!
//!   loop { AppLogic::update() }  ──►  sync, markers, scene, submit
//! ```
//!
//! **[`logic`]** owns the runtime resources derived from the state: the
//! [`MultiLayerView`](maskcomp_render::view::MultiLayerView), the
//! [`MaskScene`](maskcomp_render::scene::MaskScene) and the marker tracker.
//!
//! **[`controller`]** owns the presets and turns user actions into state
//! changes. It stands in for an interactive UI.
//!
//! **[`config`]** names the files the controller reads and writes.
//!
//! # Crate features
//!
//! - `video-depth-test` (disabled by default): Enables the global video depth
//!   test option group and its controller actions.

pub mod config;
pub mod controller;
pub mod logic;
