// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types for a masking compositor client.
//!
//! `maskcomp_core` holds the data model and the runtime contract shared by
//! the rendering, presets and application crates. It performs no rendering
//! itself.
//!
//! # Architecture
//!
//! One application tick flows through the pieces like this:
//!
//! ```text
//!   Runtime::poll_event ──► AppState (options + planes)
//!                                │
//!   MarkerTracker::update ──► bind_planes() ──► planes with poses
//!                                                    │
//!                 ┌──────────────────────────────────┘
//!                 ▼
//!   Runtime::wait_sync ──► RenderPlan per view ──► LayerSubmission
//!                                                    │
//!                           Runtime::end_frame ◄─────┘
//! ```
//!
//! **[`session`]** — Owned runtime connection; every other component
//! borrows it.
//!
//! **[`runtime`]** — The [`Runtime`](runtime::Runtime) trait and the
//! event, frame and marker records that cross it.
//!
//! **[`state`]** — Options, mask planes and live counters.
//!
//! **[`marker`]** — Marker tracker adapter and the pure plane-binding step.
//!
//! **[`layers`]** — Layer configuration, submit parameters and view
//! extensions.
//!
//! **[`plan`]** — Per-view draw lists handed to the rasterizer.
//!
//! **[`transform`]** — Column-major 4×4 transform.
//!
//! **[`time`]** — Runtime clock values.
//!
//! # Crate features
//!
//! - `video-depth-test` (disabled by default): Enables the global video depth
//!   test option group.

pub mod layers;
pub mod marker;
pub mod plan;
pub mod runtime;
pub mod session;
pub mod state;
pub mod time;
pub mod transform;
