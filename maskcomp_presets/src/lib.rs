// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Preset documents and saved state persistence.
//!
//! A presets document names a reset state and a list of presets. Every preset
//! is an *overlay*: it starts as a copy of the reset state and only the fields
//! present in the document replace the reset values.
//!
//! ```text
//!   { "defaultId": "Extended",
//!     "resetState": <State>,
//!     "presetMetadata": [ { "id", "name", "desc" }, ... ],   (document order)
//!     "presetStates": { "<id>": <State>, ... } }
//!
//!   <State> = { "options": { "maskingMode": 2, ... },
//!               "planes":  [ { "enabled", "position", ..., "trackedPose" }, ... ] }
//! ```
//!
//! The saved state file is a bare `<State>` at the document root. Saving
//! always writes `"tracking": false` so a restarted tool does not resume
//! tracking on its own.
//!
//! Presets that set options this build cannot honor (a non-zero
//! `videoDepthTestMode` without the `video-depth-test` feature) are dropped
//! while loading; the rest of the document still loads.

mod error;
mod format;
mod store;

pub use error::PresetError;
pub use store::{
    Preset, Presets, apply_preset, load_state, load_state_into, parse_state, save_state,
};
