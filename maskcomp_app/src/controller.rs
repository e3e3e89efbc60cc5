// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Preset handling and user actions on top of [`AppLogic`].
//!
//! The controller never edits the live state in place. Every action works on
//! a copy of the logic's state and hands the result back through
//! [`AppLogic::set_state`] with [`ApplyMode::Changed`], so only the fields the
//! action touched reach the runtime.

use maskcomp_core::session::Session;
use maskcomp_core::state::{DebugMode, State};
use maskcomp_presets::{Presets, apply_preset, load_state_into, save_state};
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::logic::{AppLogic, ApplyMode};

/// Far ends cycled through by [`Action::CycleDepthTestRange`], in meters.
#[cfg(feature = "video-depth-test")]
pub const DEPTH_TEST_RANGES: [f64; 4] = [3.0, 1.5, 0.5, 0.0];

/// A user request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    /// Log the keyboard shortcuts.
    Help,
    /// Return to the reset state.
    Reset,
    /// Next masking mode.
    CycleMaskingMode,
    /// Next debug visualization.
    CycleDebugMode,
    /// Switch between the default and the test presets file.
    ToggleTestPresets,
    /// Apply the preset at this index in document order.
    ApplyPreset(usize),
    /// Write the current state to the saved state file.
    SaveState,
    /// Replace the current state with the saved state file.
    LoadState,
    /// Enable every plane and bind each to the next visible marker.
    TrackAllPlanes,
    /// Stop tracking; planes stay visible only if they hold a marker.
    StopTrackingPlanes,
    /// Restore every plane from the reset state.
    ResetPlanes,
    /// Restore one plane from the reset state, keeping its enabled flag.
    ResetPlane(usize),
    /// Clear one plane's marker id so it binds again.
    ResetPlaneId(usize),
    /// Next global video depth test mode.
    #[cfg(feature = "video-depth-test")]
    CycleDepthTestMode,
    /// Next global video depth test behavior.
    #[cfg(feature = "video-depth-test")]
    CycleDepthTestBehavior,
    /// Next global video depth test range.
    #[cfg(feature = "video-depth-test")]
    CycleDepthTestRange,
}

/// Shortcut help lines, in display order.
const HELP: &[&str] = &[
    "H    Print help",
    "R    Reset settings",
    "M    Change masking mode",
    "V    Change visualization mode",
    "T    Toggle test presets",
    #[cfg(feature = "video-depth-test")]
    "D    Toggle global depth test mode: Default, Full, Limited, Forced",
    #[cfg(feature = "video-depth-test")]
    "B    Toggle global depth test behavior: Prefer Layer, Prefer Video, Combine",
    #[cfg(feature = "video-depth-test")]
    "Z    Toggle global depth test range: 3.0m, 1.5m, 0.5m, 0.0m",
    "S    Save state",
    "L    Load saved state",
    "1-9  Apply preset 1-9",
];

impl Action {
    /// Maps a keyboard shortcut to its action. Letters are case-insensitive.
    #[must_use]
    pub fn from_key(key: char) -> Option<Self> {
        let action = match key.to_ascii_uppercase() {
            'H' | '?' => Self::Help,
            'R' => Self::Reset,
            'M' => Self::CycleMaskingMode,
            'V' => Self::CycleDebugMode,
            'T' => Self::ToggleTestPresets,
            'S' => Self::SaveState,
            'L' => Self::LoadState,
            #[cfg(feature = "video-depth-test")]
            'D' => Self::CycleDepthTestMode,
            #[cfg(feature = "video-depth-test")]
            'B' => Self::CycleDepthTestBehavior,
            #[cfg(feature = "video-depth-test")]
            'Z' => Self::CycleDepthTestRange,
            '1'..='9' => Self::ApplyPreset(key as usize - '1' as usize),
            _ => return None,
        };
        Some(action)
    }
}

/// Owns the logic and the presets; stands in for the interactive UI.
#[derive(Debug)]
pub struct Controller<'s> {
    logic: AppLogic<'s>,
    presets: Presets,
    config: AppConfig,
    test_presets: bool,
    #[cfg(feature = "video-depth-test")]
    depth_range_index: usize,
}

impl<'s> Controller<'s> {
    /// Loads the presets and the startup state, then force-applies it.
    ///
    /// The startup state is the saved state file if it exists and loads,
    /// otherwise the reset state with the default preset applied. A missing
    /// or malformed presets file leaves the built-in defaults.
    pub fn init(session: &'s Session, config: AppConfig) -> Self {
        let mut logic = AppLogic::init(session);

        let mut presets = Presets::default();
        if let Err(e) = presets.load_presets(&config.presets_path) {
            error!(path = %config.presets_path.display(), error = %e, "loading presets failed");
            presets.reset();
        }

        let mut app_state = logic.state().clone();
        app_state.state = presets.reset_state().clone();

        let mut loaded = false;
        if config.state_path.exists() {
            match load_state_into(&config.state_path, &mut app_state.state) {
                Ok(()) => loaded = true,
                Err(e) => error!(error = %e, "loading saved state failed"),
            }
        }
        if !loaded && !presets.default_id().is_empty() {
            match presets.preset(presets.default_id()) {
                Ok(preset) => apply_preset(preset, &mut app_state.state, false),
                Err(e) => warn!(error = %e, "default preset not applied"),
            }
        }

        logic.set_state(app_state, ApplyMode::Force);

        #[cfg(feature = "video-depth-test")]
        let depth_range_index = range_index(&logic.state().state);
        Self {
            logic,
            presets,
            config,
            test_presets: false,
            #[cfg(feature = "video-depth-test")]
            depth_range_index,
        }
    }

    /// The application logic.
    #[must_use]
    pub fn logic(&self) -> &AppLogic<'s> {
        &self.logic
    }

    /// The loaded presets.
    #[must_use]
    pub fn presets(&self) -> &Presets {
        &self.presets
    }

    /// The current user-editable state.
    #[must_use]
    pub fn state(&self) -> &State {
        &self.logic.state().state
    }

    /// Whether the test presets file is active.
    #[must_use]
    pub fn test_presets(&self) -> bool {
        self.test_presets
    }

    /// Runs one frame. Returns `true` if a frame was submitted.
    pub fn update(&mut self) -> bool {
        self.logic.update()
    }

    /// Edits a copy of the state and applies the result.
    pub fn edit(&mut self, f: impl FnOnce(&mut State)) {
        let mut app_state = self.logic.state().clone();
        f(&mut app_state.state);
        self.logic.set_state(app_state, ApplyMode::Changed);
    }

    /// Handles `action`. Returns `true` if the state changed and was applied.
    pub fn on_action(&mut self, action: Action) -> bool {
        info!(?action, "action");
        let mut app_state = self.logic.state().clone();
        let dirty = self.handle(action, &mut app_state.state);
        if dirty {
            self.logic.set_state(app_state, ApplyMode::Changed);
        }
        dirty
    }

    fn handle(&mut self, action: Action, state: &mut State) -> bool {
        match action {
            Action::Help => {
                info!("keyboard shortcuts:");
                for line in HELP {
                    info!("  {line}");
                }
                false
            }
            Action::Reset => {
                info!("reset to defaults");
                *state = self.presets.reset_state().clone();
                true
            }
            Action::CycleMaskingMode => {
                state.options.masking_mode = state.options.masking_mode.cycle();
                true
            }
            Action::CycleDebugMode => {
                state.options.debug_mode = state.options.debug_mode.cycle();
                true
            }
            Action::ToggleTestPresets => {
                self.test_presets = !self.test_presets;
                info!(enabled = self.test_presets, "test presets");
                let path = if self.test_presets {
                    &self.config.test_presets_path
                } else {
                    &self.config.presets_path
                };
                if let Err(e) = self.presets.load_presets(path) {
                    error!(path = %path.display(), error = %e, "loading presets failed");
                }
                false
            }
            Action::ApplyPreset(index) => {
                let Some(id) = self.presets.preset_id(index) else {
                    warn!(index, "no preset to apply");
                    return false;
                };
                match self.presets.preset(id) {
                    Ok(preset) => {
                        apply_preset(preset, state, !self.test_presets);
                        true
                    }
                    Err(e) => {
                        warn!(error = %e, "preset not applied");
                        false
                    }
                }
            }
            Action::SaveState => {
                if let Err(e) = save_state(&self.config.state_path, state) {
                    error!(error = %e, "saving state failed");
                }
                false
            }
            Action::LoadState => match load_state_into(&self.config.state_path, state) {
                Ok(()) => {
                    #[cfg(feature = "video-depth-test")]
                    {
                        self.depth_range_index = range_index(state);
                    }
                    true
                }
                Err(e) => {
                    error!(error = %e, "loading saved state failed");
                    false
                }
            },
            Action::TrackAllPlanes => {
                info!("tracking all planes");
                state.options.debug_mode = DebugMode::VisualizeMask;
                for plane in &mut state.planes {
                    plane.tracking = true;
                    plane.reset_marker_prediction = true;
                    plane.tracked_id = 0;
                    plane.enabled = true;
                }
                true
            }
            Action::StopTrackingPlanes => {
                info!("stop tracking planes");
                for plane in &mut state.planes {
                    plane.tracking = false;
                    plane.enabled = plane.is_assigned();
                }
                true
            }
            Action::ResetPlanes => {
                info!("reset all planes");
                state.planes = self.presets.reset_state().planes.clone();
                true
            }
            Action::ResetPlane(index) => {
                let (Some(plane), Some(reset)) = (
                    state.planes.get_mut(index),
                    self.presets.reset_state().planes.get(index),
                ) else {
                    warn!(index, "no such plane");
                    return false;
                };
                info!(plane = index, "reset plane");
                let enabled = plane.enabled;
                *plane = reset.clone();
                plane.enabled = enabled;
                true
            }
            Action::ResetPlaneId(index) => {
                let Some(plane) = state.planes.get_mut(index) else {
                    warn!(index, "no such plane");
                    return false;
                };
                plane.tracked_id = 0;
                true
            }
            #[cfg(feature = "video-depth-test")]
            Action::CycleDepthTestMode => {
                let options = &mut state.options;
                options.video_depth_test_mode = options.video_depth_test_mode.cycle();
                true
            }
            #[cfg(feature = "video-depth-test")]
            Action::CycleDepthTestBehavior => {
                let options = &mut state.options;
                options.video_depth_test_behavior = options.video_depth_test_behavior.cycle();
                true
            }
            #[cfg(feature = "video-depth-test")]
            Action::CycleDepthTestRange => {
                self.depth_range_index = (self.depth_range_index + 1) % DEPTH_TEST_RANGES.len();
                state.options.video_depth_test_range =
                    [0.0, DEPTH_TEST_RANGES[self.depth_range_index]];
                true
            }
        }
    }
}

/// Index of the configured range's far end in [`DEPTH_TEST_RANGES`], or 0.
#[cfg(feature = "video-depth-test")]
fn range_index(state: &State) -> usize {
    let far = state.options.video_depth_test_range[1];
    DEPTH_TEST_RANGES
        .iter()
        .position(|r| *r == far)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use maskcomp_core::layers::MASK_LAYER;
    use maskcomp_core::state::{MaskingMode, PlaneConfig};
    use maskcomp_harness::{RuntimeProbe, SimulatedRuntime};

    use super::*;

    const PRESETS: &str = r#"{
        "defaultId": "Extended",
        "resetState": {
            "options": { "maskingMode": 0, "frameSkip": 0 },
            "planes": [ { "enabled": true, "scale": [0.5, 0.5] } ]
        },
        "presetMetadata": [
            { "id": "Restricted", "name": "Restricted", "desc": "" },
            { "id": "Extended", "name": "Extended", "desc": "" },
            { "id": "Limited", "name": "Limited depth test", "desc": "" },
            { "id": "Planes", "name": "Two planes", "desc": "" }
        ],
        "presetStates": {
            "Restricted": { "options": { "maskingMode": 1 } },
            "Extended": { "options": { "maskingMode": 2 } },
            "Limited": { "options": { "maskingMode": 4, "videoDepthTestMode": 2 } },
            "Planes": {
                "options": { "maskingMode": 3 },
                "planes": [ {}, { "enabled": true, "position": [0.0, 0.0, -1.0] } ]
            }
        }
    }"#;

    const TEST_PRESETS: &str = r#"{
        "defaultId": "Color",
        "presetMetadata": [ { "id": "Color", "name": "Color", "desc": "" } ],
        "presetStates": {
            "Color": { "options": { "vrLayerSubmitColor": true } }
        }
    }"#;

    fn session() -> (Session, RuntimeProbe) {
        let runtime = SimulatedRuntime::default();
        let probe = runtime.probe();
        let session = Session::init(Box::new(runtime)).expect("simulated runtime is running");
        (session, probe)
    }

    fn config_with_presets(dir: &Path) -> AppConfig {
        let config = AppConfig::in_dir(dir);
        fs::write(&config.presets_path, PRESETS).expect("write presets");
        fs::write(&config.test_presets_path, TEST_PRESETS).expect("write test presets");
        config
    }

    #[test]
    fn startup_applies_default_preset_over_reset_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (session, probe) = session();
        let mut controller = Controller::init(&session, config_with_presets(dir.path()));

        let state = controller.state();
        assert_eq!(state.options.masking_mode, MaskingMode::Extended);
        assert_eq!(state.options.frame_skip, 0, "reset state fields survive");
        assert!(state.planes[0].enabled);
        assert!(controller.logic().has_view());

        assert!(controller.update());
        let frame = probe.last_frame().expect("submitted");
        assert_eq!(frame.len(), 1, "color disabled, mask enabled");
        assert_eq!(frame[0].layer_index, MASK_LAYER);
        for view in 0..frame[0].views.len() {
            let blend = frame[0].blend_control(view).expect("blend control attached");
            assert_eq!(blend.masking_mode, MaskingMode::Extended);
        }
    }

    #[test]
    fn saved_state_wins_over_default_preset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config_with_presets(dir.path());
        let mut saved = State::default();
        saved.options.masking_mode = MaskingMode::DepthTestOrFail;
        saved.options.res_divider = 8;
        save_state(&config.state_path, &saved).expect("save");

        let (session, _probe) = session();
        let controller = Controller::init(&session, config);
        assert_eq!(
            controller.state().options.masking_mode,
            MaskingMode::DepthTestOrFail
        );
        assert_eq!(controller.state().options.res_divider, 8);
        // Saved files are complete; nothing of the reset state shows through.
        assert_eq!(controller.state().options.frame_skip, 1);
    }

    #[test]
    fn unreadable_saved_state_falls_back_to_default_preset() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = config_with_presets(dir.path());
        fs::write(&config.state_path, "{ not json").expect("write");

        let (session, _probe) = session();
        let controller = Controller::init(&session, config);
        assert_eq!(controller.state().options.masking_mode, MaskingMode::Extended);
        assert_eq!(controller.state().options.frame_skip, 0);
    }

    #[test]
    fn missing_presets_start_from_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (session, probe) = session();
        let controller = Controller::init(&session, AppConfig::in_dir(dir.path()));
        assert_eq!(controller.presets().preset_count(), 0);
        assert_eq!(controller.state(), &State::default());
        assert_eq!(probe.video_render(), Some(true), "state force-applied");
    }

    #[test]
    fn preset_keeps_planes_unless_test_presets_are_active() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (session, _probe) = session();
        let mut controller = Controller::init(&session, config_with_presets(dir.path()));

        controller.edit(|s| s.planes[2].enabled = true);
        let planes = controller.state().planes.clone();
        #[cfg(not(feature = "video-depth-test"))]
        let index = 2;
        #[cfg(feature = "video-depth-test")]
        let index = 3;
        assert!(controller.on_action(Action::ApplyPreset(index)));
        assert_eq!(controller.state().options.masking_mode, MaskingMode::Reduced);
        assert_eq!(controller.state().planes, planes, "planes kept");

        assert!(!controller.on_action(Action::ToggleTestPresets));
        assert!(controller.test_presets());
        assert_eq!(controller.presets().preset_count(), 1);
        assert!(controller.on_action(Action::ApplyPreset(0)));
        assert!(controller.state().options.vr_layer_submit_color);
        assert!(!controller.state().planes[2].enabled, "planes replaced");

        assert!(!controller.on_action(Action::ToggleTestPresets));
        assert_eq!(controller.presets().default_id(), "Extended");
    }

    #[cfg(not(feature = "video-depth-test"))]
    #[test]
    fn unsupported_preset_is_dropped_and_state_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (session, probe) = session();
        let mut controller = Controller::init(&session, config_with_presets(dir.path()));

        let ids: Vec<_> = controller.presets().presets().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["Restricted", "Extended", "Planes"]);

        let before = controller.state().clone();
        let _ = probe.take_calls();
        assert!(!controller.on_action(Action::ApplyPreset(3)));
        assert_eq!(controller.state(), &before);
        assert!(probe.calls().is_empty());
    }

    #[test]
    fn out_of_range_preset_is_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (session, _probe) = session();
        let mut controller = Controller::init(&session, config_with_presets(dir.path()));
        assert!(!controller.on_action(Action::ApplyPreset(8)));
    }

    #[test]
    fn modes_cycle_and_wrap() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (session, _probe) = session();
        let mut controller = Controller::init(&session, config_with_presets(dir.path()));

        let modes: Vec<_> = (0..MaskingMode::ALL.len())
            .map(|_| {
                controller.on_action(Action::CycleMaskingMode);
                controller.state().options.masking_mode
            })
            .collect();
        assert_eq!(modes.first(), Some(&MaskingMode::Reduced));
        assert_eq!(modes.last(), Some(&MaskingMode::Extended), "full cycle");

        controller.on_action(Action::CycleDebugMode);
        assert_eq!(controller.state().options.debug_mode, DebugMode::VisualizeMask);
    }

    #[test]
    fn reset_restores_the_reset_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (session, _probe) = session();
        let mut controller = Controller::init(&session, config_with_presets(dir.path()));
        assert!(controller.on_action(Action::Reset));
        assert_eq!(controller.state().options.masking_mode, MaskingMode::None);
        assert_eq!(controller.state(), controller.presets().reset_state());
        assert!(!controller.on_action(Action::Help));
    }

    #[test]
    fn save_then_load_restores_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (session, _probe) = session();
        let mut controller = Controller::init(&session, config_with_presets(dir.path()));

        controller.edit(|s| {
            s.options.vr_view_offset = 0.25;
            s.planes[1].color = [0.0, 1.0, 0.0, 1.0];
        });
        assert!(!controller.on_action(Action::SaveState));
        let saved = controller.state().clone();

        controller.on_action(Action::Reset);
        assert_ne!(controller.state(), &saved);
        assert!(controller.on_action(Action::LoadState));
        assert_eq!(controller.state(), &saved);
    }

    #[test]
    fn load_without_saved_state_changes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (session, _probe) = session();
        let mut controller = Controller::init(&session, config_with_presets(dir.path()));
        let before = controller.state().clone();
        assert!(!controller.on_action(Action::LoadState));
        assert_eq!(controller.state(), &before);
    }

    #[test]
    fn track_all_then_stop_keeps_bound_planes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (session, probe) = session();
        let mut controller = Controller::init(&session, config_with_presets(dir.path()));

        assert!(controller.on_action(Action::TrackAllPlanes));
        assert_eq!(controller.state().options.debug_mode, DebugMode::VisualizeMask);
        assert!(controller.state().planes.iter().all(|p| p.tracking && p.enabled));

        probe.show_marker(3, maskcomp_core::transform::Transform3d::IDENTITY);
        controller.update();
        assert!(controller.logic().is_tracking());
        assert_eq!(controller.state().planes[0].tracked_id, 3);

        assert!(controller.on_action(Action::StopTrackingPlanes));
        let enabled: Vec<_> = controller.state().planes.iter().map(|p| p.enabled).collect();
        assert_eq!(enabled, [true, false, false, false]);
        controller.update();
        assert!(!controller.logic().is_tracking());
    }

    #[test]
    fn plane_resets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (session, _probe) = session();
        let mut controller = Controller::init(&session, config_with_presets(dir.path()));

        controller.edit(|s| {
            s.planes[0] = PlaneConfig {
                enabled: false,
                tracked_id: 9,
                position: [1.0, 2.0, 3.0],
                ..PlaneConfig::default()
            };
            s.planes[1].enabled = true;
        });

        assert!(controller.on_action(Action::ResetPlaneId(0)));
        assert_eq!(controller.state().planes[0].tracked_id, 0);

        assert!(controller.on_action(Action::ResetPlane(0)));
        let plane = &controller.state().planes[0];
        assert!(!plane.enabled, "enabled flag kept");
        assert_eq!(plane.scale, [0.5, 0.5]);
        assert_eq!(plane.position, [0.0; 3]);

        assert!(!controller.on_action(Action::ResetPlane(7)));

        assert!(controller.on_action(Action::ResetPlanes));
        assert_eq!(
            controller.state().planes,
            controller.presets().reset_state().planes
        );
    }

    #[test]
    fn shortcut_keys() {
        assert_eq!(Action::from_key('m'), Some(Action::CycleMaskingMode));
        assert_eq!(Action::from_key('R'), Some(Action::Reset));
        assert_eq!(Action::from_key('1'), Some(Action::ApplyPreset(0)));
        assert_eq!(Action::from_key('9'), Some(Action::ApplyPreset(8)));
        assert_eq!(Action::from_key('0'), None);
        assert_eq!(Action::from_key('x'), None);
        #[cfg(feature = "video-depth-test")]
        assert_eq!(Action::from_key('z'), Some(Action::CycleDepthTestRange));
        #[cfg(not(feature = "video-depth-test"))]
        assert_eq!(Action::from_key('z'), None);
    }

    #[cfg(feature = "video-depth-test")]
    #[test]
    fn depth_test_actions_cycle() {
        use maskcomp_core::state::{VideoDepthTestBehavior, VideoDepthTestMode};

        let dir = tempfile::tempdir().expect("tempdir");
        let (session, _probe) = session();
        let mut controller = Controller::init(&session, config_with_presets(dir.path()));

        controller.on_action(Action::CycleDepthTestMode);
        assert_eq!(
            controller.state().options.video_depth_test_mode,
            VideoDepthTestMode::FullRange
        );
        controller.on_action(Action::CycleDepthTestBehavior);
        assert_eq!(
            controller.state().options.video_depth_test_behavior,
            VideoDepthTestBehavior::PreferVideoRange
        );

        let ranges: Vec<_> = (0..4)
            .map(|_| {
                controller.on_action(Action::CycleDepthTestRange);
                controller.state().options.video_depth_test_range
            })
            .collect();
        assert_eq!(
            ranges,
            [[0.0, 1.5], [0.0, 0.5], [0.0, 0.0], [0.0, 3.0]],
            "default 0.75 starts the cycle at the first entry"
        );
    }
}
