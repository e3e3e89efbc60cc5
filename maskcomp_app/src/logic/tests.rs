// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::time::Instant;

use maskcomp_core::layers::{LayerConfig, TextureFormat};
use maskcomp_core::runtime::MarkerId;
use maskcomp_core::state::{DebugMode, MaskFormat, MaskingMode, PlaneConfig};
use maskcomp_core::transform::Transform3d;
use maskcomp_harness::{FailPoint, RuntimeCall, RuntimeProbe, SimConfig, SimulatedRuntime};

use super::*;

fn session_with(config: SimConfig) -> (Session, RuntimeProbe) {
    let runtime = SimulatedRuntime::new(config);
    let probe = runtime.probe();
    let session = Session::init(Box::new(runtime)).expect("simulated runtime is running");
    (session, probe)
}

fn session() -> (Session, RuntimeProbe) {
    session_with(SimConfig::default())
}

/// Logic with the default state force-applied and the call log cleared.
fn started<'a>(session: &'a Session, probe: &RuntimeProbe) -> AppLogic<'a> {
    let mut logic = AppLogic::init(session);
    logic.set_state(AppState::default(), ApplyMode::Force);
    let _ = probe.take_calls();
    logic
}

fn edited(logic: &AppLogic<'_>, f: impl FnOnce(&mut AppState)) -> AppState {
    let mut state = logic.state().clone();
    f(&mut state);
    state
}

fn count(probe: &RuntimeProbe, call: &RuntimeCall) -> usize {
    probe.count(|c| c == call)
}

/// Runs frames until one is submitted, up to a small limit.
fn submit_one(logic: &mut AppLogic<'_>) {
    assert!(
        (0..4).any(|_| logic.update()),
        "no frame submitted within four updates"
    );
}

#[test]
fn init_raises_priority_and_reads_mr_availability() {
    let (session, probe) = session();
    let logic = AppLogic::init(&session);
    assert!(logic.state().general.mr_available);
    assert!(!logic.has_view(), "view waits for the first state");
    assert_eq!(
        count(&probe, &RuntimeCall::SetSessionPriority(SESSION_PRIORITY_TOP)),
        1
    );
    assert_eq!(
        count(&probe, &RuntimeCall::PropertyBool(PROPERTY_MR_AVAILABLE.into())),
        1
    );
}

#[test]
fn forced_state_creates_view_and_submits_mask_layer() {
    let (session, probe) = session();
    let mut logic = AppLogic::init(&session);
    let state = edited(&logic, |s| s.state.planes[0].enabled = true);
    logic.set_state(state, ApplyMode::Force);

    assert!(logic.has_view());
    assert_eq!(probe.video_render(), Some(true));
    assert_eq!(probe.depth_estimation(), Some(false));
    assert_eq!(probe.view_offset(), Some(1.0));
    let layers: Vec<_> = probe.swapchains().into_iter().map(|(_, c)| c).collect();
    assert_eq!(
        layers,
        [
            LayerConfig::COLOR,
            LayerConfig::new(2, 4, TextureFormat::A8Unorm)
        ]
    );

    // Default frame skip of 1 submits even frames only.
    assert!(!logic.update(), "frame 1 is skipped");
    assert!(logic.update(), "frame 2 is submitted");

    let frame = probe.last_frame().expect("submitted");
    assert_eq!(frame.len(), 1, "color layer is off by default");
    let mask = &frame[0];
    assert_eq!(mask.layer_index, MASK_LAYER);
    assert!(!mask.params.alpha_blend);
    assert!(mask.params.submit_color);
    assert!(!mask.params.chroma_key_enabled);
    assert!(!mask.params.depth_test_range.enabled);
    assert_eq!(mask.params.depth_test_range.far, 1.5);
    assert_eq!(mask.views.len(), 4);
    for (i, view) in mask.views.iter().enumerate() {
        let blend = mask.blend_control(i).expect("blend control on every view");
        assert_eq!(blend.masking_mode, MaskingMode::Extended);
        assert_eq!(blend.debug_mode, DebugMode::None);
        assert!(blend.force_global_view_offset);
        assert_eq!(view.clear, Some(ClearParams::TRANSPARENT));
        assert_eq!(view.plan.items.len(), 1, "one enabled plane");
    }
}

#[test]
fn color_layer_blends_and_carries_no_extension() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    let state = edited(&logic, |s| {
        s.state.options.vr_layer_submit_color = true;
        s.state.options.vr_layer_submit_mask = false;
        s.state.options.vr_render_mask = false;
    });
    logic.set_state(state, ApplyMode::Changed);
    submit_one(&mut logic);

    let frame = probe.last_frame().expect("submitted");
    assert_eq!(frame.len(), 1);
    assert_eq!(frame[0].layer_index, COLOR_LAYER);
    assert!(frame[0].params.alpha_blend);
    assert!(frame[0].params.view_extensions.is_empty());
    assert!(frame[0].views.iter().all(|v| v.plan.is_empty()), "rendering off");
}

#[test]
fn unchanged_state_issues_no_calls() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);

    let same = logic.state().clone();
    logic.set_state(same.clone(), ApplyMode::Changed);
    assert!(probe.calls().is_empty(), "{:?}", probe.calls());

    logic.set_state(same, ApplyMode::Force);
    assert_eq!(count(&probe, &RuntimeCall::SetVideoRender(true)), 1);
    assert_eq!(count(&probe, &RuntimeCall::SetVideoDepthEstimation(false)), 1);
    assert_eq!(count(&probe, &RuntimeCall::SetVrViewOffset(1.0)), 1);
    assert_eq!(
        probe.count(|c| matches!(c, RuntimeCall::CreateSwapchain(..))),
        0,
        "force does not rebuild the view"
    );
}

#[test]
fn single_field_change_issues_single_call() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);

    let state = edited(&logic, |s| s.state.options.vst_rendering = false);
    logic.set_state(state, ApplyMode::Changed);
    assert_eq!(probe.take_calls(), [RuntimeCall::SetVideoRender(false)]);

    let state = edited(&logic, |s| s.state.options.vr_view_offset = 0.5);
    logic.set_state(state, ApplyMode::Changed);
    assert_eq!(probe.take_calls(), [RuntimeCall::SetVrViewOffset(0.5)]);

    let state = edited(&logic, |s| {
        s.state.options.masking_mode = MaskingMode::Reduced;
        s.state.options.debug_mode = DebugMode::VisualizeMask;
    });
    logic.set_state(state, ApplyMode::Changed);
    assert!(probe.take_calls().is_empty(), "modes are applied at submit");
}

#[test]
fn depth_estimation_follows_both_flags() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    let enable = RuntimeCall::SetVideoDepthEstimation(true);
    let disable = RuntimeCall::SetVideoDepthEstimation(false);

    let state = edited(&logic, |s| s.state.options.vr_layer_depth_test_mask = true);
    logic.set_state(state, ApplyMode::Changed);
    assert_eq!(count(&probe, &enable), 0, "submit depth still off");

    let state = edited(&logic, |s| s.state.options.vr_layer_submit_depth = true);
    logic.set_state(state, ApplyMode::Changed);
    assert_eq!(count(&probe, &enable), 1);
    assert!(logic.state().general.vst_depth_estimation);

    let state = edited(&logic, |s| s.state.options.vr_layer_submit_color = true);
    logic.set_state(state, ApplyMode::Changed);
    assert_eq!(count(&probe, &enable), 1, "unrelated change");

    let state = edited(&logic, |s| s.state.options.vr_layer_depth_test_mask = false);
    logic.set_state(state, ApplyMode::Changed);
    assert_eq!(count(&probe, &disable), 1);

    let state = edited(&logic, |s| s.state.options.vr_layer_submit_depth = false);
    logic.set_state(state, ApplyMode::Changed);
    assert_eq!(count(&probe, &disable), 1, "already off");
    assert!(!logic.state().general.vst_depth_estimation);
}

#[test]
fn view_rebuilt_only_for_resolution_or_format() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    let creates = |p: &RuntimeProbe| p.count(|c| matches!(c, RuntimeCall::CreateSwapchain(..)));

    let state = edited(&logic, |s| {
        s.state.options.frame_skip = 0;
        s.state.options.vr_layer_submit_color = true;
        s.state.options.masking_mode = MaskingMode::None;
    });
    logic.set_state(state, ApplyMode::Changed);
    assert_eq!(creates(&probe), 0);

    let state = edited(&logic, |s| s.state.options.res_divider = 4);
    logic.set_state(state, ApplyMode::Changed);
    assert_eq!(creates(&probe), 2);
    assert_eq!(
        probe.count(|c| matches!(c, RuntimeCall::DestroySwapchain(_))),
        2
    );
    let layers: Vec<_> = probe.swapchains().into_iter().map(|(_, c)| c).collect();
    assert_eq!(
        layers,
        [
            LayerConfig::COLOR,
            LayerConfig::new(4, 8, TextureFormat::A8Unorm)
        ]
    );

    let state = edited(&logic, |s| s.state.options.mask_format = MaskFormat::R8G8B8A8Srgb);
    logic.set_state(state, ApplyMode::Changed);
    assert_eq!(creates(&probe), 4);
    let layers: Vec<_> = probe.swapchains().into_iter().map(|(_, c)| c).collect();
    assert_eq!(layers[1], LayerConfig::new(4, 8, TextureFormat::R8G8B8A8Srgb));
    assert_eq!(layers[0], LayerConfig::COLOR);

    assert!(logic.update(), "frames still flow after rebuild");
}

#[test]
fn failed_view_creation_is_retried() {
    let (session, probe) = session();
    let mut logic = AppLogic::init(&session);
    probe.fail_next(FailPoint::CreateSwapchain);
    logic.set_state(AppState::default(), ApplyMode::Force);
    assert!(!logic.has_view());
    assert!(!logic.update(), "nothing to render into");
    assert!(session.error().contains("scripted failure"));

    let same = logic.state().clone();
    logic.set_state(same, ApplyMode::Changed);
    assert!(logic.has_view());
}

#[test]
fn frame_skip_keeps_previous_frame() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    let state = edited(&logic, |s| s.state.options.frame_skip = 2);
    logic.set_state(state, ApplyMode::Changed);

    let submitted: Vec<bool> = (0..6).map(|_| logic.update()).collect();
    assert_eq!(submitted, [false, false, true, false, false, true]);
    assert_eq!(probe.submitted_frames(), 2);
    assert_eq!(probe.invalidations(), 0, "skipped frames are not invalidated");
    assert_eq!(logic.state().general.frame_count, 6);
}

#[test]
fn frame_skip_zero_submits_every_frame() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    let state = edited(&logic, |s| s.state.options.frame_skip = 0);
    logic.set_state(state, ApplyMode::Changed);
    assert!((0..3).all(|_| logic.update()));
    assert_eq!(probe.submitted_frames(), 3);
}

#[test]
fn submit_off_invalidates_once() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    let state = edited(&logic, |s| {
        s.state.options.frame_skip = 0;
        s.state.options.vr_frame_submit = false;
    });
    logic.set_state(state, ApplyMode::Changed);

    for _ in 0..3 {
        assert!(!logic.update());
    }
    assert_eq!(probe.invalidations(), 1);
    assert_eq!(probe.submitted_frames(), 0);
    assert_eq!(logic.state().general.frame_count, 3, "frames still advance");
}

#[test]
fn update_off_invalidates_without_frame_accounting() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    let state = edited(&logic, |s| s.state.options.vr_frame_update = false);
    logic.set_state(state, ApplyMode::Changed);

    assert!(!logic.update());
    assert!(!logic.update());
    assert_eq!(probe.invalidations(), 1);
    assert_eq!(logic.state().general.frame_count, 0);
    assert_eq!(probe.frame_number(), 2, "still synced with the compositor");
}

#[test]
fn unsynced_frames_are_paced_and_invalidated() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    let state = edited(&logic, |s| s.state.options.vr_frame_sync = false);
    logic.set_state(state, ApplyMode::Changed);

    let start = Instant::now();
    assert!(!logic.update());
    assert!(!logic.update());
    assert!(start.elapsed() >= std::time::Duration::from(logic.pacer.period()));
    assert_eq!(probe.frame_number(), 0, "no compositor sync");
    assert_eq!(probe.invalidations(), 1);
}

#[test]
fn frame_time_accumulates_deltas() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    for _ in 0..3 {
        logic.update();
    }
    let period = SimConfig::default().frame_period.as_secs_f64();
    let general = &logic.state().general;
    assert_eq!(general.frame_count, 3);
    assert!((general.frame_time - 3.0 * period).abs() < 1e-9);
}

#[test]
fn failed_submission_skips_the_frame() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    let state = edited(&logic, |s| s.state.options.frame_skip = 0);
    logic.set_state(state, ApplyMode::Changed);

    probe.fail_next(FailPoint::EndFrame);
    assert!(!logic.update());
    assert!(logic.update(), "next frame recovers");

    probe.fail_next(FailPoint::BeginFrame);
    assert!(!logic.update());
    assert!(logic.update());
    assert_eq!(probe.submitted_frames(), 2);
}

#[test]
fn failed_sync_skips_the_frame() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    probe.fail_next(FailPoint::WaitSync);
    assert!(!logic.update());
    assert!(session.error().contains("WaitSync"));
}

fn tracking_state(logic: &AppLogic<'_>) -> AppState {
    edited(logic, |s| {
        let plane = &mut s.state.planes[0];
        plane.enabled = true;
        plane.tracking = true;
        plane.position = [0.5, 0.0, 0.0];
        plane.rotation = [0.0, 45.0, 0.0];
    })
}

#[test]
fn tracking_binds_visible_marker_and_resets_prediction() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    logic.set_state(tracking_state(&logic), ApplyMode::Changed);

    logic.update();
    assert!(logic.is_tracking());
    assert!(probe.tracker_active());
    let plane = &logic.state().state.planes[0];
    assert_eq!(plane.tracked_id, 0, "no marker visible yet");
    assert_eq!(plane.position, [0.5, 0.0, 0.0]);
    assert_eq!(plane.tracked_pose, Transform3d::IDENTITY);

    let pose = Transform3d::from_translation(0.0, 1.0, -2.0);
    probe.show_marker(7, pose);
    logic.update();
    let plane = &logic.state().state.planes[0];
    assert_eq!(plane.tracked_id, 7);
    assert_eq!(plane.position, [0.0; 3]);
    assert_eq!(plane.rotation, [0.0; 3]);
    assert!(plane.reset_marker_prediction);
    assert_eq!(
        probe.count(|c| matches!(c, RuntimeCall::SetMarkerPrediction { .. })),
        0
    );

    logic.update();
    let plane = &logic.state().state.planes[0];
    assert!(!plane.reset_marker_prediction);
    assert_eq!(plane.tracked_pose, pose);
    let predictions: Vec<_> = probe
        .calls()
        .into_iter()
        .filter(|c| matches!(c, RuntimeCall::SetMarkerPrediction { .. }))
        .collect();
    assert_eq!(
        predictions,
        [
            RuntimeCall::SetMarkerPrediction {
                enabled: true,
                ids: vec![MarkerId(7)]
            },
            RuntimeCall::SetMarkerPrediction {
                enabled: false,
                ids: vec![MarkerId(7)]
            },
        ]
    );
}

#[test]
fn hidden_marker_keeps_last_pose() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    logic.set_state(tracking_state(&logic), ApplyMode::Changed);

    let pose = Transform3d::from_translation(0.5, 0.0, -1.0);
    probe.show_marker(2, pose);
    logic.update();
    logic.update();
    assert_eq!(logic.state().state.planes[0].tracked_pose, pose);

    probe.hide_marker(2);
    logic.update();
    let plane = &logic.state().state.planes[0];
    assert_eq!(plane.tracked_id, 2, "binding survives");
    assert_eq!(plane.tracked_pose, pose);

    // A different marker does not steal the bound plane.
    probe.show_marker(4, Transform3d::IDENTITY);
    logic.update();
    assert_eq!(logic.state().state.planes[0].tracked_id, 2);
    assert_eq!(logic.state().state.planes[0].tracked_pose, pose);
}

#[test]
fn tracker_exists_only_while_a_plane_tracks() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    logic.update();
    assert!(!logic.is_tracking());
    assert_eq!(count(&probe, &RuntimeCall::StartMarkerTracking), 0);

    logic.set_state(tracking_state(&logic), ApplyMode::Changed);
    assert!(!logic.is_tracking(), "created lazily by the frame loop");
    logic.update();
    logic.update();
    assert!(logic.is_tracking());
    assert_eq!(count(&probe, &RuntimeCall::StartMarkerTracking), 1);

    let state = edited(&logic, |s| s.state.planes[0].tracking = false);
    logic.set_state(state, ApplyMode::Changed);
    logic.update();
    assert!(!logic.is_tracking());
    assert!(!probe.tracker_active());
    assert_eq!(count(&probe, &RuntimeCall::StopMarkerTracking), 1);
}

#[test]
fn tracker_released_while_frame_updates_are_off() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    logic.set_state(tracking_state(&logic), ApplyMode::Changed);
    logic.update();
    assert!(logic.is_tracking());

    let state = edited(&logic, |s| {
        s.state.planes[0].tracking = false;
        s.state.options.vr_frame_update = false;
    });
    logic.set_state(state, ApplyMode::Changed);
    assert!(!logic.is_tracking(), "released as soon as tracking stops");
    for _ in 0..5 {
        logic.update();
    }
    assert!(!logic.is_tracking());
    assert!(!probe.tracker_active());
    assert_eq!(count(&probe, &RuntimeCall::StopMarkerTracking), 1);
}

#[test]
fn tracker_failures_release_and_retry() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    logic.set_state(tracking_state(&logic), ApplyMode::Changed);

    probe.fail_next(FailPoint::StartMarkerTracking);
    logic.update();
    assert!(!logic.is_tracking());

    logic.update();
    assert!(logic.is_tracking(), "retried on the next frame");

    probe.fail_next(FailPoint::PollMarkers);
    logic.update();
    assert!(!logic.is_tracking());
    assert!(!probe.tracker_active());

    logic.update();
    assert!(logic.is_tracking());
}

#[test]
fn stopped_plane_freezes_at_last_pose() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    let state = edited(&logic, |s| {
        s.state.options.frame_skip = 0;
        s.state.planes[0] = PlaneConfig {
            enabled: true,
            tracking: true,
            ..PlaneConfig::default()
        };
    });
    logic.set_state(state, ApplyMode::Changed);

    let pose = Transform3d::from_translation(0.0, 0.0, -3.0);
    probe.show_marker(5, pose);
    logic.update();
    logic.update();
    assert_eq!(logic.state().state.planes[0].tracked_pose, pose);

    let state = edited(&logic, |s| s.state.planes[0].tracking = false);
    logic.set_state(state, ApplyMode::Changed);
    probe.show_marker(5, Transform3d::IDENTITY);
    assert!(logic.update());

    let plane = &logic.state().state.planes[0];
    assert_eq!(plane.tracked_id, 5);
    assert_eq!(plane.tracked_pose, pose, "pose no longer follows the marker");
    let frame = probe.last_frame().expect("submitted");
    let item = &frame[0].views[0].plan.items[0];
    assert_eq!(item.model, plane.model_transform());
}

#[test]
fn unassigned_tracking_plane_is_not_drawn() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    logic.set_state(tracking_state(&logic), ApplyMode::Changed);
    submit_one(&mut logic);
    let frame = probe.last_frame().expect("submitted");
    assert!(frame[0].views.iter().all(|v| v.plan.is_empty()));
}

#[test]
fn disconnect_turns_off_features_and_reconnect_restores_them() {
    let (session, probe) = session();
    let mut logic = started(&session, &probe);
    let state = edited(&logic, |s| {
        s.state.options.vr_layer_submit_depth = true;
        s.state.options.vr_layer_depth_test_mask = true;
    });
    logic.set_state(state, ApplyMode::Changed);
    assert_eq!(probe.depth_estimation(), Some(true));
    let _ = probe.take_calls();

    probe.push_event(RuntimeEvent::MrDeviceStatus(MrDeviceStatus::Disconnected));
    logic.update();
    assert!(!logic.state().general.mr_available);
    assert_eq!(probe.video_render(), Some(false));
    assert_eq!(probe.depth_estimation(), Some(false));
    assert!(logic.state().state.options.vst_rendering, "user intent kept");
    assert_eq!(count(&probe, &RuntimeCall::SetVideoRender(false)), 1);
    assert_eq!(count(&probe, &RuntimeCall::SetVideoDepthEstimation(false)), 1);

    // Changes while unavailable do not reach the runtime.
    let state = edited(&logic, |s| s.state.options.vr_view_offset = 0.0);
    logic.set_state(state, ApplyMode::Changed);
    assert_eq!(
        probe.count(|c| matches!(c, RuntimeCall::SetVrViewOffset(_))),
        0
    );
    assert!(logic.has_view(), "frames keep flowing");

    probe.push_event(RuntimeEvent::Other(42));
    probe.push_event(RuntimeEvent::MrDeviceStatus(MrDeviceStatus::Connected));
    logic.update();
    assert!(logic.state().general.mr_available);
    assert_eq!(probe.video_render(), Some(true));
    assert_eq!(probe.depth_estimation(), Some(true));
    assert_eq!(probe.view_offset(), Some(0.0));
}

#[test]
fn unavailable_mr_at_startup_still_renders() {
    let (session, probe) = session_with(SimConfig {
        mr_available: Some(false),
        ..SimConfig::default()
    });
    let mut logic = AppLogic::init(&session);
    assert!(!logic.state().general.mr_available);
    logic.set_state(AppState::default(), ApplyMode::Force);

    assert_eq!(probe.video_render(), Some(false));
    assert_eq!(probe.depth_estimation(), None, "never enabled");
    assert_eq!(probe.view_offset(), None);
    assert!(logic.state().state.options.vst_rendering);
    submit_one(&mut logic);

    // A second disconnect-style apply does not repeat the call.
    let same = logic.state().clone();
    logic.set_state(same, ApplyMode::Changed);
    assert_eq!(count(&probe, &RuntimeCall::SetVideoRender(false)), 1);
}

#[test]
fn missing_mr_property_counts_as_unavailable() {
    let (session, _probe) = session_with(SimConfig {
        mr_available: None,
        ..SimConfig::default()
    });
    let logic = AppLogic::init(&session);
    assert!(!logic.state().general.mr_available);
}

#[test]
fn dropping_logic_releases_runtime_resources() {
    let (session, probe) = session();
    {
        let mut logic = started(&session, &probe);
        logic.set_state(tracking_state(&logic), ApplyMode::Changed);
        logic.update();
        assert!(probe.tracker_active());
        assert_eq!(probe.swapchains().len(), 2);
    }
    assert!(!probe.tracker_active());
    assert!(probe.swapchains().is_empty());
    let calls = probe.calls();
    let stop = calls
        .iter()
        .position(|c| *c == RuntimeCall::StopMarkerTracking)
        .expect("tracker stopped");
    let destroy = calls
        .iter()
        .position(|c| matches!(c, RuntimeCall::DestroySwapchain(_)))
        .expect("swapchains destroyed");
    assert!(stop < destroy, "tracker released before the view");
}

#[test]
fn pacer_waits_one_period() {
    let mut pacer = FramePacer::from_hz(500);
    let start = Instant::now();
    pacer.wait();
    assert!(start.elapsed() < std::time::Duration::from_millis(2), "first call is free");
    pacer.wait();
    assert!(start.elapsed() >= std::time::Duration::from_millis(2));
}

#[cfg(feature = "video-depth-test")]
mod video_depth_test {
    use maskcomp_core::runtime::{DepthTestBehavior, DepthTestMode, LockType};
    use maskcomp_core::state::{VideoDepthTestBehavior, VideoDepthTestMode};

    use super::*;

    fn depth_calls(probe: &RuntimeProbe) -> Vec<RuntimeCall> {
        probe
            .take_calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    RuntimeCall::Lock(_)
                        | RuntimeCall::Unlock(_)
                        | RuntimeCall::ResetVideoDepthTest
                        | RuntimeCall::SetVideoDepthTestMode(..)
                        | RuntimeCall::SetVideoDepthTestRange(..)
                )
            })
            .collect()
    }

    #[test]
    fn force_resets_default_mode_under_lock() {
        let (session, probe) = session();
        let mut logic = AppLogic::init(&session);
        logic.set_state(AppState::default(), ApplyMode::Force);
        assert_eq!(
            depth_calls(&probe),
            [
                RuntimeCall::Lock(LockType::VideoDepthTest),
                RuntimeCall::ResetVideoDepthTest,
                RuntimeCall::Unlock(LockType::VideoDepthTest),
            ]
        );
        assert!(!probe.lock_held(LockType::VideoDepthTest));
    }

    #[test]
    fn leaving_default_sets_mode_and_range() {
        let (session, probe) = session();
        let mut logic = started(&session, &probe);
        let state = edited(&logic, |s| {
            s.state.options.video_depth_test_mode = VideoDepthTestMode::LimitedRange;
        });
        logic.set_state(state, ApplyMode::Changed);
        assert_eq!(
            depth_calls(&probe),
            [
                RuntimeCall::Lock(LockType::VideoDepthTest),
                RuntimeCall::SetVideoDepthTestMode(
                    DepthTestMode::LimitedRange,
                    DepthTestBehavior::PreferLayerRange
                ),
                RuntimeCall::SetVideoDepthTestRange(0.0, 0.75),
                RuntimeCall::Unlock(LockType::VideoDepthTest),
            ]
        );

        let state = edited(&logic, |s| s.state.options.video_depth_test_range = [0.0, 1.5]);
        logic.set_state(state, ApplyMode::Changed);
        assert_eq!(
            depth_calls(&probe),
            [
                RuntimeCall::Lock(LockType::VideoDepthTest),
                RuntimeCall::SetVideoDepthTestRange(0.0, 1.5),
                RuntimeCall::Unlock(LockType::VideoDepthTest),
            ]
        );

        let state = edited(&logic, |s| {
            s.state.options.video_depth_test_behavior = VideoDepthTestBehavior::CombineRanges;
        });
        logic.set_state(state, ApplyMode::Changed);
        assert_eq!(
            depth_calls(&probe),
            [
                RuntimeCall::Lock(LockType::VideoDepthTest),
                RuntimeCall::SetVideoDepthTestMode(
                    DepthTestMode::LimitedRange,
                    DepthTestBehavior::CombineRanges
                ),
                RuntimeCall::Unlock(LockType::VideoDepthTest),
            ]
        );
    }

    #[test]
    fn unrelated_change_takes_no_lock() {
        let (session, probe) = session();
        let mut logic = started(&session, &probe);
        let state = edited(&logic, |s| s.state.options.vst_rendering = false);
        logic.set_state(state, ApplyMode::Changed);
        assert!(depth_calls(&probe).is_empty());
    }

    #[test]
    fn refused_lock_skips_the_group() {
        let (session, probe) = session();
        let mut logic = started(&session, &probe);
        probe.set_lock_available(false);
        let state = edited(&logic, |s| {
            s.state.options.video_depth_test_mode = VideoDepthTestMode::FullRange;
        });
        logic.set_state(state, ApplyMode::Changed);
        assert_eq!(
            depth_calls(&probe),
            [RuntimeCall::Lock(LockType::VideoDepthTest)]
        );
        assert_eq!(
            logic.state().state.options.video_depth_test_mode,
            VideoDepthTestMode::FullRange,
            "intent is kept"
        );
    }
}
