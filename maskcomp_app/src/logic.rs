// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame application logic.
//!
//! [`AppLogic`] owns the live [`AppState`] and every runtime resource derived
//! from it. Two entry points drive it:
//!
//! - [`AppLogic::set_state`] applies a new state, issuing runtime calls only
//!   for fields that changed (or for everything with [`ApplyMode::Force`]).
//! - [`AppLogic::update`] runs one frame:
//!
//! ```text
//!   events ─► sync ─► frame time ─► markers ─► scene ─► skip? ─► submit
//!                                                              │
//!                                        color layer (0) ──────┤
//!                                        mask layer  (1) ──────┘─► end_frame
//! ```
//!
//! Mixed reality availability is runtime state, not user intent. While it is
//! unavailable, video pass-through and depth estimation are switched off at
//! the runtime but `Options` keeps what the user asked for, so a reconnect
//! restores it.

use std::mem;
use std::thread;
use std::time::Instant;

use maskcomp_core::layers::{
    BlendControlMask, COLOR_LAYER, ClearParams, DepthTestRange, LayerConfig, MASK_LAYER,
    SubmitParams, ViewExtension,
};
use maskcomp_core::marker::{MarkerTracker, bind_planes};
use maskcomp_core::runtime::{MrDeviceStatus, PROPERTY_MR_AVAILABLE, RuntimeEvent};
use maskcomp_core::session::Session;
use maskcomp_core::state::{AppState, Options};
use maskcomp_core::time::Duration;
use maskcomp_render::scene::{MaskScene, Scene};
use maskcomp_render::view::{LayerSubmitError, MultiLayerView};
use tracing::{debug, error, info, warn};

/// Session priority that keeps this client's layers on top.
pub const SESSION_PRIORITY_TOP: i32 = 9999;

/// Rate used to pace frames when compositor sync is off.
pub const UNSYNCED_FRAME_RATE: u64 = 90;

/// How [`AppLogic::set_state`] decides which runtime calls to issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApplyMode {
    /// Only fields that differ from the current state.
    Changed,
    /// Every configured call, regardless of the current state.
    Force,
}

impl ApplyMode {
    #[inline]
    const fn is_force(self) -> bool {
        matches!(self, Self::Force)
    }
}

/// Sleeps to a fixed frame period when the compositor does not pace frames.
#[derive(Debug)]
pub struct FramePacer {
    period: Duration,
    last: Option<Instant>,
}

impl FramePacer {
    /// Creates a pacer for `hz` frames per second.
    #[must_use]
    pub fn from_hz(hz: u64) -> Self {
        Self {
            period: Duration::from_hz(hz),
            last: None,
        }
    }

    /// Frame period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleeps until one period has passed since the previous call.
    ///
    /// The first call returns immediately.
    pub fn wait(&mut self) {
        if let Some(last) = self.last {
            let period = std::time::Duration::from(self.period);
            if let Some(remaining) = period.checked_sub(last.elapsed()) {
                thread::sleep(remaining);
            }
        }
        self.last = Some(Instant::now());
    }
}

/// Application logic bound to a session.
#[derive(Debug)]
pub struct AppLogic<'s> {
    session: &'s Session,
    app_state: AppState,
    /// Video render state last requested from the runtime; `None` before
    /// the first request.
    video_render: Option<bool>,
    pacer: FramePacer,
    // Fields drop in declaration order: tracker, then scene, then view.
    tracker: Option<MarkerTracker<'s>>,
    scene: MaskScene,
    view: Option<MultiLayerView<'s>>,
}

impl<'s> AppLogic<'s> {
    /// Prepares the logic on an initialized session.
    ///
    /// No layer view exists until the first [`set_state`](Self::set_state).
    pub fn init(session: &'s Session) -> Self {
        let runtime = session.runtime();
        session.check(
            "set_session_priority",
            runtime.set_session_priority(SESSION_PRIORITY_TOP),
        );

        let mr_available = session
            .check("property_bool", runtime.property_bool(PROPERTY_MR_AVAILABLE))
            .flatten()
            .unwrap_or(false);

        let mut logic = Self {
            session,
            app_state: AppState::default(),
            video_render: None,
            pacer: FramePacer::from_hz(UNSYNCED_FRAME_RATE),
            tracker: None,
            scene: MaskScene::new(),
            view: None,
        };
        logic.set_mr_available(mr_available);
        logic
    }

    /// The session this logic runs on.
    #[must_use]
    pub fn session(&self) -> &'s Session {
        self.session
    }

    /// Current application state.
    #[must_use]
    pub fn state(&self) -> &AppState {
        &self.app_state
    }

    /// Whether a layer view exists.
    #[must_use]
    pub fn has_view(&self) -> bool {
        self.view.is_some()
    }

    /// Whether the marker tracker is running.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.tracker.is_some()
    }

    /// Applies `app_state`.
    ///
    /// The live values in [`AppState::general`] belong to the logic; the
    /// caller's copy of them is ignored.
    pub fn set_state(&mut self, app_state: AppState, mode: ApplyMode) {
        let force = mode.is_force();
        let mut next = app_state;
        next.general = self.app_state.general.clone();
        let prev = mem::replace(&mut self.app_state, next);
        let options = self.app_state.state.options.clone();
        let old = &prev.state.options;
        self.release_idle_tracker();

        let mr_available = self.app_state.general.mr_available;
        if mr_available {
            if force || options.vst_rendering != old.vst_rendering {
                self.set_video_render(options.vst_rendering);
            }
            let depth = options.depth_estimation();
            if force || depth != prev.general.vst_depth_estimation {
                self.set_depth_estimation(depth);
            }
        } else {
            if self.video_render != Some(false) {
                self.set_video_render(false);
            }
            if self.app_state.general.vst_depth_estimation {
                self.set_depth_estimation(false);
            }
        }

        // Both modes are attached to the mask layer at submit time.
        if force || options.masking_mode != old.masking_mode {
            info!(mode = ?options.masking_mode, "masking mode");
        }
        if force || options.debug_mode != old.debug_mode {
            info!(mode = ?options.debug_mode, "visualization mode");
        }

        if self.view.is_none()
            || options.res_divider != old.res_divider
            || options.mask_format != old.mask_format
        {
            self.create_view(options.mask_layer_config());
        }

        if !mr_available {
            return;
        }

        if force || options.vr_view_offset != old.vr_view_offset {
            let result = self.session.runtime().set_vr_view_offset(options.vr_view_offset);
            self.session.check("set_vr_view_offset", result);
        }

        #[cfg(feature = "video-depth-test")]
        self.apply_video_depth_test(old, &options, force);
    }

    /// Runs one frame. Returns `true` if a frame was submitted.
    pub fn update(&mut self) -> bool {
        self.check_events();

        let options = self.app_state.state.options.clone();
        let Some(view) = self.view.as_mut() else {
            return false;
        };

        if options.vr_frame_sync {
            if let Err(e) = view.sync_frame() {
                self.session.record("sync_frame", e);
                return false;
            }
        } else {
            self.pacer.wait();
        }

        if !options.vr_frame_sync || !options.vr_frame_update {
            view.invalidate_frame();
            return false;
        }

        let Some((frame_number, delta)) = view.frame_info().map(|f| (f.frame_number, f.delta))
        else {
            return false;
        };
        self.app_state.general.frame_time += delta.as_secs_f64();
        self.app_state.general.frame_count = frame_number;

        self.update_tracking();

        self.scene.update_planes(&self.app_state.state.planes);
        let Some(view) = self.view.as_mut() else {
            return false;
        };
        if let Some(frame) = view.frame_info() {
            self.scene.update(frame);
        }

        // Skipped frames keep the previous submission on screen.
        if options.frame_skip > 0 && frame_number % (i64::from(options.frame_skip) + 1) != 0 {
            return false;
        }

        if !options.vr_frame_submit {
            view.invalidate_frame();
            return false;
        }

        match self.submit_frame(&options) {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, frame = frame_number, "frame submission failed");
                false
            }
        }
    }

    fn submit_frame(&mut self, options: &Options) -> Result<(), LayerSubmitError> {
        let Some(view) = self.view.as_mut() else {
            return Err(LayerSubmitError::NotSynced);
        };
        view.begin_frame()?;

        if options.vr_layer_submit_color {
            let mut pass = view.begin_layer(COLOR_LAYER, layer_params(options, true))?;
            pass.clear(ClearParams::TRANSPARENT);
            if options.vr_render_mask {
                pass.render_scene(&self.scene);
            }
            pass.end();
        }

        if options.vr_layer_submit_mask {
            let blend = ViewExtension::BlendControlMask(BlendControlMask {
                force_global_view_offset: options.force_global_view_offset,
                masking_mode: options.masking_mode,
                debug_mode: options.debug_mode,
            });
            let params = SubmitParams {
                view_extensions: vec![blend; view.view_count()],
                ..layer_params(options, false)
            };
            let mut pass = view.begin_layer(MASK_LAYER, params)?;
            pass.clear(ClearParams::TRANSPARENT);
            if options.vr_render_mask {
                pass.render_scene(&self.scene);
            }
            pass.end();
        }

        view.end_frame()
    }

    /// Drops the tracker once no plane is tracking. Returns `true` if some
    /// plane still tracks.
    fn release_idle_tracker(&mut self) -> bool {
        if self.app_state.state.any_tracking() {
            return true;
        }
        if self.tracker.take().is_some() {
            info!("no plane tracking, marker tracker released");
        }
        false
    }

    fn update_tracking(&mut self) {
        if !self.release_idle_tracker() {
            return;
        }

        if self.tracker.is_none() {
            info!("constructing marker tracker");
            match MarkerTracker::new(self.session) {
                Ok(tracker) => self.tracker = Some(tracker),
                Err(e) => {
                    error!(error = %e, "marker tracker unavailable, retrying next frame");
                    return;
                }
            }
        }
        let Some(tracker) = self.tracker.as_mut() else {
            return;
        };

        tracker.reset();
        if let Err(e) = tracker.update() {
            error!(error = %e, "marker update failed, releasing tracker");
            self.tracker = None;
            return;
        }

        let binding = bind_planes(&self.app_state.state.planes, tracker.objects());
        self.app_state.state.planes = binding.planes;
        if binding.prediction_resets.is_empty() {
            return;
        }
        info!(markers = ?binding.prediction_resets, "resetting marker prediction");
        if let Err(e) = tracker.reset_prediction(&binding.prediction_resets) {
            error!(error = %e, "marker prediction reset failed, releasing tracker");
            self.tracker = None;
        }
    }

    fn check_events(&mut self) {
        while let Some(event) = self.session.runtime().poll_event() {
            match event {
                RuntimeEvent::MrDeviceStatus(MrDeviceStatus::Connected) => {
                    info!("mixed reality device connected");
                    self.set_mr_available(true);
                    self.reapply(ApplyMode::Force);
                }
                RuntimeEvent::MrDeviceStatus(MrDeviceStatus::Disconnected) => {
                    info!("mixed reality device disconnected");
                    self.set_mr_available(false);
                    self.reapply(ApplyMode::Changed);
                }
                RuntimeEvent::Other(kind) => debug!(kind, "ignoring runtime event"),
            }
        }
    }

    fn reapply(&mut self, mode: ApplyMode) {
        let state = self.app_state.clone();
        self.set_state(state, mode);
    }

    fn set_mr_available(&mut self, available: bool) {
        self.app_state.general.mr_available = available;
        if !available {
            warn!("mixed reality features not available");
        }
    }

    fn set_video_render(&mut self, enabled: bool) {
        let result = self.session.runtime().set_video_render(enabled);
        if self.session.check("set_video_render", result).is_some() {
            info!(enabled, "video pass-through rendering");
        }
        self.video_render = Some(enabled);
    }

    fn set_depth_estimation(&mut self, enabled: bool) {
        let result = self.session.runtime().set_video_depth_estimation(enabled);
        if self.session.check("set_video_depth_estimation", result).is_some() {
            info!(enabled, "video depth estimation");
        }
        self.app_state.general.vst_depth_estimation = enabled;
    }

    fn create_view(&mut self, mask: LayerConfig) {
        info!(
            format = ?mask.format,
            context_divider = mask.context_divider,
            focus_divider = mask.focus_divider,
            "creating layer view"
        );
        // Release the old swapchains before allocating new ones.
        self.view = None;
        let view = MultiLayerView::new(self.session, &[LayerConfig::COLOR, mask]);
        self.view = self.session.check("create_view", view);
    }

    #[cfg(feature = "video-depth-test")]
    fn apply_video_depth_test(&self, old: &Options, options: &Options, force: bool) {
        use maskcomp_core::runtime::LockType;
        use maskcomp_core::state::VideoDepthTestMode;

        if !force && !options.video_depth_test_differs(old) {
            return;
        }
        let runtime = self.session.runtime();
        if self.session.check("lock", runtime.lock(LockType::VideoDepthTest)) != Some(true) {
            error!("could not change video depth test settings");
            return;
        }

        let mode = options.video_depth_test_mode;
        let behavior = options.video_depth_test_behavior;
        let mut mode_changed = false;
        if force
            || mode != old.video_depth_test_mode
            || behavior != old.video_depth_test_behavior
        {
            let result = match depth_test::mode(mode) {
                None => runtime.reset_video_depth_test(),
                Some(m) => runtime.set_video_depth_test_mode(m, depth_test::behavior(behavior)),
            };
            if self.session.check("video depth test mode", result).is_some() {
                info!(?mode, ?behavior, "video depth test mode");
                mode_changed = true;
            }
        }

        let [near, far] = options.video_depth_test_range;
        if mode != VideoDepthTestMode::Default
            && (force
                || old.video_depth_test_mode == VideoDepthTestMode::Default
                || options.video_depth_test_range != old.video_depth_test_range)
        {
            let result = runtime.set_video_depth_test_range(near, far);
            if self.session.check("set_video_depth_test_range", result).is_some() && mode_changed {
                info!(near, far, "video depth test range");
            }
        }

        self.session
            .check("unlock", runtime.unlock(LockType::VideoDepthTest));
    }
}

/// Submit parameters shared by both layers.
fn layer_params(options: &Options, alpha_blend: bool) -> SubmitParams {
    SubmitParams {
        submit_color: true,
        submit_depth: options.vr_layer_submit_depth,
        depth_test_enabled: options.vr_layer_depth_test_mask,
        depth_test_range: DepthTestRange::default(),
        chroma_key_enabled: false,
        alpha_blend,
        view_extensions: Vec::new(),
    }
}

#[cfg(feature = "video-depth-test")]
mod depth_test {
    use maskcomp_core::runtime::{DepthTestBehavior, DepthTestMode};
    use maskcomp_core::state::{VideoDepthTestBehavior, VideoDepthTestMode};

    /// Runtime mode for `mode`; `None` means restore the runtime default.
    pub(super) fn mode(mode: VideoDepthTestMode) -> Option<DepthTestMode> {
        match mode {
            VideoDepthTestMode::Default => None,
            VideoDepthTestMode::FullRange => Some(DepthTestMode::Full),
            VideoDepthTestMode::LimitedRange => Some(DepthTestMode::LimitedRange),
            VideoDepthTestMode::ForcedRange => Some(DepthTestMode::ForcedRange),
        }
    }

    pub(super) fn behavior(behavior: VideoDepthTestBehavior) -> DepthTestBehavior {
        match behavior {
            VideoDepthTestBehavior::PreferLayerRange => DepthTestBehavior::PreferLayerRange,
            VideoDepthTestBehavior::PreferVideoRange => DepthTestBehavior::PreferVideoRange,
            VideoDepthTestBehavior::CombineRanges => DepthTestBehavior::CombineRanges,
        }
    }
}

#[cfg(test)]
mod tests;
