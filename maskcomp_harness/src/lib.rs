// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated compositor runtime for tests and demos.
//!
//! [`SimulatedRuntime`] implements [`Runtime`] without a headset. Frame sync
//! advances a virtual clock at a fixed rate instead of blocking, events and
//! visible markers are scripted, and every call is recorded.
//!
//! The runtime is moved into a [`Session`](maskcomp_core::session::Session)
//! as a boxed trait object, so inspection happens through a [`RuntimeProbe`]
//! taken beforehand. Both share the same state:
//!
//! ```rust,ignore
//! let runtime = SimulatedRuntime::new(SimConfig::default());
//! let probe = runtime.probe();
//! let session = Session::init(Box::new(runtime))?;
//! // ... drive the logic ...
//! assert_eq!(probe.submitted_frames(), 1);
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;

use maskcomp_core::layers::{LayerConfig, LayerSubmission};
use maskcomp_core::runtime::{
    DepthTestBehavior, DepthTestMode, FrameInfo, LockType, MarkerId, MarkerObject,
    PROPERTY_MR_AVAILABLE, Runtime, RuntimeError, RuntimeEvent, SwapchainId, ViewInfo,
};
use maskcomp_core::time::{Duration, HostTime};
use maskcomp_core::transform::Transform3d;

/// One recorded runtime call.
#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeCall {
    /// [`Runtime::session_init`].
    SessionInit,
    /// [`Runtime::shutdown`].
    Shutdown,
    /// [`Runtime::set_session_priority`].
    SetSessionPriority(i32),
    /// [`Runtime::property_bool`].
    PropertyBool(String),
    /// [`Runtime::start_marker_tracking`].
    StartMarkerTracking,
    /// [`Runtime::stop_marker_tracking`].
    StopMarkerTracking,
    /// [`Runtime::poll_markers`].
    PollMarkers,
    /// [`Runtime::set_marker_prediction`].
    SetMarkerPrediction {
        /// Requested prediction state.
        enabled: bool,
        /// Affected markers.
        ids: Vec<MarkerId>,
    },
    /// [`Runtime::create_swapchain`].
    CreateSwapchain(SwapchainId, LayerConfig),
    /// [`Runtime::destroy_swapchain`].
    DestroySwapchain(SwapchainId),
    /// [`Runtime::wait_sync`].
    WaitSync,
    /// [`Runtime::begin_frame`].
    BeginFrame,
    /// [`Runtime::end_frame`] with the number of submitted layers.
    EndFrame(usize),
    /// [`Runtime::set_video_render`].
    SetVideoRender(bool),
    /// [`Runtime::set_video_depth_estimation`].
    SetVideoDepthEstimation(bool),
    /// [`Runtime::set_vr_view_offset`].
    SetVrViewOffset(f64),
    /// [`Runtime::lock`].
    Lock(LockType),
    /// [`Runtime::unlock`].
    Unlock(LockType),
    /// [`Runtime::reset_video_depth_test`].
    ResetVideoDepthTest,
    /// [`Runtime::set_video_depth_test_mode`].
    SetVideoDepthTestMode(DepthTestMode, DepthTestBehavior),
    /// [`Runtime::set_video_depth_test_range`].
    SetVideoDepthTestRange(f64, f64),
}

/// Calls that can be made to fail once with [`RuntimeProbe::fail_next`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FailPoint {
    /// [`Runtime::create_swapchain`].
    CreateSwapchain,
    /// [`Runtime::wait_sync`].
    WaitSync,
    /// [`Runtime::begin_frame`].
    BeginFrame,
    /// [`Runtime::end_frame`] for a non-empty submission.
    EndFrame,
    /// [`Runtime::start_marker_tracking`].
    StartMarkerTracking,
    /// [`Runtime::poll_markers`].
    PollMarkers,
    /// [`Runtime::set_video_render`].
    SetVideoRender,
}

/// Static configuration of the simulated headset.
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Views per frame: two context views, then two focus views.
    pub view_count: usize,
    /// Full-resolution context view size.
    pub context_size: (u32, u32),
    /// Full-resolution focus view size.
    pub focus_size: (u32, u32),
    /// Compositor frame period.
    pub frame_period: Duration,
    /// Interpupillary distance in meters.
    pub ipd: f64,
    /// Whether the runtime process is running.
    pub running: bool,
    /// Value of the MR availability property; `None` if not exposed.
    pub mr_available: Option<bool>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            view_count: 4,
            context_size: (1152, 1152),
            focus_size: (1920, 1920),
            frame_period: Duration::from_hz(90),
            ipd: 0.064,
            running: true,
            mr_available: Some(true),
        }
    }
}

#[derive(Debug)]
struct SimState {
    config: SimConfig,
    connected: bool,
    time: HostTime,
    frame_number: i64,
    synced: bool,
    in_frame: bool,
    calls: Vec<RuntimeCall>,
    events: VecDeque<RuntimeEvent>,
    markers: BTreeMap<MarkerId, MarkerObject>,
    tracker_active: bool,
    lock_available: bool,
    locks_held: BTreeSet<LockType>,
    next_swapchain: u64,
    swapchains: BTreeMap<SwapchainId, LayerConfig>,
    submissions: Vec<Vec<LayerSubmission>>,
    failures: Vec<FailPoint>,
    video_render: Option<bool>,
    depth_estimation: Option<bool>,
    view_offset: Option<f64>,
}

impl SimState {
    fn take_failure(&mut self, point: FailPoint) -> Result<(), RuntimeError> {
        match self.failures.iter().position(|f| *f == point) {
            Some(i) => {
                self.failures.remove(i);
                Err(RuntimeError::new(
                    RuntimeError::INVALID_ARGUMENT,
                    format!("scripted failure: {point:?}"),
                ))
            }
            None => Ok(()),
        }
    }

    fn ensure_connected(&self) -> Result<(), RuntimeError> {
        if self.connected {
            Ok(())
        } else {
            Err(RuntimeError::new(
                RuntimeError::NOT_AVAILABLE,
                "session not initialized",
            ))
        }
    }

    fn view_infos(&self) -> Vec<ViewInfo> {
        let c = &self.config;
        (0..c.view_count)
            .map(|i| {
                let focus = i >= 2;
                let (width, height) = if focus { c.focus_size } else { c.context_size };
                let eye = if i % 2 == 0 { -0.5 } else { 0.5 };
                let fov = if focus { 40.0 } else { 100.0 };
                ViewInfo {
                    view: Transform3d::from_translation(-eye * c.ipd, 0.0, 0.0),
                    projection: perspective(fov, f64::from(width) / f64::from(height), 0.1, 100.0),
                    width,
                    height,
                }
            })
            .collect()
    }
}

/// Right-handed perspective projection looking down -Z, depth in `[0, 1]`.
#[must_use]
pub fn perspective(fov_y_degrees: f64, aspect: f64, near: f64, far: f64) -> Transform3d {
    let f = 1.0 / (fov_y_degrees.to_radians() / 2.0).tan();
    let range = near - far;
    Transform3d::from_cols_array_2d([
        [f / aspect, 0.0, 0.0, 0.0],
        [0.0, f, 0.0, 0.0],
        [0.0, 0.0, far / range, -1.0],
        [0.0, 0.0, near * far / range, 0.0],
    ])
}

/// In-process stand-in for the compositor runtime.
#[derive(Debug)]
pub struct SimulatedRuntime {
    state: Rc<RefCell<SimState>>,
}

impl SimulatedRuntime {
    /// Creates a simulated runtime.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let state = SimState {
            config,
            connected: false,
            time: HostTime(1_000_000_000),
            frame_number: 0,
            synced: false,
            in_frame: false,
            calls: Vec::new(),
            events: VecDeque::new(),
            markers: BTreeMap::new(),
            tracker_active: false,
            lock_available: true,
            locks_held: BTreeSet::new(),
            next_swapchain: 1,
            swapchains: BTreeMap::new(),
            submissions: Vec::new(),
            failures: Vec::new(),
            video_render: None,
            depth_estimation: None,
            view_offset: None,
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Returns a probe sharing this runtime's state.
    #[must_use]
    pub fn probe(&self) -> RuntimeProbe {
        RuntimeProbe {
            state: Rc::clone(&self.state),
        }
    }

    fn call<T>(
        &self,
        call: RuntimeCall,
        f: impl FnOnce(&mut SimState) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(call);
        state.ensure_connected()?;
        f(&mut state)
    }
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Runtime for SimulatedRuntime {
    fn session_init(&self) -> Result<(), RuntimeError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(RuntimeCall::SessionInit);
        if !state.config.running {
            return Err(RuntimeError::new(
                RuntimeError::NOT_AVAILABLE,
                "runtime not running",
            ));
        }
        state.connected = true;
        Ok(())
    }

    fn shutdown(&self) {
        let mut state = self.state.borrow_mut();
        state.calls.push(RuntimeCall::Shutdown);
        state.connected = false;
    }

    fn current_time(&self) -> HostTime {
        self.state.borrow().time
    }

    fn set_session_priority(&self, priority: i32) -> Result<(), RuntimeError> {
        self.call(RuntimeCall::SetSessionPriority(priority), |_| Ok(()))
    }

    fn property_bool(&self, key: &str) -> Result<Option<bool>, RuntimeError> {
        self.call(RuntimeCall::PropertyBool(key.to_owned()), |s| {
            Ok(if key == PROPERTY_MR_AVAILABLE {
                s.config.mr_available
            } else {
                None
            })
        })
    }

    fn poll_event(&self) -> Option<RuntimeEvent> {
        self.state.borrow_mut().events.pop_front()
    }

    fn start_marker_tracking(&self) -> Result<(), RuntimeError> {
        self.call(RuntimeCall::StartMarkerTracking, |s| {
            s.take_failure(FailPoint::StartMarkerTracking)?;
            s.tracker_active = true;
            Ok(())
        })
    }

    fn stop_marker_tracking(&self) {
        let mut state = self.state.borrow_mut();
        state.calls.push(RuntimeCall::StopMarkerTracking);
        state.tracker_active = false;
    }

    fn poll_markers(&self) -> Result<Vec<MarkerObject>, RuntimeError> {
        self.call(RuntimeCall::PollMarkers, |s| {
            s.take_failure(FailPoint::PollMarkers)?;
            if !s.tracker_active {
                return Err(RuntimeError::new(
                    RuntimeError::INVALID_FRAME_STATE,
                    "marker tracking not started",
                ));
            }
            Ok(s.markers.values().copied().collect())
        })
    }

    fn set_marker_prediction(&self, enabled: bool, ids: &[MarkerId]) -> Result<(), RuntimeError> {
        let call = RuntimeCall::SetMarkerPrediction {
            enabled,
            ids: ids.to_vec(),
        };
        self.call(call, |_| Ok(()))
    }

    fn create_swapchain(&self, config: LayerConfig) -> Result<SwapchainId, RuntimeError> {
        let mut state = self.state.borrow_mut();
        let id = SwapchainId(state.next_swapchain);
        state.calls.push(RuntimeCall::CreateSwapchain(id, config));
        state.ensure_connected()?;
        state.take_failure(FailPoint::CreateSwapchain)?;
        state.next_swapchain += 1;
        state.swapchains.insert(id, config);
        Ok(id)
    }

    fn destroy_swapchain(&self, id: SwapchainId) {
        let mut state = self.state.borrow_mut();
        state.calls.push(RuntimeCall::DestroySwapchain(id));
        state.swapchains.remove(&id);
    }

    fn wait_sync(&self) -> Result<FrameInfo, RuntimeError> {
        self.call(RuntimeCall::WaitSync, |s| {
            s.take_failure(FailPoint::WaitSync)?;
            let delta = s.config.frame_period;
            s.time = s.time + delta;
            s.frame_number += 1;
            s.synced = true;
            Ok(FrameInfo {
                frame_number: s.frame_number,
                display_time: s.time + delta,
                delta,
                views: s.view_infos(),
            })
        })
    }

    fn begin_frame(&self) -> Result<(), RuntimeError> {
        self.call(RuntimeCall::BeginFrame, |s| {
            s.take_failure(FailPoint::BeginFrame)?;
            if !s.synced || s.in_frame {
                return Err(RuntimeError::new(
                    RuntimeError::INVALID_FRAME_STATE,
                    "begin_frame without a synced frame",
                ));
            }
            s.in_frame = true;
            Ok(())
        })
    }

    fn end_frame(&self, layers: &[LayerSubmission]) -> Result<(), RuntimeError> {
        self.call(RuntimeCall::EndFrame(layers.len()), |s| {
            if !layers.is_empty() {
                if !s.in_frame {
                    return Err(RuntimeError::new(
                        RuntimeError::INVALID_FRAME_STATE,
                        "end_frame without begin_frame",
                    ));
                }
                s.in_frame = false;
                s.synced = false;
                s.take_failure(FailPoint::EndFrame)?;
                if let Some(l) = layers.iter().find(|l| !s.swapchains.contains_key(&l.swapchain)) {
                    return Err(RuntimeError::new(
                        RuntimeError::INVALID_ARGUMENT,
                        format!("unknown swapchain {:?}", l.swapchain),
                    ));
                }
            } else {
                s.in_frame = false;
            }
            s.submissions.push(layers.to_vec());
            Ok(())
        })
    }

    fn set_video_render(&self, enabled: bool) -> Result<(), RuntimeError> {
        self.call(RuntimeCall::SetVideoRender(enabled), |s| {
            s.take_failure(FailPoint::SetVideoRender)?;
            s.video_render = Some(enabled);
            Ok(())
        })
    }

    fn set_video_depth_estimation(&self, enabled: bool) -> Result<(), RuntimeError> {
        self.call(RuntimeCall::SetVideoDepthEstimation(enabled), |s| {
            s.depth_estimation = Some(enabled);
            Ok(())
        })
    }

    fn set_vr_view_offset(&self, offset: f64) -> Result<(), RuntimeError> {
        self.call(RuntimeCall::SetVrViewOffset(offset), |s| {
            if !(0.0..=1.0).contains(&offset) {
                return Err(RuntimeError::new(
                    RuntimeError::INVALID_ARGUMENT,
                    format!("view offset {offset} out of range"),
                ));
            }
            s.view_offset = Some(offset);
            Ok(())
        })
    }

    fn lock(&self, lock: LockType) -> Result<bool, RuntimeError> {
        self.call(RuntimeCall::Lock(lock), |s| {
            if !s.lock_available {
                return Ok(false);
            }
            Ok(s.locks_held.insert(lock))
        })
    }

    fn unlock(&self, lock: LockType) -> Result<(), RuntimeError> {
        self.call(RuntimeCall::Unlock(lock), |s| {
            if s.locks_held.remove(&lock) {
                Ok(())
            } else {
                Err(RuntimeError::new(
                    RuntimeError::INVALID_ARGUMENT,
                    format!("{lock:?} not held"),
                ))
            }
        })
    }

    fn reset_video_depth_test(&self) -> Result<(), RuntimeError> {
        self.call(RuntimeCall::ResetVideoDepthTest, |s| {
            s.ensure_lock(LockType::VideoDepthTest)
        })
    }

    fn set_video_depth_test_mode(
        &self,
        mode: DepthTestMode,
        behavior: DepthTestBehavior,
    ) -> Result<(), RuntimeError> {
        self.call(RuntimeCall::SetVideoDepthTestMode(mode, behavior), |s| {
            s.ensure_lock(LockType::VideoDepthTest)
        })
    }

    fn set_video_depth_test_range(&self, near: f64, far: f64) -> Result<(), RuntimeError> {
        self.call(RuntimeCall::SetVideoDepthTestRange(near, far), |s| {
            s.ensure_lock(LockType::VideoDepthTest)
        })
    }
}

impl SimState {
    fn ensure_lock(&self, lock: LockType) -> Result<(), RuntimeError> {
        if self.locks_held.contains(&lock) {
            Ok(())
        } else {
            Err(RuntimeError::new(
                RuntimeError::INVALID_FRAME_STATE,
                format!("{lock:?} lock not held"),
            ))
        }
    }
}

/// Shared view into a [`SimulatedRuntime`] for scripting and assertions.
#[derive(Clone, Debug)]
pub struct RuntimeProbe {
    state: Rc<RefCell<SimState>>,
}

impl RuntimeProbe {
    // ---- scripting ----

    /// Queues an event for [`Runtime::poll_event`].
    pub fn push_event(&self, event: RuntimeEvent) {
        self.state.borrow_mut().events.push_back(event);
    }

    /// Makes a marker visible at `pose` (replacing any previous pose).
    pub fn show_marker(&self, id: u64, pose: Transform3d) {
        let id = MarkerId(id);
        self.state
            .borrow_mut()
            .markers
            .insert(id, MarkerObject { id, pose });
    }

    /// Hides a marker.
    pub fn hide_marker(&self, id: u64) {
        self.state.borrow_mut().markers.remove(&MarkerId(id));
    }

    /// Sets the MR availability property.
    pub fn set_mr_available(&self, available: Option<bool>) {
        self.state.borrow_mut().config.mr_available = available;
    }

    /// Whether [`Runtime::lock`] grants locks.
    pub fn set_lock_available(&self, available: bool) {
        self.state.borrow_mut().lock_available = available;
    }

    /// Makes the next call at `point` fail once.
    pub fn fail_next(&self, point: FailPoint) {
        self.state.borrow_mut().failures.push(point);
    }

    // ---- inspection ----

    /// All calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.state.borrow().calls.clone()
    }

    /// Returns and forgets the calls recorded so far.
    #[must_use]
    pub fn take_calls(&self) -> Vec<RuntimeCall> {
        core::mem::take(&mut self.state.borrow_mut().calls)
    }

    /// Number of recorded calls matching `pred`.
    #[must_use]
    pub fn count(&self, pred: impl Fn(&RuntimeCall) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    /// Whether the session is connected.
    #[must_use]
    pub fn connected(&self) -> bool {
        self.state.borrow().connected
    }

    /// Whether the marker tracker is running.
    #[must_use]
    pub fn tracker_active(&self) -> bool {
        self.state.borrow().tracker_active
    }

    /// Live swapchains and their configurations.
    #[must_use]
    pub fn swapchains(&self) -> Vec<(SwapchainId, LayerConfig)> {
        self.state
            .borrow()
            .swapchains
            .iter()
            .map(|(id, cfg)| (*id, *cfg))
            .collect()
    }

    /// Every `end_frame` payload in order; empty entries are invalidations.
    #[must_use]
    pub fn submissions(&self) -> Vec<Vec<LayerSubmission>> {
        self.state.borrow().submissions.clone()
    }

    /// The last non-empty submission.
    #[must_use]
    pub fn last_frame(&self) -> Option<Vec<LayerSubmission>> {
        self.state
            .borrow()
            .submissions
            .iter()
            .rev()
            .find(|s| !s.is_empty())
            .cloned()
    }

    /// Number of non-empty submissions.
    #[must_use]
    pub fn submitted_frames(&self) -> usize {
        self.state
            .borrow()
            .submissions
            .iter()
            .filter(|s| !s.is_empty())
            .count()
    }

    /// Number of empty (invalidating) submissions.
    #[must_use]
    pub fn invalidations(&self) -> usize {
        self.state
            .borrow()
            .submissions
            .iter()
            .filter(|s| s.is_empty())
            .count()
    }

    /// Last frame number handed out by [`Runtime::wait_sync`].
    #[must_use]
    pub fn frame_number(&self) -> i64 {
        self.state.borrow().frame_number
    }

    /// Last video render state set, if any.
    #[must_use]
    pub fn video_render(&self) -> Option<bool> {
        self.state.borrow().video_render
    }

    /// Last depth estimation state set, if any.
    #[must_use]
    pub fn depth_estimation(&self) -> Option<bool> {
        self.state.borrow().depth_estimation
    }

    /// Last VR view offset set, if any.
    #[must_use]
    pub fn view_offset(&self) -> Option<f64> {
        self.state.borrow().view_offset
    }

    /// Whether `lock` is currently held.
    #[must_use]
    pub fn lock_held(&self, lock: LockType) -> bool {
        self.state.borrow().locks_held.contains(&lock)
    }
}
