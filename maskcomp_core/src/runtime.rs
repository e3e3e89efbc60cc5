// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract with the HMD compositor runtime.
//!
//! The runtime is an external collaborator: it owns the display, the video
//! pass-through pipeline and the marker tracker. Everything this workspace
//! needs from it is expressed by the [`Runtime`] trait. A production
//! integration binds the trait to the vendor SDK; tests and the demo use the
//! simulated runtime from `maskcomp_harness`.
//!
//! # Call model
//!
//! All methods take `&self` and are called from a single thread. Failed
//! calls return a [`RuntimeError`]; callers route them through
//! [`Session::check`](crate::session::Session::check), which logs the error
//! and records it as the session's last error.
//!
//! # Frame protocol
//!
//! ```text
//!   wait_sync() ──► begin_frame() ──► end_frame(&[LayerSubmission])
//!                                          │
//!                    end_frame(&[]) ◄──────┘ (empty submit invalidates)
//! ```

use core::fmt;

use crate::layers::{LayerConfig, LayerSubmission};
use crate::time::{Duration, HostTime};
use crate::transform::Transform3d;

/// A failed runtime call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("runtime error {code}: {message}")]
pub struct RuntimeError {
    /// Runtime-specific error code.
    pub code: i64,
    /// Human-readable description.
    pub message: String,
}

impl RuntimeError {
    /// The runtime is not running or refused the connection.
    pub const NOT_AVAILABLE: i64 = 1;
    /// The runtime build does not implement the requested feature.
    pub const UNSUPPORTED: i64 = 2;
    /// An argument was rejected.
    pub const INVALID_ARGUMENT: i64 = 3;
    /// A frame protocol call arrived out of order.
    pub const INVALID_FRAME_STATE: i64 = 4;

    /// Creates an error with the given code and message.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates an [`UNSUPPORTED`](Self::UNSUPPORTED) error naming `what`.
    #[must_use]
    pub fn unsupported(what: &str) -> Self {
        Self::new(Self::UNSUPPORTED, format!("{what} is not supported"))
    }
}

/// Handle to a runtime-owned layer swapchain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SwapchainId(pub u64);

/// Id of a fiducial marker, as printed on the marker.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

impl MarkerId {
    /// Converts a plane's tracked id into a marker id; `None` when unassigned.
    #[inline]
    #[must_use]
    pub fn from_tracked(tracked_id: i64) -> Option<Self> {
        u64::try_from(tracked_id).ok().filter(|id| *id > 0).map(Self)
    }

    /// Returns the id as stored in a plane's tracked id.
    #[inline]
    #[must_use]
    pub fn to_tracked(self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }
}

impl fmt::Debug for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MarkerId({})", self.0)
    }
}

/// A visible marker and its pose in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerObject {
    /// Marker id.
    pub id: MarkerId,
    /// World-space pose.
    pub pose: Transform3d,
}

/// Mixed reality device connection state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MrDeviceStatus {
    /// The video pass-through device became available.
    Connected,
    /// The video pass-through device went away.
    Disconnected,
}

/// An event polled from the runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RuntimeEvent {
    /// Mixed reality device status changed.
    MrDeviceStatus(MrDeviceStatus),
    /// An event type this client does not handle, by runtime type code.
    Other(u64),
}

/// Camera parameters for one view of the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewInfo {
    /// World to eye transform.
    pub view: Transform3d,
    /// Eye to clip transform.
    pub projection: Transform3d,
    /// Recommended full-resolution width in pixels.
    pub width: u32,
    /// Recommended full-resolution height in pixels.
    pub height: u32,
}

/// Metadata for a synced frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameInfo {
    /// Monotonic frame number assigned by the compositor.
    pub frame_number: i64,
    /// Predicted display time of the frame.
    pub display_time: HostTime,
    /// Time since the previous synced frame.
    pub delta: Duration,
    /// Per-view camera parameters, in view order.
    pub views: Vec<ViewInfo>,
}

/// Coarse runtime locks guarding shared configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockType {
    /// Global video depth test configuration.
    VideoDepthTest,
}

/// Runtime video depth test mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepthTestMode {
    /// Depth test over the full range.
    Full,
    /// Depth test within the configured range.
    LimitedRange,
    /// Depth test forced within the configured range.
    ForcedRange,
}

/// Runtime policy for combining layer and video depth ranges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepthTestBehavior {
    /// Layer range wins.
    PreferLayerRange,
    /// Video range wins.
    PreferVideoRange,
    /// Intersect both ranges.
    CombineRanges,
}

/// Property key for mixed reality availability.
pub const PROPERTY_MR_AVAILABLE: &str = "mr.available";

/// The compositor runtime.
///
/// The video depth test group and the coarse locks have default
/// implementations that report [`RuntimeError::UNSUPPORTED`], matching
/// runtimes built without that feature.
pub trait Runtime: fmt::Debug {
    /// Connects to the runtime. Fails if the runtime is not running.
    fn session_init(&self) -> Result<(), RuntimeError>;

    /// Disconnects from the runtime. No calls are valid afterwards.
    fn shutdown(&self);

    /// Current time on the runtime clock.
    fn current_time(&self) -> HostTime;

    /// Sets the session's compositing priority; higher stays on top.
    fn set_session_priority(&self, priority: i32) -> Result<(), RuntimeError>;

    /// Refreshes the property cache and reads a boolean property.
    ///
    /// Returns `Ok(None)` if the runtime does not expose the key.
    fn property_bool(&self, key: &str) -> Result<Option<bool>, RuntimeError>;

    /// Pops the next pending event, if any.
    fn poll_event(&self) -> Option<RuntimeEvent>;

    /// Starts the marker tracker.
    fn start_marker_tracking(&self) -> Result<(), RuntimeError>;

    /// Stops the marker tracker.
    fn stop_marker_tracking(&self);

    /// Returns the markers visible in the latest tracking frame.
    fn poll_markers(&self) -> Result<Vec<MarkerObject>, RuntimeError>;

    /// Enables or disables pose prediction for the given markers.
    fn set_marker_prediction(&self, enabled: bool, ids: &[MarkerId]) -> Result<(), RuntimeError>;

    /// Creates a swapchain for one layer.
    fn create_swapchain(&self, config: LayerConfig) -> Result<SwapchainId, RuntimeError>;

    /// Destroys a swapchain created by [`create_swapchain`](Self::create_swapchain).
    fn destroy_swapchain(&self, id: SwapchainId);

    /// Blocks until the compositor grants the next frame slot.
    fn wait_sync(&self) -> Result<FrameInfo, RuntimeError>;

    /// Starts rendering the synced frame.
    fn begin_frame(&self) -> Result<(), RuntimeError>;

    /// Submits the frame. An empty slice drops this client's contribution.
    fn end_frame(&self, layers: &[LayerSubmission]) -> Result<(), RuntimeError>;

    /// Enables or disables video pass-through rendering.
    fn set_video_render(&self, enabled: bool) -> Result<(), RuntimeError>;

    /// Enables or disables video depth estimation.
    fn set_video_depth_estimation(&self, enabled: bool) -> Result<(), RuntimeError>;

    /// Sets the VR view offset in `[0, 1]`.
    fn set_vr_view_offset(&self, offset: f64) -> Result<(), RuntimeError>;

    /// Tries to take a coarse lock. `Ok(false)` means another client holds it.
    fn lock(&self, lock: LockType) -> Result<bool, RuntimeError> {
        let _ = lock;
        Err(RuntimeError::unsupported("configuration locking"))
    }

    /// Releases a lock taken with [`lock`](Self::lock).
    fn unlock(&self, lock: LockType) -> Result<(), RuntimeError> {
        let _ = lock;
        Err(RuntimeError::unsupported("configuration locking"))
    }

    /// Restores the system default video depth test.
    fn reset_video_depth_test(&self) -> Result<(), RuntimeError> {
        Err(RuntimeError::unsupported("video depth test"))
    }

    /// Sets the global video depth test mode and behavior.
    fn set_video_depth_test_mode(
        &self,
        mode: DepthTestMode,
        behavior: DepthTestBehavior,
    ) -> Result<(), RuntimeError> {
        let _ = (mode, behavior);
        Err(RuntimeError::unsupported("video depth test"))
    }

    /// Sets the global video depth test range in meters.
    fn set_video_depth_test_range(&self, near: f64, far: f64) -> Result<(), RuntimeError> {
        let _ = (near, far);
        Err(RuntimeError::unsupported("video depth test"))
    }
}
