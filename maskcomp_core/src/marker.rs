// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fiducial marker tracking and plane binding.
//!
//! [`MarkerTracker`] wraps the runtime's marker tracker. It is a heavyweight
//! runtime resource: the application constructs it only while at least one
//! plane is tracking, and drops it as soon as none is.
//!
//! [`bind_planes`] is the plane-to-marker binding state machine. It is a pure
//! function over the plane array and the currently visible markers:
//!
//! ```text
//!   Unassigned ──(tracking, free marker visible)──► Assigned (reset pending)
//!        ▲                                              │
//!        │                               (next tick) prediction reset
//!        │                                              ▼
//!        └───────────── id cleared by user ─────── Assigned
//! ```
//!
//! Assigned planes copy the pose of their marker while it is visible and keep
//! the last pose while it is not. Planes that stop tracking keep both id and
//! pose, which freezes them in place.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::runtime::{MarkerId, MarkerObject, RuntimeError};
use crate::session::Session;
use crate::state::{NUM_MASK_PLANES, PlaneConfig};

/// A marker tracker call failed.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MarkerTrackerError {
    /// Starting the tracker failed.
    #[error("starting marker tracker failed: {0}")]
    Start(#[source] RuntimeError),
    /// Polling visible markers failed.
    #[error("polling markers failed: {0}")]
    Poll(#[source] RuntimeError),
    /// Changing marker prediction failed.
    #[error("setting marker prediction failed: {0}")]
    Prediction(#[source] RuntimeError),
}

/// Live marker tracker bound to a session.
#[derive(Debug)]
pub struct MarkerTracker<'s> {
    session: &'s Session,
    objects: BTreeMap<MarkerId, MarkerObject>,
}

impl<'s> MarkerTracker<'s> {
    /// Starts marker tracking on the session.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerTrackerError::Start`] if the runtime refuses.
    pub fn new(session: &'s Session) -> Result<Self, MarkerTrackerError> {
        session
            .runtime()
            .start_marker_tracking()
            .map_err(MarkerTrackerError::Start)?;
        info!("marker tracking started");
        Ok(Self {
            session,
            objects: BTreeMap::new(),
        })
    }

    /// Forgets the previous frame's observations.
    pub fn reset(&mut self) {
        self.objects.clear();
    }

    /// Pulls the markers visible in the latest tracking frame.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerTrackerError::Poll`] if the runtime call fails.
    pub fn update(&mut self) -> Result<(), MarkerTrackerError> {
        let markers = self
            .session
            .runtime()
            .poll_markers()
            .map_err(MarkerTrackerError::Poll)?;
        for marker in markers {
            self.objects.insert(marker.id, marker);
        }
        Ok(())
    }

    /// Visible markers by id.
    #[must_use]
    pub fn objects(&self) -> &BTreeMap<MarkerId, MarkerObject> {
        &self.objects
    }

    /// Looks up one visible marker.
    #[must_use]
    pub fn object(&self, id: MarkerId) -> Option<&MarkerObject> {
        self.objects.get(&id)
    }

    /// Enables or disables pose prediction for the given markers.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerTrackerError::Prediction`] if the runtime call fails.
    pub fn set_prediction(&self, enabled: bool, ids: &[MarkerId]) -> Result<(), MarkerTrackerError> {
        self.session
            .runtime()
            .set_marker_prediction(enabled, ids)
            .map_err(MarkerTrackerError::Prediction)
    }

    /// Resets the runtime's pose smoother for `ids` by toggling prediction on
    /// and back off.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerTrackerError::Prediction`] if either call fails.
    pub fn reset_prediction(&self, ids: &[MarkerId]) -> Result<(), MarkerTrackerError> {
        if ids.is_empty() {
            return Ok(());
        }
        debug!(?ids, "resetting marker prediction");
        self.set_prediction(true, ids)?;
        self.set_prediction(false, ids)
    }
}

impl Drop for MarkerTracker<'_> {
    fn drop(&mut self) {
        self.session.runtime().stop_marker_tracking();
        info!("marker tracking stopped");
    }
}

/// Result of one binding step.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    /// Planes after binding.
    pub planes: [PlaneConfig; NUM_MASK_PLANES],
    /// Markers whose prediction must be reset this tick.
    pub prediction_resets: Vec<MarkerId>,
}

/// Advances the plane-to-marker binding by one tick.
///
/// Nothing changes while no marker is visible. Otherwise:
///
/// - every plane holding an id claims it, tracking or not;
/// - tracking planes copy the pose of their visible marker;
/// - tracking planes with a pending reset report their id and clear the flag;
/// - tracking planes without an id take the lowest unclaimed visible id.
///
/// A newly bound plane raises its reset flag; the reset itself is reported
/// on the following tick.
#[must_use]
pub fn bind_planes(
    planes: &[PlaneConfig; NUM_MASK_PLANES],
    markers: &BTreeMap<MarkerId, MarkerObject>,
) -> Binding {
    let mut next = planes.clone();
    let mut prediction_resets = Vec::new();

    if markers.is_empty() {
        return Binding {
            planes: next,
            prediction_resets,
        };
    }

    let mut available: BTreeSet<MarkerId> = markers.keys().copied().collect();
    for plane in &next {
        if let Some(id) = MarkerId::from_tracked(plane.tracked_id) {
            available.remove(&id);
        }
    }

    for (index, plane) in next.iter_mut().enumerate() {
        if let Some(id) = MarkerId::from_tracked(plane.tracked_id) {
            if !plane.tracking {
                continue;
            }
            if let Some(marker) = markers.get(&id) {
                plane.tracked_pose = marker.pose;
            }
            if plane.reset_marker_prediction {
                prediction_resets.push(id);
                plane.reset_marker_prediction = false;
            }
        } else if plane.tracking {
            if let Some(id) = available.pop_first() {
                info!(plane = index, marker = id.0, "plane bound to marker");
                plane.bind_to_marker(id.to_tracked());
            }
        }
    }

    Binding {
        planes: next,
        prediction_resets,
    }
}
