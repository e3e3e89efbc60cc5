// Copyright 2026 the Maskcomp Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime time stamps.
//!
//! The compositor runtime reports a single monotonic clock in nanoseconds.
//! [`HostTime`] is a point on that clock and [`Duration`] is a span between
//! two points. Frame deltas are converted to seconds only at the edges
//! (accumulated frame time, pacing).

use core::fmt;
use core::ops::{Add, Sub};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// A point in time on the runtime's monotonic clock, in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs.0)
    }
}

/// Time elapsed between two points. Saturates at zero if `rhs` is later.
impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({}ns)", self.0)
    }
}

/// A span of time in nanoseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// A zero-length duration.
    pub const ZERO: Self = Self(0);

    /// Creates a duration lasting one period of the given rate.
    ///
    /// A zero rate yields [`Duration::ZERO`].
    #[inline]
    #[must_use]
    pub const fn from_hz(hz: u64) -> Self {
        if hz == 0 {
            return Self::ZERO;
        }
        Self(NANOS_PER_SEC / hz)
    }

    /// Returns the raw nanosecond value.
    #[inline]
    #[must_use]
    pub const fn nanos(self) -> u64 {
        self.0
    }

    /// Converts this duration to fractional seconds.
    #[inline]
    #[must_use]
    pub const fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC as f64
    }
}

impl From<Duration> for std::time::Duration {
    #[inline]
    fn from(value: Duration) -> Self {
        Self::from_nanos(value.0)
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({}ns)", self.0)
    }
}
