//! Time types for the simulated network.
//!
//! All time values are passed explicitly; nothing in this crate reads a
//! platform clock, which keeps runs deterministic under the simulator.
//! One simulated time unit equals one second, stored as milliseconds.

use core::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

/// Virtual timestamp in milliseconds since simulation start.
///
/// Wraps a u64 to enforce explicit unit conversions and prevent mixing
/// milliseconds with whole time units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Simulation start.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Create a timestamp from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Timestamp(ms)
    }

    /// Create a timestamp from whole time units (seconds).
    #[inline]
    pub const fn from_units(units: u64) -> Self {
        Timestamp(units.saturating_mul(1000))
    }

    /// Get the timestamp as milliseconds.
    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Get the timestamp as fractional time units.
    #[inline]
    pub fn as_units(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Saturating subtraction of another timestamp, returning a duration.
    #[inline]
    pub const fn saturating_sub(self, other: Timestamp) -> Duration {
        Duration(self.0.saturating_sub(other.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    #[inline]
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp(self.0 + rhs.0)
    }
}

impl AddAssign<Duration> for Timestamp {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}

impl Sub for Timestamp {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Timestamp) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

/// Virtual time span in milliseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Duration(u64);

impl Duration {
    /// Zero duration.
    pub const ZERO: Duration = Duration(0);

    /// Create a duration from milliseconds.
    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Duration(ms)
    }

    /// Create a duration from whole time units (seconds).
    #[inline]
    pub const fn from_units(units: u64) -> Self {
        Duration(units.saturating_mul(1000))
    }

    /// Create a duration from fractional time units, rounded to milliseconds.
    ///
    /// Negative inputs clamp to zero.
    #[inline]
    pub fn from_units_f64(units: f64) -> Self {
        Duration((units.max(0.0) * 1000.0).round() as u64)
    }

    /// Get the duration as milliseconds.
    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Get the duration as fractional time units.
    #[inline]
    pub fn as_units(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Saturating addition.
    #[inline]
    pub const fn saturating_add(self, other: Duration) -> Self {
        Duration(self.0.saturating_add(other.0))
    }
}

impl Add for Duration {
    type Output = Duration;

    #[inline]
    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    #[inline]
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}
