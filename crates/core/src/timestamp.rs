//! Microsecond-precision timestamp type
//!
//! `updated_at_timestamp` is the sync ordering key, so every comparison
//! and arithmetic operation on it goes through this type rather than raw
//! `u64` microsecond math.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A point in time expressed as microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Unix epoch.
    pub const EPOCH: Timestamp = Timestamp(0);

    /// One microsecond, as a constant for boundary arithmetic.
    pub const ONE_MICRO: u64 = 1;

    /// Current wall-clock time. Not monotonic on its own — see [`crate::clock`].
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_micros() as u64;
        Timestamp(micros)
    }

    /// Construct from raw microseconds since epoch.
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        Timestamp(micros)
    }

    /// Construct from whole seconds since epoch.
    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Timestamp(secs.saturating_mul(1_000_000))
    }

    /// Construct from a fractional-seconds decimal, as carried in a v2
    /// token payload.
    pub fn from_secs_f64(secs: f64) -> Self {
        Timestamp((secs * 1_000_000.0).round() as u64)
    }

    /// Microseconds since epoch.
    #[inline]
    pub const fn as_micros(&self) -> u64 {
        self.0
    }

    /// Seconds since epoch, as a fractional decimal (the v2 token payload
    /// shape).
    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    /// `self + 1µs`, the boundary offset used when minting a sync token
    /// from the last delivered item's timestamp.
    pub fn plus_one_micro(&self) -> Self {
        Timestamp(self.0.saturating_add(Self::ONE_MICRO))
    }

    /// Duration elapsed since an earlier timestamp, or `None` if `earlier`
    /// is not actually earlier.
    pub fn duration_since(&self, earlier: Timestamp) -> Option<Duration> {
        self.0
            .checked_sub(earlier.0)
            .map(Duration::from_micros)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::EPOCH
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:06}", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}

impl From<u64> for Timestamp {
    fn from(micros: u64) -> Self {
        Timestamp::from_micros(micros)
    }
}

impl From<Timestamp> for u64 {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
