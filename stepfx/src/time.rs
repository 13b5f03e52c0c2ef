//! Monotonic timestamps and latencies for telemetry.
//!
//! Both serialize as plain integers (microseconds), a stable wire format
//! that does not depend on serde's internal `Duration` representation.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

fn anchor() -> Instant {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    *ANCHOR.get_or_init(Instant::now)
}

/// A monotonic point in time: microseconds since a process-wide anchor.
///
/// Only meaningful relative to other timestamps from the same process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The current time.
    pub fn now() -> Self {
        Self(anchor().elapsed().as_micros() as u64)
    }

    /// Create from raw microseconds.
    pub fn from_micros(us: u64) -> Self {
        Self(us)
    }

    /// Raw microseconds since the anchor.
    pub fn as_micros(&self) -> u64 {
        self.0
    }

    /// Time elapsed from `self` to `end` (zero if `end` is earlier).
    pub fn until(&self, end: Timestamp) -> Latency {
        Latency(end.0.saturating_sub(self.0))
    }
}

/// Elapsed time in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Latency(u64);

impl Latency {
    /// Zero latency.
    pub const ZERO: Self = Self(0);

    /// Create from microseconds.
    pub fn from_micros(us: u64) -> Self {
        Self(us)
    }

    /// The value in microseconds.
    pub fn as_micros(&self) -> u64 {
        self.0
    }

    /// Convert to `std::time::Duration`.
    pub fn to_std(&self) -> Duration {
        Duration::from_micros(self.0)
    }
}

impl From<Duration> for Latency {
    fn from(d: Duration) -> Self {
        Self(d.as_micros() as u64)
    }
}

impl std::fmt::Display for Latency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}us", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_monotonic() {
        let a = Timestamp::now();
        let b = Timestamp::now();
        assert!(b >= a);
        assert_eq!(a.until(b).as_micros(), b.as_micros() - a.as_micros());
    }

    #[test]
    fn latency_never_negative() {
        let late = Timestamp::from_micros(10);
        let early = Timestamp::from_micros(5);
        assert_eq!(late.until(early), Latency::ZERO);
    }

    #[test]
    fn latency_converts_to_and_from_std() {
        let latency = Latency::from(Duration::from_millis(3));
        assert_eq!(latency.as_micros(), 3_000);
        assert_eq!(latency.to_std(), Duration::from_micros(3_000));
        assert_eq!(latency.to_string(), "3000us");
    }

    #[test]
    fn serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Latency::from_micros(1500)).unwrap(), "1500");
    }
}
