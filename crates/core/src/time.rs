use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Duration in whole milliseconds.
///
/// Game time (oxygen, deadlines, cooldowns) is data, so it is stored as a plain
/// integer that serializes as a number.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Millis(u64);

impl Millis {
    pub const ZERO: Self = Self(0);

    const MILLIS_PER_SEC: u64 = 1_000;
    const MILLIS_PER_MIN: u64 = 60_000;

    /// Create from whole minutes.
    pub const fn from_mins(mins: u32) -> Self {
        Self(mins as u64 * Self::MILLIS_PER_MIN)
    }

    /// Create from whole seconds.
    pub const fn from_secs(secs: u32) -> Self {
        Self(secs as u64 * Self::MILLIS_PER_SEC)
    }

    /// Create from whole milliseconds.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Elapsed time as fractional seconds, for rate-based simulation.
    pub fn as_secs_f32(self) -> f32 {
        self.0 as f32 / Self::MILLIS_PER_SEC as f32
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl core::ops::Add for Millis {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::ops::Mul<u32> for Millis {
    type Output = Self;
    fn mul(self, rhs: u32) -> Self {
        Self(self.0 * rhs as u64)
    }
}

/// Wall-clock instant, milliseconds since the Unix epoch.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`. Zero if `earlier` is in the future.
    pub const fn saturating_since(self, earlier: Timestamp) -> Millis {
        Millis(self.0.saturating_sub(earlier.0))
    }

    pub const fn plus(self, duration: Millis) -> Timestamp {
        Timestamp(self.0.saturating_add(duration.0))
    }
}

/// Source of "now" for every time-dependent computation.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Reads the operating system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Timestamp(millis)
    }
}

/// Manually driven clock. Clones share the same instant.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start.0)),
        }
    }

    pub fn advance(&self, by: Millis) {
        self.now.fetch_add(by.0, Ordering::SeqCst);
    }

    pub fn set(&self, to: Timestamp) {
        self.now.store(to.0, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.now.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_constructors() {
        assert_eq!(Millis::from_mins(1).as_millis(), 60_000);
        assert_eq!(Millis::from_secs(30).as_millis(), 30_000);
        assert_eq!(Millis::from_millis(5).as_millis(), 5);
    }

    #[test]
    fn millis_arithmetic() {
        let a = Millis::from_secs(5);
        let b = Millis::from_secs(3);

        assert_eq!((a + b).as_millis(), 8_000);
        assert_eq!(a.saturating_sub(b).as_millis(), 2_000);
        assert_eq!(b.saturating_sub(a), Millis::ZERO);
        assert_eq!((a * 2).as_millis(), 10_000);
        assert!((Millis::from_millis(1_500).as_secs_f32() - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn timestamp_since_never_underflows() {
        let earlier = Timestamp::from_millis(1_000);
        let later = Timestamp::from_millis(4_500);

        assert_eq!(later.saturating_since(earlier).as_millis(), 3_500);
        assert_eq!(earlier.saturating_since(later), Millis::ZERO);
        assert_eq!(earlier.plus(Millis::from_secs(1)).as_millis(), 2_000);
    }

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let clock = ManualClock::new(Timestamp::from_millis(10));
        let other = clock.clone();

        clock.advance(Millis::from_secs(2));
        assert_eq!(other.now().as_millis(), 2_010);

        other.set(Timestamp::from_millis(7));
        assert_eq!(clock.now().as_millis(), 7);
    }

    #[test]
    fn system_clock_is_after_epoch() {
        assert!(SystemClock.now().as_millis() > 0);
    }
}
