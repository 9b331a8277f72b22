use std::num::NonZero;
use std::ops::Sub;

use crate::Clock;

/// A value of the monotonic counter, captured at one point in time.
///
/// The only arithmetic between timestamps is subtraction, which yields the elapsed time in
/// seconds. The tick count is opaque; its unit depends on the platform and is converted
/// using the frequency of the clock that captured it.
///
/// # Examples
///
/// ```
/// use code_timer::Timestamp;
///
/// let earlier = Timestamp::now();
/// let later = Timestamp::now();
///
/// let seconds: f64 = later - earlier;
/// assert!(seconds >= 0.0);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Timestamp {
    ticks: u64,
    ticks_per_second: NonZero<u64>,
}

impl Timestamp {
    /// Captures the current value of the real platform counter.
    ///
    /// # Panics
    ///
    /// Panics if the platform counter cannot be calibrated or read. This is fatal for every
    /// measurement; call [`calibrate()`][crate::calibrate] at process start to detect it early.
    #[must_use]
    pub fn now() -> Self {
        Clock::new().now()
    }

    pub(crate) const fn from_ticks(ticks: u64, ticks_per_second: NonZero<u64>) -> Self {
        Self {
            ticks,
            ticks_per_second,
        }
    }

    /// Seconds elapsed between `earlier` and `self`.
    ///
    /// The result is negative if `earlier` was in fact captured later. Both timestamps must
    /// come from clocks of the same platform.
    #[must_use]
    pub fn seconds_since(self, earlier: Self) -> f64 {
        debug_assert_eq!(
            self.ticks_per_second, earlier.ticks_per_second,
            "timestamps from counters with different frequencies cannot be compared"
        );

        if self.ticks >= earlier.ticks {
            ticks_to_seconds(self.ticks.wrapping_sub(earlier.ticks), self.ticks_per_second)
        } else {
            -ticks_to_seconds(earlier.ticks.wrapping_sub(self.ticks), self.ticks_per_second)
        }
    }

    /// Seconds elapsed between `earlier` and `self`, or zero if `earlier` is not earlier.
    #[must_use]
    pub fn saturating_seconds_since(self, earlier: Self) -> f64 {
        self.seconds_since(earlier).max(0.0)
    }
}

impl Sub for Timestamp {
    type Output = f64;

    fn sub(self, rhs: Self) -> f64 {
        self.seconds_since(rhs)
    }
}

// Whole seconds and the remainder are converted separately, so that a large tick count
// (long uptime, fast counter) does not eat into the sub-second precision of the result.
#[expect(
    clippy::cast_precision_loss,
    reason = "whole seconds and sub-second ticks both fit the f64 mantissa for any real uptime"
)]
fn ticks_to_seconds(ticks: u64, ticks_per_second: NonZero<u64>) -> f64 {
    let whole = ticks / ticks_per_second;
    let remainder = ticks % ticks_per_second;

    whole as f64 + remainder as f64 / ticks_per_second.get() as f64
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Timestamp: Send, Sync, Copy);

    fn hz(value: u64) -> NonZero<u64> {
        NonZero::new(value).expect("test frequencies are non-zero")
    }

    #[test]
    fn subtraction_yields_seconds() {
        let a = Timestamp::from_ticks(1_000, hz(1_000));
        let b = Timestamp::from_ticks(3_500, hz(1_000));

        assert!(((b - a) - 2.5).abs() < 1e-12);
        assert!(((a - b) + 2.5).abs() < 1e-12);
        assert!((a - a).abs() < f64::EPSILON);
    }

    #[test]
    fn saturating_difference_is_never_negative() {
        let a = Timestamp::from_ticks(10, hz(10));
        let b = Timestamp::from_ticks(20, hz(10));

        assert!(a.saturating_seconds_since(b).abs() < f64::EPSILON);
        assert!((b.saturating_seconds_since(a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn long_uptime_keeps_nanosecond_precision() {
        // 200 days of uptime on a nanosecond counter.
        let base = 200 * 24 * 3600 * 1_000_000_000_u64;
        let a = Timestamp::from_ticks(base, hz(1_000_000_000));
        let b = Timestamp::from_ticks(base + 1, hz(1_000_000_000));

        assert!(((b - a) - 1e-9).abs() < 1e-15);
    }

    #[test]
    fn extreme_tick_values_do_not_overflow() {
        let a = Timestamp::from_ticks(0, hz(10_000_000));
        let b = Timestamp::from_ticks(u64::MAX, hz(10_000_000));

        let seconds = b - a;

        assert!(seconds.is_finite());
        assert!(seconds > 1.8e12);
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Miri cannot talk to the real platform.
    fn back_to_back_captures_are_close() {
        let a = Timestamp::now();
        let b = Timestamp::now();

        let seconds = b - a;

        assert!(seconds >= 0.0);
        assert!(seconds < 0.1, "back-to-back captures took {seconds} s");
    }
}
