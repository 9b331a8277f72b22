use std::num::NonZero;

use crate::pal::{Platform, PlatformFacade};
use crate::{ClockError, Timestamp};

/// A calibrated handle to the monotonic counter of the current platform.
///
/// The counter is a high-resolution performance counter on Windows and `CLOCK_MONOTONIC`
/// elsewhere. Which one is used is invisible to callers: every [`Timestamp`] captured from
/// a clock carries the conversion factor needed to turn tick differences into seconds.
///
/// Creating a clock is cheap. The platform is calibrated once per process and the result
/// is reused by every clock created afterwards.
///
/// # Examples
///
/// ```
/// use code_timer::Clock;
///
/// let clock = Clock::new();
///
/// let start = clock.now();
/// std::thread::sleep(std::time::Duration::from_millis(5));
/// let end = clock.now();
///
/// assert!(end - start >= 0.0);
/// ```
#[derive(Clone, Debug)]
pub struct Clock {
    platform: PlatformFacade,
    ticks_per_second: NonZero<u64>,
}

impl Clock {
    /// Creates a clock backed by the real platform counter.
    ///
    /// # Panics
    ///
    /// Panics if the platform counter cannot be calibrated. Use [`Clock::try_new()`] or
    /// [`calibrate()`] to handle this without panicking.
    #[must_use]
    pub fn new() -> Self {
        Self::try_new().unwrap_or_else(|error| panic!("monotonic clock is unusable: {error}"))
    }

    /// Creates a clock backed by the real platform counter, reporting calibration failure.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError`] if the platform counter cannot be calibrated.
    pub fn try_new() -> Result<Self, ClockError> {
        Self::from_platform(PlatformFacade::real())
    }

    pub(crate) fn from_platform(platform: PlatformFacade) -> Result<Self, ClockError> {
        let ticks_per_second = platform.ticks_per_second()?;

        Ok(Self {
            platform,
            ticks_per_second,
        })
    }

    /// Captures the current value of the monotonic counter.
    #[must_use]
    #[inline]
    pub fn now(&self) -> Timestamp {
        Timestamp::from_ticks(self.platform.ticks(), self.ticks_per_second)
    }

    /// How many ticks the underlying counter advances per second.
    #[must_use]
    pub fn ticks_per_second(&self) -> NonZero<u64> {
        self.ticks_per_second
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

/// Verifies that the monotonic counter of the current platform is usable.
///
/// Calibration happens at most once per process; later calls return the memoized result.
/// Calling this at process start turns a clock failure into an early, handleable error
/// instead of a panic on the first measurement.
///
/// # Errors
///
/// Returns [`ClockError`] if the platform counter cannot be calibrated.
///
/// # Examples
///
/// ```
/// let ticks_per_second = code_timer::calibrate().expect("monotonic clock is unusable");
/// println!("counter frequency: {ticks_per_second} Hz");
/// ```
pub fn calibrate() -> Result<NonZero<u64>, ClockError> {
    PlatformFacade::real().ticks_per_second()
}
