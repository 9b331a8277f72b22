#![cfg_attr(coverage_nightly, coverage(off))]

use std::num::NonZero;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::ClockError;
use crate::pal::Platform;

const ERR_POISONED_FAKE: &str = "FakePlatform state lock should not be poisoned";

#[derive(Debug)]
struct FakePlatformState {
    ticks: u64,
    ticks_per_second: u64,
}

/// Fake tick source whose counter only moves when a test says so.
///
/// Clones share the same counter, so a test can keep one clone and advance time while the
/// code under test reads another.
#[derive(Clone, Debug)]
pub(crate) struct FakePlatform {
    state: Arc<Mutex<FakePlatformState>>,
}

impl FakePlatform {
    /// Nanosecond ticks, starting from an arbitrary non-zero counter value.
    pub(crate) fn new() -> Self {
        Self::with_ticks_per_second(1_000_000_000)
    }

    pub(crate) fn with_ticks_per_second(ticks_per_second: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakePlatformState {
                ticks: 1_000_000,
                ticks_per_second,
            })),
        }
    }

    pub(crate) fn advance(&self, duration: Duration) {
        let mut state = self.state.lock().expect(ERR_POISONED_FAKE);

        let delta = duration
            .as_nanos()
            .checked_mul(u128::from(state.ticks_per_second))
            .map(|scaled| scaled / 1_000_000_000)
            .and_then(|ticks| u64::try_from(ticks).ok())
            .expect("test advanced the fake clock by an unrealistic amount");

        state.ticks = state
            .ticks
            .checked_add(delta)
            .expect("test advanced the fake clock by an unrealistic amount");
    }

    pub(crate) fn set_ticks(&self, ticks: u64) {
        self.state.lock().expect(ERR_POISONED_FAKE).ticks = ticks;
    }
}

impl Platform for FakePlatform {
    fn ticks(&self) -> u64 {
        self.state.lock().expect(ERR_POISONED_FAKE).ticks
    }

    fn ticks_per_second(&self) -> Result<NonZero<u64>, ClockError> {
        NonZero::new(self.state.lock().expect(ERR_POISONED_FAKE).ticks_per_second)
            .ok_or(ClockError::ZeroFrequency)
    }
}

mod tests {
    use super::*;

    #[test]
    fn advance_scales_by_frequency() {
        let platform = FakePlatform::with_ticks_per_second(10_000_000);
        platform.set_ticks(0);

        platform.advance(Duration::from_millis(50));

        assert_eq!(platform.ticks(), 500_000);
    }

    #[test]
    fn shared_state_between_clones() {
        let platform1 = FakePlatform::new();
        let platform2 = platform1.clone();

        platform1.set_ticks(77);

        assert_eq!(platform2.ticks(), 77);
    }

    #[test]
    fn zero_frequency_is_an_error() {
        let platform = FakePlatform::with_ticks_per_second(0);

        assert_eq!(platform.ticks_per_second(), Err(ClockError::ZeroFrequency));
    }
}
