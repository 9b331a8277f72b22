use std::num::NonZero;
use std::{io, mem};

use libc::{CLOCK_MONOTONIC, timespec};

use crate::ClockError;
use crate::pal::Platform;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

/// `CLOCK_MONOTONIC` counts nanoseconds, so one tick is always one nanosecond.
const NANOS_PER_SECOND: NonZero<u64> = NonZero::new(1_000_000_000).expect("literal is non-zero");

/// Reads `CLOCK_MONOTONIC`, which is not affected by wall clock adjustments and has
/// nanosecond granularity on every Unix we target.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform;

impl Platform for BuildTargetPlatform {
    fn ticks(&self) -> u64 {
        // SAFETY: All-zero is a valid initial value for this type.
        let mut ts: timespec = unsafe { mem::zeroed() };

        // SAFETY: We are passing valid arguments, no other safety requirements.
        let result = unsafe { libc::clock_gettime(CLOCK_MONOTONIC, &raw mut ts) };

        assert!(result == 0, "{}", io::Error::last_os_error());

        timespec_to_nanos(i64::from(ts.tv_sec), i64::from(ts.tv_nsec))
    }

    fn ticks_per_second(&self) -> Result<NonZero<u64>, ClockError> {
        // SAFETY: All-zero is a valid initial value for this type.
        let mut resolution: timespec = unsafe { mem::zeroed() };

        // The tick unit is fixed but we still ask the clock for its resolution, which fails
        // if the clock is not supported by the running kernel.
        // SAFETY: We are passing valid arguments, no other safety requirements.
        let result = unsafe { libc::clock_getres(CLOCK_MONOTONIC, &raw mut resolution) };

        if result != 0 {
            return Err(ClockError::FrequencyUnavailable {
                reason: io::Error::last_os_error().to_string(),
            });
        }

        Ok(NANOS_PER_SECOND)
    }
}

fn timespec_to_nanos(seconds: i64, nanos: i64) -> u64 {
    let seconds = u64::try_from(seconds).expect("monotonic clock never reports negative seconds");
    let nanos = u64::try_from(nanos).expect("monotonic clock never reports negative nanoseconds");

    seconds
        .checked_mul(NANOS_PER_SECOND.get())
        .and_then(|whole| whole.checked_add(nanos))
        .expect("monotonic clock beyond 584 years of uptime - impossible")
}
