use std::num::NonZero;

use windows::Win32::System::Performance::{QueryPerformanceCounter, QueryPerformanceFrequency};

use crate::ClockError;
use crate::pal::Platform;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

/// Reads the high-resolution performance counter. Its frequency is fixed at boot and has to
/// be queried separately.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform;

impl Platform for BuildTargetPlatform {
    fn ticks(&self) -> u64 {
        let mut counter = 0_i64;

        // SAFETY: We are passing a valid pointer to a local, no other safety requirements.
        unsafe { QueryPerformanceCounter(&raw mut counter) }
            .expect("QueryPerformanceCounter never fails on supported Windows versions");

        u64::try_from(counter).expect("performance counter is never negative")
    }

    fn ticks_per_second(&self) -> Result<NonZero<u64>, ClockError> {
        let mut frequency = 0_i64;

        // SAFETY: We are passing a valid pointer to a local, no other safety requirements.
        unsafe { QueryPerformanceFrequency(&raw mut frequency) }.map_err(|error| {
            ClockError::FrequencyUnavailable {
                reason: error.to_string(),
            }
        })?;

        u64::try_from(frequency)
            .ok()
            .and_then(NonZero::new)
            .ok_or(ClockError::ZeroFrequency)
    }
}
