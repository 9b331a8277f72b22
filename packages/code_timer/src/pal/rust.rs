use std::num::NonZero;
use std::sync::LazyLock;
use std::time::Instant;

use crate::ClockError;
use crate::pal::Platform;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

const NANOS_PER_SECOND: NonZero<u64> = NonZero::new(1_000_000_000).expect("literal is non-zero");

static EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Portable tick source built on `std::time::Instant`, counting nanoseconds since the first
/// use in the process.
///
/// We use this under Miri because Miri cannot talk to a real OS but Rust std time still works,
/// and on targets that have neither a Unix nor a Windows counter.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform;

impl Platform for BuildTargetPlatform {
    fn ticks(&self) -> u64 {
        u64::try_from(EPOCH.elapsed().as_nanos())
            .expect("process running for more than 584 years - impossible")
    }

    fn ticks_per_second(&self) -> Result<NonZero<u64>, ClockError> {
        Ok(NANOS_PER_SECOND)
    }
}
