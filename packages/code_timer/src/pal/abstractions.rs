use std::fmt::Debug;
use std::num::NonZero;

use crate::ClockError;

/// A monotonic counter that only ever moves forward while the process is alive.
///
/// All PAL calls must go through this trait, enabling them to be faked or mocked.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Reads the current value of the counter.
    ///
    /// A counter that cannot be read is a fatal condition and panics.
    fn ticks(&self) -> u64;

    /// Determines how many ticks the counter advances per second.
    ///
    /// This may be expensive and is expected to be called once per process (real platform)
    /// or once per clock (fake platforms).
    fn ticks_per_second(&self) -> Result<NonZero<u64>, ClockError>;
}
