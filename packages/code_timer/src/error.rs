use thiserror::Error;

/// The monotonic clock of the current platform cannot be used.
///
/// Every duration measured by this package depends on the clock, so this is fatal for the
/// whole measurement subsystem. Call [`calibrate()`][crate::calibrate] at process start to
/// surface the problem early instead of panicking on the first measurement.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum ClockError {
    /// The platform could not report how many ticks its counter advances per second.
    #[error("monotonic clock frequency is unavailable: {reason}")]
    FrequencyUnavailable {
        /// Human-readable description of the platform failure.
        reason: String,
    },

    /// The platform reported a tick frequency of zero, which cannot be converted to seconds.
    #[error("monotonic clock reported a zero tick frequency")]
    ZeroFrequency,
}

/// A usage error in instrumented code, detected by a timer frame.
///
/// Misuse never propagates to the caller. Frames repair their own state and report the
/// misuse through `tracing`.
#[derive(Clone, Copy, Debug, Error, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Misuse {
    /// `stop()` was called more times than `start()`.
    #[error("stop() without a matching start()")]
    UnbalancedStop,

    /// `pause()` was called on a frame that is not running.
    #[error("pause() on an idle frame")]
    PauseWhileIdle,

    /// `pause()` was called on a frame that is already paused.
    #[error("pause() on an already paused frame")]
    PauseWhilePaused,

    /// `resume()` was called on a frame that is not running.
    #[error("resume() on an idle frame")]
    ResumeWhileIdle,

    /// `resume()` was called on a frame that is not paused.
    #[error("resume() on a frame that is not paused")]
    ResumeWhileActive,

    /// A frame or registry was used from one of its own collector callbacks.
    #[error("reentrant access from a collector callback")]
    ReentrantAccess,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(ClockError: Send, Sync, Debug, Clone);
    assert_impl_all!(Misuse: Send, Sync, Debug, Copy);

    #[test]
    fn clock_error_mentions_reason() {
        let error = ClockError::FrequencyUnavailable {
            reason: "counter not present".to_string(),
        };

        assert!(error.to_string().contains("counter not present"));
    }

    #[test]
    fn misuse_messages_name_the_operation() {
        assert!(Misuse::UnbalancedStop.to_string().starts_with("stop()"));
        assert!(Misuse::PauseWhileIdle.to_string().starts_with("pause()"));
        assert!(Misuse::ResumeWhileActive.to_string().starts_with("resume()"));
        assert!(Misuse::ReentrantAccess.to_string().contains("collector"));
    }
}
