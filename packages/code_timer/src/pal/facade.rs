use std::num::NonZero;
#[cfg(test)]
use std::sync::Arc;
use std::sync::LazyLock;

use crate::ClockError;
#[cfg(test)]
use crate::pal::{FakePlatform, MockPlatform};
use crate::pal::{BUILD_TARGET_PLATFORM, BuildTargetPlatform, Platform};

// Calibrating the real counter may involve a system call, so it happens once per process.
static REAL_TICKS_PER_SECOND: LazyLock<Result<NonZero<u64>, ClockError>> =
    LazyLock::new(|| BUILD_TARGET_PLATFORM.ticks_per_second());

#[derive(Clone, Debug)]
pub(crate) enum PlatformFacade {
    Real(&'static BuildTargetPlatform),

    #[cfg(test)]
    Fake(FakePlatform),

    #[cfg(test)]
    Mock(Arc<MockPlatform>),
}

impl PlatformFacade {
    pub(crate) fn real() -> Self {
        Self::Real(&BUILD_TARGET_PLATFORM)
    }

    #[cfg(test)]
    pub(crate) fn fake(platform: FakePlatform) -> Self {
        Self::Fake(platform)
    }
}

impl Platform for PlatformFacade {
    fn ticks(&self) -> u64 {
        match self {
            Self::Real(p) => p.ticks(),
            #[cfg(test)]
            Self::Fake(p) => p.ticks(),
            #[cfg(test)]
            Self::Mock(p) => p.ticks(),
        }
    }

    fn ticks_per_second(&self) -> Result<NonZero<u64>, ClockError> {
        match self {
            Self::Real(_) => REAL_TICKS_PER_SECOND.clone(),
            #[cfg(test)]
            Self::Fake(p) => p.ticks_per_second(),
            #[cfg(test)]
            Self::Mock(p) => p.ticks_per_second(),
        }
    }
}

impl From<&'static BuildTargetPlatform> for PlatformFacade {
    fn from(p: &'static BuildTargetPlatform) -> Self {
        Self::Real(p)
    }
}

#[cfg(test)]
impl From<MockPlatform> for PlatformFacade {
    fn from(p: MockPlatform) -> Self {
        Self::Mock(Arc::new(p))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    #[cfg_attr(miri, ignore)] // Miri cannot talk to the real platform.
    fn real_calibration_is_memoized() {
        let facade = PlatformFacade::real();

        let first = facade.ticks_per_second();
        let second = facade.ticks_per_second();

        assert!(first.is_ok());
        assert_eq!(first, second);
    }

    #[test]
    #[cfg_attr(miri, ignore)] // Miri cannot talk to the real platform.
    fn real_ticks_do_not_go_backwards() {
        let facade = PlatformFacade::real();

        let a = facade.ticks();
        let b = facade.ticks();

        assert!(b >= a);
    }

    #[test]
    fn fake_is_passed_through() {
        let platform = FakePlatform::new();
        let facade = PlatformFacade::fake(platform.clone());

        let before = facade.ticks();
        platform.advance(Duration::from_millis(3));

        assert_eq!(facade.ticks().checked_sub(before), Some(3_000_000));
        assert_eq!(
            facade.ticks_per_second().map(NonZero::get),
            Ok(1_000_000_000)
        );
    }

    #[test]
    fn mock_is_passed_through() {
        let mut platform = MockPlatform::new();
        platform.expect_ticks().once().return_const(42_u64);

        let facade = PlatformFacade::from(platform);

        assert_eq!(facade.ticks(), 42);
    }
}
