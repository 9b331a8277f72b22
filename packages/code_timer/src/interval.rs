use crate::{FrameHandle, FrameState, Registry};

/// Keeps a frame started until dropped.
///
/// Returned by [`Registry::enter()`]. Dropping the guard stops the frame once, so the
/// recursion depth stays balanced on every exit path, panics included.
///
/// # Examples
///
/// ```
/// use code_timer::{Registry, code_point};
///
/// let registry = Registry::new();
///
/// let interval = registry.enter(code_point!("load"));
///
/// {
///     // Time spent waiting for the user is not attributed to "load".
///     let _paused = interval.pause();
/// }
///
/// drop(interval);
/// ```
#[derive(Debug)]
#[must_use = "the interval is closed as soon as the guard is dropped"]
pub struct ActiveInterval<'a> {
    registry: &'a Registry,
    frame: FrameHandle,

    // Registry epoch at entry. A different epoch means the registry force-closed the frame.
    epoch: u64,
}

impl<'a> ActiveInterval<'a> {
    pub(crate) fn new(registry: &'a Registry, frame: FrameHandle, epoch: u64) -> Self {
        Self {
            registry,
            frame,
            epoch,
        }
    }

    /// The frame this interval belongs to.
    #[must_use]
    pub fn frame(&self) -> &FrameHandle {
        &self.frame
    }

    /// Pauses the frame until the returned guard is dropped.
    pub fn pause(&self) -> PausedInterval<'_> {
        PausedInterval::new(&self.frame)
    }
}

impl Drop for ActiveInterval<'_> {
    fn drop(&mut self) {
        // After `close_all()` the frame and the open stack belong to newer intervals.
        if self.registry.epoch() != self.epoch {
            return;
        }

        if self.frame.is_running() {
            self.frame.stop(false);
        }

        self.registry.leave(self.frame.index());
    }
}

/// Keeps a frame paused until dropped.
///
/// Returned by [`ActiveInterval::pause()`]. Only a guard that actually paused the frame
/// resumes it, so nested pauses leave the frame paused until the outermost one ends.
#[derive(Debug)]
#[must_use = "the frame is resumed as soon as the guard is dropped"]
pub struct PausedInterval<'a> {
    frame: &'a FrameHandle,
    resume_on_drop: bool,
}

impl<'a> PausedInterval<'a> {
    fn new(frame: &'a FrameHandle) -> Self {
        let resume_on_drop = frame.state() == FrameState::Active;
        frame.pause();

        Self {
            frame,
            resume_on_drop,
        }
    }
}

impl Drop for PausedInterval<'_> {
    fn drop(&mut self) {
        if self.resume_on_drop && self.frame.is_paused() {
            self.frame.resume();
        }
    }
}

/// Times the rest of the enclosing block as an interval of a code point declared here.
///
/// Expands to a [`code_point!`][crate::code_point] declaration and a call to
/// [`Registry::enter()`] whose guard lives until the end of the enclosing block.
///
/// # Examples
///
/// ```
/// use code_timer::{Registry, timed_scope};
///
/// let registry = Registry::new();
///
/// fn parse(registry: &Registry, input: &str) -> usize {
///     timed_scope!(registry, "parse");
///
///     input.split_whitespace().count()
/// }
///
/// assert_eq!(parse(&registry, "a b c"), 3);
/// assert_eq!(registry.report().frames()[0].tag(), "parse");
/// ```
#[macro_export]
macro_rules! timed_scope {
    ($registry:expr, $tag:expr) => {
        let _code_timer_interval = $registry.enter($crate::code_point!($tag));
    };
}
