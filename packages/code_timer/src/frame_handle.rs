use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;

use crate::{CodePoint, FrameIndex, FrameState, MetricValue, Misuse, TimerFrame};

/// Shared handle to a [`TimerFrame`] owned by a [`Registry`][crate::Registry].
///
/// Cloning the handle does not clone the frame. All clones operate on the same frame, which
/// lives for as long as the registry or any handle does.
///
/// The handle is bound to the thread that created it. A frame is only ever driven by one
/// logical thread of execution; use one registry per thread.
///
/// While the frame is notifying its collectors, it cannot be used through a handle. A
/// collector that calls back into its own frame gets a warning instead: operations do
/// nothing and queries return the default value of their type.
#[derive(Clone, Debug)]
pub struct FrameHandle {
    frame: Rc<RefCell<TimerFrame>>,

    // Fixed at creation, so readable while the frame is busy.
    code_point: &'static CodePoint,
    index: FrameIndex,
}

impl FrameHandle {
    pub(crate) fn new(frame: TimerFrame) -> Self {
        Self {
            code_point: frame.code_point(),
            index: frame.index(),
            frame: Rc::new(RefCell::new(frame)),
        }
    }

    /// See [`TimerFrame::start()`].
    pub fn start(&self) {
        self.update("start", TimerFrame::start);
    }

    /// See [`TimerFrame::stop()`].
    pub fn stop(&self, forced: bool) -> bool {
        self.update("stop", |frame| frame.stop(forced))
    }

    /// See [`TimerFrame::pause()`].
    pub fn pause(&self) {
        self.update("pause", TimerFrame::pause);
    }

    /// See [`TimerFrame::resume()`].
    pub fn resume(&self) {
        self.update("resume", TimerFrame::resume);
    }

    /// See [`TimerFrame::is_running()`].
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.read("is_running", TimerFrame::is_running)
    }

    /// See [`TimerFrame::is_paused()`].
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.read("is_paused", TimerFrame::is_paused)
    }

    /// See [`TimerFrame::state()`].
    #[must_use]
    pub fn state(&self) -> FrameState {
        self.read("state", TimerFrame::state)
    }

    /// See [`TimerFrame::depth()`].
    #[must_use]
    pub fn depth(&self) -> usize {
        self.read("depth", TimerFrame::depth)
    }

    /// See [`TimerFrame::code_point()`].
    #[must_use]
    pub fn code_point(&self) -> &'static CodePoint {
        self.code_point
    }

    /// See [`TimerFrame::index()`].
    #[must_use]
    pub fn index(&self) -> FrameIndex {
        self.index
    }

    /// See [`TimerFrame::total_seconds()`].
    #[must_use]
    pub fn total_seconds(&self) -> f64 {
        self.read("total_seconds", TimerFrame::total_seconds)
    }

    /// See [`TimerFrame::current_seconds()`].
    #[must_use]
    pub fn current_seconds(&self) -> f64 {
        self.read("current_seconds", TimerFrame::current_seconds)
    }

    /// See [`TimerFrame::call_count()`].
    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.read("call_count", TimerFrame::call_count)
    }

    /// See [`TimerFrame::interval_count()`].
    #[must_use]
    pub fn interval_count(&self) -> u64 {
        self.read("interval_count", TimerFrame::interval_count)
    }

    /// See [`TimerFrame::metrics()`].
    #[must_use]
    pub fn metrics(&self) -> Vec<(&'static str, MetricValue)> {
        self.read("metrics", TimerFrame::metrics)
    }

    /// Runs `f` with shared access to the frame.
    ///
    /// Returns `None` without calling `f` if the frame is busy notifying its collectors.
    pub fn inspect<R>(&self, f: impl FnOnce(&TimerFrame) -> R) -> Option<R> {
        self.try_read("inspect", f)
    }

    /// Whether both handles refer to the same frame.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.frame, &other.frame)
    }

    fn update<R: Default>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut TimerFrame) -> R,
    ) -> R {
        if let Ok(mut frame) = self.frame.try_borrow_mut() {
            f(&mut frame)
        } else {
            self.report_reentrancy(operation);
            R::default()
        }
    }

    fn read<R: Default>(&self, operation: &'static str, f: impl FnOnce(&TimerFrame) -> R) -> R {
        self.try_read(operation, f).unwrap_or_default()
    }

    fn try_read<R>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&TimerFrame) -> R,
    ) -> Option<R> {
        if let Ok(frame) = self.frame.try_borrow() {
            Some(f(&frame))
        } else {
            self.report_reentrancy(operation);
            None
        }
    }

    fn report_reentrancy(&self, operation: &'static str) {
        warn!(
            tag = self.code_point.tag(),
            file = self.code_point.file(),
            line = self.code_point.line(),
            operation,
            misuse = %Misuse::ReentrantAccess,
            "timer frame used while notifying its collectors; ignoring"
        );
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use static_assertions::assert_not_impl_any;

    use super::*;
    use crate::pal::{FakePlatform, PlatformFacade};
    use crate::{Clock, Collector, ElapsedTime};

    assert_not_impl_any!(FrameHandle: Send, Sync);

    static CODE_POINT: CodePoint = CodePoint::new("handle", "frame_handle.rs", 1);

    fn fake_handle() -> (FrameHandle, FakePlatform) {
        let platform = FakePlatform::new();
        let clock = Clock::from_platform(PlatformFacade::fake(platform.clone()))
            .expect("fake calibration succeeds");

        let frame = TimerFrame::with_clock(
            &CODE_POINT,
            FrameIndex::new(0),
            clock,
            vec![Box::new(ElapsedTime::new())],
        );

        (FrameHandle::new(frame), platform)
    }

    #[test]
    fn clones_share_one_frame() {
        let (handle, platform) = fake_handle();
        let other = handle.clone();

        handle.start();
        assert!(other.is_running());

        platform.advance(Duration::from_millis(4));
        assert!(!other.stop(false));

        assert!(!handle.is_running());
        assert_eq!(handle.interval_count(), 1);
        assert!((handle.total_seconds() - 0.004).abs() < 1e-9);
        assert!(handle.ptr_eq(&other));
    }

    #[test]
    fn delegates_pause_and_resume() {
        let (handle, platform) = fake_handle();

        handle.start();
        handle.pause();
        assert!(handle.is_paused());
        assert_eq!(handle.state(), FrameState::Paused);
        assert_eq!(handle.depth(), 1);

        platform.advance(Duration::from_millis(50));
        handle.resume();
        assert_eq!(handle.state(), FrameState::Active);
        assert!(handle.current_seconds().abs() < 1e-9);

        handle.stop(false);
        assert_eq!(handle.call_count(), 1);
    }

    #[test]
    fn inspect_sees_frame_details() {
        let (handle, _) = fake_handle();

        let (tag, collectors) = handle
            .inspect(|frame| (frame.code_point().tag(), frame.collectors().len()))
            .expect("frame is not busy");

        assert_eq!(tag, "handle");
        assert_eq!(collectors, 1);
        assert_eq!(handle.index(), FrameIndex::new(0));
        assert_eq!(handle.code_point().line(), 1);
        assert_eq!(handle.metrics()[0].0, "time");
    }

    // Uses its own frame from inside the close notification.
    #[derive(Debug)]
    struct CallsBack {
        handle: Rc<RefCell<Option<FrameHandle>>>,
        seen: Rc<Cell<Option<(bool, FrameIndex, bool)>>>,
    }

    impl Collector for CallsBack {
        fn name(&self) -> &'static str {
            "calls_back"
        }

        fn on_close(&mut self, _elapsed_seconds: f64) {
            let handle = self
                .handle
                .borrow()
                .clone()
                .expect("handle is set before the frame runs");

            handle.start();
            let still_open = handle.stop(false);

            self.seen.set(Some((
                handle.is_running() || still_open,
                handle.index(),
                handle.inspect(|_| ()).is_some(),
            )));
        }

        fn value(&self) -> MetricValue {
            MetricValue::Count(0)
        }
    }

    #[test]
    fn collector_using_own_frame_is_ignored() {
        let platform = FakePlatform::new();
        let clock = Clock::from_platform(PlatformFacade::fake(platform.clone()))
            .expect("fake calibration succeeds");

        let slot = Rc::new(RefCell::new(None));
        let seen = Rc::new(Cell::new(None));

        let handle = FrameHandle::new(TimerFrame::with_clock(
            &CODE_POINT,
            FrameIndex::new(3),
            clock,
            vec![Box::new(CallsBack {
                handle: Rc::clone(&slot),
                seen: Rc::clone(&seen),
            })],
        ));
        *slot.borrow_mut() = Some(handle.clone());

        handle.start();
        platform.advance(Duration::from_millis(2));
        assert!(!handle.stop(false));

        // Inside the callback every use was a no-op, only the fixed details were readable.
        assert_eq!(seen.get(), Some((false, FrameIndex::new(3), false)));

        assert_eq!(handle.state(), FrameState::Idle);
        assert_eq!(handle.depth(), 0);
        assert_eq!(handle.interval_count(), 1);
        assert!((handle.total_seconds() - 0.002).abs() < 1e-9);

        // Nothing leaked into the next interval.
        handle.start();
        assert_eq!(handle.depth(), 1);
        assert!(!handle.stop(false));

        // Break the cycle between the frame and its collector.
        slot.borrow_mut().take();
    }
}
