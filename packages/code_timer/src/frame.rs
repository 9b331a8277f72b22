//! The recursion-aware timing state machine of one code point.

use std::fmt;

use tracing::{debug, warn};

use crate::{Clock, CodePoint, Collector, MetricValue, Misuse, Timestamp};

/// Position of a frame in the arena of the [`Registry`][crate::Registry] that owns it.
///
/// Assigned once, when the frame is created, and never changed.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FrameIndex(usize);

impl FrameIndex {
    /// Wraps a raw arena position.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The raw arena position.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a [`TimerFrame`] is in its lifecycle.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum FrameState {
    /// No interval is open.
    #[default]
    Idle,

    /// An interval is open and time is being accumulated.
    Active,

    /// An interval is open but time is not being accumulated.
    Paused,
}

/// Measures the time spent in one code point, collapsing recursive entries into one interval.
///
/// Every [`start()`][Self::start] increments a recursion depth and every
/// [`stop()`][Self::stop] decrements it. Only the transition from depth 0 to 1 opens an
/// interval and only the transition back to 0 closes it, so N nested entries produce one net
/// interval spanning the outermost entry. [`pause()`][Self::pause] and
/// [`resume()`][Self::resume] exclude a stretch of time from the open interval without
/// touching the depth.
///
/// The frame notifies its [`Collector`]s, in attachment order, whenever the interval opens,
/// closes, pauses or resumes. It knows nothing about other frames; placing frames in a tree
/// is the job of the [`Registry`][crate::Registry].
///
/// Misuse (stopping an idle frame, pausing twice, ...) never fails the caller. The frame
/// keeps its state consistent and reports the misuse through `tracing`.
///
/// A frame that is dropped while still running is force-closed first.
///
/// # Examples
///
/// ```
/// use code_timer::{ElapsedTime, FrameIndex, TimerFrame, code_point};
///
/// let mut frame = TimerFrame::new(
///     code_point!("fibonacci"),
///     FrameIndex::new(0),
///     vec![Box::new(ElapsedTime::new())],
/// );
///
/// frame.start(); // Outer call.
/// frame.start(); // Recursive call.
/// assert!(frame.stop(false)); // Swallowed by the outer call.
/// assert!(!frame.stop(false)); // Interval closed.
///
/// assert!(!frame.is_running());
/// assert_eq!(frame.interval_count(), 1);
/// ```
#[derive(Debug)]
pub struct TimerFrame {
    code_point: &'static CodePoint,
    index: FrameIndex,
    clock: Clock,

    depth: usize,
    paused: bool,

    // Start of the current stretch of active timing. `None` while idle or paused.
    active_since: Option<Timestamp>,

    // Active time of the open interval accumulated before the most recent pause.
    banked_seconds: f64,

    total_seconds: f64,
    call_count: u64,
    interval_count: u64,

    collectors: Vec<Box<dyn Collector>>,
}

impl TimerFrame {
    /// Creates an idle frame timed by the real platform clock.
    ///
    /// # Panics
    ///
    /// Panics if the platform clock cannot be calibrated.
    #[must_use]
    pub fn new(
        code_point: &'static CodePoint,
        index: FrameIndex,
        collectors: Vec<Box<dyn Collector>>,
    ) -> Self {
        Self::with_clock(code_point, index, Clock::new(), collectors)
    }

    /// Creates an idle frame timed by the given clock.
    #[must_use]
    pub fn with_clock(
        code_point: &'static CodePoint,
        index: FrameIndex,
        clock: Clock,
        collectors: Vec<Box<dyn Collector>>,
    ) -> Self {
        Self {
            code_point,
            index,
            clock,
            depth: 0,
            paused: false,
            active_since: None,
            banked_seconds: 0.0,
            total_seconds: 0.0,
            call_count: 0,
            interval_count: 0,
            collectors,
        }
    }

    /// Enters the code point.
    ///
    /// Opens a new interval if the frame was idle, otherwise only records one more level of
    /// recursion. Entering a paused frame keeps it paused.
    pub fn start(&mut self) {
        self.call_count = self.call_count.saturating_add(1);

        if self.depth == 0 {
            self.active_since = Some(self.clock.now());
            self.banked_seconds = 0.0;
            self.paused = false;

            for collector in &mut self.collectors {
                collector.on_open();
            }
        }

        self.depth = self
            .depth
            .checked_add(1)
            .expect("recursion depth exceeds usize - impossible with a real call stack");
    }

    /// Leaves the code point.
    ///
    /// Decrements the recursion depth, or resets it to zero if `forced` is set (used when
    /// unwinding through nested entries). When the depth reaches zero, the interval is
    /// closed: its net elapsed time is added to the frame total and handed to every collector.
    ///
    /// Returns `true` if the frame is still running, i.e. this call was absorbed by an
    /// enclosing recursive entry.
    ///
    /// Stopping an idle frame is a usage error. The frame stays idle, nothing is recorded
    /// and a warning is emitted.
    pub fn stop(&mut self, forced: bool) -> bool {
        if self.depth == 0 {
            warn!(
                tag = self.code_point.tag(),
                file = self.code_point.file(),
                line = self.code_point.line(),
                misuse = %Misuse::UnbalancedStop,
                "timer frame stopped more often than started"
            );
            return false;
        }

        if forced {
            if self.depth > 1 {
                debug!(
                    tag = self.code_point.tag(),
                    depth = self.depth,
                    "force-closing nested timer frame entries"
                );
            }

            self.depth = 0;
        } else {
            self.depth = self
                .depth
                .checked_sub(1)
                .expect("depth was checked to be positive - impossible to underflow");
        }

        if self.depth > 0 {
            return true;
        }

        self.close_interval();
        false
    }

    /// Stops accumulating time without closing the interval.
    ///
    /// Does nothing if the frame is idle or already paused.
    pub fn pause(&mut self) {
        if self.depth == 0 {
            self.ignore_misuse(Misuse::PauseWhileIdle);
            return;
        }

        if self.paused {
            self.ignore_misuse(Misuse::PauseWhilePaused);
            return;
        }

        self.bank_active_time();
        self.paused = true;

        for collector in &mut self.collectors {
            collector.on_pause();
        }
    }

    /// Continues accumulating time after [`pause()`][Self::pause].
    ///
    /// Does nothing if the frame is idle or not paused.
    pub fn resume(&mut self) {
        if self.depth == 0 {
            self.ignore_misuse(Misuse::ResumeWhileIdle);
            return;
        }

        if !self.paused {
            self.ignore_misuse(Misuse::ResumeWhileActive);
            return;
        }

        self.active_since = Some(self.clock.now());
        self.paused = false;

        for collector in &mut self.collectors {
            collector.on_resume();
        }
    }

    /// Whether an interval is open, paused or not.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.depth > 0
    }

    /// Whether an interval is open but paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.depth > 0 && self.paused
    }

    /// The lifecycle state of the frame.
    #[must_use]
    pub fn state(&self) -> FrameState {
        if self.depth == 0 {
            FrameState::Idle
        } else if self.paused {
            FrameState::Paused
        } else {
            FrameState::Active
        }
    }

    /// Number of unmatched [`start()`][Self::start] calls.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The code point this frame measures.
    #[must_use]
    pub fn code_point(&self) -> &'static CodePoint {
        self.code_point
    }

    /// Position of this frame in its registry.
    #[must_use]
    pub fn index(&self) -> FrameIndex {
        self.index
    }

    /// Net elapsed seconds over all closed intervals.
    #[must_use]
    pub fn total_seconds(&self) -> f64 {
        self.total_seconds
    }

    /// Net elapsed seconds of the open interval so far, or zero if idle.
    #[must_use]
    pub fn current_seconds(&self) -> f64 {
        match self.active_since {
            Some(since) => self.banked_seconds + elapsed_since(since, self.clock.now()),
            None => self.banked_seconds,
        }
    }

    /// Number of [`start()`][Self::start] calls, recursive ones included.
    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    /// Number of closed intervals.
    #[must_use]
    pub fn interval_count(&self) -> u64 {
        self.interval_count
    }

    /// The attached collectors, in attachment order.
    #[must_use]
    pub fn collectors(&self) -> &[Box<dyn Collector>] {
        &self.collectors
    }

    /// The name and current value of every attached collector, in attachment order.
    #[must_use]
    pub fn metrics(&self) -> Vec<(&'static str, MetricValue)> {
        self.collectors
            .iter()
            .map(|collector| (collector.name(), collector.value()))
            .collect()
    }

    /// Attaches another collector.
    ///
    /// If an interval is already open, the collector starts observing it from now on.
    pub fn attach(&mut self, mut collector: Box<dyn Collector>) {
        if self.is_running() {
            collector.on_open();

            if self.paused {
                collector.on_pause();
            }
        }

        self.collectors.push(collector);
    }

    fn bank_active_time(&mut self) {
        if let Some(since) = self.active_since.take() {
            self.banked_seconds += elapsed_since(since, self.clock.now());
        }
    }

    fn close_interval(&mut self) {
        // A paused interval was banked when it paused, so no fresh reading is taken.
        self.bank_active_time();

        let elapsed = self.banked_seconds;

        self.total_seconds += elapsed;
        self.interval_count = self.interval_count.saturating_add(1);
        self.banked_seconds = 0.0;
        self.paused = false;

        for collector in &mut self.collectors {
            collector.on_close(elapsed);
        }
    }

    fn ignore_misuse(&self, misuse: Misuse) {
        debug!(
            tag = self.code_point.tag(),
            file = self.code_point.file(),
            line = self.code_point.line(),
            %misuse,
            "ignoring timer frame misuse"
        );
    }
}

impl Drop for TimerFrame {
    fn drop(&mut self) {
        if self.is_running() {
            debug!(
                tag = self.code_point.tag(),
                depth = self.depth,
                "closing timer frame that was still running at teardown"
            );

            self.stop(true);
        }
    }
}

// Clock anomalies must never produce negative or non-finite durations.
fn elapsed_since(since: Timestamp, now: Timestamp) -> f64 {
    let seconds = now - since;

    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}
