//! Ownership and lookup of timer frames.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::{
    ActiveInterval, Clock, ClockError, CodePoint, CodePointId, Collector, ElapsedTime,
    FrameHandle, FrameIndex, Misuse, Report, ReportFrame, TimerFrame,
};

type CollectorFactory = Box<dyn Fn(&'static CodePoint) -> Box<dyn Collector>>;

/// Owns the timer frames of one thread, one frame per code point.
///
/// The first time a code point is used, the registry creates its frame, assigns it the next
/// [`FrameIndex`] and attaches a fresh set of collectors. Later uses of the same code point
/// return the same frame. Code points are compared by identity, so every expansion of
/// [`code_point!`][crate::code_point] is a separate frame even if the tags are equal.
///
/// The registry also remembers which interval entered through it was innermost when each
/// frame was created. [`report()`][Self::report] uses this to arrange frames in a call tree.
///
/// Frames are driven by one thread. Multi-threaded programs create one registry per thread
/// and merge the reports if needed.
///
/// Dropping the registry force-closes every frame that is still running.
///
/// # Examples
///
/// ```
/// use code_timer::{Registry, code_point};
///
/// let registry = Registry::new();
///
/// fn fibonacci(registry: &Registry, n: u64) -> u64 {
///     let _interval = registry.enter(code_point!("fibonacci"));
///
///     if n < 2 {
///         n
///     } else {
///         fibonacci(registry, n - 1) + fibonacci(registry, n - 2)
///     }
/// }
///
/// assert_eq!(fibonacci(&registry, 10), 55);
///
/// // All 177 recursive calls were collapsed into one interval.
/// let report = registry.report();
/// assert_eq!(report.frames().len(), 1);
/// assert_eq!(report.frames()[0].call_count(), 177);
/// assert_eq!(report.frames()[0].interval_count(), 1);
/// ```
pub struct Registry {
    clock: Clock,
    elapsed_time: bool,
    factories: Vec<CollectorFactory>,
    state: RefCell<RegistryState>,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: Vec<Entry>,
    lookup: HashMap<CodePointId, FrameIndex>,

    // Frames entered through `enter()` whose guards are still alive, innermost last.
    open: Vec<FrameIndex>,

    // Advanced by `close_all()`. Guards from an earlier epoch no longer own their frame.
    epoch: u64,
}

#[derive(Debug)]
struct Entry {
    frame: FrameHandle,
    parent: Option<FrameIndex>,
}

impl Registry {
    /// Creates a registry that measures elapsed time on the real platform clock.
    ///
    /// # Panics
    ///
    /// Panics if the platform clock cannot be calibrated.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Returns the frame of `code_point`, creating it on first use.
    pub fn frame(&self, code_point: &'static CodePoint) -> FrameHandle {
        let id = code_point.id();

        {
            let state = self.state.borrow();

            if let Some(frame) = state
                .lookup
                .get(&id)
                .and_then(|index| state.entries.get(index.get()))
                .map(|entry| entry.frame.clone())
            {
                return frame;
            }
        }

        // Factories are user code, so they run without the state borrowed.
        let collectors = self.create_collectors(code_point);

        let mut state = self.state.borrow_mut();

        let index = FrameIndex::new(state.entries.len());
        let parent = state.open.last().copied();

        let frame = FrameHandle::new(TimerFrame::with_clock(
            code_point,
            index,
            self.clock.clone(),
            collectors,
        ));

        state.entries.push(Entry {
            frame: frame.clone(),
            parent,
        });
        state.lookup.insert(id, index);

        frame
    }

    /// Starts the frame of `code_point` and returns a guard that stops it when dropped.
    ///
    /// The frame is stopped on every exit path from the scope holding the guard, including
    /// early returns and panics.
    pub fn enter(&self, code_point: &'static CodePoint) -> ActiveInterval<'_> {
        let frame = self.frame(code_point);
        frame.start();

        let epoch = {
            let mut state = self.state.borrow_mut();
            state.open.push(frame.index());
            state.epoch
        };

        ActiveInterval::new(self, frame, epoch)
    }

    /// The frame at `index`, if the registry has created one there.
    #[must_use]
    pub fn get(&self, index: FrameIndex) -> Option<FrameHandle> {
        self.state
            .borrow()
            .entries
            .get(index.get())
            .map(|entry| entry.frame.clone())
    }

    /// The frame that was innermost when the frame at `index` was created, if any.
    #[must_use]
    pub fn parent_of(&self, index: FrameIndex) -> Option<FrameIndex> {
        self.state
            .borrow()
            .entries
            .get(index.get())
            .and_then(|entry| entry.parent)
    }

    /// Number of frames created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    /// Whether no frame has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().entries.is_empty()
    }

    /// Force-closes every running frame, innermost first, and returns how many there were.
    ///
    /// Meant for abnormal teardown. Guards that are still alive afterwards do nothing when
    /// dropped, even if their code point has been entered again since.
    pub fn close_all(&self) -> usize {
        let running: Vec<FrameHandle> = {
            let mut state = self.state.borrow_mut();
            state.open.clear();
            state.epoch = state.epoch.wrapping_add(1);

            state
                .entries
                .iter()
                .rev()
                .filter(|entry| entry.frame.is_running())
                .map(|entry| entry.frame.clone())
                .collect()
        };

        for frame in &running {
            frame.stop(true);
        }

        running.len()
    }

    /// Captures the current state of every frame.
    ///
    /// A frame that is busy notifying its collectors cannot be read. This happens when a
    /// collector asks for a report from one of its own callbacks. Such frames are left out
    /// of the report.
    #[must_use]
    pub fn report(&self) -> Report {
        let Ok(state) = self.state.try_borrow() else {
            warn!(
                misuse = %Misuse::ReentrantAccess,
                "registry is being modified; report is empty"
            );
            return Report::new(Vec::new());
        };

        let entries: Vec<(FrameHandle, Option<FrameIndex>)> = state
            .entries
            .iter()
            .map(|entry| (entry.frame.clone(), entry.parent))
            .collect();
        drop(state);

        Report::new(
            entries
                .iter()
                .filter_map(|(frame, parent)| {
                    frame.inspect(|frame| ReportFrame::capture(frame, *parent))
                })
                .collect(),
        )
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.state.borrow().epoch
    }

    pub(crate) fn leave(&self, index: FrameIndex) {
        let mut state = self.state.borrow_mut();

        // Guards may be dropped out of order, e.g. when moved into a longer-lived scope.
        if let Some(position) = state.open.iter().rposition(|open| *open == index) {
            state.open.remove(position);
        }
    }

    fn create_collectors(&self, code_point: &'static CodePoint) -> Vec<Box<dyn Collector>> {
        let mut collectors: Vec<Box<dyn Collector>> =
            Vec::with_capacity(self.factories.len().saturating_add(1));

        if self.elapsed_time {
            collectors.push(Box::new(ElapsedTime::new()));
        }

        collectors.extend(self.factories.iter().map(|factory| factory(code_point)));
        collectors
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.close_all();
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("clock", &self.clock)
            .field("elapsed_time", &self.elapsed_time)
            .field("factories", &self.factories.len())
            .field("state", &self.state)
            .finish()
    }
}

/// Configures a [`Registry`].
///
/// By default, every frame gets an [`ElapsedTime`] collector and is timed by the real
/// platform clock.
///
/// # Examples
///
/// ```
/// use code_timer::{PeakMemory, Registry};
///
/// let registry = Registry::builder()
///     .collector(|_| Box::new(PeakMemory::new()))
///     .build();
/// # drop(registry);
/// ```
#[must_use]
pub struct RegistryBuilder {
    clock: Option<Clock>,
    elapsed_time: bool,
    factories: Vec<CollectorFactory>,
}

impl RegistryBuilder {
    fn new() -> Self {
        Self {
            clock: None,
            elapsed_time: true,
            factories: Vec::new(),
        }
    }

    /// Attaches a collector created by `factory` to every new frame.
    ///
    /// Collectors are notified in the order their factories were added, after the built-in
    /// [`ElapsedTime`] collector.
    pub fn collector<F>(mut self, factory: F) -> Self
    where
        F: Fn(&'static CodePoint) -> Box<dyn Collector> + 'static,
    {
        self.factories.push(Box::new(factory));
        self
    }

    /// Does not attach the built-in [`ElapsedTime`] collector.
    ///
    /// Frames still track their total elapsed time; only the `time` metric is omitted.
    pub fn without_elapsed_time(mut self) -> Self {
        self.elapsed_time = false;
        self
    }

    /// Times frames with `clock` instead of the real platform clock.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Creates the registry.
    ///
    /// # Panics
    ///
    /// Panics if no clock was provided and the platform clock cannot be calibrated.
    #[must_use]
    pub fn build(self) -> Registry {
        self.try_build()
            .unwrap_or_else(|error| panic!("monotonic clock is unusable: {error}"))
    }

    /// Creates the registry, failing if no clock was provided and the platform clock cannot
    /// be calibrated.
    pub fn try_build(self) -> Result<Registry, ClockError> {
        let clock = match self.clock {
            Some(clock) => clock,
            None => Clock::try_new()?,
        };

        Ok(Registry {
            clock,
            elapsed_time: self.elapsed_time,
            factories: self.factories,
            state: RefCell::new(RegistryState::default()),
        })
    }
}

impl fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryBuilder")
            .field("clock", &self.clock)
            .field("elapsed_time", &self.elapsed_time)
            .field("factories", &self.factories.len())
            .finish()
    }
}
