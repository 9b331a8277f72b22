//! Snapshots of timer frames for display and analysis.

use std::fmt;

use crate::{FrameIndex, FrameState, MetricValue, TimerFrame};

/// The state of every frame of a [`Registry`][crate::Registry] at one point in time.
///
/// A report is plain data. It can be sent to other threads and outlives the registry.
///
/// The [`Display`][fmt::Display] implementation renders frames as a call tree: each frame
/// is listed under the frame whose interval was innermost when it was first used.
///
/// # Examples
///
/// ```
/// use code_timer::{Registry, code_point};
///
/// let registry = Registry::new();
///
/// {
///     let _request = registry.enter(code_point!("request"));
///     let _query = registry.enter(code_point!("query"));
/// }
///
/// let report = registry.report();
///
/// let rendered = report.to_string();
/// assert!(rendered.contains("request"));
/// assert!(rendered.contains("  query"));
///
/// report.print_to_stdout();
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    frames: Vec<ReportFrame>,
}

impl Report {
    pub(crate) fn new(frames: Vec<ReportFrame>) -> Self {
        Self { frames }
    }

    /// All frames, in creation order.
    #[must_use]
    pub fn frames(&self) -> &[ReportFrame] {
        &self.frames
    }

    /// The frame at `index`.
    #[must_use]
    pub fn frame(&self, index: FrameIndex) -> Option<&ReportFrame> {
        // Usually at its own position, unless busy frames were left out of the report.
        self.frames
            .get(index.get())
            .filter(|frame| frame.index == index)
            .or_else(|| self.frames.iter().find(|frame| frame.index == index))
    }

    /// The first frame with the given tag.
    #[must_use]
    pub fn find(&self, tag: &str) -> Option<&ReportFrame> {
        self.frames.iter().find(|frame| frame.tag == tag)
    }

    /// Frames that have no parent, in creation order.
    pub fn roots(&self) -> impl Iterator<Item = &ReportFrame> {
        self.frames.iter().filter(|frame| frame.parent.is_none())
    }

    /// Frames whose parent is `index`, in creation order.
    pub fn children_of(&self, index: FrameIndex) -> impl Iterator<Item = &ReportFrame> {
        self.frames
            .iter()
            .filter(move |frame| frame.parent == Some(index))
    }

    /// Whether no frame in this report was ever started.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.iter().all(|frame| frame.call_count == 0)
    }

    /// Prints the report to stdout.
    ///
    /// Prints nothing if the report is empty.
    #[cfg_attr(test, mutants::skip)] // Too difficult to test stdout output reliably - manually tested.
    pub fn print_to_stdout(&self) {
        if self.is_empty() {
            return;
        }

        println!("{self}");
    }

    fn write_subtree(
        &self,
        f: &mut fmt::Formatter<'_>,
        frame: &ReportFrame,
        level: usize,
    ) -> fmt::Result {
        writeln!(f, "{:indent$}{frame}", "", indent = level.saturating_mul(2))?;

        // A parent is always created before its children, so this terminates.
        for child in self.children_of(frame.index) {
            self.write_subtree(f, child, level.saturating_add(1))?;
        }

        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No timer frames recorded.");
        }

        writeln!(f, "Timer frames:")?;

        for root in self.roots() {
            self.write_subtree(f, root, 1)?;
        }

        Ok(())
    }
}

/// One frame in a [`Report`].
#[derive(Clone, Debug, PartialEq)]
pub struct ReportFrame {
    index: FrameIndex,
    parent: Option<FrameIndex>,
    tag: &'static str,
    file: &'static str,
    line: u32,
    state: FrameState,
    call_count: u64,
    interval_count: u64,
    total_seconds: f64,
    metrics: Vec<ReportMetric>,
}

impl ReportFrame {
    pub(crate) fn capture(frame: &TimerFrame, parent: Option<FrameIndex>) -> Self {
        let code_point = frame.code_point();

        Self {
            index: frame.index(),
            parent,
            tag: code_point.tag(),
            file: code_point.file(),
            line: code_point.line(),
            state: frame.state(),
            call_count: frame.call_count(),
            interval_count: frame.interval_count(),
            total_seconds: frame.total_seconds(),
            metrics: frame
                .metrics()
                .into_iter()
                .map(|(name, value)| ReportMetric { name, value })
                .collect(),
        }
    }

    /// Position of the frame in its registry.
    #[must_use]
    pub fn index(&self) -> FrameIndex {
        self.index
    }

    /// The frame that was innermost when this frame was first used, if any.
    #[must_use]
    pub fn parent(&self) -> Option<FrameIndex> {
        self.parent
    }

    /// Tag of the code point.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// Source file of the code point.
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Source line of the code point.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Lifecycle state when the snapshot was taken.
    #[must_use]
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Number of starts, recursive ones included.
    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    /// Number of closed intervals.
    #[must_use]
    pub fn interval_count(&self) -> u64 {
        self.interval_count
    }

    /// Net elapsed seconds over all closed intervals.
    #[must_use]
    pub fn total_seconds(&self) -> f64 {
        self.total_seconds
    }

    /// Collector readings, in attachment order.
    #[must_use]
    pub fn metrics(&self) -> &[ReportMetric] {
        &self.metrics
    }
}

impl fmt::Display for ReportFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}:{}] calls={} intervals={}",
            self.tag, self.file, self.line, self.call_count, self.interval_count
        )?;

        for metric in &self.metrics {
            write!(f, " {metric}")?;
        }

        match self.state {
            FrameState::Active => write!(f, " (running)"),
            FrameState::Paused => write!(f, " (paused)"),
            FrameState::Idle => Ok(()),
        }
    }
}

/// One collector reading in a [`ReportFrame`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReportMetric {
    name: &'static str,
    value: MetricValue,
}

impl ReportMetric {
    /// Label of the metric.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The reading.
    #[must_use]
    pub fn value(&self) -> MetricValue {
        self.value
    }
}

impl fmt::Display for ReportMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}
