//! Pluggable per-frame metrics.

use std::fmt::{self, Debug};

/// Accumulates one metric for the timer frame it is attached to.
///
/// A frame notifies its collectors, in attachment order, whenever its measured interval
/// opens, closes, pauses or resumes. Recursive re-entry into a running frame is collapsed by
/// the frame, so a collector only ever sees one open interval at a time. Collectors must not
/// depend on side effects of other collectors attached to the same frame.
///
/// Elapsed time is measured by the frame itself and handed to [`on_close()`][Self::on_close];
/// collectors that measure something else (e.g. [`PeakMemory`][crate::PeakMemory]) take
/// their own readings in the other callbacks.
///
/// # Examples
///
/// ```
/// use code_timer::{Collector, MetricValue};
///
/// #[derive(Debug, Default)]
/// struct LongestInterval {
///     longest: f64,
/// }
///
/// impl Collector for LongestInterval {
///     fn name(&self) -> &'static str {
///         "longest"
///     }
///
///     fn on_close(&mut self, elapsed_seconds: f64) {
///         self.longest = self.longest.max(elapsed_seconds);
///     }
///
///     fn value(&self) -> MetricValue {
///         MetricValue::Seconds(self.longest)
///     }
/// }
/// ```
pub trait Collector: Debug {
    /// Label of the metric in reports.
    fn name(&self) -> &'static str;

    /// The frame opened a new interval. Collectors may take a baseline reading here.
    fn on_open(&mut self) {}

    /// The frame closed its interval, having been actively timing for `elapsed_seconds`
    /// (pauses excluded). Always non-negative and finite.
    fn on_close(&mut self, elapsed_seconds: f64);

    /// The frame stopped measuring without closing its interval.
    fn on_pause(&mut self) {}

    /// The frame continues measuring after a pause.
    fn on_resume(&mut self) {}

    /// The value accumulated so far.
    fn value(&self) -> MetricValue;
}

/// A metric reading reported by a [`Collector`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[non_exhaustive]
pub enum MetricValue {
    /// A duration in seconds.
    Seconds(f64),

    /// An amount of memory in bytes.
    Bytes(u64),

    /// A plain count of events.
    Count(u64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(seconds) => write!(f, "{seconds:.6} s"),
            Self::Bytes(bytes) => write!(f, "{bytes} B"),
            Self::Count(count) => write!(f, "{count}"),
        }
    }
}

/// Total time spent in closed intervals of a frame. Attached to every frame by default.
#[derive(Debug, Default)]
pub struct ElapsedTime {
    total_seconds: f64,
    intervals: u64,
}

impl ElapsedTime {
    /// Creates a collector with nothing accumulated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of the net elapsed seconds of every closed interval.
    #[must_use]
    pub fn total_seconds(&self) -> f64 {
        self.total_seconds
    }

    /// Number of closed intervals.
    #[must_use]
    pub fn intervals(&self) -> u64 {
        self.intervals
    }
}

impl Collector for ElapsedTime {
    fn name(&self) -> &'static str {
        "time"
    }

    fn on_close(&mut self, elapsed_seconds: f64) {
        self.total_seconds += elapsed_seconds;
        self.intervals = self.intervals.saturating_add(1);
    }

    fn value(&self) -> MetricValue {
        MetricValue::Seconds(self.total_seconds)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn elapsed_time_sums_closed_intervals() {
        let mut collector = ElapsedTime::new();

        collector.on_open();
        collector.on_close(0.25);
        collector.on_open();
        collector.on_pause();
        collector.on_resume();
        collector.on_close(0.5);

        assert_eq!(collector.intervals(), 2);
        assert!((collector.total_seconds() - 0.75).abs() < 1e-12);
        assert_eq!(collector.value(), MetricValue::Seconds(0.75));
    }

    #[test]
    fn metric_values_display_with_units() {
        assert_eq!(MetricValue::Seconds(1.5).to_string(), "1.500000 s");
        assert_eq!(MetricValue::Bytes(2048).to_string(), "2048 B");
        assert_eq!(MetricValue::Count(3).to_string(), "3");
    }
}
