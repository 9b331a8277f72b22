use crate::memory::{HeapSource, HeapSourceFacade, WindowId};
use crate::{Collector, MetricValue};

/// High-water mark of heap usage inside the intervals of a frame.
///
/// For each interval, the collector records how far the live heap total rose above its
/// value when the interval opened. Growth that happens while the frame is paused does not
/// count. The reported value is the largest such rise over all closed intervals.
///
/// Readings come from [`Allocator`][crate::Allocator], which must be installed as the global
/// allocator. Heap usage is accounted per thread: only memory allocated and freed by the
/// thread driving the frame counts, which matches the one-registry-per-thread model. Any
/// number of frames with this collector may be open at the same time, nested or not.
///
/// # Examples
///
/// ```
/// use code_timer::{PeakMemory, Registry, code_point};
///
/// #[global_allocator]
/// static ALLOCATOR: code_timer::Allocator<std::alloc::System> = code_timer::Allocator::system();
///
/// let registry = Registry::builder()
///     .collector(|_| Box::new(PeakMemory::new()))
///     .build();
///
/// {
///     let _interval = registry.enter(code_point!("allocate"));
///     let buffer = vec![0_u8; 1024 * 1024];
///     std::hint::black_box(&buffer);
/// }
///
/// println!("{}", registry.report());
/// ```
#[derive(Debug)]
pub struct PeakMemory {
    heap: HeapSourceFacade,

    baseline: i64,

    // Present while the collector watches the heap (interval open and not paused).
    window: Option<WindowId>,

    interval_peak: u64,
    max_peak: u64,
}

impl PeakMemory {
    /// Creates a collector reading from the tracking global allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_heap(HeapSourceFacade::Real)
    }

    pub(crate) fn with_heap(heap: HeapSourceFacade) -> Self {
        Self {
            heap,
            baseline: 0,
            window: None,
            interval_peak: 0,
            max_peak: 0,
        }
    }

    /// Largest rise above the interval baseline seen in any closed interval, in bytes.
    #[must_use]
    pub fn peak_bytes(&self) -> u64 {
        self.max_peak
    }

    fn start_watching(&mut self) {
        if self.window.is_none() {
            self.window = self.heap.open_window();
        }
    }

    fn stop_watching(&mut self) {
        let Some(window) = self.window.take() else {
            return;
        };

        if let Some(observed) = self.heap.close_window(window) {
            let rise = u64::try_from(observed.saturating_sub(self.baseline)).unwrap_or(0);
            self.interval_peak = self.interval_peak.max(rise);
        }
    }
}

impl Default for PeakMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for PeakMemory {
    fn name(&self) -> &'static str {
        "peak_memory"
    }

    fn on_open(&mut self) {
        self.stop_watching();

        self.interval_peak = 0;
        self.start_watching();

        // Taken after opening the window, which may allocate.
        self.baseline = self.heap.live_bytes();
    }

    fn on_close(&mut self, _elapsed_seconds: f64) {
        self.stop_watching();
        self.max_peak = self.max_peak.max(self.interval_peak);
    }

    fn on_pause(&mut self) {
        self.stop_watching();
    }

    fn on_resume(&mut self) {
        self.start_watching();
    }

    fn value(&self) -> MetricValue {
        MetricValue::Bytes(self.max_peak)
    }
}
