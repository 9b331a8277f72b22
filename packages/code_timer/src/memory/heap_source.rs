use std::fmt::Debug;
#[cfg(test)]
use std::sync::{Arc, Mutex};

use crate::memory::{WindowId, allocator};
#[cfg(test)]
use crate::memory::Watermarks;

/// Source of heap readings for [`PeakMemory`][crate::PeakMemory].
pub(crate) trait HeapSource: Debug {
    /// Net bytes allocated by the current thread.
    fn live_bytes(&self) -> i64;

    /// Starts recording the peak live total. `None` if recording is impossible.
    fn open_window(&self) -> Option<WindowId>;

    /// Stops recording, returning the peak live total seen since the matching open.
    fn close_window(&self, window: WindowId) -> Option<i64>;
}

#[derive(Clone, Debug)]
pub(crate) enum HeapSourceFacade {
    /// Readings from the tracking global allocator.
    Real,

    #[cfg(test)]
    Fake(FakeHeap),
}

impl HeapSource for HeapSourceFacade {
    fn live_bytes(&self) -> i64 {
        match self {
            Self::Real => allocator::live_bytes(),
            #[cfg(test)]
            Self::Fake(heap) => heap.live_bytes(),
        }
    }

    fn open_window(&self) -> Option<WindowId> {
        match self {
            Self::Real => allocator::open_window(),
            #[cfg(test)]
            Self::Fake(heap) => heap.open_window(),
        }
    }

    fn close_window(&self, window: WindowId) -> Option<i64> {
        match self {
            Self::Real => allocator::close_window(window),
            #[cfg(test)]
            Self::Fake(heap) => heap.close_window(window),
        }
    }
}

#[cfg(test)]
const ERR_POISONED_HEAP: &str = "FakeHeap state lock should not be poisoned";

#[cfg(test)]
#[derive(Debug)]
struct FakeMemoryState {
    live: i64,
    segment_peak: i64,
    watermarks: Watermarks,
}

/// Heap readings driven by the test instead of a real allocator. Clones share state.
#[cfg(test)]
#[derive(Clone, Debug)]
pub(crate) struct FakeHeap {
    state: Arc<Mutex<FakeMemoryState>>,
}

#[cfg(test)]
impl FakeHeap {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeMemoryState {
                live: 0,
                segment_peak: 0,
                watermarks: Watermarks::new(),
            })),
        }
    }

    pub(crate) fn allocate(&self, bytes: i64) {
        let mut state = self.state.lock().expect(ERR_POISONED_HEAP);
        state.live = state.live.saturating_add(bytes);
        state.segment_peak = state.segment_peak.max(state.live);
    }

    pub(crate) fn free(&self, bytes: i64) {
        let mut state = self.state.lock().expect(ERR_POISONED_HEAP);
        state.live = state.live.saturating_sub(bytes);
    }
}

#[cfg(test)]
impl HeapSource for FakeHeap {
    fn live_bytes(&self) -> i64 {
        self.state.lock().expect(ERR_POISONED_HEAP).live
    }

    fn open_window(&self) -> Option<WindowId> {
        let mut state = self.state.lock().expect(ERR_POISONED_HEAP);
        let live = state.live;
        let segment_peak = std::mem::replace(&mut state.segment_peak, live);

        Some(state.watermarks.open(live, segment_peak))
    }

    fn close_window(&self, window: WindowId) -> Option<i64> {
        let mut state = self.state.lock().expect(ERR_POISONED_HEAP);
        let live = state.live;
        let segment_peak = std::mem::replace(&mut state.segment_peak, live);

        state.watermarks.close(window, segment_peak)
    }
}
