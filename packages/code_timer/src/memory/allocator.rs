//! Allocation wrapper for tracking live heap bytes.

use std::alloc::{GlobalAlloc, Layout};
use std::cell::{Cell, RefCell};
use std::fmt;

use crate::memory::{Watermarks, WindowId};

thread_local! {
    // Net bytes allocated minus bytes freed by the current thread. Negative when the thread
    // frees more memory allocated elsewhere than it allocates itself.
    static THREAD_LIVE: Cell<i64> = const { Cell::new(0) };

    // Highest `THREAD_LIVE` value since the last window of this thread opened or closed.
    static THREAD_SEGMENT_PEAK: Cell<i64> = const { Cell::new(0) };

    // Never touched by the allocation hooks, so it may allocate.
    static THREAD_WINDOWS: RefCell<Watermarks> = const { RefCell::new(Watermarks::new()) };
}

#[inline]
fn track_allocation(size: usize) {
    let size: u64 = size.try_into().expect("usize always fits into u64");

    // The thread-local state has no destructor, so it stays usable during thread teardown.
    _ = THREAD_LIVE.try_with(|live| {
        let updated = live.get().saturating_add_unsigned(size);
        live.set(updated);

        _ = THREAD_SEGMENT_PEAK.try_with(|peak| peak.set(peak.get().max(updated)));
    });
}

#[inline]
fn track_deallocation(size: usize) {
    let size: u64 = size.try_into().expect("usize always fits into u64");

    _ = THREAD_LIVE.try_with(|live| live.set(live.get().saturating_sub_unsigned(size)));
}

/// Net bytes allocated through the tracking allocator by the current thread.
pub(crate) fn live_bytes() -> i64 {
    THREAD_LIVE.try_with(Cell::get).unwrap_or_default()
}

// Ends the current segment, returning its peak and starting the next one at the live total.
fn take_segment_peak() -> (i64, i64) {
    let live = live_bytes();
    let peak = THREAD_SEGMENT_PEAK
        .try_with(|peak| peak.replace(live))
        .unwrap_or(live);

    (live, peak)
}

/// Opens a peak window on the current thread.
///
/// Returns `None` if the thread is being torn down.
pub(crate) fn open_window() -> Option<WindowId> {
    THREAD_WINDOWS
        .try_with(|windows| {
            let mut windows = windows.borrow_mut();
            windows.reserve();

            let (live, segment_peak) = take_segment_peak();
            windows.open(live, segment_peak)
        })
        .ok()
}

/// Closes a peak window opened on the current thread, returning the highest live total seen
/// while it was open.
pub(crate) fn close_window(window: WindowId) -> Option<i64> {
    THREAD_WINDOWS
        .try_with(|windows| {
            let (_, segment_peak) = take_segment_peak();
            windows.borrow_mut().close(window, segment_peak)
        })
        .ok()
        .flatten()
}

/// A memory allocator that tracks the live heap total for [`PeakMemory`][crate::PeakMemory].
///
/// This allocator wraps any [`GlobalAlloc`] implementation, forwarding every call and
/// recording how many bytes are currently allocated.
///
/// # Examples
///
/// ```rust
/// use code_timer::Allocator;
///
/// #[global_allocator]
/// static ALLOCATOR: Allocator<std::alloc::System> = Allocator::system();
/// ```
pub struct Allocator<A: GlobalAlloc> {
    inner: A,
}

impl<A: GlobalAlloc> fmt::Debug for Allocator<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("inner", &"<allocator>")
            .finish()
    }
}

impl Allocator<std::alloc::System> {
    /// Creates a tracking allocator on top of the system allocator.
    #[must_use]
    #[inline]
    pub const fn system() -> Self {
        Self {
            inner: std::alloc::System,
        }
    }
}

impl<A: GlobalAlloc> Allocator<A> {
    /// Creates a tracking allocator on top of the provided allocator.
    #[must_use]
    #[inline]
    pub const fn new(allocator: A) -> Self {
        Self { inner: allocator }
    }
}

// SAFETY: We delegate all allocation operations to the underlying allocator,
// which already implements GlobalAlloc safely, while adding tracking functionality.
unsafe impl<A: GlobalAlloc> GlobalAlloc for Allocator<A> {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        // SAFETY: We forward the call to the underlying allocator which implements GlobalAlloc.
        let ptr = unsafe { self.inner.alloc(layout) };

        if !ptr.is_null() {
            track_allocation(layout.size());
        }

        ptr
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        track_deallocation(layout.size());

        // SAFETY: We forward the call to the underlying allocator which implements GlobalAlloc.
        unsafe { self.inner.dealloc(ptr, layout) }
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        // SAFETY: We forward the call to the underlying allocator which implements GlobalAlloc.
        let ptr = unsafe { self.inner.alloc_zeroed(layout) };

        if !ptr.is_null() {
            track_allocation(layout.size());
        }

        ptr
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        // SAFETY: We forward the call to the underlying allocator which implements GlobalAlloc.
        let new_ptr = unsafe { self.inner.realloc(ptr, layout, new_size) };

        // On failure the original block is untouched and still live.
        if !new_ptr.is_null() {
            track_deallocation(layout.size());
            track_allocation(new_size);
        }

        new_ptr
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::thread;

    use super::*;

    static_assertions::assert_impl_all!(Allocator<std::alloc::System>: Send, Sync);

    // The unit test binary does not install the tracking allocator, so the counters only
    // move when we drive the allocator by hand. They are per thread, so tests do not see
    // each other's allocations.
    #[test]
    fn tracks_live_bytes_and_nested_windows() {
        let allocator = Allocator::system();
        let layout = Layout::from_size_align(4096, 8).expect("valid layout");
        let start = live_bytes();

        let outer = open_window().expect("thread is alive");

        // SAFETY: Layout has non-zero size.
        let a = unsafe { allocator.alloc(layout) };
        assert!(!a.is_null());
        assert_eq!(live_bytes(), start + 4096);

        let inner = open_window().expect("thread is alive");

        // SAFETY: Layout has non-zero size.
        let b = unsafe { allocator.alloc_zeroed(layout) };
        assert!(!b.is_null());

        // SAFETY: `b` was allocated above with the same layout.
        unsafe { allocator.dealloc(b, layout) };

        let inner_peak = close_window(inner).expect("window is open");
        assert!(inner_peak >= start + 8192);

        // SAFETY: `a` was allocated above with the same layout.
        unsafe { allocator.dealloc(a, layout) };

        let outer_peak = close_window(outer).expect("window is open");
        assert!(outer_peak >= inner_peak);
        assert_eq!(live_bytes(), start);
    }

    #[test]
    fn other_threads_do_not_move_the_counters() {
        let start = live_bytes();
        let window = open_window().expect("thread is alive");

        thread::spawn(|| {
            let allocator = Allocator::system();
            let layout = Layout::from_size_align(1 << 20, 8).expect("valid layout");

            // SAFETY: Layout has non-zero size.
            let ptr = unsafe { allocator.alloc(layout) };
            assert!(!ptr.is_null());

            // SAFETY: `ptr` was allocated above with the same layout.
            unsafe { allocator.dealloc(ptr, layout) };
        })
        .join()
        .expect("allocating thread succeeds");

        assert_eq!(close_window(window), Some(start));
        assert_eq!(live_bytes(), start);
    }

    #[test]
    fn window_from_another_thread_is_unknown() {
        let window = open_window().expect("thread is alive");

        let closed_elsewhere = thread::spawn(move || close_window(window))
            .join()
            .expect("closing thread succeeds");

        assert_eq!(closed_elsewhere, None);
        assert!(close_window(window).is_some());
    }
}
