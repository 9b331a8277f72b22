//! Peak tracking for any number of overlapping windows.
//!
//! Windows do not have to nest: a window may close while windows opened after it are still
//! open. Time is split into segments at every window boundary. Each open window owns the
//! segment that started when it opened, and its peak is the maximum over its own segment
//! and all later ones. When a window closes, its segment is merged into the segment of the
//! window opened just before it, so earlier windows still see that part of the history.
//!
//! The live total itself is not tracked here. The caller reports the highest live total of
//! the current segment on every open and close, then starts a new segment at the current
//! live total.

/// Identifies one open window.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct WindowId(u64);

#[derive(Debug)]
struct Window {
    id: WindowId,

    // Highest live total seen in the segment owned by this window.
    peak: i64,
}

#[derive(Debug)]
pub(crate) struct Watermarks {
    // In opening order. The last window owns the segment that is still running.
    windows: Vec<Window>,
    next_id: u64,
}

impl Watermarks {
    pub(crate) const fn new() -> Self {
        Self {
            windows: Vec::new(),
            next_id: 0,
        }
    }

    /// Makes sure the next [`open()`][Self::open] does not allocate.
    pub(crate) fn reserve(&mut self) {
        self.windows.reserve(1);
    }

    /// Opens a window starting at the `live` total.
    ///
    /// `segment_peak` is the highest live total since the previous open or close.
    pub(crate) fn open(&mut self, live: i64, segment_peak: i64) -> WindowId {
        self.end_segment(segment_peak);

        let id = WindowId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);

        self.windows.push(Window { id, peak: live });
        id
    }

    /// Closes a window, returning the highest live total seen while it was open.
    ///
    /// `segment_peak` is the highest live total since the previous open or close. Returns
    /// `None` if the window is not open here.
    pub(crate) fn close(&mut self, id: WindowId, segment_peak: i64) -> Option<i64> {
        self.end_segment(segment_peak);

        let position = self.windows.iter().position(|window| window.id == id)?;

        let peak = self
            .windows
            .iter()
            .skip(position)
            .map(|window| window.peak)
            .max()?;

        let closed = self.windows.remove(position);

        if let Some(previous) = position
            .checked_sub(1)
            .and_then(|previous| self.windows.get_mut(previous))
        {
            previous.peak = previous.peak.max(closed.peak);
        }

        Some(peak)
    }

    /// Number of windows that are open.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.windows.len()
    }

    fn end_segment(&mut self, segment_peak: i64) {
        if let Some(last) = self.windows.last_mut() {
            last.peak = last.peak.max(segment_peak);
        }
    }
}
