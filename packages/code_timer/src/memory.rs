//! Heap usage tracking behind the [`PeakMemory`] collector.
//!
//! Measurements are only meaningful when [`Allocator`] is installed as the global allocator
//! of the process. Without it, every reading is zero. Heap usage is accounted per thread.

mod allocator;
mod peak_memory;
mod heap_source;
mod watermarks;

pub use allocator::Allocator;
pub use peak_memory::PeakMemory;
pub(crate) use heap_source::*;
pub(crate) use watermarks::*;
