#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Recursion-aware timing of instrumented code regions.
//!
//! Application code marks a lexical region as a *code point*. Every pass through the region
//! records the elapsed wall-clock time and any auxiliary metrics attached to it, such as the
//! heap high-water mark. Recursive re-entry into a region that is already being timed is
//! collapsed into one net interval spanning the outermost entry, so a recursive function is
//! never counted more than once.
//!
//! The building blocks are:
//!
//! - [`Timestamp`] and [`Clock`] - captures of the platform's monotonic counter, which subtract
//!   to seconds.
//! - [`CodePoint`] and [`code_point!`] - a static descriptor of one instrumented region.
//! - [`TimerFrame`] - the start/stop/pause/resume state machine of one code point.
//! - [`Collector`] - a metric accumulated per frame, e.g. [`ElapsedTime`] or [`PeakMemory`].
//! - [`Registry`] - owns the frames of one thread and hands out scope guards.
//! - [`Report`] - a snapshot of every frame, printable as a call tree.
//!
//! # Simple usage
//!
//! ```
//! use code_timer::{Registry, timed_scope};
//!
//! fn walk(registry: &Registry, depth: u32) {
//!     timed_scope!(registry, "walk");
//!
//!     if depth > 0 {
//!         walk(registry, depth - 1);
//!     }
//! }
//!
//! // Fail fast if this platform has no usable monotonic clock.
//! code_timer::calibrate().expect("monotonic clock is usable");
//!
//! let registry = Registry::new();
//! walk(&registry, 3);
//!
//! let report = registry.report();
//! let frame = report.find("walk").unwrap();
//!
//! assert_eq!(frame.call_count(), 4);
//! assert_eq!(frame.interval_count(), 1);
//!
//! report.print_to_stdout();
//! ```
//!
//! # Pausing
//!
//! Time that should not be attributed to a region, such as waiting for user input, can be
//! excluded without closing the interval:
//!
//! ```
//! use code_timer::{Registry, code_point};
//!
//! let registry = Registry::new();
//! let interval = registry.enter(code_point!("session"));
//!
//! {
//!     let _paused = interval.pause();
//!     // Not measured.
//! }
//! ```
//!
//! # Manual control
//!
//! Regions that do not map to a lexical scope can drive their frame directly through a
//! [`FrameHandle`]. Every `start()` must then be matched by a `stop()`:
//!
//! ```
//! use code_timer::{Registry, code_point};
//!
//! let registry = Registry::new();
//! let frame = registry.frame(code_point!("callback"));
//!
//! frame.start();
//! // ...
//! frame.stop(false);
//!
//! assert!(!frame.is_running());
//! ```
//!
//! # Threading
//!
//! Frames, handles and registries are bound to the thread that created them. Use one
//! [`Registry`] per thread. Reports are plain data and can be sent anywhere.
//!
//! # Diagnostics
//!
//! Usage errors such as stopping a frame that is not running never fail the caller. They are
//! repaired and reported through the [`tracing`](https://docs.rs/tracing) facade; install a
//! subscriber to see them.

mod clock;
mod code_point;
mod collector;
mod error;
mod frame;
mod frame_handle;
mod interval;
mod memory;
mod pal;
mod registry;
mod report;
mod timestamp;

pub use clock::*;
pub use code_point::*;
pub use collector::*;
pub use error::*;
pub use frame::*;
pub use frame_handle::*;
pub use interval::*;
pub use memory::{Allocator, PeakMemory};
pub use registry::*;
pub use report::*;
pub use timestamp::*;
