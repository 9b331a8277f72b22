//! Platform abstraction layer for the monotonic tick source.
//!
//! Public types never talk to the operating system directly. They go through
//! [`PlatformFacade`], which targets the real platform in production and can be swapped for a
//! fake or mock platform in unit tests.

mod abstractions;
mod facade;

pub(crate) use abstractions::*;
pub(crate) use facade::*;

#[cfg(all(unix, not(miri)))]
mod unix;
#[cfg(all(unix, not(miri)))]
pub(crate) use unix::*;

#[cfg(all(windows, not(miri)))]
mod windows;
#[cfg(all(windows, not(miri)))]
pub(crate) use windows::*;

#[cfg(any(miri, not(any(unix, windows))))]
mod rust;
#[cfg(any(miri, not(any(unix, windows))))]
pub(crate) use rust::*;

#[cfg(test)]
mod fake;
#[cfg(test)]
pub(crate) use fake::*;
