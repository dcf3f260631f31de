//! A general-purpose heap allocator built on per-heap, mmap-backed regions.
//!
//! Each [`Heap`] owns a registry of regions obtained directly from the OS.
//! Small and medium requests share arena regions, subdivided into blocks
//! with in-band headers, a segregated free-list index and eager coalescing;
//! large requests get a dedicated region released to the OS as a unit.
//! Outstanding allocations can be enumerated through [`Heap::leaks`].
//!
//! The heap itself is single-threaded; [`GorillaAlloc`] wraps one heap in a
//! spin lock for use as `#[global_allocator]`, and [`api`] exposes the
//! classic null-returning C surface.

extern crate libc;

mod block;
mod config;
mod freelist;
mod heap;
mod platform;
mod region;
mod util;

pub mod api;
pub mod global;

pub use config::HeapConfig;
pub use global::GorillaAlloc;
pub use heap::{AllocError, ConsistencyReport, Heap, HeapStats, LeakRecord, Leaks};
pub use region::RegionKind;
pub use util::MIN_ALIGN;
