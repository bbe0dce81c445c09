//! Memory primitives for cross-process image sharing.
//!
//! - [`MappedFileSegment`]: a file mapped `MAP_SHARED`, unmapped on drop
//! - [`RegionLock`] / [`ScopedLock`]: a named cross-process lock with RAII
//!   release

mod lock;
mod mapped_file;

pub use lock::{RegionLock, ScopedLock};
pub use mapped_file::MappedFileSegment;
