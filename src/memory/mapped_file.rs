//! Memory-mapped file segment.
//!
//! A [`MappedFileSegment`] maps a file with `MAP_SHARED`, so every process
//! that maps the same path sees the same bytes. The mapping is released in
//! `Drop`; the file itself is left on disk and removing it is the owner's
//! job, after the segment has been dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! use pixbridge::memory::MappedFileSegment;
//!
//! let segment = MappedFileSegment::create("/dev/shm/frame.bin", 640 * 480 * 3)?;
//! unsafe { segment.as_mut_slice() }.unwrap()[..3].copy_from_slice(&[1, 2, 3]);
//! segment.sync()?;
//!
//! let reader = MappedFileSegment::open_readonly("/dev/shm/frame.bin")?;
//! ```

use crate::error::{Error, Result};
use rustix::fd::OwnedFd;
use rustix::fs::{Mode, OFlags};
use rustix::mm::{MapFlags, MsyncFlags, ProtFlags};
use std::io;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// A memory segment backed by a file on disk.
pub struct MappedFileSegment {
    /// File descriptor, kept open for the lifetime of the mapping.
    _fd: OwnedFd,
    /// Pointer to the mmap'd region.
    ptr: NonNull<u8>,
    /// Size of the segment.
    len: usize,
    /// Path to the file.
    path: PathBuf,
    /// Whether the mapping is read-only.
    read_only: bool,
}

impl MappedFileSegment {
    /// Create (or truncate) a file of `size` bytes and map it read-write.
    ///
    /// # Errors
    ///
    /// Returns an error if `size` is zero or if creating, truncating or
    /// mapping the file fails.
    pub fn create<P: AsRef<Path>>(path: P, size: usize) -> Result<Self> {
        let path = path.as_ref();
        if size == 0 {
            return Err(empty_mapping());
        }

        let fd = rustix::fs::open(
            path,
            OFlags::RDWR | OFlags::CREATE | OFlags::TRUNC | OFlags::CLOEXEC,
            Mode::from_raw_mode(0o644),
        )?;
        rustix::fs::ftruncate(&fd, size as u64)?;

        Self::map(fd, path, size, false)
    }

    /// Map an existing file read-only.
    pub fn open_readonly<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let fd = rustix::fs::open(path, OFlags::RDONLY | OFlags::CLOEXEC, Mode::empty())?;

        let size = rustix::fs::fstat(&fd)?.st_size as usize;
        if size == 0 {
            return Err(empty_mapping());
        }

        Self::map(fd, path, size, true)
    }

    fn map(fd: OwnedFd, path: &Path, size: usize, read_only: bool) -> Result<Self> {
        let prot = if read_only {
            ProtFlags::READ
        } else {
            ProtFlags::READ | ProtFlags::WRITE
        };

        // SAFETY: a fresh mapping at a kernel-chosen address aliases nothing
        // in this process.
        let ptr = unsafe {
            rustix::mm::mmap(std::ptr::null_mut(), size, prot, MapFlags::SHARED, &fd, 0)?
        };
        let ptr = NonNull::new(ptr.cast::<u8>())
            .ok_or_else(|| Error::Io(io::Error::other("mmap returned null")))?;

        tracing::trace!(path = %path.display(), size, read_only, "mapped file");

        Ok(Self {
            _fd: fd,
            ptr,
            len: size,
            path: path.to_path_buf(),
            read_only,
        })
    }

    /// Flush modifications to the backing file.
    pub fn sync(&self) -> Result<()> {
        // SAFETY: ptr/len describe exactly the live mapping.
        unsafe {
            rustix::mm::msync(self.ptr.as_ptr().cast(), self.len, MsyncFlags::SYNC)?;
        }
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the mapping in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the mapping is empty. Never true for a live segment.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if the segment is read-only.
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// The mapped bytes.
    ///
    /// # Safety
    ///
    /// Other processes may write the same file. The caller must hold the
    /// region lock (or otherwise know there are no concurrent writers) for
    /// as long as the slice is alive.
    pub unsafe fn as_slice(&self) -> &[u8] {
        // SAFETY: caller guarantees no concurrent writers.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// The mapped bytes, writable. `None` for read-only mappings.
    ///
    /// # Safety
    ///
    /// The caller must hold the region lock and must not create overlapping
    /// slices from the same segment.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn as_mut_slice(&self) -> Option<&mut [u8]> {
        if self.read_only {
            return None;
        }
        // SAFETY: caller guarantees exclusive access.
        Some(unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) })
    }
}

impl Drop for MappedFileSegment {
    fn drop(&mut self) {
        if !self.read_only {
            if let Err(e) = self.sync() {
                tracing::warn!(path = %self.path.display(), "msync on unmap failed: {}", e);
            }
        }

        // SAFETY: ptr/len describe exactly the mapping created in `map`, and
        // no borrowed slices outlive `&self`.
        if let Err(e) = unsafe { rustix::mm::munmap(self.ptr.as_ptr().cast(), self.len) } {
            tracing::warn!(path = %self.path.display(), "munmap failed: {}", e);
        } else {
            tracing::trace!(path = %self.path.display(), "unmapped file");
        }
        // fd is closed when OwnedFd is dropped
    }
}

// SAFETY: the mapping is plain memory owned by this handle; access to its
// contents is gated by the unsafe slice accessors.
unsafe impl Send for MappedFileSegment {}
unsafe impl Sync for MappedFileSegment {}

impl std::fmt::Debug for MappedFileSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedFileSegment")
            .field("path", &self.path)
            .field("len", &self.len)
            .field("read_only", &self.read_only)
            .finish()
    }
}

fn empty_mapping() -> Error {
    Error::Io(io::Error::new(
        io::ErrorKind::InvalidInput,
        "cannot map an empty region",
    ))
}
