//! Shared-memory image channel.
//!
//! A [`SharedImageChannel`] publishes one [`PixelBuffer`] payload through a
//! memory-mapped file so another process can read it without a copy across
//! the boundary. The file holds exactly `height * width * channels` bytes in
//! canonical order: no header and no padding.
//!
//! # Lifecycle
//!
//! ```text
//! Unmapped --create_channel--> Mapped --teardown/drop--> Unmapped
//! ```
//!
//! Replacing the image tears the old mapping down before the new one is
//! created, and unmapping always completes before the backing file is
//! deleted. All payload reads and the initial write happen under the
//! region lock; snapshots are owned copies.
//!
//! # Example
//!
//! ```rust,ignore
//! use pixbridge::channel::SharedImageChannel;
//! use pixbridge::config::ChannelConfig;
//!
//! let mut channel = SharedImageChannel::new(ChannelConfig::new("/dev/shm/frame.bin"))?;
//! channel.create_channel(&image)?;
//! let copy = channel.read_snapshot()?;
//! assert_eq!(copy, image);
//! ```

use crate::config::ChannelConfig;
use crate::error::{Error, Result};
use crate::memory::{MappedFileSegment, RegionLock, ScopedLock};
use crate::pixel::{PixelBuffer, Shape};
use std::io;
use std::path::Path;
use std::time::Duration;

/// Mapping state of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No live mapping.
    Unmapped,
    /// A region is mapped and readable.
    Mapped,
}

/// A mapped, lock-guarded region holding one image payload.
#[derive(Debug)]
pub struct SharedRegion {
    segment: MappedFileSegment,
    shape: Shape,
    lock: RegionLock,
    lock_timeout: Option<Duration>,
}

impl SharedRegion {
    /// Map an existing region read-only, as a peer process would.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the backing file does not hold exactly
    /// `shape.len()` bytes, `Io` if it cannot be opened or mapped.
    pub fn attach<P, Q>(backing_path: P, lock_path: Q, shape: Shape) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        shape.validate()?;
        let lock = RegionLock::new(lock_path)?;
        let segment = {
            let _guard = lock.acquire()?;
            MappedFileSegment::open_readonly(backing_path)?
        };
        shape.check_len(segment.len())?;

        Ok(Self {
            segment,
            shape,
            lock,
            lock_timeout: None,
        })
    }

    /// Attach using the paths and lock bound of `config`.
    pub fn attach_with(config: &ChannelConfig, shape: Shape) -> Result<Self> {
        let mut region = Self::attach(&config.backing_path, &config.lock_path, shape)?;
        region.lock_timeout = config.lock_timeout;
        Ok(region)
    }

    /// Declared image shape.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Path of the backing file.
    pub fn backing_path(&self) -> &Path {
        self.segment.path()
    }

    /// Acquire the region lock, honouring the configured bound.
    pub fn acquire_lock(&self) -> Result<ScopedLock> {
        match self.lock_timeout {
            Some(timeout) => self.lock.acquire_within(timeout),
            None => self.lock.acquire(),
        }
    }

    /// Copy the payload out under the lock.
    ///
    /// The result is independent of the mapping; later writes to the region
    /// never show through it.
    pub fn read_snapshot(&self) -> Result<PixelBuffer> {
        let guard = self.acquire_lock()?;
        self.copy_out(guard)
    }

    /// Like [`read_snapshot`](Self::read_snapshot) with an explicit bound.
    ///
    /// # Errors
    ///
    /// `LockTimeout` if the lock is not acquired within `timeout`.
    pub fn read_snapshot_within(&self, timeout: Duration) -> Result<PixelBuffer> {
        let guard = self.lock.acquire_within(timeout)?;
        self.copy_out(guard)
    }

    fn copy_out(&self, guard: ScopedLock) -> Result<PixelBuffer> {
        // SAFETY: the region lock is held, so no writer touches the mapping
        // while the slice is alive.
        let payload = unsafe { self.segment.as_slice() }.to_vec();
        drop(guard);

        tracing::debug!(shape = %self.shape, "copied snapshot out of shared region");
        PixelBuffer::new(self.shape, payload)
    }
}

/// Owner side of the shared-memory path.
#[derive(Debug)]
pub struct SharedImageChannel {
    config: ChannelConfig,
    lock: RegionLock,
    region: Option<SharedRegion>,
    generation: u64,
}

impl SharedImageChannel {
    /// Create an unmapped channel. The lock file is created eagerly.
    ///
    /// # Errors
    ///
    /// `Io` if the lock path equals the backing path or the lock file
    /// cannot be created.
    pub fn new(config: ChannelConfig) -> Result<Self> {
        if config.lock_path == config.backing_path {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "lock file and backing file must differ",
            )));
        }
        let lock = RegionLock::new(&config.lock_path)?;
        Ok(Self {
            config,
            lock,
            region: None,
            generation: 0,
        })
    }

    /// Publish `buffer` through a fresh mapping.
    ///
    /// Any previous mapping is torn down first. Under the region lock the
    /// backing file is created at the payload's size, mapped read-write,
    /// filled and synced.
    ///
    /// # Errors
    ///
    /// `Io` if the image is empty or the file cannot be written or mapped.
    /// On error the channel is left unmapped.
    pub fn create_channel(&mut self, buffer: &PixelBuffer) -> Result<&SharedRegion> {
        self.teardown();

        let payload = buffer.payload();
        if payload.is_empty() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "cannot share an empty image",
            )));
        }

        let path = self.config.backing_path.clone();
        let segment = {
            let _guard = self.acquire_lock()?;
            match write_and_map(&path, payload) {
                Ok(segment) => segment,
                Err(e) => {
                    remove_backing(&path);
                    return Err(e);
                }
            }
        };

        self.generation += 1;
        tracing::info!(
            path = %path.display(),
            shape = %buffer.shape(),
            generation = self.generation,
            "shared image channel mapped"
        );

        Ok(self.region.insert(SharedRegion {
            segment,
            shape: buffer.shape(),
            lock: self.lock.clone(),
            lock_timeout: self.config.lock_timeout,
        }))
    }

    /// Acquire the region lock, honouring the configured bound.
    pub fn acquire_lock(&self) -> Result<ScopedLock> {
        match self.config.lock_timeout {
            Some(timeout) => self.lock.acquire_within(timeout),
            None => self.lock.acquire(),
        }
    }

    /// Copy the current payload out under the lock.
    ///
    /// # Errors
    ///
    /// `Unmapped` if no region is live.
    pub fn read_snapshot(&self) -> Result<PixelBuffer> {
        self.region.as_ref().ok_or(Error::Unmapped)?.read_snapshot()
    }

    /// The live region, if any.
    pub fn region(&self) -> Option<&SharedRegion> {
        self.region.as_ref()
    }

    /// Current mapping state.
    pub fn state(&self) -> ChannelState {
        if self.region.is_some() {
            ChannelState::Mapped
        } else {
            ChannelState::Unmapped
        }
    }

    /// Number of successful `create_channel` calls.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Channel configuration.
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Unmap the region, then delete its backing file.
    pub fn teardown(&mut self) {
        if let Some(region) = self.region.take() {
            let path = region.backing_path().to_path_buf();
            drop(region);
            remove_backing(&path);
            tracing::debug!(path = %path.display(), "shared image channel unmapped");
        }
    }
}

impl Drop for SharedImageChannel {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn write_and_map(path: &Path, payload: &[u8]) -> Result<MappedFileSegment> {
    let segment = MappedFileSegment::create(path, payload.len())?;
    // SAFETY: the caller holds the region lock and this is the only slice
    // taken from the fresh mapping.
    let region = unsafe { segment.as_mut_slice() }
        .ok_or_else(|| Error::Io(io::Error::other("owner mapping is read-only")))?;
    region.copy_from_slice(payload);
    segment.sync()?;
    Ok(segment)
}

/// Best-effort deletion; failures are logged, not propagated.
fn remove_backing(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "failed to remove backing file: {}", e),
    }
}
