//! Cross-process region lock.
//!
//! The lock is an advisory `flock(2)` on a sidecar file. Every acquisition
//! opens its own file description, so two threads of one process exclude
//! each other just like two processes do. The lock is tied to the
//! descriptor: [`ScopedLock`] unlocks in `Drop`, and the kernel releases it
//! anyway if the holder dies.

use crate::error::{Error, Result};
use rustix::fd::OwnedFd;
use rustix::fs::{FlockOperation, Mode, OFlags};
use rustix::io::Errno;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

const INITIAL_BACKOFF: Duration = Duration::from_micros(100);
const MAX_BACKOFF: Duration = Duration::from_millis(10);

/// Named mutual-exclusion lock shared by every process that opens the same
/// path.
#[derive(Debug, Clone)]
pub struct RegionLock {
    path: PathBuf,
}

impl RegionLock {
    /// Create the lock file if needed and return a handle to it.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let lock = Self {
            path: path.as_ref().to_path_buf(),
        };
        drop(lock.open()?);
        Ok(lock)
    }

    /// Path of the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until the lock is held.
    pub fn acquire(&self) -> Result<ScopedLock> {
        let fd = self.open()?;
        loop {
            match rustix::fs::flock(&fd, FlockOperation::LockExclusive) {
                Ok(()) => break,
                Err(Errno::INTR) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(self.held(fd))
    }

    /// Wait at most `timeout` for the lock.
    ///
    /// # Errors
    ///
    /// `LockTimeout` if another holder keeps the lock past the bound.
    pub fn acquire_within(&self, timeout: Duration) -> Result<ScopedLock> {
        let fd = self.open()?;
        let deadline = Instant::now() + timeout;
        let mut backoff = INITIAL_BACKOFF;

        loop {
            match rustix::fs::flock(&fd, FlockOperation::NonBlockingLockExclusive) {
                Ok(()) => return Ok(self.held(fd)),
                Err(Errno::WOULDBLOCK) | Err(Errno::INTR) => {}
                Err(e) => return Err(e.into()),
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::debug!(path = %self.path.display(), ?timeout, "lock wait timed out");
                return Err(Error::LockTimeout(timeout));
            }
            thread::sleep(backoff.min(deadline - now));
            backoff = (backoff * 2).min(MAX_BACKOFF);
        }
    }

    /// Take the lock if it is free right now.
    pub fn try_acquire(&self) -> Result<Option<ScopedLock>> {
        let fd = self.open()?;
        match rustix::fs::flock(&fd, FlockOperation::NonBlockingLockExclusive) {
            Ok(()) => Ok(Some(self.held(fd))),
            Err(Errno::WOULDBLOCK) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether some holder currently owns the lock.
    pub fn is_locked(&self) -> Result<bool> {
        Ok(self.try_acquire()?.is_none())
    }

    fn open(&self) -> Result<OwnedFd> {
        Ok(rustix::fs::open(
            &self.path,
            OFlags::RDWR | OFlags::CREATE | OFlags::CLOEXEC,
            Mode::from_raw_mode(0o644),
        )?)
    }

    fn held(&self, fd: OwnedFd) -> ScopedLock {
        tracing::trace!(path = %self.path.display(), "lock acquired");
        ScopedLock {
            fd,
            path: self.path.clone(),
        }
    }
}

/// RAII guard for a held [`RegionLock`].
///
/// Released on every exit path: normal return, `?` propagation and panic
/// unwinding.
#[derive(Debug)]
pub struct ScopedLock {
    fd: OwnedFd,
    path: PathBuf,
}

impl ScopedLock {
    /// Path of the lock file this guard holds.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedLock {
    fn drop(&mut self) {
        if let Err(e) = rustix::fs::flock(&self.fd, FlockOperation::Unlock) {
            // Closing the descriptor below still drops the lock.
            tracing::warn!(path = %self.path.display(), "unlock failed: {}", e);
        } else {
            tracing::trace!(path = %self.path.display(), "lock released");
        }
    }
}
