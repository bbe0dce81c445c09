//! Explicit configuration.
//!
//! Every path is supplied by the caller; nothing falls back to a fixed
//! global location, so independent sources never share files by accident.
//!
//! ```rust,ignore
//! use pixbridge::config::SourceConfig;
//! use std::time::Duration;
//!
//! let config = SourceConfig::in_dir("/dev/shm/camera0")
//!     .with_lock_timeout(Duration::from_millis(250));
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the shared payload inside [`SourceConfig::in_dir`].
pub const BACKING_FILE_NAME: &str = "shared-image.bin";

/// File name of the lock inside [`SourceConfig::in_dir`].
pub const LOCK_FILE_NAME: &str = "shared-image.lock";

/// Default JPEG quality for the compressed path.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Configuration for a [`SharedImageChannel`](crate::channel::SharedImageChannel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// File holding the raw payload, `height * width * channels` bytes.
    pub backing_path: PathBuf,
    /// Sidecar file used for the cross-process lock.
    pub lock_path: PathBuf,
    /// Bound on lock waits. `None` waits indefinitely.
    pub lock_timeout: Option<Duration>,
}

impl ChannelConfig {
    /// Configure a channel backed by `backing_path`.
    ///
    /// The lock lives next to it, named after the full file name with
    /// `.lock` appended (`frame.bin` locks through `frame.bin.lock`).
    pub fn new<P: AsRef<Path>>(backing_path: P) -> Self {
        let backing_path = backing_path.as_ref().to_path_buf();
        let mut lock_path = backing_path.clone().into_os_string();
        lock_path.push(".lock");
        let lock_path = PathBuf::from(lock_path);
        Self {
            backing_path,
            lock_path,
            lock_timeout: None,
        }
    }

    /// Use a different lock file.
    pub fn with_lock_path<P: AsRef<Path>>(mut self, lock_path: P) -> Self {
        self.lock_path = lock_path.as_ref().to_path_buf();
        self
    }

    /// Bound every lock wait by `timeout`.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }
}

/// Configuration for an [`ImageSource`](crate::source::ImageSource).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    /// Shared-memory channel settings.
    pub channel: ChannelConfig,
    /// Directory for transient files of the compressed path.
    pub transient_dir: PathBuf,
}

impl SourceConfig {
    /// Create a configuration from its parts.
    pub fn new<P: AsRef<Path>>(channel: ChannelConfig, transient_dir: P) -> Self {
        Self {
            channel,
            transient_dir: transient_dir.as_ref().to_path_buf(),
        }
    }

    /// Place every file inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self {
            channel: ChannelConfig::new(dir.join(BACKING_FILE_NAME))
                .with_lock_path(dir.join(LOCK_FILE_NAME)),
            transient_dir: dir.to_path_buf(),
        }
    }

    /// Bound every shared-region lock wait by `timeout`.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.channel = self.channel.with_lock_timeout(timeout);
        self
    }
}
