//! Image source orchestrator.
//!
//! [`ImageSource`] ingests one compressed image, hands it to the peer and
//! publishes it through the shared-memory channel. Afterwards the same image
//! can be fetched back through any [`Strategy`], each of which rebuilds a
//! [`PixelBuffer`] independently:
//!
//! | Strategy | Collaborator | Conversion |
//! |----------|--------------|------------|
//! | `Layout(kind)` | peer raw bytes | [`layout::decode`] |
//! | `Compressed` | peer compressed bytes | [`CompressedRoundTrip::decode`] |
//! | `SharedMemory` | mapped region | [`SharedImageChannel::read_snapshot`] |
//!
//! `set_image` is the only writer. It either makes every strategy available
//! or fails and leaves the source empty, in which case every retrieval fails
//! with [`Error::NoImage`].
//!
//! # Example
//!
//! ```rust,ignore
//! use pixbridge::prelude::*;
//!
//! let config = SourceConfig::in_dir(&scratch);
//! let mut source = ImageSource::new(config, LocalPeer::new(), AutoCodec::default())?;
//! source.load("frame.jpg")?;
//!
//! let via_shm = source.retrieve(Strategy::SharedMemory)?;
//! let via_planar = source.retrieve(Strategy::Layout(RawLayout::Planar1D))?;
//! assert_eq!(via_shm, via_planar);
//! ```

use crate::channel::SharedImageChannel;
use crate::codec::{AutoCodec, CompressedRoundTrip, ImageDecoder};
use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::layout::{self, RawLayout};
use crate::peer::RuntimePeer;
use crate::pixel::PixelBuffer;
use std::fmt;
use std::path::{Path, PathBuf};

/// Way of fetching the image back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Raw bytes from the peer in the given layout.
    Layout(RawLayout),
    /// Compressed bytes from the peer, decoded through a transient file.
    Compressed,
    /// Owned copy of the shared-memory region.
    SharedMemory,
}

impl Strategy {
    /// Every strategy, raw layouts first.
    pub const ALL: [Strategy; 5] = [
        Strategy::Layout(RawLayout::Packed3D),
        Strategy::Layout(RawLayout::Interleaved1D),
        Strategy::Layout(RawLayout::Planar1D),
        Strategy::Compressed,
        Strategy::SharedMemory,
    ];

    /// Whether the strategy reproduces the image bit-exactly.
    ///
    /// Only the compressed path can differ, and only for lossy formats.
    pub fn is_exact(&self) -> bool {
        !matches!(self, Strategy::Compressed)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Layout(RawLayout::Packed3D) => f.write_str("packed-3d"),
            Strategy::Layout(RawLayout::Interleaved1D) => f.write_str("interleaved-1d"),
            Strategy::Layout(RawLayout::Planar1D) => f.write_str("planar-1d"),
            Strategy::Compressed => f.write_str("compressed"),
            Strategy::SharedMemory => f.write_str("shared-memory"),
        }
    }
}

/// Holds one image and serves it through every retrieval strategy.
pub struct ImageSource<P, D = AutoCodec> {
    config: SourceConfig,
    peer: P,
    round_trip: CompressedRoundTrip<D>,
    channel: SharedImageChannel,
    image: Option<PixelBuffer>,
    source_path: Option<PathBuf>,
}

impl<P: RuntimePeer, D: ImageDecoder> ImageSource<P, D> {
    /// Create an empty source.
    ///
    /// # Errors
    ///
    /// `Io` if the channel's lock file cannot be created.
    pub fn new(config: SourceConfig, peer: P, decoder: D) -> Result<Self> {
        let channel = SharedImageChannel::new(config.channel.clone())?;
        let round_trip = CompressedRoundTrip::new(decoder, &config.transient_dir);
        Ok(Self {
            config,
            peer,
            round_trip,
            channel,
            image: None,
            source_path: None,
        })
    }

    /// Ingest `source_bytes`, recorded as coming from `source_path`.
    ///
    /// Decodes the bytes, pushes pixels and bytes to the peer, then maps a
    /// fresh shared region. Any previous image is dropped first, so on error
    /// the source is empty.
    pub fn set_image<Q: AsRef<Path>>(&mut self, source_bytes: &[u8], source_path: Q) -> Result<()> {
        self.image = None;
        self.source_path = None;
        self.channel.teardown();

        let source_path = source_path.as_ref();
        let image = self.round_trip.codec().decode(source_bytes)?;
        self.peer.set_image(&image, source_bytes)?;
        self.channel.create_channel(&image)?;

        tracing::info!(
            path = %source_path.display(),
            shape = %image.shape(),
            compressed_bytes = source_bytes.len(),
            "image ingested"
        );
        self.image = Some(image);
        self.source_path = Some(source_path.to_path_buf());
        Ok(())
    }

    /// Read `path` and ingest its contents.
    pub fn load<Q: AsRef<Path>>(&mut self, path: Q) -> Result<()> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        self.set_image(&bytes, path)
    }

    /// Fetch raw bytes of `kind` from the peer and convert them.
    pub fn get_via_layout(&self, kind: RawLayout) -> Result<PixelBuffer> {
        let shape = self.current()?.shape();
        let bytes = self.peer.raw(kind)?;
        tracing::debug!(layout = ?kind, bytes = bytes.len(), "retrieving via raw layout");
        layout::decode(kind, &bytes, shape)
    }

    /// Fetch compressed bytes from the peer and decode them.
    pub fn get_via_compressed(&self) -> Result<PixelBuffer> {
        self.current()?;
        let bytes = self.peer.compressed()?;
        tracing::debug!(bytes = bytes.len(), "retrieving via compressed round-trip");
        self.round_trip.decode(&bytes)
    }

    /// Copy the image out of the shared-memory region.
    pub fn get_via_shared_memory(&self) -> Result<PixelBuffer> {
        self.current()?;
        tracing::debug!(
            path = %self.config.channel.backing_path.display(),
            "retrieving via shared memory"
        );
        self.channel.read_snapshot()
    }

    /// Fetch the image with `strategy`.
    pub fn retrieve(&self, strategy: Strategy) -> Result<PixelBuffer> {
        match strategy {
            Strategy::Layout(kind) => self.get_via_layout(kind),
            Strategy::Compressed => self.get_via_compressed(),
            Strategy::SharedMemory => self.get_via_shared_memory(),
        }
    }

    fn current(&self) -> Result<&PixelBuffer> {
        self.image.as_ref().ok_or(Error::NoImage)
    }
}

impl<P, D> ImageSource<P, D> {
    /// Image from the most recent successful `set_image`.
    pub fn image(&self) -> Option<&PixelBuffer> {
        self.image.as_ref()
    }

    /// Path recorded by the most recent successful `set_image`.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Source configuration.
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// The peer.
    pub fn peer(&self) -> &P {
        &self.peer
    }

    /// The shared-memory channel.
    pub fn channel(&self) -> &SharedImageChannel {
        &self.channel
    }
}

impl<P: fmt::Debug, D> fmt::Debug for ImageSource<P, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSource")
            .field("config", &self.config)
            .field("peer", &self.peer)
            .field("channel", &self.channel.state())
            .field("image", &self.image)
            .field("source_path", &self.source_path)
            .finish()
    }
}
