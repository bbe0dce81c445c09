//! # pixbridge
//!
//! Moves one image between two runtimes and measures the ways of doing it.
//!
//! An [`ImageSource`](source::ImageSource) ingests a compressed image once,
//! hands it to a cross-runtime peer and publishes it through a memory-mapped
//! region. The image can then be fetched back through raw layout conversion,
//! a compressed round-trip or a shared-memory snapshot, and every path
//! yields the same canonical [`PixelBuffer`](pixel::PixelBuffer).
//!
//! ## Features
//!
//! - **Canonical pixels**: column-major, channel-planar RGB or grayscale
//! - **Raw layouts**: packed `[h][w][c]`, interleaved BGR and planar, with
//!   signed bytes reinterpreted bit-for-bit
//! - **Compressed path**: JPEG and PNG through pure-Rust codecs
//! - **Shared memory**: headerless mmap region guarded by a cross-process
//!   `flock`, always read back as an owned copy
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pixbridge::prelude::*;
//!
//! let mut source = ImageSource::new(
//!     SourceConfig::in_dir("/tmp/pixbridge"),
//!     LocalPeer::new(),
//!     AutoCodec::default(),
//! )?;
//! source.load("frame.jpg")?;
//!
//! for strategy in Strategy::ALL {
//!     let image = source.retrieve(strategy)?;
//!     println!("{strategy}: {}", image.shape());
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod channel;
pub mod codec;
pub mod config;
pub mod error;
pub mod layout;
pub mod memory;
pub mod peer;
pub mod pixel;
pub mod source;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::channel::{ChannelState, SharedImageChannel, SharedRegion};
    pub use crate::codec::{
        AutoCodec, CompressedRoundTrip, ImageDecoder, ImageEncoder, ImageFormat, JpegCodec,
        PngCodec,
    };
    pub use crate::config::{ChannelConfig, SourceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::layout::RawLayout;
    pub use crate::peer::{LocalPeer, RuntimePeer};
    pub use crate::pixel::{PixelBuffer, Shape};
    pub use crate::source::{ImageSource, Strategy};
}

pub use error::{Error, Result};
