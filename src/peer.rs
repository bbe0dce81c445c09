//! Cross-runtime peer.
//!
//! The peer is the other side of the bridge: it receives the decoded image
//! together with the original compressed bytes and hands back its own copy
//! of the image in each raw layout. [`ImageSource`](crate::source::ImageSource)
//! only talks to it through [`RuntimePeer`], so any bridge (an embedded VM,
//! a subprocess, an FFI shim) can stand in.
//!
//! [`LocalPeer`] is the in-process implementation used by default and in
//! tests.

use crate::codec::ImageEncoder;
use crate::error::{Error, Result};
use crate::layout::{self, RawLayout};
use crate::pixel::PixelBuffer;
use std::fmt;

/// Method contract of the cross-runtime peer.
///
/// Every getter returns an independently owned copy and fails with
/// [`Error::NoImage`] until [`set_image`](Self::set_image) has succeeded.
pub trait RuntimePeer {
    /// Hand the peer a decoded image and the compressed bytes it came from.
    fn set_image(&mut self, image: &PixelBuffer, compressed: &[u8]) -> Result<()>;

    /// Image as row-major `[h][w][c]` RGB.
    fn raw_packed_3d(&self) -> Result<Vec<i8>>;

    /// Image as a flat row-major BGR sequence.
    fn interleaved_1d(&self) -> Result<Vec<i8>>;

    /// Image as a flat column-major, channel-planar RGB sequence.
    fn planar_1d(&self) -> Result<Vec<i8>>;

    /// Image as a compressed stream.
    fn compressed(&self) -> Result<Vec<u8>>;

    /// Image in `layout`.
    fn raw(&self, layout: RawLayout) -> Result<Vec<i8>> {
        match layout {
            RawLayout::Packed3D => self.raw_packed_3d(),
            RawLayout::Interleaved1D => self.interleaved_1d(),
            RawLayout::Planar1D => self.planar_1d(),
        }
    }
}

#[derive(Debug, Clone)]
struct PeerImage {
    packed_3d: Vec<i8>,
    interleaved_1d: Vec<i8>,
    planar_1d: Vec<i8>,
    compressed: Vec<u8>,
}

/// In-process peer that precomputes every layout on `set_image`.
///
/// By default the compressed form is the source bytes echoed back. With
/// [`LocalPeer::reencoding`] the peer compresses the image itself instead.
#[derive(Default)]
pub struct LocalPeer {
    image: Option<PeerImage>,
    encoder: Option<Box<dyn ImageEncoder + Send + Sync>>,
}

impl LocalPeer {
    /// Peer that echoes the source bytes as its compressed form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Peer that re-encodes the image with `encoder`.
    pub fn reencoding<E>(encoder: E) -> Self
    where
        E: ImageEncoder + Send + Sync + 'static,
    {
        Self {
            image: None,
            encoder: Some(Box::new(encoder)),
        }
    }

    /// Whether an image has been set.
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    fn current(&self) -> Result<&PeerImage> {
        self.image.as_ref().ok_or(Error::NoImage)
    }
}

impl RuntimePeer for LocalPeer {
    fn set_image(&mut self, image: &PixelBuffer, compressed: &[u8]) -> Result<()> {
        self.image = None;

        let compressed = match &self.encoder {
            Some(encoder) => encoder.encode(image)?,
            None => compressed.to_vec(),
        };

        self.image = Some(PeerImage {
            packed_3d: layout::encode(RawLayout::Packed3D, image),
            interleaved_1d: layout::encode(RawLayout::Interleaved1D, image),
            planar_1d: layout::encode(RawLayout::Planar1D, image),
            compressed,
        });
        tracing::debug!(shape = %image.shape(), "peer holds new image");
        Ok(())
    }

    fn raw_packed_3d(&self) -> Result<Vec<i8>> {
        Ok(self.current()?.packed_3d.clone())
    }

    fn interleaved_1d(&self) -> Result<Vec<i8>> {
        Ok(self.current()?.interleaved_1d.clone())
    }

    fn planar_1d(&self) -> Result<Vec<i8>> {
        Ok(self.current()?.planar_1d.clone())
    }

    fn compressed(&self) -> Result<Vec<u8>> {
        Ok(self.current()?.compressed.clone())
    }
}

impl fmt::Debug for LocalPeer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalPeer")
            .field("has_image", &self.image.is_some())
            .field(
                "reencode_as",
                &self.encoder.as_ref().map(|e| e.format()),
            )
            .finish()
    }
}
