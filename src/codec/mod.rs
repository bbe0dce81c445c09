//! Compressed image codecs.
//!
//! The codecs here wrap existing pure-Rust implementations; pixbridge never
//! implements compression itself.
//!
//! # Supported Formats
//!
//! | Format | Decoder | Encoder | Exact |
//! |--------|---------|---------|-------|
//! | JPEG | zune-jpeg | image | No |
//! | PNG | png | png | Yes |
//!
//! Decoders always produce a canonical [`PixelBuffer`]. Alpha channels are
//! dropped and 16-bit or palette PNGs are normalised to 8-bit samples.

mod jpeg_codec;
mod png_codec;
pub mod round_trip;

pub use jpeg_codec::JpegCodec;
pub use png_codec::PngCodec;
pub use round_trip::CompressedRoundTrip;

use crate::error::{Error, Result};
use crate::layout;
use crate::pixel::{PixelBuffer, Shape};
use std::path::Path;

/// Compressed raster format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// JPEG (lossy).
    Jpeg,
    /// PNG (lossless).
    Png,
}

impl ImageFormat {
    const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];
    const JPEG_SOI: [u8; 3] = [0xFF, 0xD8, 0xFF];

    /// Detect the format from leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&Self::PNG_SIGNATURE) {
            Some(ImageFormat::Png)
        } else if bytes.starts_with(&Self::JPEG_SOI) {
            Some(ImageFormat::Jpeg)
        } else {
            None
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    /// Whether a round-trip through this format is bit-exact.
    pub fn is_lossless(&self) -> bool {
        matches!(self, ImageFormat::Png)
    }
}

/// Turns compressed bytes into pixels.
pub trait ImageDecoder {
    /// Decode an in-memory stream.
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer>;

    /// Decode a file on disk.
    fn decode_path(&self, path: &Path) -> Result<PixelBuffer> {
        let bytes = std::fs::read(path)?;
        self.decode(&bytes)
    }
}

/// Turns pixels into compressed bytes.
pub trait ImageEncoder {
    /// Format produced by [`encode`](Self::encode).
    fn format(&self) -> ImageFormat;

    /// Encode `buffer` into an opaque compressed stream.
    fn encode(&self, buffer: &PixelBuffer) -> Result<Vec<u8>>;
}

/// Decodes JPEG or PNG by sniffing, encodes with one configured format.
#[derive(Debug, Clone)]
pub struct AutoCodec {
    jpeg: JpegCodec,
    png: PngCodec,
    output: ImageFormat,
}

impl AutoCodec {
    /// Create a codec that encodes as `output`.
    pub fn new(output: ImageFormat) -> Self {
        Self {
            jpeg: JpegCodec::default(),
            png: PngCodec,
            output,
        }
    }

    /// Set the JPEG encoding quality.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg = JpegCodec::new(quality);
        self
    }
}

impl Default for AutoCodec {
    fn default() -> Self {
        Self::new(ImageFormat::Jpeg)
    }
}

impl ImageDecoder for AutoCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer> {
        match ImageFormat::sniff(bytes) {
            Some(ImageFormat::Jpeg) => self.jpeg.decode(bytes),
            Some(ImageFormat::Png) => self.png.decode(bytes),
            None => Err(Error::Codec("unrecognised image format".into())),
        }
    }
}

impl ImageEncoder for AutoCodec {
    fn format(&self) -> ImageFormat {
        self.output
    }

    fn encode(&self, buffer: &PixelBuffer) -> Result<Vec<u8>> {
        match self.output {
            ImageFormat::Jpeg => self.jpeg.encode(buffer),
            ImageFormat::Png => self.png.encode(buffer),
        }
    }
}

/// Canonicalise row-major decoder output with `samples` values per pixel.
fn canonicalize(pixels: &[u8], height: u32, width: u32, samples: usize) -> Result<PixelBuffer> {
    let (channels, keep) = match samples {
        1 => (1, 1),
        2 => (1, 2),
        3 => (3, 3),
        4 => (3, 4),
        other => {
            return Err(Error::Codec(format!(
                "unsupported decoded sample count: {other}"
            )));
        }
    };
    let shape = Shape::new(height, width, channels);

    if keep == channels as usize {
        return layout::from_rgb_rows(pixels, shape);
    }

    tracing::debug!(samples, "dropping alpha channel from decoded image");
    let stripped: Vec<u8> = pixels
        .chunks_exact(keep)
        .flat_map(|px| px[..channels as usize].iter().copied())
        .collect();
    layout::from_rgb_rows(&stripped, shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff() {
        assert_eq!(
            ImageFormat::sniff(&[137, 80, 78, 71, 13, 10, 26, 10, 0]),
            Some(ImageFormat::Png)
        );
        assert_eq!(
            ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::sniff(b"GIF89a"), None);
        assert_eq!(ImageFormat::sniff(&[]), None);
    }

    #[test]
    fn test_format_properties() {
        assert_eq!(ImageFormat::Jpeg.extension(), "jpg");
        assert_eq!(ImageFormat::Png.extension(), "png");
        assert!(ImageFormat::Png.is_lossless());
        assert!(!ImageFormat::Jpeg.is_lossless());
    }

    #[test]
    fn test_canonicalize_strips_alpha() {
        // 1x2 RGBA
        let rgba = [10, 20, 30, 255, 40, 50, 60, 128];
        let buf = canonicalize(&rgba, 1, 2, 4).unwrap();
        assert_eq!(buf.shape(), Shape::new(1, 2, 3));
        assert_eq!(buf.payload(), &[10, 40, 20, 50, 30, 60]);

        let gray_alpha = [7, 255, 9, 0];
        let buf = canonicalize(&gray_alpha, 2, 1, 2).unwrap();
        assert_eq!(buf.payload(), &[7, 9]);
    }

    #[test]
    fn test_canonicalize_rejects_odd_samples() {
        assert!(matches!(
            canonicalize(&[0; 5], 1, 1, 5),
            Err(Error::Codec(_))
        ));
    }

    #[test]
    fn test_auto_codec_rejects_unknown() {
        let codec = AutoCodec::default();
        assert!(matches!(codec.decode(b"not an image"), Err(Error::Codec(_))));
    }

    #[test]
    fn test_auto_codec_dispatches_png() {
        let codec = AutoCodec::new(ImageFormat::Png);
        let image = PixelBuffer::from_fn(Shape::new(3, 4, 3), |h, w, c| (h * 40 + w * 10 + c) as u8)
            .unwrap();
        let bytes = codec.encode(&image).unwrap();
        assert_eq!(ImageFormat::sniff(&bytes), Some(ImageFormat::Png));
        assert_eq!(codec.decode(&bytes).unwrap(), image);
    }
}
