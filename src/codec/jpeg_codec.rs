//! JPEG codec: zune-jpeg for decoding, the image crate's encoder for
//! encoding.

use super::{ImageDecoder, ImageEncoder, ImageFormat, canonicalize};
use crate::config::DEFAULT_JPEG_QUALITY;
use crate::error::{Error, Result};
use crate::layout;
use crate::pixel::PixelBuffer;
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use zune_jpeg::JpegDecoder as ZuneJpegDecoder;

/// JPEG encoder/decoder.
///
/// Lossy: decoded pixels differ from the encoded ones, but the shape is
/// always preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegCodec {
    quality: u8,
}

impl JpegCodec {
    /// Create a codec encoding at `quality` (clamped to 1..=100).
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    /// Encoding quality.
    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl ImageDecoder for JpegCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer> {
        let mut decoder = ZuneJpegDecoder::new(bytes);

        decoder
            .decode_headers()
            .map_err(|e| Error::Codec(format!("JPEG header decode failed: {:?}", e)))?;

        let info = decoder
            .info()
            .ok_or_else(|| Error::Codec("failed to get JPEG info".to_string()))?;

        let pixels = decoder
            .decode()
            .map_err(|e| Error::Codec(format!("JPEG decode failed: {:?}", e)))?;

        let (width, height) = (info.width as u32, info.height as u32);
        let count = width as usize * height as usize;
        if count == 0 || pixels.len() % count != 0 {
            return Err(Error::Codec(format!(
                "JPEG decode produced {} bytes for {}x{}",
                pixels.len(),
                width,
                height
            )));
        }

        let samples = pixels.len() / count;
        if info.components == 1 && samples == 3 {
            // Grayscale source expanded to RGB by the decoder.
            let gray: Vec<u8> = pixels.iter().step_by(3).copied().collect();
            return canonicalize(&gray, height, width, 1);
        }
        canonicalize(&pixels, height, width, samples)
    }
}

impl ImageEncoder for JpegCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn encode(&self, buffer: &PixelBuffer) -> Result<Vec<u8>> {
        let color = match buffer.channels() {
            1 => ExtendedColorType::L8,
            3 => ExtendedColorType::Rgb8,
            other => return Err(Error::UnsupportedChannelCount(other)),
        };
        let rows = layout::to_rgb_rows(buffer);

        let mut output = Vec::new();
        JpegEncoder::new_with_quality(&mut output, self.quality)
            .encode(&rows, buffer.width(), buffer.height(), color)
            .map_err(|e| Error::Codec(format!("JPEG encode failed: {}", e)))?;

        tracing::debug!(
            shape = %buffer.shape(),
            quality = self.quality,
            bytes = output.len(),
            "encoded JPEG"
        );
        Ok(output)
    }
}
