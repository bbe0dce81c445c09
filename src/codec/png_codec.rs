//! PNG codec using the png crate.

use super::{ImageDecoder, ImageEncoder, ImageFormat, canonicalize};
use crate::error::{Error, Result};
use crate::layout;
use crate::pixel::PixelBuffer;
use std::io::Cursor;

/// Lossless PNG encoder/decoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PngCodec;

impl ImageDecoder for PngCodec {
    fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer> {
        let mut decoder = png::Decoder::new(Cursor::new(bytes));
        decoder.set_transformations(png::Transformations::normalize_to_color8());

        let mut reader = decoder
            .read_info()
            .map_err(|e| Error::Codec(format!("PNG header decode failed: {:?}", e)))?;
        let (color_type, _) = reader.output_color_type();

        let mut pixels = vec![0u8; reader.output_buffer_size()];
        let info = reader
            .next_frame(&mut pixels)
            .map_err(|e| Error::Codec(format!("PNG decode failed: {:?}", e)))?;

        // Truncate to actual size
        pixels.truncate(info.buffer_size());

        canonicalize(&pixels, info.height, info.width, color_type.samples())
    }
}

impl ImageEncoder for PngCodec {
    fn format(&self) -> ImageFormat {
        ImageFormat::Png
    }

    fn encode(&self, buffer: &PixelBuffer) -> Result<Vec<u8>> {
        let color = match buffer.channels() {
            1 => png::ColorType::Grayscale,
            3 => png::ColorType::Rgb,
            other => return Err(Error::UnsupportedChannelCount(other)),
        };
        let rows = layout::to_rgb_rows(buffer);

        let mut output = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut output, buffer.width(), buffer.height());
            encoder.set_color(color);
            encoder.set_depth(png::BitDepth::Eight);

            let mut writer = encoder
                .write_header()
                .map_err(|e| Error::Codec(format!("PNG header write failed: {:?}", e)))?;
            writer
                .write_image_data(&rows)
                .map_err(|e| Error::Codec(format!("PNG encode failed: {:?}", e)))?;
            writer
                .finish()
                .map_err(|e| Error::Codec(format!("PNG finish failed: {:?}", e)))?;
        }

        tracing::debug!(shape = %buffer.shape(), bytes = output.len(), "encoded PNG");
        Ok(output)
    }
}
