//! Compressed round-trip through a transient file.
//!
//! [`CompressedRoundTrip::decode`] writes the stream to a uniquely named
//! file in the configured directory, lets the decoder read it from disk and
//! removes it again. Removal happens whether decoding succeeds or not; a
//! failed removal is logged and does not affect the result.

use super::{ImageDecoder, ImageEncoder, ImageFormat};
use crate::error::Result;
use crate::pixel::PixelBuffer;
use std::io::Write;
use std::path::{Path, PathBuf};

const TRANSIENT_PREFIX: &str = "pixbridge-roundtrip-";

/// Encode/decode pair around an external codec.
#[derive(Debug, Clone)]
pub struct CompressedRoundTrip<C> {
    codec: C,
    transient_dir: PathBuf,
}

impl<C> CompressedRoundTrip<C> {
    /// Use `codec`, placing transient files in `transient_dir`.
    pub fn new<P: AsRef<Path>>(codec: C, transient_dir: P) -> Self {
        Self {
            codec,
            transient_dir: transient_dir.as_ref().to_path_buf(),
        }
    }

    /// The wrapped codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Directory for transient files.
    pub fn transient_dir(&self) -> &Path {
        &self.transient_dir
    }
}

impl<C: ImageEncoder> CompressedRoundTrip<C> {
    /// Encode `buffer` to an opaque compressed stream.
    pub fn encode(&self, buffer: &PixelBuffer) -> Result<Vec<u8>> {
        self.codec.encode(buffer)
    }
}

impl<C: ImageDecoder> CompressedRoundTrip<C> {
    /// Reconstruct pixels from a compressed stream.
    ///
    /// # Errors
    ///
    /// `Io` if the transient file cannot be written or read back, `Codec` if
    /// the decoder rejects the stream.
    pub fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer> {
        let suffix = ImageFormat::sniff(bytes)
            .map(|f| format!(".{}", f.extension()))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix(TRANSIENT_PREFIX)
            .suffix(&suffix)
            .tempfile_in(&self.transient_dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        let path = file.into_temp_path();
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "decoding via transient file");

        let result = self.codec.decode_path(&path);

        let transient = path.to_path_buf();
        if let Err(e) = path.close() {
            tracing::warn!(path = %transient.display(), "failed to remove transient file: {}", e);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{JpegCodec, PngCodec};
    use crate::error::Error;
    use crate::pixel::Shape;
    use tempfile::tempdir;

    fn image(channels: u8) -> PixelBuffer {
        PixelBuffer::from_fn(Shape::new(12, 10, channels), |h, w, c| {
            (h * 9 + w * 5 + c * 40) as u8
        })
        .unwrap()
    }

    fn dir_is_empty(dir: &Path) -> bool {
        std::fs::read_dir(dir).unwrap().next().is_none()
    }

    /// Decoder that removes the file itself before the round-trip does.
    struct SelfCleaningDecoder;

    impl ImageDecoder for SelfCleaningDecoder {
        fn decode(&self, bytes: &[u8]) -> Result<PixelBuffer> {
            PngCodec.decode(bytes)
        }

        fn decode_path(&self, path: &Path) -> Result<PixelBuffer> {
            let bytes = std::fs::read(path)?;
            std::fs::remove_file(path)?;
            self.decode(&bytes)
        }
    }

    #[test]
    fn test_png_roundtrip_is_exact() {
        let dir = tempdir().unwrap();
        let rt = CompressedRoundTrip::new(PngCodec, dir.path());
        let original = image(3);

        let decoded = rt.decode(&rt.encode(&original).unwrap()).unwrap();
        assert_eq!(decoded, original);
        assert!(dir_is_empty(dir.path()));
    }

    #[test]
    fn test_jpeg_roundtrip_keeps_shape() {
        let dir = tempdir().unwrap();
        let rt = CompressedRoundTrip::new(JpegCodec::new(90), dir.path());
        let original = image(3);

        let decoded = rt.decode(&rt.encode(&original).unwrap()).unwrap();
        assert_eq!(decoded.shape(), original.shape());
        assert!(decoded.psnr(&original).unwrap() > 25.0);
        assert!(dir_is_empty(dir.path()));
    }

    #[test]
    fn test_transient_removed_on_decode_failure() {
        let dir = tempdir().unwrap();
        let rt = CompressedRoundTrip::new(PngCodec, dir.path());

        let err = rt.decode(b"\x89PNG\r\n\x1a\nthis is not a png").unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
        assert!(dir_is_empty(dir.path()));
    }

    #[test]
    fn test_failed_removal_is_not_propagated() {
        let dir = tempdir().unwrap();
        let rt = CompressedRoundTrip::new(SelfCleaningDecoder, dir.path());
        let original = image(1);

        let bytes = PngCodec.encode(&original).unwrap();
        assert_eq!(rt.decode(&bytes).unwrap(), original);
    }

    #[test]
    fn test_unwritable_dir_is_io_error() {
        let dir = tempdir().unwrap();
        let rt = CompressedRoundTrip::new(PngCodec, dir.path().join("missing"));

        let bytes = PngCodec.encode(&image(3)).unwrap();
        assert!(matches!(rt.decode(&bytes), Err(Error::Io(_))));
    }
}
