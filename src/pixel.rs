//! Canonical pixel buffer.
//!
//! A [`PixelBuffer`] stores 8-bit samples in column-major, channel-planar
//! order: the row index varies fastest, then the column, then the channel.
//! For a buffer of height `H` and width `W` the sample at `(h, w, c)` lives
//! at offset `c * H * W + w * H + h`. Colour images carry their planes in
//! (R, G, B) order.

use crate::error::{Error, Result};
use std::fmt;

/// Image dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    /// Number of rows.
    pub height: u32,
    /// Number of columns.
    pub width: u32,
    /// Samples per pixel: 1 (grayscale) or 3 (RGB).
    pub channels: u8,
}

impl Shape {
    /// Create a new shape. Validation happens in [`Shape::validate`].
    pub const fn new(height: u32, width: u32, channels: u8) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Number of pixels (`height * width`), saturating at `usize::MAX`.
    pub fn pixels(&self) -> usize {
        (self.height as usize).saturating_mul(self.width as usize)
    }

    /// Total number of samples (`height * width * channels`), saturating at
    /// `usize::MAX`. Use [`Shape::checked_len`] to detect overflow.
    pub fn len(&self) -> usize {
        self.checked_len().unwrap_or(usize::MAX)
    }

    /// Total number of samples, or `None` if it does not fit in `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        (self.height as usize)
            .checked_mul(self.width as usize)?
            .checked_mul(self.channels as usize)
    }

    /// Returns true if the shape holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reject channel counts other than 1 or 3 and sizes that overflow.
    ///
    /// An overflowing size is reported as `ShapeMismatch` with `expected`
    /// set to `usize::MAX`.
    pub fn validate(&self) -> Result<()> {
        match self.channels {
            1 | 3 => {}
            other => return Err(Error::UnsupportedChannelCount(other)),
        }
        match self.checked_len() {
            Some(_) => Ok(()),
            None => Err(Error::shape(usize::MAX, 0)),
        }
    }

    /// Validate the shape and check that `actual` samples fill it exactly.
    pub fn check_len(&self, actual: usize) -> Result<()> {
        let expected = match self.channels {
            1 | 3 => self.checked_len(),
            other => return Err(Error::UnsupportedChannelCount(other)),
        };
        let Some(expected) = expected else {
            return Err(Error::shape(usize::MAX, actual));
        };
        if expected != actual {
            return Err(Error::shape(expected, actual));
        }
        Ok(())
    }

    /// Offset of `(h, w, c)` in canonical order.
    #[inline]
    pub(crate) fn canonical_index(&self, h: usize, w: usize, c: usize) -> usize {
        let height = self.height as usize;
        c * self.pixels() + w * height + h
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

/// An immutable image in canonical layout.
///
/// Conversions always produce a new buffer; there is no in-place mutation.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PixelBuffer {
    shape: Shape,
    payload: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap a payload that is already in canonical order.
    ///
    /// # Errors
    ///
    /// `UnsupportedChannelCount` if the channel count is not 1 or 3,
    /// `ShapeMismatch` if `payload.len()` does not equal `shape.len()`.
    pub fn new(shape: Shape, payload: Vec<u8>) -> Result<Self> {
        shape.check_len(payload.len())?;
        Ok(Self { shape, payload })
    }

    /// Build a buffer by evaluating `f(h, w, c)` for every sample.
    pub fn from_fn<F>(shape: Shape, mut f: F) -> Result<Self>
    where
        F: FnMut(usize, usize, usize) -> u8,
    {
        shape.validate()?;
        let (height, width) = (shape.height as usize, shape.width as usize);
        let mut payload = Vec::with_capacity(shape.len());
        for c in 0..shape.channels as usize {
            for w in 0..width {
                for h in 0..height {
                    payload.push(f(h, w, c));
                }
            }
        }
        Ok(Self { shape, payload })
    }

    /// Image dimensions.
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.shape.height
    }

    /// Number of columns.
    pub fn width(&self) -> u32 {
        self.shape.width
    }

    /// Samples per pixel.
    pub fn channels(&self) -> u8 {
        self.shape.channels
    }

    /// Canonical payload.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the buffer and return the canonical payload.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Sample at row `h`, column `w`, channel `c`.
    pub fn get(&self, h: usize, w: usize, c: usize) -> Option<u8> {
        if h >= self.shape.height as usize
            || w >= self.shape.width as usize
            || c >= self.shape.channels as usize
        {
            return None;
        }
        Some(self.payload[self.shape.canonical_index(h, w, c)])
    }

    /// One channel plane, column-major.
    pub fn plane(&self, c: usize) -> Option<&[u8]> {
        if c >= self.shape.channels as usize {
            return None;
        }
        let size = self.shape.pixels();
        Some(&self.payload[c * size..(c + 1) * size])
    }

    /// Mean absolute per-sample difference against `other`.
    ///
    /// Used to judge lossy round-trips, where bit-exact equality is not
    /// expected.
    pub fn mean_abs_diff(&self, other: &PixelBuffer) -> Result<f64> {
        self.check_same_shape(other)?;
        if self.payload.is_empty() {
            return Ok(0.0);
        }
        let total: u64 = self
            .payload
            .iter()
            .zip(&other.payload)
            .map(|(&a, &b)| a.abs_diff(b) as u64)
            .sum();
        Ok(total as f64 / self.payload.len() as f64)
    }

    /// Peak signal-to-noise ratio in dB against `other`.
    ///
    /// Identical buffers yield `f64::INFINITY`.
    pub fn psnr(&self, other: &PixelBuffer) -> Result<f64> {
        self.check_same_shape(other)?;
        if self.payload.is_empty() {
            return Ok(f64::INFINITY);
        }
        let sq: u64 = self
            .payload
            .iter()
            .zip(&other.payload)
            .map(|(&a, &b)| {
                let d = a.abs_diff(b) as u64;
                d * d
            })
            .sum();
        if sq == 0 {
            return Ok(f64::INFINITY);
        }
        let mse = sq as f64 / self.payload.len() as f64;
        Ok(10.0 * (255.0 * 255.0 / mse).log10())
    }

    fn check_same_shape(&self, other: &PixelBuffer) -> Result<()> {
        if self.shape != other.shape {
            return Err(Error::shape(self.shape.len(), other.shape.len()));
        }
        Ok(())
    }
}

impl fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("shape", &self.shape)
            .field("bytes", &self.payload.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_len() {
        assert_eq!(Shape::new(2, 3, 3).len(), 18);
        assert_eq!(Shape::new(4, 4, 1).len(), 16);
        assert!(Shape::new(0, 4, 3).is_empty());
    }

    #[test]
    fn test_shape_overflow_is_shape_mismatch() {
        let shape = Shape::new(u32::MAX, u32::MAX, 3);
        assert_eq!(shape.checked_len(), None);
        assert_eq!(shape.len(), usize::MAX);
        assert!(matches!(
            shape.check_len(12),
            Err(Error::ShapeMismatch {
                expected: usize::MAX,
                actual: 12
            })
        ));
        assert!(matches!(
            PixelBuffer::from_fn(shape, |_, _, _| 0),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_shape_rejects_bad_channels() {
        assert!(matches!(
            Shape::new(2, 2, 4).validate(),
            Err(Error::UnsupportedChannelCount(4))
        ));
        assert!(matches!(
            Shape::new(2, 2, 0).validate(),
            Err(Error::UnsupportedChannelCount(0))
        ));
    }

    #[test]
    fn test_new_checks_length() {
        let err = PixelBuffer::new(Shape::new(2, 2, 3), vec![0; 10]).unwrap_err();
        assert!(matches!(
            err,
            Error::ShapeMismatch {
                expected: 12,
                actual: 10
            }
        ));
    }

    #[test]
    fn test_canonical_order_is_column_major_planar() {
        // R = [[1,2],[3,4]], G = R + 4, B = R + 8
        let buf = PixelBuffer::from_fn(Shape::new(2, 2, 3), |h, w, c| {
            (1 + h * 2 + w + c * 4) as u8
        })
        .unwrap();
        assert_eq!(buf.payload(), &[1, 3, 2, 4, 5, 7, 6, 8, 9, 11, 10, 12]);
        assert_eq!(buf.plane(1).unwrap(), &[5, 7, 6, 8]);
        assert_eq!(buf.get(0, 1, 0), Some(2));
        assert_eq!(buf.get(1, 0, 2), Some(11));
        assert_eq!(buf.get(2, 0, 0), None);
        assert!(buf.plane(3).is_none());
    }

    #[test]
    fn test_diff_metrics() {
        let shape = Shape::new(2, 2, 1);
        let a = PixelBuffer::new(shape, vec![10, 20, 30, 40]).unwrap();
        let b = PixelBuffer::new(shape, vec![12, 18, 30, 40]).unwrap();
        assert_eq!(a.mean_abs_diff(&b).unwrap(), 1.0);
        assert!(a.psnr(&a).unwrap().is_infinite());
        assert!(a.psnr(&b).unwrap() > 40.0);

        let c = PixelBuffer::new(Shape::new(1, 4, 1), vec![0; 4]).unwrap();
        assert!(a.mean_abs_diff(&c).is_err());
    }

    #[test]
    fn test_debug_omits_payload() {
        let buf = PixelBuffer::new(Shape::new(1, 1, 1), vec![7]).unwrap();
        let dbg = format!("{buf:?}");
        assert!(dbg.contains("bytes: 1"));
    }
}
