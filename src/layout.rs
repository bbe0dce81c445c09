//! Raw layout transforms.
//!
//! Converts between the canonical [`PixelBuffer`] layout (column-major,
//! channel-planar, RGB) and the raw layouts a foreign runtime hands over.
//! Raw samples arrive as signed bytes; they are reinterpreted bit-for-bit as
//! unsigned, so `-1i8` becomes `255u8`, never `0`.
//!
//! | Layout | Element order (fastest first) | Channel order |
//! |--------|-------------------------------|---------------|
//! | [`RawLayout::Packed3D`] | channel, width, height (`[h][w][c]`) | R, G, B |
//! | [`RawLayout::Interleaved1D`] | channel, width, height | B, G, R |
//! | [`RawLayout::Planar1D`] | height, width, channel | R, G, B |
//!
//! All functions are pure and never mutate their input.
//!
//! # Example
//!
//! ```rust,ignore
//! use pixbridge::layout::{self, RawLayout};
//!
//! let raw = peer.interleaved_1d()?;
//! let image = layout::from_interleaved_1d(&raw, 480, 640, 3)?;
//! ```

use crate::error::Result;
use crate::pixel::{PixelBuffer, Shape};

/// Raw layout variants a peer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawLayout {
    /// 3-D array flattened row-major as `[h][w][c]`.
    Packed3D,
    /// Windowing-toolkit buffer order: channel-fastest, then width, then
    /// height, with channels stored B, G, R.
    Interleaved1D,
    /// Column-major planes, identical to the canonical order.
    Planar1D,
}

impl RawLayout {
    /// All layout variants.
    pub const ALL: [RawLayout; 3] = [
        RawLayout::Packed3D,
        RawLayout::Interleaved1D,
        RawLayout::Planar1D,
    ];
}

#[derive(Clone, Copy)]
enum ChannelOrder {
    Rgb,
    Bgr,
}

impl ChannelOrder {
    #[inline]
    fn source_channel(self, c: usize, channels: usize) -> usize {
        match self {
            ChannelOrder::Rgb => c,
            ChannelOrder::Bgr => channels - 1 - c,
        }
    }
}

/// Reinterpret signed samples as unsigned, bit-for-bit.
pub fn reinterpret_signed(bytes: &[i8]) -> Vec<u8> {
    bytes.iter().map(|&b| b as u8).collect()
}

/// Reinterpret unsigned samples as signed, bit-for-bit.
pub fn reinterpret_unsigned(bytes: &[u8]) -> Vec<i8> {
    bytes.iter().map(|&b| b as i8).collect()
}

/// Decode a packed `[h][w][c]` buffer.
///
/// # Errors
///
/// `UnsupportedChannelCount` if `channels` is not 1 or 3, `ShapeMismatch` if
/// `bytes.len() != height * width * channels`.
pub fn from_packed_3d(bytes: &[i8], height: u32, width: u32, channels: u8) -> Result<PixelBuffer> {
    gather_rows(
        bytes,
        Shape::new(height, width, channels),
        ChannelOrder::Rgb,
        |b| b as u8,
    )
}

/// Decode a channel-interleaved, row-major, BGR buffer.
///
/// Grayscale input is only transposed; there is nothing to de-interleave.
///
/// # Errors
///
/// Same as [`from_packed_3d`].
pub fn from_interleaved_1d(
    bytes: &[i8],
    height: u32,
    width: u32,
    channels: u8,
) -> Result<PixelBuffer> {
    gather_rows(
        bytes,
        Shape::new(height, width, channels),
        ChannelOrder::Bgr,
        |b| b as u8,
    )
}

/// Decode a column-major planar buffer. This is a pure reinterpretation.
///
/// # Errors
///
/// Same as [`from_packed_3d`].
pub fn from_planar_1d(bytes: &[i8], height: u32, width: u32, channels: u8) -> Result<PixelBuffer> {
    PixelBuffer::new(
        Shape::new(height, width, channels),
        reinterpret_signed(bytes),
    )
}

/// Encode into the packed `[h][w][c]` layout.
pub fn to_packed_3d(buffer: &PixelBuffer) -> Vec<i8> {
    scatter_rows(buffer, ChannelOrder::Rgb, |b| b as i8)
}

/// Encode into the channel-interleaved BGR layout.
pub fn to_interleaved_1d(buffer: &PixelBuffer) -> Vec<i8> {
    scatter_rows(buffer, ChannelOrder::Bgr, |b| b as i8)
}

/// Encode into the column-major planar layout.
pub fn to_planar_1d(buffer: &PixelBuffer) -> Vec<i8> {
    reinterpret_unsigned(buffer.payload())
}

/// Decode `bytes` laid out as `layout`.
pub fn decode(layout: RawLayout, bytes: &[i8], shape: Shape) -> Result<PixelBuffer> {
    let Shape {
        height,
        width,
        channels,
    } = shape;
    match layout {
        RawLayout::Packed3D => from_packed_3d(bytes, height, width, channels),
        RawLayout::Interleaved1D => from_interleaved_1d(bytes, height, width, channels),
        RawLayout::Planar1D => from_planar_1d(bytes, height, width, channels),
    }
}

/// Encode `buffer` into `layout`.
pub fn encode(layout: RawLayout, buffer: &PixelBuffer) -> Vec<i8> {
    match layout {
        RawLayout::Packed3D => to_packed_3d(buffer),
        RawLayout::Interleaved1D => to_interleaved_1d(buffer),
        RawLayout::Planar1D => to_planar_1d(buffer),
    }
}

/// Canonicalise the row-major RGB/gray output of an image decoder.
pub(crate) fn from_rgb_rows(bytes: &[u8], shape: Shape) -> Result<PixelBuffer> {
    gather_rows(bytes, shape, ChannelOrder::Rgb, |b| b)
}

/// Row-major RGB/gray input for an image encoder.
pub(crate) fn to_rgb_rows(buffer: &PixelBuffer) -> Vec<u8> {
    scatter_rows(buffer, ChannelOrder::Rgb, |b| b)
}

fn gather_rows<T, F>(src: &[T], shape: Shape, order: ChannelOrder, cast: F) -> Result<PixelBuffer>
where
    T: Copy,
    F: Fn(T) -> u8,
{
    shape.check_len(src.len())?;

    let (height, width) = (shape.height as usize, shape.width as usize);
    let channels = shape.channels as usize;
    let mut payload = vec![0u8; src.len()];

    for h in 0..height {
        for w in 0..width {
            let base = (h * width + w) * channels;
            for c in 0..channels {
                let s = order.source_channel(c, channels);
                payload[shape.canonical_index(h, w, c)] = cast(src[base + s]);
            }
        }
    }

    PixelBuffer::new(shape, payload)
}

fn scatter_rows<T, F>(buffer: &PixelBuffer, order: ChannelOrder, cast: F) -> Vec<T>
where
    T: Copy + Default,
    F: Fn(u8) -> T,
{
    let shape = buffer.shape();
    let (height, width) = (shape.height as usize, shape.width as usize);
    let channels = shape.channels as usize;
    let payload = buffer.payload();
    let mut out = vec![T::default(); payload.len()];

    for h in 0..height {
        for w in 0..width {
            let base = (h * width + w) * channels;
            for c in 0..channels {
                let s = order.source_channel(c, channels);
                out[base + s] = cast(payload[shape.canonical_index(h, w, c)]);
            }
        }
    }

    out
}
