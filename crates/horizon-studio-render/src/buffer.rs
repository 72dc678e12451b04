//! The pixel buffer every engine reads and produces.
//!
//! [`PixelBuffer`] wraps an `image::RgbaImage` and guarantees a non-empty,
//! row-major grid of straight-alpha RGBA samples. Buffers are immutable from
//! the outside: every transform in this crate takes `&self` and returns a
//! freshly owned buffer, so a buffer stored in an undo history can never be
//! changed behind its owner's back.
//!
//! # Example
//!
//! ```ignore
//! use horizon_studio_render::{Color, FilterKind, PixelBuffer, ResizeFilter};
//!
//! let red = PixelBuffer::from_color(100, 100, Color::RED)?;
//! let result = red
//!     .resize(200, 200, ResizeFilter::Triangle)?
//!     .apply_filter(FilterKind::Grayscale);
//! assert_eq!(result.dimensions(), (200, 200));
//! ```

use image::RgbaImage;
use rayon::prelude::*;

use crate::error::{RenderError, RenderResult};
use crate::types::Color;

/// A rectangular, non-empty grid of 8-bit RGBA samples.
///
/// Two buffers compare equal when their dimensions and every sample match,
/// which is what undo/redo round trips are checked against.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    inner: RgbaImage,
}

impl PixelBuffer {
    // ========================================================================
    // CONSTRUCTION
    // ========================================================================

    /// Create a fully transparent buffer.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        Self::from_color(width, height, Color::TRANSPARENT)
    }

    /// Create a buffer filled with a solid color.
    pub fn from_color(width: u32, height: u32, color: Color) -> RenderResult<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            inner: RgbaImage::from_pixel(width, height, color.to_rgba()),
        })
    }

    /// Create a buffer from raw RGBA bytes.
    ///
    /// The data must be exactly `width * height * 4` bytes in row-major order.
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32) -> RenderResult<Self> {
        check_dimensions(width, height)?;
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(RenderError::invalid(
                "data",
                format!("expected {expected} bytes, got {}", data.len()),
            ));
        }
        let inner = RgbaImage::from_raw(width, height, data)
            .ok_or_else(|| RenderError::invalid("data", "buffer too small for dimensions"))?;
        Ok(Self { inner })
    }

    /// Wrap an existing `RgbaImage`.
    pub fn from_image(inner: RgbaImage) -> RenderResult<Self> {
        check_dimensions(inner.width(), inner.height())?;
        Ok(Self { inner })
    }

    /// Wrap an image produced by an engine whose dimensions are already known
    /// to be non-zero.
    #[inline]
    pub(crate) fn from_image_unchecked(inner: RgbaImage) -> Self {
        debug_assert!(inner.width() > 0 && inner.height() > 0);
        Self { inner }
    }

    // ========================================================================
    // PROPERTIES
    // ========================================================================

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// Dimensions as a `(width, height)` tuple.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        self.inner.dimensions()
    }

    /// Number of pixels (`width * height`).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Bytes per row.
    #[inline]
    pub(crate) fn row_stride(&self) -> usize {
        self.width() as usize * 4
    }

    // ========================================================================
    // PIXEL ACCESS
    // ========================================================================

    /// Get the color at `(x, y)`, or `None` when out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.inner.get_pixel_checked(x, y).map(|p| Color::from(*p))
    }

    /// All pixels in row-major order.
    #[inline]
    pub fn pixels(&self) -> &[Color] {
        bytemuck::cast_slice(self.inner.as_raw())
    }

    /// Raw RGBA bytes in row-major order.
    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        self.inner.as_raw()
    }

    /// Borrow the underlying `RgbaImage`.
    #[inline]
    pub fn as_image(&self) -> &RgbaImage {
        &self.inner
    }

    /// Consume the buffer and return the underlying `RgbaImage`.
    #[inline]
    pub fn into_image(self) -> RgbaImage {
        self.inner
    }

    /// Produce a new buffer by mapping every pixel independently.
    ///
    /// Rows are processed in parallel.
    #[must_use]
    pub fn map_pixels<F>(&self, f: F) -> Self
    where
        F: Fn(Color) -> Color + Sync,
    {
        let mut out = self.inner.clone();
        let stride = self.row_stride();
        out.par_chunks_mut(stride).for_each(|row| {
            let row: &mut [Color] = bytemuck::cast_slice_mut(row);
            for px in row {
                *px = f(*px);
            }
        });
        Self { inner: out }
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

pub(crate) fn check_dimensions(width: u32, height: u32) -> RenderResult<()> {
    if width == 0 || height == 0 {
        return Err(RenderError::invalid(
            "dimensions",
            format!("{width}x{height} has zero area"),
        ));
    }
    Ok(())
}
