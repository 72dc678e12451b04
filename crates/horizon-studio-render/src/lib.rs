//! Pixel buffer algebra for Horizon Studio.
//!
//! This crate owns the image data model and every deterministic transform
//! applied to it. Each operation is a pure function of an immutable
//! [`PixelBuffer`] that returns a freshly owned buffer or a [`RenderError`];
//! nothing here keeps state between calls, which is what lets the editing
//! session store buffers in an undo history without copying them again.
//!
//! # Decoding and Encoding
//!
//! The [`Codec`] turns PNG, JPEG, WebP, GIF or BMP bytes into a buffer, bounded
//! by [`DecodeLimits`], and encodes buffers back to PNG, JPEG, WebP or BMP:
//!
//! ```no_run
//! use horizon_studio_render::{Codec, ExportFormat};
//!
//! # fn example(bytes: &[u8]) -> horizon_studio_render::RenderResult<()> {
//! let codec = Codec::default();
//! let buffer = codec.decode(bytes)?;
//! let jpeg = codec.encode(&buffer, ExportFormat::Jpeg, 0.9)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Transforms
//!
//! Transforms are methods on [`PixelBuffer`] grouped by engine:
//!
//! - geometry: [`resize`](PixelBuffer::resize), [`crop`](PixelBuffer::crop),
//!   [`crop_inset`](PixelBuffer::crop_inset), [`rotate`](PixelBuffer::rotate),
//!   [`flip`](PixelBuffer::flip)
//! - color: [`apply_filter`](PixelBuffer::apply_filter),
//!   [`adjust`](PixelBuffer::adjust), [`histogram`](PixelBuffer::histogram)
//! - convolution: [`blur`](PixelBuffer::blur)
//! - compositing: [`watermark`](PixelBuffer::watermark)
//!
//! ```
//! use horizon_studio_render::{BlurKind, Color, CropRect, FilterKind, PixelBuffer, ResizeFilter};
//!
//! # fn main() -> horizon_studio_render::RenderResult<()> {
//! let red = PixelBuffer::from_color(100, 100, Color::RED)?;
//! let result = red
//!     .resize(200, 200, ResizeFilter::Triangle)?
//!     .crop(CropRect::new(50, 50, 100, 100))?
//!     .blur(2, BlurKind::Gaussian)?
//!     .apply_filter(FilterKind::Invert);
//! assert_eq!(result.dimensions(), (100, 100));
//! assert_eq!(result.get_pixel(50, 50), Some(Color::from_rgb8(0, 255, 255)));
//! # Ok(())
//! # }
//! ```
//!
//! # Text
//!
//! Watermarks are rasterized through the [`TextRasterizer`] trait. The
//! default [`CosmicTextRasterizer`] shapes bold sans-serif text with
//! cosmic-text and loads system fonts on first use.
//!
//! # Parallelism
//!
//! Per-pixel loops are split by rows across the rayon global thread pool.
//!
//! # Features
//!
//! - `serde`: derive `Serialize`/`Deserialize` for the parameter types.

mod buffer;
mod codec;
mod color;
mod compositor;
mod convolution;
mod error;
mod geometry;
mod text;
mod types;

pub use buffer::PixelBuffer;
pub use codec::{Codec, DecodeLimits, ExportFormat};
pub use color::{Adjustments, FilterKind, Histogram};
pub use compositor::{WatermarkPosition, WatermarkSpec, WatermarkStyle, MAX_FONT_SIZE};
pub use convolution::{BlurKind, MAX_BLUR_RADIUS};
pub use error::{RenderError, RenderResult};
pub use geometry::{aspect_locked_height, aspect_locked_width, rotated_dimensions, ResizeFilter};
pub use text::{CosmicTextRasterizer, FontConfig, TextMask, TextRasterizer};
pub use types::{Color, CropRect, FlipAxis};

/// Re-exported so callers can name decoded source formats.
pub use image::ImageFormat;
