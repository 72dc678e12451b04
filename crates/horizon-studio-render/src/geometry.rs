//! Geometric transforms: resize, crop, rotate and flip.
//!
//! These are the only operations that can change a buffer's dimensions.
//! Right-angle rotations and flips are lossless permutations of the source
//! samples; arbitrary-angle rotation resamples bilinearly into the bounding
//! box of the rotated rectangle and leaves uncovered pixels transparent.

use glam::Vec2;
use image::imageops::{self, FilterType};
use image::RgbaImage;
use rayon::prelude::*;

use crate::buffer::{check_dimensions, PixelBuffer};
use crate::error::{RenderError, RenderResult};
use crate::types::{CropRect, FlipAxis};

const TARGET: &str = "horizon_studio_render::geometry";

/// Angles closer than this to a multiple of 90 degrees use the exact
/// right-angle path.
const RIGHT_ANGLE_EPSILON: f64 = 1e-6;

/// Slack subtracted before rounding bounding-box extents up, so that float
/// noise does not add a spurious row or column.
const BOUNDS_EPSILON: f64 = 1e-4;

/// Resampling filter for resize operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ResizeFilter {
    /// Nearest neighbor interpolation. Fast but pixelated.
    Nearest,
    /// Bilinear interpolation. Balanced speed and quality.
    #[default]
    Triangle,
    /// Catmull-Rom bicubic interpolation. Good quality.
    CatmullRom,
    /// Gaussian interpolation. Smooth results.
    Gaussian,
    /// Lanczos interpolation with window size 3. High quality.
    Lanczos3,
}

impl ResizeFilter {
    fn to_image_filter(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Height that keeps the `width:height` aspect ratio of the source when the
/// width changes to `new_width`. Never returns zero.
pub fn aspect_locked_height(width: u32, height: u32, new_width: u32) -> u32 {
    if width == 0 {
        return height.max(1);
    }
    let aspect = width as f64 / height as f64;
    ((new_width as f64 / aspect).round() as u32).max(1)
}

/// Width that keeps the `width:height` aspect ratio of the source when the
/// height changes to `new_height`. Never returns zero.
pub fn aspect_locked_width(width: u32, height: u32, new_height: u32) -> u32 {
    if height == 0 {
        return width.max(1);
    }
    let aspect = width as f64 / height as f64;
    ((new_height as f64 * aspect).round() as u32).max(1)
}

impl PixelBuffer {
    // ========================================================================
    // RESIZE & CROP
    // ========================================================================

    /// Resample to exact dimensions. The aspect ratio may change.
    pub fn resize(&self, width: u32, height: u32, filter: ResizeFilter) -> RenderResult<Self> {
        check_dimensions(width, height)?;
        tracing::debug!(
            target: TARGET,
            from = ?self.dimensions(),
            to = ?(width, height),
            ?filter,
            "resize"
        );
        let out = imageops::resize(self.as_image(), width, height, filter.to_image_filter());
        Ok(Self::from_image_unchecked(out))
    }

    /// Copy out the pixels inside `rect`.
    ///
    /// Fails with [`RenderError::OutOfBounds`] when the rectangle extends past
    /// the buffer and [`RenderError::InvalidParameter`] when it has zero area.
    pub fn crop(&self, rect: CropRect) -> RenderResult<Self> {
        if rect.is_empty() {
            return Err(RenderError::invalid(
                "rect",
                format!("crop {rect} has zero area"),
            ));
        }
        if !rect.fits_within(self.width(), self.height()) {
            return Err(RenderError::OutOfBounds {
                rect,
                width: self.width(),
                height: self.height(),
            });
        }
        tracing::debug!(target: TARGET, %rect, "crop");
        let out = imageops::crop_imm(self.as_image(), rect.x, rect.y, rect.width, rect.height)
            .to_image();
        Ok(Self::from_image_unchecked(out))
    }

    /// Crop `percent` of each dimension away from every side.
    ///
    /// `percent` must lie in `1..=49` so that at least one pixel survives.
    pub fn crop_inset(&self, percent: u32) -> RenderResult<Self> {
        if !(1..=49).contains(&percent) {
            return Err(RenderError::invalid(
                "percent",
                format!("{percent} is outside 1..=49"),
            ));
        }
        self.crop(inset_rect(self.width(), self.height(), percent))
    }

    // ========================================================================
    // ROTATION
    // ========================================================================

    /// Rotate clockwise by `degrees` about the center.
    ///
    /// Multiples of 90 degrees are exact. Other angles produce the bounding
    /// box of the rotated image, bilinearly sampled, with transparent corners.
    pub fn rotate(&self, degrees: f64) -> RenderResult<Self> {
        let normalized = normalize_angle(degrees)?;
        if let Some(turns) = quarter_turns(normalized) {
            return Ok(self.rotate_quarter_turns(turns));
        }

        let theta = normalized.to_radians();
        let (out_w, out_h) = rotated_bounds(self.width(), self.height(), theta);
        tracing::debug!(
            target: TARGET,
            degrees = normalized,
            from = ?self.dimensions(),
            to = ?(out_w, out_h),
            "rotate"
        );
        Ok(Self::from_image_unchecked(rotate_bilinear(
            self.as_image(),
            out_w,
            out_h,
            theta as f32,
        )))
    }

    /// Rotate 90 degrees clockwise.
    #[must_use]
    pub fn rotate90(&self) -> Self {
        Self::from_image_unchecked(imageops::rotate90(self.as_image()))
    }

    /// Rotate 180 degrees.
    #[must_use]
    pub fn rotate180(&self) -> Self {
        Self::from_image_unchecked(imageops::rotate180(self.as_image()))
    }

    /// Rotate 270 degrees clockwise (90 counter-clockwise).
    #[must_use]
    pub fn rotate270(&self) -> Self {
        Self::from_image_unchecked(imageops::rotate270(self.as_image()))
    }

    fn rotate_quarter_turns(&self, turns: u32) -> Self {
        match turns {
            1 => self.rotate90(),
            2 => self.rotate180(),
            3 => self.rotate270(),
            _ => self.clone(),
        }
    }

    // ========================================================================
    // FLIP
    // ========================================================================

    /// Mirror along `axis`. Dimensions are unchanged.
    #[must_use]
    pub fn flip(&self, axis: FlipAxis) -> Self {
        match axis {
            FlipAxis::Horizontal => self.flip_horizontal(),
            FlipAxis::Vertical => self.flip_vertical(),
        }
    }

    /// Mirror left-to-right.
    #[must_use]
    pub fn flip_horizontal(&self) -> Self {
        Self::from_image_unchecked(imageops::flip_horizontal(self.as_image()))
    }

    /// Mirror top-to-bottom.
    #[must_use]
    pub fn flip_vertical(&self) -> Self {
        Self::from_image_unchecked(imageops::flip_vertical(self.as_image()))
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Dimensions [`PixelBuffer::rotate`] produces for a `width` x `height`
/// buffer, without rotating anything.
pub fn rotated_dimensions(width: u32, height: u32, degrees: f64) -> RenderResult<(u32, u32)> {
    let normalized = normalize_angle(degrees)?;
    Ok(match quarter_turns(normalized) {
        Some(1 | 3) => (height, width),
        Some(_) => (width, height),
        None => rotated_bounds(width, height, normalized.to_radians()),
    })
}

/// Map a finite angle into `0.0..360.0`.
fn normalize_angle(degrees: f64) -> RenderResult<f64> {
    if !degrees.is_finite() {
        return Err(RenderError::invalid(
            "degrees",
            format!("{degrees} is not a finite angle"),
        ));
    }
    Ok(degrees.rem_euclid(360.0))
}

/// Number of clockwise quarter turns when `normalized` is a right angle.
fn quarter_turns(normalized: f64) -> Option<u32> {
    let quarter = (normalized / 90.0).round();
    ((normalized - quarter * 90.0).abs() < RIGHT_ANGLE_EPSILON).then_some(quarter as u32 % 4)
}

fn inset_rect(width: u32, height: u32, percent: u32) -> CropRect {
    let x = (width as u64 * percent as u64 / 100) as u32;
    let y = (height as u64 * percent as u64 / 100) as u32;
    CropRect::new(x, y, width - 2 * x, height - 2 * y)
}

/// Size of the axis-aligned box enclosing a `width` x `height` rectangle
/// rotated by `theta` radians.
fn rotated_bounds(width: u32, height: u32, theta: f64) -> (u32, u32) {
    let (sin, cos) = theta.sin_cos();
    let (w, h) = (width as f64, height as f64);
    let out_w = (w * cos.abs() + h * sin.abs() - BOUNDS_EPSILON).ceil();
    let out_h = (w * sin.abs() + h * cos.abs() - BOUNDS_EPSILON).ceil();
    ((out_w as u32).max(1), (out_h as u32).max(1))
}

/// Inverse-map every destination pixel center into the source and sample it
/// bilinearly in premultiplied space. Samples outside the source are
/// transparent.
fn rotate_bilinear(src: &RgbaImage, out_w: u32, out_h: u32, theta: f32) -> RgbaImage {
    let mut dst = RgbaImage::new(out_w, out_h);
    let src_w = src.width() as i32;
    let src_h = src.height() as i32;
    let src_stride = src_w as usize * 4;
    let src_raw = src.as_raw();

    let src_center = Vec2::new(src.width() as f32, src.height() as f32) * 0.5;
    let dst_center = Vec2::new(out_w as f32, out_h as f32) * 0.5;
    let inverse = Vec2::from_angle(-theta);

    let sample = |sx: i32, sy: i32| -> [f32; 4] {
        if sx < 0 || sy < 0 || sx >= src_w || sy >= src_h {
            return [0.0; 4];
        }
        let idx = sy as usize * src_stride + sx as usize * 4;
        let a = src_raw[idx + 3] as f32;
        let k = a / 255.0;
        [
            src_raw[idx] as f32 * k,
            src_raw[idx + 1] as f32 * k,
            src_raw[idx + 2] as f32 * k,
            a,
        ]
    };

    let row_bytes = out_w as usize * 4;
    dst.par_chunks_mut(row_bytes)
        .enumerate()
        .for_each(|(dy, row)| {
            for dx in 0..out_w as usize {
                let p = Vec2::new(dx as f32 + 0.5, dy as f32 + 0.5) - dst_center;
                let s = inverse.rotate(p) + src_center - Vec2::splat(0.5);

                let x0 = s.x.floor() as i32;
                let y0 = s.y.floor() as i32;
                if x0 < -1 || y0 < -1 || x0 >= src_w || y0 >= src_h {
                    continue;
                }
                let fx = s.x - x0 as f32;
                let fy = s.y - y0 as f32;

                let tl = sample(x0, y0);
                let tr = sample(x0 + 1, y0);
                let bl = sample(x0, y0 + 1);
                let br = sample(x0 + 1, y0 + 1);

                let mut acc = [0.0f32; 4];
                for c in 0..4 {
                    let top = tl[c] + (tr[c] - tl[c]) * fx;
                    let bot = bl[c] + (br[c] - bl[c]) * fx;
                    acc[c] = top + (bot - top) * fy;
                }

                let px = dx * 4;
                let alpha = acc[3].round().clamp(0.0, 255.0);
                if alpha <= 0.0 {
                    continue;
                }
                let unpremultiply = 255.0 / acc[3];
                for c in 0..3 {
                    row[px + c] = (acc[c] * unpremultiply).round().clamp(0.0, 255.0) as u8;
                }
                row[px + 3] = alpha as u8;
            }
        });
    dst
}
