//! Kernel-based blurs.
//!
//! Both blurs run on premultiplied `f32` samples so that transparent pixels
//! do not bleed their (meaningless) color into opaque neighbours, and both
//! clamp sample coordinates to the buffer edge.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;

use crate::buffer::PixelBuffer;
use crate::error::{RenderError, RenderResult};
use crate::types::Color;

const TARGET: &str = "horizon_studio_render::convolution";

/// Largest radius the engine accepts regardless of caller configuration.
pub const MAX_BLUR_RADIUS: u32 = 256;

/// Blur variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BlurKind {
    /// Separable Gaussian with `sigma = radius`.
    #[default]
    Gaussian,
    /// Horizontal box of width `2 * radius + 1`.
    Motion,
}

impl BlurKind {
    pub fn name(self) -> &'static str {
        match self {
            BlurKind::Gaussian => "gaussian",
            BlurKind::Motion => "motion",
        }
    }
}

impl fmt::Display for BlurKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlurKind {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gaussian" => Ok(BlurKind::Gaussian),
            "motion" => Ok(BlurKind::Motion),
            _ => Err(RenderError::invalid("blur", format!("unknown blur `{s}`"))),
        }
    }
}

type Premul = [f32; 4];

impl PixelBuffer {
    /// Blur with the given radius in pixels.
    ///
    /// A radius of zero returns an identical copy. Dimensions never change.
    pub fn blur(&self, radius: u32, kind: BlurKind) -> RenderResult<Self> {
        if radius > MAX_BLUR_RADIUS {
            return Err(RenderError::invalid(
                "radius",
                format!("{radius} exceeds the maximum of {MAX_BLUR_RADIUS}"),
            ));
        }
        if radius == 0 {
            return Ok(self.clone());
        }
        tracing::debug!(target: TARGET, radius, kind = kind.name(), "blur");

        let width = self.width() as usize;
        let src = premultiply(self.pixels());
        let out = match kind {
            BlurKind::Gaussian => {
                let kernel = gaussian_kernel(radius);
                let horizontal = convolve_rows(&src, width, &kernel);
                convolve_columns(&horizontal, width, &kernel)
            }
            BlurKind::Motion => {
                let taps = 2 * radius as usize + 1;
                let kernel = vec![1.0 / taps as f32; taps];
                convolve_rows(&src, width, &kernel)
            }
        };
        Ok(self.map_from_premultiplied(&out))
    }

    fn map_from_premultiplied(&self, samples: &[Premul]) -> Self {
        let mut out = self.as_image().clone();
        let width = self.width() as usize;
        out.par_chunks_mut(self.row_stride())
            .zip(samples.par_chunks(width))
            .for_each(|(row, src)| {
                let row: &mut [Color] = bytemuck::cast_slice_mut(row);
                for (dst, s) in row.iter_mut().zip(src) {
                    *dst = unpremultiply(*s);
                }
            });
        Self::from_image_unchecked(out)
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Normalized 1-D Gaussian with `sigma = radius` and half-width
/// `ceil(3 * sigma)`. Index `half` is the center tap.
fn gaussian_kernel(radius: u32) -> Vec<f32> {
    let sigma = radius as f32;
    let half = (3.0 * sigma).ceil() as i32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    for w in &mut kernel {
        *w /= sum;
    }
    kernel
}

fn premultiply(pixels: &[Color]) -> Vec<Premul> {
    pixels
        .par_iter()
        .map(|c| {
            let a = c.a as f32;
            let k = a / 255.0;
            [c.r as f32 * k, c.g as f32 * k, c.b as f32 * k, a]
        })
        .collect()
}

fn unpremultiply([r, g, b, a]: Premul) -> Color {
    let alpha = a.round().clamp(0.0, 255.0);
    if alpha <= 0.0 {
        return Color::TRANSPARENT;
    }
    let k = 255.0 / a;
    let q = |v: f32| (v * k).round().clamp(0.0, 255.0) as u8;
    Color::from_rgba8(q(r), q(g), q(b), alpha as u8)
}

/// Convolve every row with a centered kernel, clamping at the row ends.
fn convolve_rows(src: &[Premul], width: usize, kernel: &[f32]) -> Vec<Premul> {
    let half = (kernel.len() / 2) as isize;
    let last = width as isize - 1;
    let mut dst = vec![[0.0f32; 4]; src.len()];
    dst.par_chunks_mut(width)
        .zip(src.par_chunks(width))
        .for_each(|(out, row)| {
            for (x, px) in out.iter_mut().enumerate() {
                let mut acc = [0.0f32; 4];
                for (k, &w) in kernel.iter().enumerate() {
                    let sx = (x as isize + k as isize - half).clamp(0, last) as usize;
                    let s = row[sx];
                    for c in 0..4 {
                        acc[c] += s[c] * w;
                    }
                }
                *px = acc;
            }
        });
    dst
}

/// Convolve every column with a centered kernel, clamping at the top and
/// bottom rows. Output rows are computed in parallel.
fn convolve_columns(src: &[Premul], width: usize, kernel: &[f32]) -> Vec<Premul> {
    let height = src.len() / width;
    let half = (kernel.len() / 2) as isize;
    let last = height as isize - 1;
    let mut dst = vec![[0.0f32; 4]; src.len()];
    dst.par_chunks_mut(width).enumerate().for_each(|(y, out)| {
        for (k, &w) in kernel.iter().enumerate() {
            let sy = (y as isize + k as isize - half).clamp(0, last) as usize;
            let row = &src[sy * width..(sy + 1) * width];
            for (px, s) in out.iter_mut().zip(row) {
                for c in 0..4 {
                    px[c] += s[c] * w;
                }
            }
        }
    });
    dst
}
