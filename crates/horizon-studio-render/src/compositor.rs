//! Alpha compositing of derived content onto a buffer.
//!
//! The compositor draws watermark text: a dark outline at half the requested
//! opacity, then a light fill at the full requested opacity, both blended
//! source-over in straight alpha.

use image::{GrayImage, Rgba};

use crate::buffer::PixelBuffer;
use crate::error::{RenderError, RenderResult};
use crate::text::{dilate, TextMask, TextRasterizer};
use crate::types::Color;

const TARGET: &str = "horizon_studio_render::compositor";

/// Largest accepted watermark font size, in pixels.
pub const MAX_FONT_SIZE: f32 = 1024.0;

/// Where a watermark is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum WatermarkPosition {
    TopLeft,
    TopRight,
    #[default]
    BottomLeft,
    BottomRight,
    Center,
}

impl WatermarkPosition {
    pub fn name(self) -> &'static str {
        match self {
            WatermarkPosition::TopLeft => "top-left",
            WatermarkPosition::TopRight => "top-right",
            WatermarkPosition::BottomLeft => "bottom-left",
            WatermarkPosition::BottomRight => "bottom-right",
            WatermarkPosition::Center => "center",
        }
    }
}

/// What to draw.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WatermarkSpec {
    pub text: String,
    pub position: WatermarkPosition,
    /// Fill opacity in `0.0..=1.0`. The outline uses half of it.
    pub opacity: f32,
    /// Font size in pixels.
    pub font_size: f32,
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            text: String::new(),
            position: WatermarkPosition::default(),
            opacity: 0.5,
            font_size: 24.0,
        }
    }
}

impl WatermarkSpec {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn position(mut self, position: WatermarkPosition) -> Self {
        self.position = position;
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn font_size(mut self, font_size: f32) -> Self {
        self.font_size = font_size;
        self
    }

    pub fn validate(&self) -> RenderResult<()> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(RenderError::invalid(
                "opacity",
                format!("{} is outside 0.0..=1.0", self.opacity),
            ));
        }
        if !self.font_size.is_finite() || self.font_size <= 0.0 {
            return Err(RenderError::invalid(
                "font_size",
                format!("{} must be a positive number", self.font_size),
            ));
        }
        if self.font_size > MAX_FONT_SIZE {
            return Err(RenderError::invalid(
                "font_size",
                format!("{} exceeds the maximum of {MAX_FONT_SIZE}", self.font_size),
            ));
        }
        Ok(())
    }
}

/// How watermarks look, independent of what they say.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WatermarkStyle {
    /// Distance from the buffer edge for corner anchors.
    pub padding: u32,
    /// Outline width in pixels, centered on the glyph edge.
    pub stroke_width: u32,
    pub fill: Color,
    pub stroke: Color,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            padding: 20,
            stroke_width: 2,
            fill: Color::WHITE,
            stroke: Color::BLACK,
        }
    }
}

impl PixelBuffer {
    /// Draw watermark text onto a copy of this buffer.
    ///
    /// Empty text, or text the rasterizer cannot draw, yields an identical
    /// copy.
    pub fn watermark(
        &self,
        spec: &WatermarkSpec,
        style: &WatermarkStyle,
        rasterizer: &mut dyn TextRasterizer,
    ) -> RenderResult<Self> {
        spec.validate()?;
        if spec.text.is_empty() {
            return Ok(self.clone());
        }
        let Some(mask) = rasterizer.rasterize(&spec.text, spec.font_size)? else {
            tracing::warn!(target: TARGET, text = %spec.text, "watermark text produced no glyphs");
            return Ok(self.clone());
        };

        let (left, top) = placement(&mask, spec, style.padding, self.width(), self.height());
        tracing::debug!(
            target: TARGET,
            position = spec.position.name(),
            left,
            top,
            opacity = spec.opacity,
            "watermark"
        );

        let mut out = self.as_image().clone();
        if style.stroke_width > 0 {
            let outline = dilate(&mask.coverage, (style.stroke_width / 2).max(1));
            blend_mask(&mut out, &outline, left, top, style.stroke, spec.opacity * 0.5);
        }
        blend_mask(&mut out, &mask.coverage, left, top, style.fill, spec.opacity);
        Ok(Self::from_image_unchecked(out))
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Top-left corner, in buffer coordinates, at which to place the mask.
fn placement(
    mask: &TextMask,
    spec: &WatermarkSpec,
    padding: u32,
    width: u32,
    height: u32,
) -> (i64, i64) {
    let pad = padding as f64;
    let (w, h) = (width as f64, height as f64);
    let text_width = mask.advance as f64;
    let font_size = spec.font_size as f64;

    let (pen_x, baseline) = match spec.position {
        WatermarkPosition::TopLeft => (pad, pad + font_size),
        WatermarkPosition::TopRight => (w - text_width - pad, pad + font_size),
        WatermarkPosition::BottomLeft => (pad, h - pad),
        WatermarkPosition::BottomRight => (w - text_width - pad, h - pad),
        WatermarkPosition::Center => {
            let Some((x0, y0, x1, y1)) = mask.ink_bounds() else {
                return (0, 0);
            };
            let ink_cx = (x0 + x1 + 1) as f64 / 2.0;
            let ink_cy = (y0 + y1 + 1) as f64 / 2.0;
            return (
                (w / 2.0 - ink_cx).round() as i64,
                (h / 2.0 - ink_cy).round() as i64,
            );
        }
    };
    (
        pen_x.round() as i64 - mask.origin_x as i64,
        baseline.round() as i64 - mask.baseline_y as i64,
    )
}

/// Blend `color` through `coverage` onto `dst` with the mask's top-left at
/// `(left, top)`. Pixels outside `dst` are clipped.
fn blend_mask(
    dst: &mut image::RgbaImage,
    coverage: &GrayImage,
    left: i64,
    top: i64,
    color: Color,
    opacity: f32,
) {
    let (dw, dh) = (dst.width() as i64, dst.height() as i64);
    for (mx, my, m) in coverage.enumerate_pixels() {
        let cov = m.0[0];
        if cov == 0 {
            continue;
        }
        let dx = left + mx as i64;
        let dy = top + my as i64;
        if dx < 0 || dy < 0 || dx >= dw || dy >= dh {
            continue;
        }
        let alpha = color.a as f32 / 255.0 * cov as f32 / 255.0 * opacity;
        let src = Rgba([color.r, color.g, color.b, (alpha * 255.0).round().clamp(0.0, 255.0) as u8]);
        let p = dst.get_pixel_mut(dx as u32, dy as u32);
        *p = source_over(*p, src);
    }
}

/// Straight-alpha source-over.
fn source_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let [sr, sg, sb, sa] = src.0;
    let [dr, dg, db, da] = dst.0;

    let src_a = sa as f32 / 255.0;
    let dst_a = da as f32 / 255.0;

    if src_a == 0.0 {
        return dst;
    }

    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        let result = (sf * src_a + df * dst_a * (1.0 - src_a)) / out_a;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(sr, dr),
        blend(sg, dg),
        blend(sb, db),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{CosmicTextRasterizer, FontConfig};

    /// Draws every character as a solid `size/2` square sitting on the
    /// baseline, with a two pixel margin around the run.
    struct BlockRasterizer;

    impl TextRasterizer for BlockRasterizer {
        fn rasterize(&mut self, text: &str, font_size: f32) -> RenderResult<Option<TextMask>> {
            const MARGIN: u32 = 2;
            let glyph = (font_size / 2.0) as u32;
            let chars: Vec<char> = text.chars().collect();
            if chars.iter().all(|c| c.is_whitespace()) {
                return Ok(None);
            }
            let advance = glyph * chars.len() as u32;
            let mut coverage = GrayImage::new(advance + 2 * MARGIN, glyph + 2 * MARGIN);
            for (x, y, p) in coverage.enumerate_pixels_mut() {
                if x < MARGIN || y < MARGIN || x >= MARGIN + advance || y >= MARGIN + glyph {
                    continue;
                }
                if !chars[((x - MARGIN) / glyph) as usize].is_whitespace() {
                    p.0[0] = 255;
                }
            }
            Ok(Some(TextMask {
                coverage,
                origin_x: MARGIN as i32,
                baseline_y: (MARGIN + glyph) as i32,
                advance: advance as f32,
            }))
        }
    }

    fn gray_canvas() -> PixelBuffer {
        PixelBuffer::from_color(200, 100, Color::from_rgb8(128, 128, 128)).unwrap()
    }

    #[test]
    fn test_empty_text_is_noop() {
        let buf = gray_canvas();
        let out = buf
            .watermark(&WatermarkSpec::new(""), &WatermarkStyle::default(), &mut BlockRasterizer)
            .unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn test_blank_glyphs_are_noop() {
        let buf = gray_canvas();
        let out = buf
            .watermark(&WatermarkSpec::new("   "), &WatermarkStyle::default(), &mut BlockRasterizer)
            .unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn test_bottom_left_placement() {
        let buf = gray_canvas();
        let spec = WatermarkSpec::new("AB").opacity(1.0).font_size(20.0);
        let out = buf
            .watermark(&spec, &WatermarkStyle::default(), &mut BlockRasterizer)
            .unwrap();
        // Blocks are 10x10 with the baseline at y = 100 - 20 = 80, starting at x = 20.
        assert_eq!(out.get_pixel(25, 75), Some(Color::WHITE));
        assert_eq!(out.get_pixel(39, 71), Some(Color::WHITE));
        // Outline just outside the fill is darkened at half opacity.
        assert_eq!(out.get_pixel(19, 75), Some(Color::from_rgb8(64, 64, 64)));
        // Well away from the text nothing changes.
        assert_eq!(out.get_pixel(100, 20), buf.get_pixel(100, 20));
    }

    #[test]
    fn test_top_right_placement() {
        let buf = gray_canvas();
        let spec = WatermarkSpec::new("AB").opacity(1.0).font_size(20.0);
        let out = buf
            .watermark(&spec, &WatermarkStyle::default(), &mut BlockRasterizer)
            .unwrap();
        let top = buf
            .watermark(
                &spec.clone().position(WatermarkPosition::TopRight),
                &WatermarkStyle::default(),
                &mut BlockRasterizer,
            )
            .unwrap();
        assert_ne!(out, top);
        // Pen x = 200 - 20 - 20 = 160, baseline = 20 + 20 = 40.
        assert_eq!(top.get_pixel(165, 35), Some(Color::WHITE));
        assert_eq!(top.get_pixel(179, 30), Some(Color::WHITE));
    }

    #[test]
    fn test_center_placement_is_centered() {
        let buf = gray_canvas();
        let spec = WatermarkSpec::new("AB")
            .opacity(1.0)
            .font_size(20.0)
            .position(WatermarkPosition::Center);
        let out = buf
            .watermark(&spec, &WatermarkStyle::default(), &mut BlockRasterizer)
            .unwrap();
        // 20x10 ink block centered on (100, 50).
        assert_eq!(out.get_pixel(90, 45), Some(Color::WHITE));
        assert_eq!(out.get_pixel(109, 54), Some(Color::WHITE));
        assert_ne!(out.get_pixel(89, 45), Some(Color::WHITE));
        assert_ne!(out.get_pixel(110, 54), Some(Color::WHITE));
    }

    #[test]
    fn test_opacity_blends_fill() {
        let buf = gray_canvas();
        let style = WatermarkStyle {
            stroke_width: 0,
            ..WatermarkStyle::default()
        };
        let spec = WatermarkSpec::new("A").opacity(0.5).font_size(20.0);
        let out = buf.watermark(&spec, &style, &mut BlockRasterizer).unwrap();
        // 128 + (255 - 128) * 0.5 ~= 191.5; source alpha is quantized to 128/255.
        let p = out.get_pixel(25, 75).unwrap();
        assert!((191..=192).contains(&p.r), "got {p:?}");
        assert_eq!(p.a, 255);
    }

    #[test]
    fn test_invalid_watermark_parameters() {
        let buf = gray_canvas();
        let style = WatermarkStyle::default();
        for spec in [
            WatermarkSpec::new("x").opacity(1.5),
            WatermarkSpec::new("x").font_size(0.0),
            WatermarkSpec::new("x").font_size(f32::NAN),
            WatermarkSpec::new("x").font_size(MAX_FONT_SIZE + 1.0),
            WatermarkSpec::new("hi").font_size(1.0e7),
        ] {
            assert!(matches!(
                buf.watermark(&spec, &style, &mut BlockRasterizer),
                Err(RenderError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_cosmic_rasterizer_without_fonts_is_noop() {
        let buf = gray_canvas();
        let mut rasterizer =
            CosmicTextRasterizer::with_config(FontConfig::new().load_system_fonts(false));
        let out = buf
            .watermark(&WatermarkSpec::new("Proof"), &WatermarkStyle::default(), &mut rasterizer)
            .unwrap();
        assert_eq!(out, buf);
    }

    #[test]
    fn test_cosmic_rasterizer_draws_in_corner() {
        let buf = gray_canvas();
        let mut rasterizer =
            CosmicTextRasterizer::with_config(FontConfig::new().load_system_fonts(false));
        rasterizer.load_font_data(include_bytes!("../tests/fonts/Tuffy.ttf").to_vec());
        let spec = WatermarkSpec::new("Proof")
            .position(WatermarkPosition::BottomRight)
            .opacity(1.0)
            .font_size(24.0);
        let out = buf.watermark(&spec, &WatermarkStyle::default(), &mut rasterizer).unwrap();

        let background = Color::from_rgb8(128, 128, 128);
        let changed: Vec<(u32, u32)> = (0..out.height())
            .flat_map(|y| (0..out.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| out.get_pixel(x, y) != Some(background))
            .collect();
        assert!(!changed.is_empty());
        // Everything drawn sits in the bottom-right quadrant, inside the padding.
        assert!(changed.iter().all(|&(x, y)| x >= 100 && y >= 50 && x < 200 - 15 && y < 100 - 15));
        // Fill is lighter than the background, outline darker.
        assert!(out.pixels().iter().any(|p| p.r > 200));
        assert!(out.pixels().iter().any(|p| p.r < 100));
    }

    #[test]
    fn test_source_over() {
        let dst = Rgba([0, 0, 255, 255]);
        assert_eq!(source_over(dst, Rgba([255, 0, 0, 0])), dst);
        assert_eq!(source_over(dst, Rgba([255, 0, 0, 255])), Rgba([255, 0, 0, 255]));
        assert_eq!(source_over(Rgba([0, 0, 0, 0]), Rgba([10, 20, 30, 40])), Rgba([10, 20, 30, 40]));
    }
}
