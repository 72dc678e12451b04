//! Per-pixel color transforms.
//!
//! Every transform here reads one pixel and writes one pixel. Alpha is passed
//! through untouched and each output channel is rounded to the nearest
//! integer and clamped to `0..=255`. The formulas are part of the public
//! contract; golden-image tests depend on them.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;

use crate::buffer::PixelBuffer;
use crate::error::{RenderError, RenderResult};
use crate::types::Color;

const TARGET: &str = "horizon_studio_render::color";

/// Rec. 601 luma weights.
const LUMA: [f32; 3] = [0.299, 0.587, 0.114];

/// Standard sepia transform matrix, one row per output channel.
const SEPIA: [[f32; 3]; 3] = [
    [0.393, 0.769, 0.189],
    [0.349, 0.686, 0.168],
    [0.272, 0.534, 0.131],
];

/// A one-click color filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FilterKind {
    /// Rec. 601 luma replicated into all three channels.
    Grayscale,
    /// Classic sepia tone matrix.
    Sepia,
    /// `255 - c` per channel.
    Invert,
    /// Channel gains `(1.2, 0.9, 0.8)`.
    Vintage,
    /// Channel gains `(0.9, 1.0, 1.2)`.
    Cool,
    /// Channel gains `(1.2, 1.0, 0.8)`.
    Warm,
}

impl FilterKind {
    /// Every filter, in menu order.
    pub const ALL: [FilterKind; 6] = [
        FilterKind::Grayscale,
        FilterKind::Sepia,
        FilterKind::Invert,
        FilterKind::Vintage,
        FilterKind::Cool,
        FilterKind::Warm,
    ];

    /// Lowercase name, as used in history labels and settings files.
    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Grayscale => "grayscale",
            FilterKind::Sepia => "sepia",
            FilterKind::Invert => "invert",
            FilterKind::Vintage => "vintage",
            FilterKind::Cool => "cool",
            FilterKind::Warm => "warm",
        }
    }

    fn apply(self, [r, g, b]: [f32; 3]) -> [f32; 3] {
        match self {
            FilterKind::Grayscale => {
                let y = LUMA[0] * r + LUMA[1] * g + LUMA[2] * b;
                [y, y, y]
            }
            FilterKind::Sepia => SEPIA.map(|[kr, kg, kb]| kr * r + kg * g + kb * b),
            FilterKind::Invert => [255.0 - r, 255.0 - g, 255.0 - b],
            FilterKind::Vintage => [r * 1.2, g * 0.9, b * 0.8],
            FilterKind::Cool => [r * 0.9, g, b * 1.2],
            FilterKind::Warm => [r * 1.2, g, b * 0.8],
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        FilterKind::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or_else(|| RenderError::invalid("filter", format!("unknown filter `{s}`")))
    }
}

/// Brightness, contrast and saturation offsets, each in `-100..=100`.
///
/// Zero means "leave this stage out". The stages run in the order
/// brightness, contrast, saturation, each on the rounded output of the
/// previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Adjustments {
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
}

impl Adjustments {
    /// Smallest accepted value for any field.
    pub const MIN: i32 = -100;
    /// Largest accepted value for any field.
    pub const MAX: i32 = 100;

    pub fn new(brightness: i32, contrast: i32, saturation: i32) -> Self {
        Self {
            brightness,
            contrast,
            saturation,
        }
    }

    /// True when every stage would be skipped.
    pub fn is_identity(&self) -> bool {
        self.brightness == 0 && self.contrast == 0 && self.saturation == 0
    }

    /// Check every field lies in `MIN..=MAX`.
    pub fn validate(&self) -> RenderResult<()> {
        for (name, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("saturation", self.saturation),
        ] {
            if !(Self::MIN..=Self::MAX).contains(&value) {
                return Err(RenderError::invalid(
                    name,
                    format!("{value} is outside {}..={}", Self::MIN, Self::MAX),
                ));
            }
        }
        Ok(())
    }

    fn factor(value: i32) -> f32 {
        (100 + value) as f32 / 100.0
    }
}

/// Per-channel value counts of a buffer.
#[derive(Clone, PartialEq, Eq)]
pub struct Histogram {
    pub red: [u32; 256],
    pub green: [u32; 256],
    pub blue: [u32; 256],
    /// Counts of the rounded Rec. 601 luma.
    pub luminance: [u32; 256],
}

impl Histogram {
    fn empty() -> Self {
        Self {
            red: [0; 256],
            green: [0; 256],
            blue: [0; 256],
            luminance: [0; 256],
        }
    }

    fn add(&mut self, c: Color) {
        self.red[c.r as usize] += 1;
        self.green[c.g as usize] += 1;
        self.blue[c.b as usize] += 1;
        let y = luma(c.r as f32, c.g as f32, c.b as f32);
        self.luminance[quantize(y) as usize] += 1;
    }

    fn merge(mut self, other: Self) -> Self {
        for i in 0..256 {
            self.red[i] += other.red[i];
            self.green[i] += other.green[i];
            self.blue[i] += other.blue[i];
            self.luminance[i] += other.luminance[i];
        }
        self
    }

    /// Number of pixels counted.
    pub fn total(&self) -> u64 {
        self.luminance.iter().map(|&n| n as u64).sum()
    }

    /// Mean luma in `0.0..=255.0`, or zero for an empty histogram.
    pub fn mean_luminance(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted: f64 = self
            .luminance
            .iter()
            .enumerate()
            .map(|(v, &n)| v as f64 * n as f64)
            .sum();
        weighted / total as f64
    }
}

impl fmt::Debug for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Histogram")
            .field("total", &self.total())
            .field("mean_luminance", &self.mean_luminance())
            .finish()
    }
}

impl PixelBuffer {
    // ========================================================================
    // FILTERS
    // ========================================================================

    /// Apply a one-click filter at full strength.
    #[must_use]
    pub fn apply_filter(&self, kind: FilterKind) -> Self {
        tracing::debug!(target: TARGET, filter = kind.name(), "apply filter");
        self.map_pixels(|c| filter_pixel(kind, c))
    }

    /// Apply a filter blended with the input.
    ///
    /// `intensity` linearly mixes the quantized filter result with the source
    /// pixel: `1.0` equals [`apply_filter`](Self::apply_filter) exactly and
    /// `0.0` returns an identical copy.
    pub fn apply_filter_with_intensity(&self, kind: FilterKind, intensity: f32) -> RenderResult<Self> {
        if !(0.0..=1.0).contains(&intensity) {
            return Err(RenderError::invalid(
                "intensity",
                format!("{intensity} is outside 0.0..=1.0"),
            ));
        }
        if intensity == 1.0 {
            return Ok(self.apply_filter(kind));
        }
        if intensity == 0.0 {
            return Ok(self.clone());
        }
        tracing::debug!(target: TARGET, filter = kind.name(), intensity, "apply filter");
        Ok(self.map_pixels(|c| {
            let f = filter_pixel(kind, c);
            let mix = |s: u8, d: u8| quantize(s as f32 + (d as f32 - s as f32) * intensity);
            Color::from_rgba8(mix(c.r, f.r), mix(c.g, f.g), mix(c.b, f.b), c.a)
        }))
    }

    /// Convert to grayscale.
    #[must_use]
    pub fn to_grayscale(&self) -> Self {
        self.apply_filter(FilterKind::Grayscale)
    }

    /// Apply the sepia tone matrix.
    #[must_use]
    pub fn sepia(&self) -> Self {
        self.apply_filter(FilterKind::Sepia)
    }

    /// Invert the color channels.
    #[must_use]
    pub fn invert(&self) -> Self {
        self.apply_filter(FilterKind::Invert)
    }

    // ========================================================================
    // ADJUSTMENTS
    // ========================================================================

    /// Apply brightness, contrast and saturation.
    ///
    /// Brightness multiplies channels by `(100 + b) / 100`. Contrast maps
    /// `c` to `(c - 128) * (100 + k) / 100 + 128`. Saturation scales HSL
    /// saturation by `(100 + s) / 100`. All-zero adjustments return an
    /// identical copy.
    pub fn adjust(&self, adjustments: Adjustments) -> RenderResult<Self> {
        adjustments.validate()?;
        if adjustments.is_identity() {
            return Ok(self.clone());
        }
        tracing::debug!(target: TARGET, ?adjustments, "adjust");

        let brightness = (adjustments.brightness != 0).then(|| Adjustments::factor(adjustments.brightness));
        let contrast = (adjustments.contrast != 0).then(|| Adjustments::factor(adjustments.contrast));
        let saturation = (adjustments.saturation != 0).then(|| Adjustments::factor(adjustments.saturation));

        Ok(self.map_pixels(|c| {
            let mut rgb = [c.r, c.g, c.b];
            if let Some(f) = brightness {
                rgb = rgb.map(|v| quantize(v as f32 * f));
            }
            if let Some(f) = contrast {
                rgb = rgb.map(|v| quantize((v as f32 - 128.0) * f + 128.0));
            }
            if let Some(f) = saturation {
                rgb = saturate(rgb, f);
            }
            Color::from_rgba8(rgb[0], rgb[1], rgb[2], c.a)
        }))
    }

    // ========================================================================
    // ANALYSIS
    // ========================================================================

    /// Count channel and luma values over every pixel.
    pub fn histogram(&self) -> Histogram {
        self.as_raw()
            .par_chunks(self.row_stride())
            .fold(Histogram::empty, |mut hist, row| {
                let row: &[Color] = bytemuck::cast_slice(row);
                for &c in row {
                    hist.add(c);
                }
                hist
            })
            .reduce(Histogram::empty, Histogram::merge)
    }
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

#[inline]
fn quantize(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[inline]
fn luma(r: f32, g: f32, b: f32) -> f32 {
    LUMA[0] * r + LUMA[1] * g + LUMA[2] * b
}

fn filter_pixel(kind: FilterKind, c: Color) -> Color {
    let [r, g, b] = kind.apply([c.r as f32, c.g as f32, c.b as f32]);
    Color::from_rgba8(quantize(r), quantize(g), quantize(b), c.a)
}

fn saturate(rgb: [u8; 3], factor: f32) -> [u8; 3] {
    let [r, g, b] = rgb.map(|v| v as f32 / 255.0);
    let (h, s, l) = rgb_to_hsl(r, g, b);
    let (r, g, b) = hsl_to_rgb(h, (s * factor).clamp(0.0, 1.0), l);
    [quantize(r * 255.0), quantize(g * 255.0), quantize(b * 255.0)]
}

/// RGB (0..1) to HSL (all 0..1).
fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < 1e-6 {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };

    let h = if max == r {
        let h = (g - b) / d;
        if h < 0.0 { h + 6.0 } else { h }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (h / 6.0, s, l)
}

/// HSL (all 0..1) to RGB (0..1).
fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s.abs() < 1e-6 {
        return (l, l, l);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    (
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(c: Color) -> PixelBuffer {
        PixelBuffer::from_color(1, 1, c).unwrap()
    }

    fn first(buf: &PixelBuffer) -> Color {
        buf.get_pixel(0, 0).unwrap()
    }

    #[test]
    fn test_grayscale() {
        let out = pixel(Color::from_rgba8(100, 150, 200, 128)).to_grayscale();
        // 0.299*100 + 0.587*150 + 0.114*200 = 140.75
        assert_eq!(first(&out), Color::from_rgba8(141, 141, 141, 128));
    }

    #[test]
    fn test_grayscale_idempotent() {
        let buf = pixel(Color::from_rgb8(13, 200, 77)).to_grayscale();
        assert_eq!(buf.to_grayscale(), buf);
    }

    #[test]
    fn test_sepia() {
        let out = pixel(Color::from_rgb8(100, 100, 100)).sepia();
        // Rows sum to 1.351, 1.203, 0.937
        assert_eq!(first(&out), Color::from_rgb8(135, 120, 94));
        let bright = pixel(Color::WHITE).sepia();
        assert_eq!(first(&bright), Color::from_rgb8(255, 255, 239));
    }

    #[test]
    fn test_invert() {
        let buf = pixel(Color::from_rgba8(10, 20, 30, 40));
        let once = buf.invert();
        assert_eq!(first(&once), Color::from_rgba8(245, 235, 225, 40));
        assert_eq!(once.invert(), buf);
    }

    #[test]
    fn test_tone_presets() {
        let buf = pixel(Color::from_rgb8(100, 100, 100));
        assert_eq!(first(&buf.apply_filter(FilterKind::Vintage)), Color::from_rgb8(120, 90, 80));
        assert_eq!(first(&buf.apply_filter(FilterKind::Cool)), Color::from_rgb8(90, 100, 120));
        assert_eq!(first(&buf.apply_filter(FilterKind::Warm)), Color::from_rgb8(120, 100, 80));
        let hot = pixel(Color::from_rgb8(250, 0, 0)).apply_filter(FilterKind::Warm);
        assert_eq!(first(&hot).r, 255);
    }

    #[test]
    fn test_filter_intensity() {
        let buf = pixel(Color::from_rgb8(0, 100, 200));
        assert_eq!(
            buf.apply_filter_with_intensity(FilterKind::Invert, 1.0).unwrap(),
            buf.invert()
        );
        assert_eq!(buf.apply_filter_with_intensity(FilterKind::Invert, 0.0).unwrap(), buf);
        let half = buf.apply_filter_with_intensity(FilterKind::Invert, 0.5).unwrap();
        // 0 -> 255 at half is 127.5, 100 -> 155 is 127.5, 200 -> 55 is 127.5
        assert_eq!(first(&half), Color::from_rgb8(128, 128, 128));
        assert!(buf.apply_filter_with_intensity(FilterKind::Invert, 1.5).is_err());
    }

    #[test]
    fn test_filter_names_parse() {
        for kind in FilterKind::ALL {
            assert_eq!(kind.name().parse::<FilterKind>().unwrap(), kind);
        }
        assert_eq!(" Sepia ".parse::<FilterKind>().unwrap(), FilterKind::Sepia);
        assert!("posterize".parse::<FilterKind>().is_err());
    }

    #[test]
    fn test_adjust_zero_is_identity() {
        let buf = pixel(Color::from_rgba8(3, 140, 251, 9));
        assert_eq!(buf.adjust(Adjustments::default()).unwrap(), buf);
    }

    #[test]
    fn test_adjust_brightness() {
        let buf = pixel(Color::from_rgb8(100, 200, 50));
        let out = buf.adjust(Adjustments::new(50, 0, 0)).unwrap();
        assert_eq!(first(&out), Color::from_rgb8(150, 255, 75));
        let dark = buf.adjust(Adjustments::new(-100, 0, 0)).unwrap();
        assert_eq!(first(&dark), Color::BLACK);
    }

    #[test]
    fn test_adjust_contrast() {
        let buf = pixel(Color::from_rgb8(28, 128, 228));
        let out = buf.adjust(Adjustments::new(0, 50, 0)).unwrap();
        assert_eq!(first(&out), Color::from_rgb8(0, 128, 255));
        let flat = buf.adjust(Adjustments::new(0, -100, 0)).unwrap();
        assert_eq!(first(&flat), Color::from_rgb8(128, 128, 128));
    }

    #[test]
    fn test_adjust_saturation() {
        let buf = pixel(Color::from_rgb8(200, 100, 100));
        let gray = buf.adjust(Adjustments::new(0, 0, -100)).unwrap();
        let c = first(&gray);
        assert_eq!((c.r, c.g, c.b), (150, 150, 150));
    }

    #[test]
    fn test_adjust_out_of_range() {
        let buf = pixel(Color::WHITE);
        let err = buf.adjust(Adjustments::new(0, 101, 0)).unwrap_err();
        assert!(matches!(err, RenderError::InvalidParameter { name: "contrast", .. }));
    }

    #[test]
    fn test_histogram() {
        let buf = PixelBuffer::from_color(4, 2, Color::RED).unwrap();
        let hist = buf.histogram();
        assert_eq!(hist.total(), 8);
        assert_eq!(hist.red[255], 8);
        assert_eq!(hist.green[0], 8);
        // 0.299 * 255 = 76.245
        assert_eq!(hist.luminance[76], 8);
    }
}
