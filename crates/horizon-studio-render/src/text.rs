//! Text rasterization for the compositor.
//!
//! The compositor only needs an 8-bit coverage mask and a little layout
//! information, so text rendering sits behind the [`TextRasterizer`] trait.
//! [`CosmicTextRasterizer`] is the production implementation; tests and
//! headless environments without fonts can supply their own.

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, SwashCache, Weight};
use image::{GrayImage, Luma};

use crate::error::{RenderError, RenderResult};

const TARGET: &str = "horizon_studio_render::text";

/// Line height as a multiple of the font size.
const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Largest coverage mask, in pixels, a single run of text may produce.
const MAX_MASK_AREA: u64 = 1 << 26;

/// A rasterized run of text.
///
/// `coverage` holds per-pixel ink coverage. The pen starts at
/// `(origin_x, baseline_y)` inside the mask and advances `advance` pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMask {
    pub coverage: GrayImage,
    pub origin_x: i32,
    pub baseline_y: i32,
    pub advance: f32,
}

impl TextMask {
    /// Bounding box `(min_x, min_y, max_x, max_y)` of non-zero coverage,
    /// inclusive. `None` when the mask has no ink.
    pub fn ink_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, p) in self.coverage.enumerate_pixels() {
            if p.0[0] == 0 {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
        bounds
    }

    /// True when no pixel has any coverage.
    pub fn is_blank(&self) -> bool {
        self.coverage.pixels().all(|p| p.0[0] == 0)
    }
}

/// Turns a string into a coverage mask at a given pixel size.
///
/// Implementations render bold sans-serif text. Returning `Ok(None)` means
/// nothing could be drawn (no usable font, or only whitespace).
pub trait TextRasterizer: Send {
    fn rasterize(&mut self, text: &str, font_size: f32) -> RenderResult<Option<TextMask>>;
}

/// Configuration for [`CosmicTextRasterizer`].
#[derive(Debug, Clone)]
pub struct FontConfig {
    /// Whether to load system fonts when the font system is first needed.
    pub load_system_fonts: bool,
    /// Locale string for text shaping (e.g., "en-US").
    pub locale: String,
    /// Override for the generic sans-serif family.
    pub sans_serif_family: Option<String>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            load_system_fonts: true,
            locale: "en-US".to_string(),
            sans_serif_family: None,
        }
    }
}

impl FontConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to load system fonts.
    pub fn load_system_fonts(mut self, load: bool) -> Self {
        self.load_system_fonts = load;
        self
    }

    /// Set the locale for text shaping.
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Set the default sans-serif font family.
    pub fn sans_serif_family(mut self, family: impl Into<String>) -> Self {
        self.sans_serif_family = Some(family.into());
        self
    }
}

/// [`TextRasterizer`] backed by cosmic-text and swash.
///
/// The font system is created lazily on the first call, since loading system
/// fonts can take around a second.
pub struct CosmicTextRasterizer {
    config: FontConfig,
    font_system: Option<FontSystem>,
    pending_fonts: Vec<Vec<u8>>,
    swash_cache: SwashCache,
}

impl CosmicTextRasterizer {
    pub fn new() -> Self {
        Self::with_config(FontConfig::default())
    }

    pub fn with_config(config: FontConfig) -> Self {
        Self {
            config,
            font_system: None,
            pending_fonts: Vec::new(),
            swash_cache: SwashCache::new(),
        }
    }

    /// Register font file data (TTF/OTF) in addition to any system fonts.
    pub fn load_font_data(&mut self, data: Vec<u8>) {
        match self.font_system.as_mut() {
            Some(fs) => fs.db_mut().load_font_data(data),
            None => self.pending_fonts.push(data),
        }
    }

    fn font_system<'a>(
        config: &FontConfig,
        slot: &'a mut Option<FontSystem>,
        pending: &mut Vec<Vec<u8>>,
    ) -> &'a mut FontSystem {
        let fs = slot.get_or_insert_with(|| {
            tracing::debug!(
                target: TARGET,
                load_system_fonts = config.load_system_fonts,
                "creating font system"
            );
            let mut inner = if config.load_system_fonts {
                FontSystem::new()
            } else {
                FontSystem::new_with_locale_and_db(config.locale.clone(), fontdb::Database::new())
            };
            if let Some(ref family) = config.sans_serif_family {
                inner.db_mut().set_sans_serif_family(family);
            }
            inner
        });
        for data in pending.drain(..) {
            fs.db_mut().load_font_data(data);
        }
        fs
    }
}

impl Default for CosmicTextRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CosmicTextRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CosmicTextRasterizer")
            .field("config", &self.config)
            .field("font_system_loaded", &self.font_system.is_some())
            .finish()
    }
}

impl TextRasterizer for CosmicTextRasterizer {
    fn rasterize(&mut self, text: &str, font_size: f32) -> RenderResult<Option<TextMask>> {
        let Self {
            config,
            font_system,
            pending_fonts,
            swash_cache,
        } = self;
        let fs = Self::font_system(config, font_system, pending_fonts);

        let attrs = Attrs::new().family(Family::SansSerif).weight(Weight::BOLD);
        if fs.get_font_matches(attrs).is_empty() {
            tracing::warn!(target: TARGET, faces = fs.db().len(), "no usable font for text");
            return Ok(None);
        }

        let metrics = Metrics::new(font_size, font_size * LINE_HEIGHT_FACTOR);
        let mut buffer = Buffer::new(fs, metrics);
        buffer.set_size(fs, None, None);
        buffer.set_text(fs, text, attrs, Shaping::Advanced);
        buffer.shape_until_scroll(fs, false);

        let mut advance = 0.0f32;
        let mut baseline = None;
        let mut bottom = 0.0f32;
        for run in buffer.layout_runs() {
            advance = advance.max(run.line_w);
            baseline.get_or_insert(run.line_y);
            bottom = bottom.max(run.line_top + metrics.line_height);
        }
        let Some(baseline) = baseline else {
            return Ok(None);
        };

        // Glyph ink can overhang the advance box (italics, bearings, tall
        // diacritics), so pad the canvas on every side.
        let margin = (font_size * 0.5).ceil() as i32 + 2;
        let (width, height) = mask_dimensions(advance, bottom, margin)?;
        let mut coverage = GrayImage::new(width, height);

        buffer.draw(
            fs,
            swash_cache,
            cosmic_text::Color::rgb(255, 255, 255),
            |x, y, w, h, color| {
                let alpha = color.a();
                if alpha == 0 {
                    return;
                }
                for dy in 0..h as i32 {
                    for dx in 0..w as i32 {
                        let px = x + dx + margin;
                        let py = y + dy + margin;
                        if px < 0 || py < 0 || px >= width as i32 || py >= height as i32 {
                            continue;
                        }
                        let p = coverage.get_pixel_mut(px as u32, py as u32);
                        p.0[0] = p.0[0].max(alpha);
                    }
                }
            },
        );

        let mask = TextMask {
            coverage,
            origin_x: margin,
            baseline_y: margin + baseline.round() as i32,
            advance,
        };
        if mask.is_blank() {
            tracing::debug!(target: TARGET, text, "text produced no visible glyphs");
            return Ok(None);
        }
        Ok(Some(mask))
    }
}

/// Canvas size for a run `advance` wide and `bottom` tall plus `margin` on
/// every side, bounded by [`MAX_MASK_AREA`].
fn mask_dimensions(advance: f32, bottom: f32, margin: i32) -> RenderResult<(u32, u32)> {
    let pad = 2.0 * margin as f64;
    let width = (advance.ceil() as f64 + pad).max(1.0);
    let height = (bottom.ceil() as f64 + pad).max(1.0);
    if width * height > MAX_MASK_AREA as f64 {
        return Err(RenderError::invalid(
            "text",
            format!("rendered text would need a {width}x{height} mask"),
        ));
    }
    Ok((width as u32, height as u32))
}

/// Grow every inked pixel of `mask` into a square of side `2 * radius + 1`,
/// keeping the maximum coverage.
pub(crate) fn dilate(mask: &GrayImage, radius: u32) -> GrayImage {
    let (w, h) = mask.dimensions();
    let r = radius as i64;
    GrayImage::from_fn(w, h, |x, y| {
        let mut best = 0u8;
        for dy in -r..=r {
            let sy = y as i64 + dy;
            if sy < 0 || sy >= h as i64 {
                continue;
            }
            for dx in -r..=r {
                let sx = x as i64 + dx;
                if sx < 0 || sx >= w as i64 {
                    continue;
                }
                best = best.max(mask.get_pixel(sx as u32, sy as u32).0[0]);
            }
        }
        Luma([best])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot_mask() -> TextMask {
        let mut coverage = GrayImage::new(7, 7);
        coverage.put_pixel(3, 3, Luma([200]));
        TextMask {
            coverage,
            origin_x: 0,
            baseline_y: 6,
            advance: 7.0,
        }
    }

    #[test]
    fn test_ink_bounds() {
        let mask = dot_mask();
        assert_eq!(mask.ink_bounds(), Some((3, 3, 3, 3)));
        assert!(!mask.is_blank());

        let blank = TextMask {
            coverage: GrayImage::new(3, 3),
            ..dot_mask()
        };
        assert_eq!(blank.ink_bounds(), None);
        assert!(blank.is_blank());
    }

    #[test]
    fn test_dilate() {
        let grown = dilate(&dot_mask().coverage, 1);
        assert_eq!(
            TextMask {
                coverage: grown.clone(),
                ..dot_mask()
            }
            .ink_bounds(),
            Some((2, 2, 4, 4))
        );
        assert_eq!(grown.get_pixel(2, 4).0[0], 200);
        assert_eq!(grown.get_pixel(1, 3).0[0], 0);
    }

    #[test]
    fn test_rasterizer_empty_text_draws_nothing() {
        let mut rasterizer =
            CosmicTextRasterizer::with_config(FontConfig::new().load_system_fonts(false));
        assert!(rasterizer.font_system.is_none());
        assert_eq!(rasterizer.rasterize("", 24.0).unwrap(), None);
        assert!(rasterizer.font_system.is_some());
    }

    const TEST_FONT: &[u8] = include_bytes!("../tests/fonts/Tuffy.ttf");

    fn bundled_font_rasterizer() -> CosmicTextRasterizer {
        let mut rasterizer =
            CosmicTextRasterizer::with_config(FontConfig::new().load_system_fonts(false));
        rasterizer.load_font_data(TEST_FONT.to_vec());
        rasterizer
    }

    #[test]
    fn test_rasterizer_without_fonts_draws_nothing() {
        let mut rasterizer =
            CosmicTextRasterizer::with_config(FontConfig::new().load_system_fonts(false));
        assert_eq!(rasterizer.rasterize("A", 24.0).unwrap(), None);
        assert_eq!(rasterizer.rasterize("Hello", 1.0e10).unwrap(), None);
    }

    #[test]
    fn test_rasterize_with_bundled_font() {
        let mut rasterizer = bundled_font_rasterizer();
        let mask = rasterizer.rasterize("Hello", 32.0).unwrap().unwrap();

        assert!(mask.advance > 32.0 && mask.advance < 5.0 * 32.0, "advance {}", mask.advance);
        assert!(mask.origin_x > 0);
        let (x0, y0, x1, y1) = mask.ink_bounds().unwrap();
        // Ink starts near the pen and sits mostly above the baseline.
        assert!(x0 as i32 >= mask.origin_x - 4);
        assert!((x1 as f32) < mask.origin_x as f32 + mask.advance + 4.0);
        assert!((y0 as i32) < mask.baseline_y);
        assert!(y1 as i32 <= mask.baseline_y + 2);
        // Cap height of a 32px font is well over a third of the size.
        assert!(mask.baseline_y - y0 as i32 > 10);
    }

    #[test]
    fn test_rasterize_scales_with_font_size() {
        let mut rasterizer = bundled_font_rasterizer();
        let small = rasterizer.rasterize("Mark", 16.0).unwrap().unwrap();
        let large = rasterizer.rasterize("Mark", 48.0).unwrap().unwrap();
        assert!(large.advance > 2.0 * small.advance);
        assert!(large.coverage.height() > small.coverage.height());
    }

    #[test]
    fn test_rasterize_whitespace_is_blank() {
        let mut rasterizer = bundled_font_rasterizer();
        assert_eq!(rasterizer.rasterize("   ", 24.0).unwrap(), None);
    }

    #[test]
    fn test_oversized_mask_rejected() {
        assert!(mask_dimensions(100.0, 30.0, 10).is_ok());
        assert!(matches!(
            mask_dimensions(1.0e9, 1.2e7, 5_000_002),
            Err(RenderError::InvalidParameter { name: "text", .. })
        ));
        assert!(mask_dimensions(f32::MAX, 10.0, 2).is_err());
    }

    #[test]
    fn test_rasterizer_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<CosmicTextRasterizer>();
    }
}
