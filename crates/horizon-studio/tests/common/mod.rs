//! Shared fixtures for session tests.

#![allow(dead_code)]

use horizon_studio::render::{RenderResult, TextMask, TextRasterizer};
use horizon_studio::{Color, EditSession, EditorSettings, PixelBuffer};
use image::GrayImage;

/// Draws each non-whitespace character as a solid square of half the font
/// size, so tests do not depend on installed fonts.
#[derive(Debug, Default)]
pub struct BlockRasterizer;

impl TextRasterizer for BlockRasterizer {
    fn rasterize(&mut self, text: &str, font_size: f32) -> RenderResult<Option<TextMask>> {
        const MARGIN: u32 = 2;
        let glyph = ((font_size / 2.0) as u32).max(1);
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

/// Deterministic opaque gradient with some structure in both axes.
pub fn gradient(width: u32, height: u32) -> PixelBuffer {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                ((x * 7 + y * 13) % 256) as u8,
                255,
            ]);
        }
    }
    PixelBuffer::from_rgba(data, width, height).unwrap()
}

pub fn session_with(buffer: PixelBuffer, settings: EditorSettings) -> EditSession {
    EditSession::from_buffer(buffer, settings)
        .unwrap()
        .with_rasterizer(BlockRasterizer)
}

pub fn gradient_session() -> EditSession {
    session_with(gradient(64, 48), EditorSettings::default())
}

pub fn solid_session(width: u32, height: u32, color: Color) -> EditSession {
    session_with(
        PixelBuffer::from_color(width, height, color).unwrap(),
        EditorSettings::default(),
    )
}

/// Route tracing output through the test harness. Honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
