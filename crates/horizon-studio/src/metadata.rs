//! Read-only facts about a buffer, for display next to the canvas.

use std::fmt;

use horizon_studio_render::{Codec, ExportFormat, ImageFormat, PixelBuffer, RenderResult};
use serde::Serialize;

/// Color model of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColorSpace {
    #[serde(rename = "RGB")]
    Rgb,
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorSpace::Rgb => f.write_str("RGB"),
        }
    }
}

/// Summary of a buffer and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// Size of the buffer encoded as PNG, in bytes.
    pub approximate_byte_size: usize,
    pub color_space: ColorSpace,
    /// Whether any pixel is not fully opaque.
    pub has_transparency: bool,
    /// Format the session was opened from, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_format: Option<String>,
}

impl ImageMetadata {
    /// Describe `buffer`. Encoding it as PNG is the only costly step.
    pub fn describe(
        buffer: &PixelBuffer,
        source_format: Option<ImageFormat>,
        codec: &Codec,
    ) -> RenderResult<Self> {
        let png = codec.encode(buffer, ExportFormat::Png, 1.0)?;
        Ok(Self {
            width: buffer.width(),
            height: buffer.height(),
            approximate_byte_size: png.len(),
            color_space: ColorSpace::Rgb,
            has_transparency: buffer.pixels().iter().any(|p| p.a < 255),
            source_format: source_format.map(format_name),
        })
    }

    /// Human-readable size, e.g. `12.3 KB`.
    pub fn display_size(&self) -> String {
        let bytes = self.approximate_byte_size as f64;
        if bytes < 1024.0 {
            format!("{} B", self.approximate_byte_size)
        } else if bytes < 1024.0 * 1024.0 {
            format!("{:.1} KB", bytes / 1024.0)
        } else {
            format!("{:.2} MB", bytes / (1024.0 * 1024.0))
        }
    }
}

fn format_name(format: ImageFormat) -> String {
    format
        .extensions_str()
        .first()
        .map(|ext| ext.to_string())
        .unwrap_or_else(|| format!("{format:?}").to_ascii_lowercase())
}
