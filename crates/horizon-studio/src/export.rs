//! Export results and file naming.

use chrono::{DateTime, Utc};
use horizon_studio_render::{ExportFormat, ImageFormat};

/// Bytes produced by an export, with what they contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedImage {
    pub bytes: Vec<u8>,
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
}

impl ExportedImage {
    #[inline]
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Default export format for a source format: JPEG and WebP sources export
/// as themselves, everything else as PNG.
pub fn preferred_export_format(source: Option<ImageFormat>) -> ExportFormat {
    match source {
        Some(ImageFormat::Jpeg) => ExportFormat::Jpeg,
        Some(ImageFormat::WebP) => ExportFormat::WebP,
        _ => ExportFormat::Png,
    }
}

/// `<prefix>-<operation>-<unix-millis>.<ext>` using the current time.
pub fn suggested_file_name(prefix: &str, operation: &str, format: ExportFormat) -> String {
    suggested_file_name_at(prefix, operation, format, Utc::now())
}

/// Like [`suggested_file_name`] with an explicit timestamp.
pub fn suggested_file_name_at(
    prefix: &str,
    operation: &str,
    format: ExportFormat,
    at: DateTime<Utc>,
) -> String {
    format!(
        "{}-{}-{}.{}",
        slug(prefix),
        slug(operation),
        at.timestamp_millis(),
        format.extension()
    )
}

/// Lowercase ASCII alphanumerics separated by single dashes.
fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        out.push_str("image");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_preferred_format() {
        assert_eq!(preferred_export_format(Some(ImageFormat::Jpeg)), ExportFormat::Jpeg);
        assert_eq!(preferred_export_format(Some(ImageFormat::WebP)), ExportFormat::WebP);
        assert_eq!(preferred_export_format(Some(ImageFormat::Gif)), ExportFormat::Png);
        assert_eq!(preferred_export_format(None), ExportFormat::Png);
    }

    #[test]
    fn test_file_name() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(
            suggested_file_name_at("horizon-studio", "rotate-12.5", ExportFormat::Jpeg, at),
            "horizon-studio-rotate-12-5-1700000000123.jpg"
        );
        assert_eq!(
            suggested_file_name_at("My Shots", "crop-3x4+1+2", ExportFormat::Png, at),
            "my-shots-crop-3x4-1-2-1700000000123.png"
        );
        assert_eq!(
            suggested_file_name_at("x", "***", ExportFormat::WebP, at),
            "x-image-1700000000123.webp"
        );
    }

    #[test]
    fn test_current_time_name() {
        let name = suggested_file_name("studio", "open", ExportFormat::Png);
        assert!(name.starts_with("studio-open-"));
        assert!(name.ends_with(".png"));
    }
}
