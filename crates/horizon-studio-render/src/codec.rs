//! Decoding external image bytes and encoding buffers for export.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, Limits};

use crate::buffer::PixelBuffer;
use crate::error::{RenderError, RenderResult};

const TARGET: &str = "horizon_studio_render::codec";

/// Formats accepted as decode input.
const DECODABLE: [ImageFormat; 5] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::WebP,
    ImageFormat::Gif,
    ImageFormat::Bmp,
];

/// Export target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ExportFormat {
    /// PNG format (lossless).
    Png,
    /// JPEG format (lossy, no alpha).
    Jpeg,
    /// WebP format. Always written lossless: the encoder ignores `quality`,
    /// so re-encoding through WebP leaves pixels unchanged.
    WebP,
    /// BMP format.
    Bmp,
}

impl ExportFormat {
    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::WebP => "webp",
            ExportFormat::Bmp => "bmp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::WebP => "image/webp",
            ExportFormat::Bmp => "image/bmp",
        }
    }

    /// Whether the quality argument affects the output.
    pub fn is_lossy(self) -> bool {
        matches!(self, ExportFormat::Jpeg)
    }

    /// The matching export format for a decoded source format, if any.
    pub fn from_image_format(format: ImageFormat) -> Option<Self> {
        match format {
            ImageFormat::Png => Some(ExportFormat::Png),
            ImageFormat::Jpeg => Some(ExportFormat::Jpeg),
            ImageFormat::WebP => Some(ExportFormat::WebP),
            ImageFormat::Bmp => Some(ExportFormat::Bmp),
            _ => None,
        }
    }

    fn to_image_format(self) -> ImageFormat {
        match self {
            ExportFormat::Png => ImageFormat::Png,
            ExportFormat::Jpeg => ImageFormat::Jpeg,
            ExportFormat::WebP => ImageFormat::WebP,
            ExportFormat::Bmp => ImageFormat::Bmp,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = RenderError;

    /// Accepts extensions (`png`, `jpg`, `jpeg`, `webp`, `bmp`) and MIME
    /// types, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let name = lower.strip_prefix("image/").unwrap_or(&lower);
        match name {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpeg),
            "webp" => Ok(ExportFormat::WebP),
            "bmp" => Ok(ExportFormat::Bmp),
            _ => Err(RenderError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Upper bounds enforced while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecodeLimits {
    pub max_width: u32,
    pub max_height: u32,
    /// Maximum bytes the decoder may allocate.
    pub max_alloc: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_width: 16_384,
            max_height: 16_384,
            max_alloc: 512 * 1024 * 1024,
        }
    }
}

impl DecodeLimits {
    fn to_image_limits(self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_width);
        limits.max_image_height = Some(self.max_height);
        limits.max_alloc = Some(self.max_alloc);
        limits
    }
}

/// Decoder and encoder for pixel buffers.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    limits: DecodeLimits,
}

impl Codec {
    pub fn new(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> DecodeLimits {
        self.limits
    }

    /// Detect the raster format of `bytes` from its signature.
    pub fn probe_format(bytes: &[u8]) -> Option<ImageFormat> {
        image::guess_format(bytes).ok()
    }

    /// Decode PNG, JPEG, WebP, GIF or BMP bytes.
    pub fn decode(&self, bytes: &[u8]) -> RenderResult<PixelBuffer> {
        self.decode_with_format(bytes).map(|(buffer, _)| buffer)
    }

    /// Decode and also report the detected source format.
    ///
    /// Animated GIFs decode to their first frame.
    pub fn decode_with_format(&self, bytes: &[u8]) -> RenderResult<(PixelBuffer, ImageFormat)> {
        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| RenderError::Decode(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| RenderError::Decode("unrecognized image format".to_string()))?;
        if !DECODABLE.contains(&format) {
            return Err(RenderError::Decode(format!(
                "{format:?} input is not supported"
            )));
        }
        reader.limits(self.limits.to_image_limits());
        let image = reader.decode().map_err(|e| {
            tracing::warn!(target: TARGET, ?format, error = %e, "decode failed");
            RenderError::Decode(e.to_string())
        })?;
        if image.width() == 0 || image.height() == 0 {
            return Err(RenderError::Decode("image has zero area".to_string()));
        }
        tracing::debug!(
            target: TARGET,
            ?format,
            width = image.width(),
            height = image.height(),
            "decoded"
        );
        Ok((PixelBuffer::from_image_unchecked(image.into_rgba8()), format))
    }

    /// Encode `buffer` as `format`.
    ///
    /// `quality` must lie in `0.0..=1.0` for every format; only JPEG uses
    /// it. PNG, WebP and BMP are lossless. JPEG output drops the alpha
    /// channel.
    pub fn encode(&self, buffer: &PixelBuffer, format: ExportFormat, quality: f32) -> RenderResult<Vec<u8>> {
        if !(0.0..=1.0).contains(&quality) {
            return Err(RenderError::invalid(
                "quality",
                format!("{quality} is outside 0.0..=1.0"),
            ));
        }
        let mut out = Cursor::new(Vec::new());
        match format {
            ExportFormat::Jpeg => {
                let q = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
                let rgb = DynamicImage::ImageRgba8(buffer.as_image().clone()).to_rgb8();
                JpegEncoder::new_with_quality(&mut out, q)
                    .encode_image(&rgb)
                    .map_err(|e| RenderError::Encode(e.to_string()))?;
            }
            _ => {
                buffer
                    .as_image()
                    .write_to(&mut out, format.to_image_format())
                    .map_err(|e| RenderError::Encode(e.to_string()))?;
            }
        }
        let bytes = out.into_inner();
        tracing::debug!(
            target: TARGET,
            %format,
            quality,
            size = bytes.len(),
            "encoded"
        );
        Ok(bytes)
    }

    /// Encode with a format given by name (`"png"`, `"image/jpeg"`, ...).
    pub fn encode_named(&self, buffer: &PixelBuffer, format: &str, quality: f32) -> RenderResult<Vec<u8>> {
        self.encode(buffer, format.parse()?, quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color;

    fn sample() -> PixelBuffer {
        let mut data = Vec::new();
        for y in 0..6u8 {
            for x in 0..5u8 {
                data.extend_from_slice(&[x * 40, y * 40, 200, 255 - x * 10]);
            }
        }
        PixelBuffer::from_rgba(data, 5, 6).unwrap()
    }

    #[test]
    fn test_png_round_trip() {
        let codec = Codec::default();
        let buf = sample();
        let bytes = codec.encode(&buf, ExportFormat::Png, 1.0).unwrap();
        assert_eq!(Codec::probe_format(&bytes), Some(ImageFormat::Png));
        let (decoded, format) = codec.decode_with_format(&bytes).unwrap();
        assert_eq!(format, ImageFormat::Png);
        assert_eq!(decoded, buf);
    }

    #[test]
    fn test_png_is_deterministic() {
        let codec = Codec::default();
        let buf = sample();
        assert_eq!(
            codec.encode(&buf, ExportFormat::Png, 0.3).unwrap(),
            codec.encode(&buf, ExportFormat::Png, 0.9).unwrap()
        );
    }

    #[test]
    fn test_webp_is_lossless() {
        let codec = Codec::default();
        let buf = sample();
        let bytes = codec.encode(&buf, ExportFormat::WebP, 0.5).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), buf);
    }

    #[test]
    fn test_bmp_round_trip() {
        let codec = Codec::default();
        let buf = sample().map_pixels(|c| c.with_alpha(255));
        let bytes = codec.encode(&buf, ExportFormat::Bmp, 1.0).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), buf);
    }

    #[test]
    fn test_jpeg_preserves_dimensions() {
        let codec = Codec::default();
        let buf = PixelBuffer::from_color(33, 17, Color::from_rgba8(200, 30, 30, 100)).unwrap();
        let bytes = codec.encode(&buf, ExportFormat::Jpeg, 0.8).unwrap();
        let (decoded, format) = codec.decode_with_format(&bytes).unwrap();
        assert_eq!(format, ImageFormat::Jpeg);
        assert_eq!(decoded.dimensions(), (33, 17));
        assert_eq!(decoded.get_pixel(0, 0).unwrap().a, 255);
    }

    #[test]
    fn test_quality_out_of_range() {
        let codec = Codec::default();
        let buf = sample();
        for q in [-0.1, 1.1, f32::NAN] {
            assert!(matches!(
                codec.encode(&buf, ExportFormat::Jpeg, q),
                Err(RenderError::InvalidParameter { name: "quality", .. })
            ));
        }
    }

    #[test]
    fn test_format_names() {
        assert_eq!("PNG".parse::<ExportFormat>().unwrap(), ExportFormat::Png);
        assert_eq!("jpeg".parse::<ExportFormat>().unwrap(), ExportFormat::Jpeg);
        assert_eq!("image/webp".parse::<ExportFormat>().unwrap(), ExportFormat::WebP);
        assert_eq!(ExportFormat::Jpeg.extension(), "jpg");
        assert!(ExportFormat::Jpeg.is_lossy());
        assert!(!ExportFormat::WebP.is_lossy());
        let err = Codec::default()
            .encode_named(&sample(), "tiff", 1.0)
            .unwrap_err();
        assert_eq!(err, RenderError::UnsupportedFormat("tiff".to_string()));
    }

    #[test]
    fn test_decode_garbage() {
        let codec = Codec::default();
        assert!(matches!(codec.decode(b"not an image"), Err(RenderError::Decode(_))));
        assert!(matches!(codec.decode(&[]), Err(RenderError::Decode(_))));
    }

    #[test]
    fn test_decode_truncated_png() {
        let codec = Codec::default();
        let bytes = codec.encode(&sample(), ExportFormat::Png, 1.0).unwrap();
        assert!(matches!(
            codec.decode(&bytes[..bytes.len() / 2]),
            Err(RenderError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_limits() {
        let codec = Codec::new(DecodeLimits {
            max_width: 4,
            ..DecodeLimits::default()
        });
        let bytes = Codec::default().encode(&sample(), ExportFormat::Png, 1.0).unwrap();
        assert!(matches!(codec.decode(&bytes), Err(RenderError::Decode(_))));
    }
}
