//! The closed set of edits a session can apply.

use horizon_studio_render::{
    Adjustments, BlurKind, CropRect, ExportFormat, FilterKind, FlipAxis, WatermarkSpec,
};
use serde::{Deserialize, Serialize};

/// One user-facing edit.
///
/// Every variant maps to exactly one engine call and, on success, exactly
/// one history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Resample to exact dimensions with the session's resize filter.
    Resize { width: u32, height: u32 },
    /// Keep only the pixels inside a rectangle.
    Crop(CropRect),
    /// Crop a percentage from every side.
    CropInset { percent: u32 },
    /// Rotate clockwise by an arbitrary angle.
    Rotate { degrees: f64 },
    /// Mirror along an axis.
    Flip { axis: FlipAxis },
    /// Apply a color filter, optionally blended with the input.
    Filter {
        kind: FilterKind,
        #[serde(default = "full_intensity")]
        intensity: f32,
    },
    /// Brightness, contrast and saturation.
    Adjust(Adjustments),
    /// Gaussian or motion blur.
    Blur { radius: u32, kind: BlurKind },
    /// Draw watermark text.
    Watermark(WatermarkSpec),
    /// Round-trip through an encoder and keep the decoded result. Only JPEG
    /// is lossy; the other formats commit identical pixels.
    Compress { format: ExportFormat, quality: f32 },
}

fn full_intensity() -> f32 {
    1.0
}

impl Operation {
    /// Short, static name of the operation kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Resize { .. } => "resize",
            Operation::Crop(_) => "crop",
            Operation::CropInset { .. } => "crop-inset",
            Operation::Rotate { .. } => "rotate",
            Operation::Flip { .. } => "flip",
            Operation::Filter { .. } => "filter",
            Operation::Adjust(_) => "adjust",
            Operation::Blur { .. } => "blur",
            Operation::Watermark(_) => "watermark",
            Operation::Compress { .. } => "compress",
        }
    }

    /// History label, e.g. `rotate-90` or `filter-sepia`.
    pub fn label(&self) -> String {
        match self {
            Operation::Resize { width, height } => format!("resize-{width}x{height}"),
            Operation::Crop(rect) => format!("crop-{rect}"),
            Operation::CropInset { percent } => format!("crop-inset-{percent}"),
            Operation::Rotate { degrees } => format!("rotate-{degrees}"),
            Operation::Flip { axis } => match axis {
                FlipAxis::Horizontal => "flip-horizontal".to_string(),
                FlipAxis::Vertical => "flip-vertical".to_string(),
            },
            Operation::Filter { kind, .. } => format!("filter-{kind}"),
            Operation::Adjust(_) => "adjust".to_string(),
            Operation::Blur { kind, .. } => format!("blur-{kind}"),
            Operation::Watermark(_) => "watermark".to_string(),
            Operation::Compress { format, .. } => format!("compress-{format}"),
        }
    }
}
