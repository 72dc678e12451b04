//! Error types for the render crate.

use thiserror::Error;

use crate::types::CropRect;

/// Errors that can occur while decoding, transforming or encoding pixel buffers.
///
/// Every engine operation either returns a complete new buffer or one of these
/// errors; there is no partially applied state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The input bytes are not a recognized raster format, are malformed, or
    /// exceed the configured decode limits.
    #[error("failed to decode image: {0}")]
    Decode(String),

    /// The requested export format is not one of the supported targets.
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// A rectangle does not fit inside the buffer it was applied to.
    #[error("rectangle {rect} lies outside the {width}x{height} buffer")]
    OutOfBounds {
        rect: CropRect,
        width: u32,
        height: u32,
    },

    /// A parameter is zero, negative, non-finite or outside its allowed range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The encoder failed to produce output.
    #[error("failed to encode image: {0}")]
    Encode(String),
}

impl RenderError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Returns true for errors caused by the caller's arguments rather than by
    /// the image data itself.
    pub fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::OutOfBounds { .. } | Self::UnsupportedFormat(_)
        )
    }
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
