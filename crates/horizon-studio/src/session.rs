//! The editing session: a decoded original, its history and the operation
//! surface.
//!
//! [`EditSession`] is the only stateful component. Every operation runs an
//! engine on the current snapshot and, when the engine succeeds, commits the
//! result as a new history entry. A failed operation leaves the session
//! exactly as it was.

use std::sync::Arc;

use horizon_studio_render::{
    Adjustments, BlurKind, Codec, CosmicTextRasterizer, CropRect, ExportFormat, FilterKind,
    FlipAxis, Histogram, ImageFormat, PixelBuffer, RenderError, RenderResult, TextRasterizer,
    WatermarkSpec, rotated_dimensions,
};

use crate::error::SessionResult;
use crate::export::{preferred_export_format, suggested_file_name, ExportedImage};
use crate::history::{HistoryConfig, HistoryEntry, HistoryManager};
use crate::logging::{span_names, targets, PerfSpan};
use crate::metadata::ImageMetadata;
use crate::operation::Operation;
use crate::settings::EditorSettings;

/// Label of the first history entry.
pub const OPEN_LABEL: &str = "open";
/// Label of entries committed by [`EditSession::reset`].
pub const RESET_LABEL: &str = "reset";

/// State after an operation, undo, redo or reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub width: u32,
    pub height: u32,
    /// Label of the entry that is now current.
    pub label: String,
    pub history_len: usize,
    pub cursor: usize,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// An open image with its undo/redo history.
pub struct EditSession {
    original: Arc<PixelBuffer>,
    source_format: Option<ImageFormat>,
    history: HistoryManager,
    settings: EditorSettings,
    codec: Codec,
    rasterizer: Box<dyn TextRasterizer>,
}

impl std::fmt::Debug for EditSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditSession")
            .field("original", &self.original.dimensions())
            .field("source_format", &self.source_format)
            .field("history_len", &self.history.len())
            .field("cursor", &self.history.cursor())
            .finish_non_exhaustive()
    }
}

impl EditSession {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Decode `bytes` and open a session with default settings.
    pub fn open(bytes: &[u8]) -> SessionResult<Self> {
        Self::open_with_settings(bytes, EditorSettings::default())
    }

    /// Decode `bytes` and open a session with `settings`.
    pub fn open_with_settings(bytes: &[u8], settings: EditorSettings) -> SessionResult<Self> {
        settings.validate()?;
        let codec = Codec::new(settings.decode_limits);
        let (buffer, format) = codec.decode_with_format(bytes)?;
        tracing::info!(
            target: targets::SESSION,
            format = ?format,
            width = buffer.width(),
            height = buffer.height(),
            "opened image"
        );
        Ok(Self::build(buffer, Some(format), settings, codec))
    }

    /// Open a session on an already decoded buffer.
    pub fn from_buffer(buffer: PixelBuffer, settings: EditorSettings) -> SessionResult<Self> {
        settings.validate()?;
        let codec = Codec::new(settings.decode_limits);
        Ok(Self::build(buffer, None, settings, codec))
    }

    fn build(
        buffer: PixelBuffer,
        source_format: Option<ImageFormat>,
        settings: EditorSettings,
        codec: Codec,
    ) -> Self {
        let original = Arc::new(buffer);
        let config = match settings.history_capacity {
            Some(max) => HistoryConfig::with_limit(max),
            None => HistoryConfig::unlimited(),
        };
        let history = HistoryManager::new(HistoryEntry::new(original.clone(), OPEN_LABEL), config);
        Self {
            original,
            source_format,
            history,
            settings,
            codec,
            rasterizer: Box::new(CosmicTextRasterizer::new()),
        }
    }

    /// Replace the text rasterizer used by watermarks.
    pub fn with_rasterizer(mut self, rasterizer: impl TextRasterizer + 'static) -> Self {
        self.rasterizer = Box::new(rasterizer);
        self
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Run `op` on the current snapshot and commit the result.
    #[tracing::instrument(skip(self), target = "horizon_studio::session", level = "debug")]
    pub fn apply(&mut self, op: Operation) -> RenderResult<EditOutcome> {
        let _perf = PerfSpan::new(span_names::OPERATION, op.kind());
        match self.run(&op) {
            Ok(buffer) => {
                self.history.push(HistoryEntry::new(Arc::new(buffer), op.label()));
                let outcome = self.outcome();
                tracing::debug!(
                    target: targets::SESSION,
                    label = %outcome.label,
                    width = outcome.width,
                    height = outcome.height,
                    "committed operation"
                );
                Ok(outcome)
            }
            Err(err) => {
                tracing::warn!(target: targets::SESSION, op = op.kind(), error = %err, "operation rejected");
                Err(err)
            }
        }
    }

    fn run(&mut self, op: &Operation) -> RenderResult<PixelBuffer> {
        let current = self.history.current().buffer().clone();
        let out = match op {
            Operation::Resize { width, height } => {
                self.check_dimensions(*width, *height)?;
                current.resize(*width, *height, self.settings.resize_filter)?
            }
            Operation::Crop(rect) => current.crop(*rect)?,
            Operation::CropInset { percent } => current.crop_inset(*percent)?,
            Operation::Rotate { degrees } => {
                let (width, height) = rotated_dimensions(current.width(), current.height(), *degrees)?;
                self.check_dimensions(width, height)?;
                current.rotate(*degrees)?
            }
            Operation::Flip { axis } => current.flip(*axis),
            Operation::Filter { kind, intensity } => {
                current.apply_filter_with_intensity(*kind, *intensity)?
            }
            Operation::Adjust(adjustments) => current.adjust(*adjustments)?,
            Operation::Blur { radius, kind } => {
                if *radius > self.settings.max_blur_radius {
                    return Err(RenderError::InvalidParameter {
                        name: "radius",
                        reason: format!(
                            "{radius} exceeds the configured maximum of {}",
                            self.settings.max_blur_radius
                        ),
                    });
                }
                current.blur(*radius, *kind)?
            }
            Operation::Watermark(spec) => {
                let max = self.settings.max_dimension as f32;
                if spec.font_size > max {
                    return Err(RenderError::InvalidParameter {
                        name: "font_size",
                        reason: format!(
                            "{} exceeds the configured maximum dimension of {max}",
                            spec.font_size
                        ),
                    });
                }
                current.watermark(spec, &self.settings.watermark, &mut *self.rasterizer)?
            }
            Operation::Compress { format, quality } => {
                let bytes = self.codec.encode(&current, *format, *quality)?;
                tracing::debug!(
                    target: targets::SESSION,
                    format = %format,
                    quality,
                    bytes = bytes.len(),
                    "compressed"
                );
                self.codec.decode(&bytes)?
            }
        };
        Ok(out)
    }

    fn check_dimensions(&self, width: u32, height: u32) -> RenderResult<()> {
        let max = self.settings.max_dimension;
        if width > max || height > max {
            return Err(RenderError::InvalidParameter {
                name: "dimensions",
                reason: format!("{width}x{height} exceeds the configured maximum of {max}"),
            });
        }
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<EditOutcome> {
        self.apply(Operation::Resize { width, height })
    }

    pub fn crop(&mut self, rect: CropRect) -> RenderResult<EditOutcome> {
        self.apply(Operation::Crop(rect))
    }

    /// Remove `percent` of the width and height from every side.
    pub fn crop_inset(&mut self, percent: u32) -> RenderResult<EditOutcome> {
        self.apply(Operation::CropInset { percent })
    }

    /// Rotate clockwise by `degrees`.
    pub fn rotate(&mut self, degrees: f64) -> RenderResult<EditOutcome> {
        self.apply(Operation::Rotate { degrees })
    }

    pub fn flip(&mut self, axis: FlipAxis) -> RenderResult<EditOutcome> {
        self.apply(Operation::Flip { axis })
    }

    pub fn apply_filter(&mut self, kind: FilterKind) -> RenderResult<EditOutcome> {
        self.apply_filter_with_intensity(kind, 1.0)
    }

    /// Apply `kind` blended with the current snapshot; `intensity` is in
    /// `0.0..=1.0`.
    pub fn apply_filter_with_intensity(
        &mut self,
        kind: FilterKind,
        intensity: f32,
    ) -> RenderResult<EditOutcome> {
        self.apply(Operation::Filter { kind, intensity })
    }

    pub fn adjust(&mut self, adjustments: Adjustments) -> RenderResult<EditOutcome> {
        self.apply(Operation::Adjust(adjustments))
    }

    pub fn blur(&mut self, radius: u32, kind: BlurKind) -> RenderResult<EditOutcome> {
        self.apply(Operation::Blur { radius, kind })
    }

    pub fn watermark(&mut self, spec: WatermarkSpec) -> RenderResult<EditOutcome> {
        self.apply(Operation::Watermark(spec))
    }

    /// Re-encode the current snapshot and keep the decoded result.
    pub fn compress(&mut self, format: ExportFormat, quality: f32) -> RenderResult<EditOutcome> {
        self.apply(Operation::Compress { format, quality })
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Step back one entry. Returns `None` at the oldest entry.
    pub fn undo(&mut self) -> Option<EditOutcome> {
        let label = self.history.undo()?.label().to_string();
        tracing::debug!(target: targets::SESSION, %label, "undo");
        Some(self.outcome())
    }

    /// Step forward one entry. Returns `None` at the newest entry.
    pub fn redo(&mut self) -> Option<EditOutcome> {
        let label = self.history.redo()?.label().to_string();
        tracing::debug!(target: targets::SESSION, %label, "redo");
        Some(self.outcome())
    }

    /// Commit the original image as a new, undoable entry.
    pub fn reset(&mut self) -> EditOutcome {
        self.history
            .push(HistoryEntry::new(self.original.clone(), RESET_LABEL));
        tracing::debug!(target: targets::SESSION, "reset to original");
        self.outcome()
    }

    #[inline]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[inline]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn outcome(&self) -> EditOutcome {
        let current = self.history.current();
        EditOutcome {
            width: current.buffer().width(),
            height: current.buffer().height(),
            label: current.label().to_string(),
            history_len: self.history.len(),
            cursor: self.history.cursor(),
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        }
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Encode the current snapshot.
    #[tracing::instrument(skip(self), target = "horizon_studio::session", level = "debug")]
    pub fn export_current(&self, format: ExportFormat, quality: f32) -> RenderResult<ExportedImage> {
        let _perf = PerfSpan::new(span_names::EXPORT, format.extension());
        let current = self.current();
        let bytes = self.codec.encode(current, format, quality)?;
        tracing::info!(
            target: targets::SESSION,
            format = %format,
            bytes = bytes.len(),
            "exported"
        );
        Ok(ExportedImage {
            bytes,
            format,
            width: current.width(),
            height: current.height(),
        })
    }

    /// Encode the current snapshot to a format given by extension or MIME
    /// type.
    pub fn export_current_named(&self, format: &str, quality: f32) -> RenderResult<ExportedImage> {
        self.export_current(format.parse()?, quality)
    }

    /// Encode in the format matching the source, at the configured quality.
    pub fn export_default(&self) -> RenderResult<ExportedImage> {
        self.export_current(self.default_export_format(), self.settings.export_quality)
    }

    pub fn default_export_format(&self) -> ExportFormat {
        preferred_export_format(self.source_format)
    }

    /// File name for an export of the current snapshot.
    pub fn suggested_file_name(&self) -> String {
        suggested_file_name(
            &self.settings.export_prefix,
            self.history.current().label(),
            self.default_export_format(),
        )
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Metadata of the current snapshot.
    pub fn describe(&self) -> RenderResult<ImageMetadata> {
        ImageMetadata::describe(self.current(), self.source_format, &self.codec)
    }

    pub fn histogram(&self) -> Histogram {
        self.current().histogram()
    }

    /// The current snapshot.
    #[inline]
    pub fn current(&self) -> &PixelBuffer {
        self.history.current().buffer()
    }

    /// The image as it was opened.
    #[inline]
    pub fn original(&self) -> &PixelBuffer {
        &self.original
    }

    #[inline]
    pub fn source_format(&self) -> Option<ImageFormat> {
        self.source_format
    }

    #[inline]
    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    #[inline]
    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }
}
