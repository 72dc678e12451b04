//! Horizon Studio: image editing sessions with undo/redo history.
//!
//! An [`EditSession`] holds a decoded image, a linear history of snapshots
//! and the editor settings. Every edit is an [`Operation`] run by one of the
//! pure engines in [`render`]; a successful run becomes a new history entry,
//! a failed one changes nothing.
//!
//! # Quick Start
//!
//! ```no_run
//! use horizon_studio::{EditSession, FilterKind, FlipAxis};
//!
//! # fn example(bytes: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = EditSession::open(bytes)?;
//! session.resize(800, 600)?;
//! session.rotate(90.0)?;
//! session.apply_filter(FilterKind::Sepia)?;
//! session.flip(FlipAxis::Horizontal)?;
//!
//! session.undo();
//! session.redo();
//!
//! let export = session.export_default()?;
//! println!("{} ({} bytes)", session.suggested_file_name(), export.byte_size());
//! # Ok(())
//! # }
//! ```
//!
//! # Operations as Data
//!
//! Operations are plain serializable values, so a batch of edits can come
//! from JSON:
//!
//! ```
//! use horizon_studio::Operation;
//!
//! let op: Operation = serde_json::from_str(r#"{"op":"rotate","degrees":180}"#).unwrap();
//! assert_eq!(op.label(), "rotate-180");
//! ```
//!
//! # Threads
//!
//! `EditSession` is `Send`. Wrap it in a [`SharedSession`] to drive it from
//! several threads.
//!
//! # Logging
//!
//! See [`logging`] for the tracing targets used by both crates.

mod error;
mod export;
mod history;
pub mod logging;
mod metadata;
mod operation;
mod session;
mod settings;
mod shared;

pub use error::{SessionError, SessionResult};
pub use export::{preferred_export_format, suggested_file_name, suggested_file_name_at, ExportedImage};
pub use history::{HistoryConfig, HistoryEntry, HistoryManager};
pub use metadata::{ColorSpace, ImageMetadata};
pub use operation::Operation;
pub use session::{EditOutcome, EditSession, OPEN_LABEL, RESET_LABEL};
pub use settings::{EditorSettings, SettingsError, SettingsResult};
pub use shared::SharedSession;

pub use horizon_studio_render as render;
pub use horizon_studio_render::{
    Adjustments, BlurKind, Color, CropRect, ExportFormat, FilterKind, FlipAxis, ImageFormat,
    PixelBuffer, RenderError, RenderResult, ResizeFilter, WatermarkPosition, WatermarkSpec,
    WatermarkStyle,
};
