//! Tracing targets and span helpers for Horizon Studio.
//!
//! Horizon Studio uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_studio=debug,horizon_studio_render=debug")
//!     .init();
//! ```

/// Span names used throughout Horizon Studio for tracing.
pub mod span_names {
    /// One committed edit operation.
    pub const OPERATION: &str = "horizon_studio::operation";
    /// Export encoding.
    pub const EXPORT: &str = "horizon_studio::export";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Edit session target.
    pub const SESSION: &str = "horizon_studio::session";
    /// Undo/redo history target.
    pub const HISTORY: &str = "horizon_studio::history";
    /// Settings loading target.
    pub const SETTINGS: &str = "horizon_studio::settings";
    /// Geometry engine target.
    pub const GEOMETRY: &str = "horizon_studio_render::geometry";
    /// Color engine target.
    pub const COLOR: &str = "horizon_studio_render::color";
    /// Convolution engine target.
    pub const CONVOLUTION: &str = "horizon_studio_render::convolution";
    /// Compositor target.
    pub const COMPOSITOR: &str = "horizon_studio_render::compositor";
    /// Text rasterization target.
    pub const TEXT: &str = "horizon_studio_render::text";
    /// Codec target.
    pub const CODEC: &str = "horizon_studio_render::codec";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of operations.
#[derive(Debug)]
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Enter a span named after `operation` under `name`.
    pub fn new(name: &'static str, operation: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_studio::perf", "perf", span = name, operation);
        Self {
            _span: span.entered(),
        }
    }
}
