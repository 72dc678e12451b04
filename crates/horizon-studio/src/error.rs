//! Error types for opening and configuring sessions.

use horizon_studio_render::RenderError;
use thiserror::Error;

use crate::settings::SettingsError;

/// Errors raised while creating an [`EditSession`](crate::EditSession).
///
/// Operations on an open session report [`RenderError`] directly.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The input bytes could not be decoded.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The supplied settings were rejected.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Result type for session construction.
pub type SessionResult<T> = Result<T, SessionError>;
