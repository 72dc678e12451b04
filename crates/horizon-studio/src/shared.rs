//! Thread-safe handle to an [`EditSession`].

use std::sync::Arc;

use horizon_studio_render::{ExportFormat, RenderResult};
use parking_lot::Mutex;

use crate::export::ExportedImage;
use crate::metadata::ImageMetadata;
use crate::operation::Operation;
use crate::session::{EditOutcome, EditSession};

/// A cloneable handle that serializes access to one session.
///
/// Each call locks the session for its whole duration, so an operation and
/// its history commit are never interleaved with another caller's.
#[derive(Debug, Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<EditSession>>,
}

impl SharedSession {
    pub fn new(session: EditSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn apply(&self, op: Operation) -> RenderResult<EditOutcome> {
        self.inner.lock().apply(op)
    }

    pub fn undo(&self) -> Option<EditOutcome> {
        self.inner.lock().undo()
    }

    pub fn redo(&self) -> Option<EditOutcome> {
        self.inner.lock().redo()
    }

    pub fn reset(&self) -> EditOutcome {
        self.inner.lock().reset()
    }

    pub fn export_current(&self, format: ExportFormat, quality: f32) -> RenderResult<ExportedImage> {
        self.inner.lock().export_current(format, quality)
    }

    pub fn describe(&self) -> RenderResult<ImageMetadata> {
        self.inner.lock().describe()
    }

    /// Run `f` with shared access to the session.
    pub fn with<R>(&self, f: impl FnOnce(&EditSession) -> R) -> R {
        f(&*self.inner.lock())
    }

    /// Run `f` with exclusive access to the session.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut EditSession) -> R) -> R {
        f(&mut *self.inner.lock())
    }

    /// Unwrap the session if this is the last handle.
    pub fn try_into_inner(self) -> Result<EditSession, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl From<EditSession> for SharedSession {
    fn from(session: EditSession) -> Self {
        Self::new(session)
    }
}
