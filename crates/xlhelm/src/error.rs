//! Session-level error type.

use std::path::PathBuf;

use thiserror::Error;

use xlhelm_automation::AutomationError;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend reported a failure.
    #[error("{0}")]
    Automation(#[from] AutomationError),

    /// The workbook behind this handle has been closed.
    #[error("workbook handle has been released")]
    WorkbookReleased,

    /// The worksheet behind this handle has been deleted, or its workbook
    /// closed.
    #[error("worksheet handle has been released")]
    WorksheetReleased,

    /// The picture file to insert does not exist.
    #[error("picture file not found: {}", .0.display())]
    PictureNotFound(PathBuf),
}

impl Error {
    /// True when the failure is a lookup miss rather than a hard error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Automation(inner) if inner.is_not_found())
    }
}
