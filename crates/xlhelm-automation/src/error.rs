//! Error types shared by every backend.

use thiserror::Error;

/// Result type alias using [`AutomationError`].
pub type Result<T> = std::result::Result<T, AutomationError>;

/// Errors surfaced by backends and by reference arithmetic.
#[derive(Debug, Error)]
pub enum AutomationError {
    /// A workbook, worksheet, range, or file lookup found nothing.
    #[error("{kind} not found: {reference}")]
    NotFound {
        /// What was being looked up ("workbook", "worksheet", ...).
        kind: &'static str,
        /// The reference that failed to resolve.
        reference: String,
    },

    /// The external application rejected or failed a call.
    #[error("{call} failed: {detail}")]
    CallFailed {
        /// The operation attempted, e.g. `"SaveAs"`.
        call: String,
        /// Backend-specific failure detail.
        detail: String,
    },

    /// Malformed cell, column, or range reference.
    #[error("invalid reference: {0:?}")]
    InvalidReference(String),

    /// Column number outside the range that can be written as letters.
    #[error("column {0} is outside the letter range 1..=702")]
    ColumnOutOfRange(u32),

    /// A cell value could not be converted to the requested type.
    #[error("cannot convert {value:?} to {target}")]
    Conversion {
        /// Display form of the offending value.
        value: String,
        /// Requested target type.
        target: &'static str,
    },
}

impl AutomationError {
    /// Lookup-failure constructor.
    pub fn not_found(kind: &'static str, reference: impl ToString) -> Self {
        AutomationError::NotFound {
            kind,
            reference: reference.to_string(),
        }
    }

    /// Failed-call constructor.
    pub fn call_failed(call: impl Into<String>, detail: impl ToString) -> Self {
        AutomationError::CallFailed {
            call: call.into(),
            detail: detail.to_string(),
        }
    }

    /// True for lookup failures, as opposed to hard call failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AutomationError::NotFound { .. })
    }
}
