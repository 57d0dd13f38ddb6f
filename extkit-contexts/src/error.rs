//! Error types for context operations.

use extkit_messaging::MessagingError;
use thiserror::Error;

/// Result type for context operations.
pub type ContextResult<T> = Result<T, ContextError>;

/// Errors a context reports to its caller.
///
/// None of these cross a context boundary: handlers turn them into
/// failure responses and UI contexts into toasts.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("no active tab found")]
    NoActiveTab,

    #[error("no text selected")]
    NoSelection,

    /// A browser tabs call failed.
    #[error("tabs error: {0}")]
    Tabs(String),

    /// A storage write reported failure.
    #[error("failed to write {0}")]
    StorageWrite(String),

    /// The receiver ran and answered `{success: false}`.
    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("invalid backup: {0}")]
    InvalidBackup(String),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Types(#[from] extkit_types::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
