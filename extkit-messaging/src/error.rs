//! Error types for message delivery.

use crate::transport::Destination;
use thiserror::Error;

/// Result type for messaging operations.
pub type MessagingResult<T> = Result<T, MessagingError>;

/// Errors a sender can observe.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// No context is listening at the destination.
    #[error("no receiver for {destination}")]
    NoReceiver { destination: Destination },

    /// Every receiver dropped the message without answering.
    #[error("receiver dropped the message without responding")]
    ResponseDropped,

    /// No response arrived within the configured timeout.
    #[error("timed out waiting for a response")]
    Timeout,

    /// The outgoing message could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(#[from] extkit_types::Error),
}

impl MessagingError {
    /// Whether this is an ordinary delivery failure that callers are
    /// expected to swallow.
    pub fn is_transport(&self) -> bool {
        !matches!(self, MessagingError::Encoding(_))
    }
}
