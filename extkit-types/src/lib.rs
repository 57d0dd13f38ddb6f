//! Core type definitions for the extension kit.
//!
//! This crate defines the types that cross execution-context boundaries:
//! - The closed message catalog and its wire envelope
//! - The response shape every receiving handler produces
//! - Payload structs and the persisted settings object
//! - Identifiers (message correlation ids, tab ids) and context kinds
//!
//! Nothing here performs I/O. Transport lives in `extkit-messaging`,
//! persistence in `extkit-storage`.

pub mod constants;
mod context;
mod ids;
mod message;
mod payload;
mod response;
mod settings;
mod timestamp;

pub use context::ContextKind;
pub use ids::{MessageId, TabId};
pub use message::{Envelope, Message, MessageType, WireEnvelope};
pub use payload::{
    CssInjection, FeatureToggle, HighlightRequest, PageInfo, SaveDataRequest, ScrollBehavior,
    ScrollBlock, ScrollRequest, Stats, TabInfo,
};
pub use response::{INVALID_MESSAGE_PAYLOAD, MessageResponse, UNKNOWN_MESSAGE_TYPE};
pub use settings::{FontSize, Settings, Theme};
pub use timestamp::now_millis;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding or manipulating shared types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    #[error("invalid payload for {tag}: {reason}")]
    InvalidPayload { tag: &'static str, reason: String },

    #[error("setting is not a boolean flag: {0}")]
    NotAFlag(String),
}
