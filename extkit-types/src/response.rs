//! The single response a receiving handler produces for a message.

use crate::{Result, now_millis};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error text returned for tags a context does not handle.
pub const UNKNOWN_MESSAGE_TYPE: &str = "Unknown message type";

/// Error text returned when a known tag carries a payload of the wrong shape.
pub const INVALID_MESSAGE_PAYLOAD: &str = "Invalid message payload";

/// Application-level outcome of handling a message.
///
/// `success: false` here means the receiver ran and reported a failure.
/// It is never used for transport failures (nobody listening), which the
/// messaging layer reports as errors instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl MessageResponse {
    /// `{success: true}`.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
            timestamp: Some(now_millis()),
        }
    }

    /// `{success: true, data}`, serializing `data`.
    pub fn ok_with<T: Serialize>(data: &T) -> Result<Self> {
        Ok(Self {
            data: Some(serde_json::to_value(data)?),
            ..Self::ok()
        })
    }

    /// `{success: false, error}`.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            timestamp: Some(now_millis()),
        }
    }

    /// The response for a tag the receiving context does not handle.
    #[must_use]
    pub fn unknown_type() -> Self {
        Self::failure(UNKNOWN_MESSAGE_TYPE)
    }

    /// The response for a message that could not be decoded.
    #[must_use]
    pub fn invalid_payload() -> Self {
        Self::failure(INVALID_MESSAGE_PAYLOAD)
    }

    /// Decodes the `data` field, if any.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.data
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }
}
