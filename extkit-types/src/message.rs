//! The closed message catalog and its wire envelope.
//!
//! On the wire every message is a JSON object
//! `{type: string, data?: any, timestamp?: number, id?: string}`.
//! In Rust the tag and its payload are one [`Message`] variant, so a
//! receiving context matches exhaustively instead of switching on strings.
//! Senders that are not typed (older builds, hand-written scripts) can still
//! put any tag on the wire; [`Envelope::from_wire`] reports those as
//! [`Error::UnknownMessageType`] rather than failing opaquely.

use crate::payload::{
    CssInjection, FeatureToggle, HighlightRequest, SaveDataRequest, ScrollRequest,
};
use crate::{ContextKind, Error, MessageId, Result, Settings, now_millis};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// A message exchanged between execution contexts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Ask the background for the sender tab's identity.
    GetTabInfo,

    /// Flip one boolean setting and persist it.
    ToggleFeature(FeatureToggle),

    /// Persist a value in device-local storage.
    SaveData(SaveDataRequest),

    /// Settings changed; receivers refresh their cached copy.
    SettingsUpdated(Settings),

    /// Toggle a highlight over every occurrence of some text.
    HighlightText(HighlightRequest),

    /// Ask the content script for page metrics.
    GetPageInfo,

    /// Scroll an element into view.
    ScrollToElement(ScrollRequest),

    /// Add or remove a stylesheet in the page.
    InjectCss(CssInjection),
}

impl Message {
    /// Returns the tag of this message.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Message::GetTabInfo => MessageType::GetTabInfo,
            Message::ToggleFeature(_) => MessageType::ToggleFeature,
            Message::SaveData(_) => MessageType::SaveData,
            Message::SettingsUpdated(_) => MessageType::SettingsUpdated,
            Message::HighlightText(_) => MessageType::HighlightText,
            Message::GetPageInfo => MessageType::GetPageInfo,
            Message::ScrollToElement(_) => MessageType::ScrollToElement,
            Message::InjectCss(_) => MessageType::InjectCss,
        }
    }
}

/// Payload-free mirror of the [`Message`] tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    GetTabInfo,
    ToggleFeature,
    SaveData,
    SettingsUpdated,
    HighlightText,
    GetPageInfo,
    ScrollToElement,
    InjectCss,
}

impl MessageType {
    pub const ALL: [MessageType; 8] = [
        MessageType::GetTabInfo,
        MessageType::ToggleFeature,
        MessageType::SaveData,
        MessageType::SettingsUpdated,
        MessageType::HighlightText,
        MessageType::GetPageInfo,
        MessageType::ScrollToElement,
        MessageType::InjectCss,
    ];

    /// The wire tag.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageType::GetTabInfo => "GET_TAB_INFO",
            MessageType::ToggleFeature => "TOGGLE_FEATURE",
            MessageType::SaveData => "SAVE_DATA",
            MessageType::SettingsUpdated => "SETTINGS_UPDATED",
            MessageType::HighlightText => "HIGHLIGHT_TEXT",
            MessageType::GetPageInfo => "GET_PAGE_INFO",
            MessageType::ScrollToElement => "SCROLL_TO_ELEMENT",
            MessageType::InjectCss => "INJECT_CSS",
        }
    }

    /// Contexts that act on this message.
    #[must_use]
    pub const fn receivers(&self) -> &'static [ContextKind] {
        match self {
            MessageType::GetTabInfo | MessageType::ToggleFeature | MessageType::SaveData => {
                &[ContextKind::Background]
            }
            MessageType::SettingsUpdated => &[ContextKind::Background, ContextKind::Content],
            MessageType::HighlightText
            | MessageType::GetPageInfo
            | MessageType::ScrollToElement
            | MessageType::InjectCss => &[ContextKind::Content],
        }
    }

    /// Whether the tag carries a `data` payload.
    #[must_use]
    pub const fn has_payload(&self) -> bool {
        !matches!(self, MessageType::GetTabInfo | MessageType::GetPageInfo)
    }

    /// Whether senders look at the response. `SETTINGS_UPDATED` is a
    /// fire-and-forget broadcast.
    #[must_use]
    pub const fn expects_response(&self) -> bool {
        !matches!(self, MessageType::SettingsUpdated)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        MessageType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::UnknownMessageType(s.to_string()))
    }
}

/// The untyped wire shape of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Milliseconds. Any JSON number is accepted; fractions are truncated.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_millis"
    )]
    pub timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

fn lenient_millis<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u64>, D::Error> {
    let Some(number) = Option::<serde_json::Number>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Some(millis) = number.as_u64() {
        return Ok(Some(millis));
    }
    match number.as_f64() {
        Some(millis) if millis.is_finite() && millis >= 0.0 => Ok(Some(millis as u64)),
        _ => Err(serde::de::Error::custom(format!(
            "timestamp {number} is not a non-negative number"
        ))),
    }
}

/// A typed message plus its optional metadata. Immutable once sent.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub message: Message,
    pub timestamp: Option<u64>,
    pub id: Option<MessageId>,
}

impl Envelope {
    /// Wraps a message with a fresh correlation id and the current time.
    #[must_use]
    pub fn new(message: Message) -> Self {
        Self {
            message,
            timestamp: Some(now_millis()),
            id: Some(MessageId::new()),
        }
    }

    /// Wraps a message without metadata.
    #[must_use]
    pub fn bare(message: Message) -> Self {
        Self {
            message,
            timestamp: None,
            id: None,
        }
    }

    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.message.message_type()
    }

    /// Converts to the untyped wire shape.
    pub fn to_wire(&self) -> Result<WireEnvelope> {
        let data = match serde_json::to_value(&self.message)? {
            Value::Object(mut map) => map.remove("data"),
            _ => None,
        };
        Ok(WireEnvelope {
            kind: self.message_type().as_str().to_string(),
            data,
            timestamp: self.timestamp,
            id: self.id.as_ref().map(ToString::to_string),
        })
    }

    /// Serializes to a JSON value ready for a transport.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self.to_wire()?)?)
    }

    /// Decodes a JSON value received from a transport.
    ///
    /// Distinguishes an unrecognized tag ([`Error::UnknownMessageType`]) from
    /// a recognized tag whose payload does not fit ([`Error::InvalidPayload`]).
    pub fn from_wire(value: Value) -> Result<Self> {
        let wire: WireEnvelope = serde_json::from_value(value)?;
        Self::try_from(wire)
    }
}

impl TryFrom<WireEnvelope> for Envelope {
    type Error = Error;

    fn try_from(wire: WireEnvelope) -> Result<Self> {
        let kind: MessageType = wire.kind.parse()?;

        let mut tagged = Map::new();
        tagged.insert("type".into(), Value::String(wire.kind));
        // Payload-free tags ignore whatever `data` a sender attached.
        if let Some(data) = wire.data.filter(|_| kind.has_payload()) {
            tagged.insert("data".into(), data);
        }
        let message: Message =
            serde_json::from_value(Value::Object(tagged)).map_err(|e| Error::InvalidPayload {
                tag: kind.as_str(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            message,
            timestamp: wire.timestamp,
            id: wire.id.map(MessageId::from),
        })
    }
}

impl From<Message> for Envelope {
    fn from(message: Message) -> Self {
        Self::new(message)
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_wire()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = WireEnvelope::deserialize(deserializer)?;
        Envelope::try_from(wire).map_err(serde::de::Error::custom)
    }
}
