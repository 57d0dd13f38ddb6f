//! Transport layer abstraction.
//!
//! The contexts talk through [`MessageTransport`] so the same handlers run
//! on the in-process [`ExtensionBus`](crate::ExtensionBus) in tests and on a
//! browser-backed transport in production.

use crate::error::MessagingResult;
use async_trait::async_trait;
use extkit_types::{ContextKind, MessageResponse, TabId, TabInfo};
use serde_json::Value;
use std::fmt;
use tokio::sync::oneshot;

/// Where a message was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// The extension runtime bus.
    Runtime,
    /// The content script of one tab.
    Tab(TabId),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Runtime => f.write_str("runtime"),
            Destination::Tab(id) => write!(f, "tab {id}"),
        }
    }
}

/// Identity of the context that sent a message.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSender {
    pub context: ContextKind,
    /// The sending tab, for content scripts.
    pub tab: Option<TabInfo>,
}

impl MessageSender {
    /// A sender with no tab (background, popup, options).
    pub fn new(context: ContextKind) -> Self {
        Self { context, tab: None }
    }

    /// The content script running in `tab`.
    pub fn content(tab: TabInfo) -> Self {
        Self {
            context: ContextKind::Content,
            tab: Some(tab),
        }
    }

    pub fn tab_id(&self) -> Option<TabId> {
        self.tab.as_ref().map(|t| t.id)
    }
}

/// Sends the single response to one received message.
///
/// `respond` consumes the responder, so a message cannot be answered twice.
/// Dropping it unanswered tells the sender nobody will respond.
#[derive(Debug)]
pub struct Responder(oneshot::Sender<MessageResponse>);

impl Responder {
    pub fn new(tx: oneshot::Sender<MessageResponse>) -> Self {
        Self(tx)
    }

    /// Returns `false` if the sender stopped waiting (another receiver
    /// answered first, or it timed out).
    pub fn respond(self, response: MessageResponse) -> bool {
        self.0.send(response).is_ok()
    }
}

/// A message received by a listening context.
#[derive(Debug)]
pub struct IncomingMessage {
    pub sender: MessageSender,
    /// The raw wire envelope.
    pub payload: Value,
    pub responder: Responder,
}

/// Carries wire envelopes between contexts.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Sends to the extension runtime and waits for the first response.
    async fn send_runtime(
        &self,
        sender: &MessageSender,
        payload: Value,
    ) -> MessagingResult<MessageResponse>;

    /// Sends to the content script of `tab` and waits for its response.
    async fn send_to_tab(
        &self,
        sender: &MessageSender,
        tab: TabId,
        payload: Value,
    ) -> MessagingResult<MessageResponse>;
}
