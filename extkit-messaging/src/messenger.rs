//! The sending side of a context.

use crate::error::MessagingResult;
use crate::transport::{MessageSender, MessageTransport};
use extkit_types::{Envelope, Message, MessageResponse, TabId};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Sends messages on behalf of one context.
#[derive(Clone)]
pub struct Messenger {
    transport: Arc<dyn MessageTransport>,
    sender: MessageSender,
}

impl Messenger {
    pub fn new(transport: Arc<dyn MessageTransport>, sender: MessageSender) -> Self {
        Self { transport, sender }
    }

    pub fn sender(&self) -> &MessageSender {
        &self.sender
    }

    /// Sends to the extension runtime and returns the first response.
    pub async fn send(&self, message: Message) -> MessagingResult<MessageResponse> {
        let payload = Envelope::new(message).to_value()?;
        self.transport.send_runtime(&self.sender, payload).await
    }

    /// Sends to the content script of `tab`.
    pub async fn send_to_tab(
        &self,
        tab: TabId,
        message: Message,
    ) -> MessagingResult<MessageResponse> {
        let payload = Envelope::new(message).to_value()?;
        self.transport.send_to_tab(&self.sender, tab, payload).await
    }

    /// Sends an arbitrary wire envelope to the runtime, for senders that
    /// build messages by hand.
    pub async fn send_raw(&self, payload: Value) -> MessagingResult<MessageResponse> {
        self.transport.send_runtime(&self.sender, payload).await
    }

    /// Fire-and-forget runtime send. Delivery failures are expected and
    /// only logged.
    pub async fn notify(&self, message: Message) -> Option<MessageResponse> {
        let tag = message.message_type();
        match self.send(message).await {
            Ok(response) => Some(response),
            Err(e) => {
                debug!("{} not delivered to runtime: {}", tag, e);
                None
            }
        }
    }

    /// Fire-and-forget tab send. Tabs without a content script (privileged
    /// pages, tabs still loading) fail here silently.
    pub async fn notify_tab(&self, tab: TabId, message: Message) -> Option<MessageResponse> {
        let tag = message.message_type();
        match self.send_to_tab(tab, message).await {
            Ok(response) => Some(response),
            Err(e) => {
                debug!("{} not delivered to tab {}: {}", tag, tab, e);
                None
            }
        }
    }
}
