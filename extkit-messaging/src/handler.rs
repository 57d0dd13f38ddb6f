//! Typed dispatch and the per-context receive loop.

use crate::bus::Listener;
use crate::transport::{IncomingMessage, MessageSender};
use async_trait::async_trait;
use extkit_types::{Envelope, Error, Message, MessageResponse};
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A context's handler over the closed message catalog.
///
/// Implementations match exhaustively on [`Message`]. Tags a context does
/// not act on should answer [`MessageResponse::unknown_type`].
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: Message, sender: &MessageSender) -> MessageResponse;
}

/// Decodes a wire envelope and hands it to `handler`.
///
/// Never fails: undecodable input becomes a failure response.
pub async fn dispatch<H>(handler: &H, payload: Value, sender: &MessageSender) -> MessageResponse
where
    H: MessageHandler + ?Sized,
{
    match Envelope::from_wire(payload) {
        Ok(envelope) => {
            debug!("{} handling {}", sender.context, envelope.message_type());
            handler.handle(envelope.message, sender).await
        }
        Err(Error::UnknownMessageType(tag)) => {
            warn!("Unknown message type: {}", tag);
            MessageResponse::unknown_type()
        }
        Err(e) => {
            warn!("Rejected message from {}: {}", sender.context, e);
            MessageResponse::invalid_payload()
        }
    }
}

/// Runs the receive loop for one listener until it is closed.
///
/// Messages are handled one at a time, in arrival order, and every
/// message gets exactly one response.
pub fn serve(mut listener: Listener, handler: Arc<dyn MessageHandler>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(incoming) = listener.recv().await {
            let IncomingMessage {
                sender,
                payload,
                responder,
            } = incoming;
            let response = dispatch(handler.as_ref(), payload, &sender).await;
            if !responder.respond(response) {
                debug!("Sender stopped waiting for {} response", listener.context());
            }
        }
    })
}
