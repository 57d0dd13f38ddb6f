//! The in-process extension bus.

use crate::error::{MessagingError, MessagingResult};
use crate::transport::{
    Destination, IncomingMessage, MessageSender, MessageTransport, Responder,
};
use async_trait::async_trait;
use extkit_types::{ContextKind, MessageResponse, TabId};
use futures::future::select_ok;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Configuration for the extension bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// How long a sender waits for a response (ms). `None` waits forever.
    pub response_timeout_ms: Option<u64>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: Some(30_000),
        }
    }
}

impl BusConfig {
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }
}

struct Registration {
    id: u64,
    context: ContextKind,
    tab: Option<TabId>,
    inbox: mpsc::UnboundedSender<IncomingMessage>,
}

impl Registration {
    fn accepts(&self, destination: Destination, sender: &MessageSender) -> bool {
        match destination {
            Destination::Runtime => {
                self.context.is_extension_page() && self.context != sender.context
            }
            Destination::Tab(tab) => {
                self.context == ContextKind::Content && self.tab == Some(tab)
            }
        }
    }
}

struct BusInner {
    config: BusConfig,
    next_id: AtomicU64,
    listeners: Mutex<Vec<Registration>>,
}

impl BusInner {
    fn unregister(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|r| r.id != id);
    }
}

/// In-process transport connecting every context of one extension.
///
/// Runtime sends reach every listening extension page except those of
/// the sender's own kind. Content scripts are reached only through
/// [`send_to_tab`](MessageTransport::send_to_tab). When several receivers
/// get a message, the first response wins; the sender sees
/// [`MessagingError::ResponseDropped`] only once every receiver has
/// dropped its [`Responder`].
#[derive(Clone)]
pub struct ExtensionBus {
    inner: Arc<BusInner>,
}

impl ExtensionBus {
    pub fn new(config: BusConfig) -> Self {
        Self {
            inner: Arc::new(BusInner {
                config,
                next_id: AtomicU64::new(0),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Registers a listener for a context. Content listeners pass the tab
    /// they are loaded in. The listener is removed when dropped.
    pub fn listen(&self, context: ContextKind, tab: Option<TabId>) -> Listener {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Registration {
                id,
                context,
                tab,
                inbox: tx,
            });
        debug!("Registered {} listener {}", context, id);
        Listener {
            id,
            context,
            tab,
            inbox: rx,
            bus: self.inner.clone(),
        }
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    async fn deliver(
        &self,
        destination: Destination,
        sender: &MessageSender,
        payload: Value,
    ) -> MessagingResult<MessageResponse> {
        let mut pending = Vec::new();
        {
            let listeners = self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            for registration in listeners.iter().filter(|r| r.accepts(destination, sender)) {
                let (tx, rx) = oneshot::channel();
                let incoming = IncomingMessage {
                    sender: sender.clone(),
                    payload: payload.clone(),
                    responder: Responder::new(tx),
                };
                if registration.inbox.send(incoming).is_ok() {
                    pending.push(rx);
                }
            }
        }

        if pending.is_empty() {
            debug!("No receiver for message to {}", destination);
            return Err(MessagingError::NoReceiver { destination });
        }
        debug!("Delivered message to {} receiver(s) at {}", pending.len(), destination);

        let first = select_ok(pending);
        let outcome = match self.inner.config.response_timeout() {
            Some(limit) => tokio::time::timeout(limit, first)
                .await
                .map_err(|_| MessagingError::Timeout)?,
            None => first.await,
        };
        outcome
            .map(|(response, _)| response)
            .map_err(|_| MessagingError::ResponseDropped)
    }
}

impl Default for ExtensionBus {
    fn default() -> Self {
        Self::new(BusConfig::default())
    }
}

#[async_trait]
impl MessageTransport for ExtensionBus {
    async fn send_runtime(
        &self,
        sender: &MessageSender,
        payload: Value,
    ) -> MessagingResult<MessageResponse> {
        self.deliver(Destination::Runtime, sender, payload).await
    }

    async fn send_to_tab(
        &self,
        sender: &MessageSender,
        tab: TabId,
        payload: Value,
    ) -> MessagingResult<MessageResponse> {
        self.deliver(Destination::Tab(tab), sender, payload).await
    }
}

/// A context's receiving end of the bus.
pub struct Listener {
    id: u64,
    context: ContextKind,
    tab: Option<TabId>,
    inbox: mpsc::UnboundedReceiver<IncomingMessage>,
    bus: Arc<BusInner>,
}

impl Listener {
    pub fn context(&self) -> ContextKind {
        self.context
    }

    pub fn tab(&self) -> Option<TabId> {
        self.tab
    }

    /// Receives the next message. Never returns `None` while the listener
    /// is registered.
    pub async fn recv(&mut self) -> Option<IncomingMessage> {
        self.inbox.recv().await
    }

    /// Takes a queued message without waiting.
    pub fn try_recv(&mut self) -> Option<IncomingMessage> {
        self.inbox.try_recv().ok()
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.bus.unregister(self.id);
        debug!("Unregistered {} listener {}", self.context, self.id);
    }
}
