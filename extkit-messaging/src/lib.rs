//! Message delivery between the extension's execution contexts.
//!
//! Two delivery patterns exist:
//! - **Runtime**: sent to the extension's own bus and received by whichever
//!   extension pages (background, popup, options) are listening.
//! - **Tab-addressed**: sent to the content script loaded in one tab.
//!
//! Either can fail because nobody is listening. That is a transport
//! failure ([`MessagingError`]), kept distinct from a receiver that ran
//! and answered `{success: false}`.
//!
//! ## Components
//!
//! - **Transport**: the [`MessageTransport`] seam and the request/response types
//! - **Bus**: [`ExtensionBus`], the in-process transport
//! - **Handler**: typed dispatch and the per-context receive loop
//! - **Messenger**: a context's sending side

mod bus;
mod error;
mod handler;
mod messenger;
pub mod transport;

pub use bus::{BusConfig, ExtensionBus, Listener};
pub use error::{MessagingError, MessagingResult};
pub use handler::{MessageHandler, dispatch, serve};
pub use messenger::Messenger;
pub use transport::{Destination, IncomingMessage, MessageSender, MessageTransport, Responder};
