//! The extension's four execution contexts.
//!
//! Each context owns its state explicitly and talks to the others only
//! through the message bus and the storage partitions:
//!
//! - [`Background`]: lifecycle events, tab info, settings writes, keep-alive
//! - [`ContentScript`]: per-tab page adaptation, highlights, DOM-change detection
//! - [`Popup`]: toolbar actions against the active tab
//! - [`OptionsPage`]: the full settings editor, keywords, backup and restore
//!
//! Browser facilities (tabs, the page document, highlight ranges, text
//! selection, toasts) are reached through the traits in [`host`], so every
//! context runs against the in-memory doubles in [`sim`].

mod background;
mod content;
mod error;
pub mod highlight;
pub mod host;
mod keepalive;
mod options;
mod popup;
pub mod sim;
mod toast;

pub use background::{Background, BackgroundConfig, InstallReason};
pub use content::{BASE_STYLES, ContentHost, ContentScript, HighlightSummary, ScrollPosition};
pub use error::{ContextError, ContextResult};
pub use highlight::{HighlightOutcome, Highlighter, NodeId, TextNode, TextRange};
pub use host::{
    ContextMenuItem, ElementId, HighlightRegistry, KeyPress, MenuContext, PageDocument,
    ScrollMetrics, SelectionProvider, TabsApi,
};
pub use keepalive::KeepAlive;
pub use options::{Backup, OptionsPage};
pub use popup::{Popup, Screenshot};
pub use toast::{Notifier, Toast, ToastBoard, ToastConfig, ToastKind, ToastPhase, play_toast};
