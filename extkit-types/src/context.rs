//! The fixed set of isolated execution contexts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the extension's isolated, single-threaded runtimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextKind {
    /// The service worker. Always listening while alive.
    Background,
    /// A content script, one per loaded tab.
    Content,
    /// The toolbar popup page.
    Popup,
    /// The options page.
    Options,
}

impl ContextKind {
    /// Every context kind.
    pub const ALL: [ContextKind; 4] = [
        ContextKind::Background,
        ContextKind::Content,
        ContextKind::Popup,
        ContextKind::Options,
    ];

    /// Returns true for contexts reachable through the runtime broadcast
    /// channel. Content scripts only receive tab-addressed messages.
    #[must_use]
    pub const fn is_extension_page(&self) -> bool {
        !matches!(self, ContextKind::Content)
    }

    /// Lowercase name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ContextKind::Background => "background",
            ContextKind::Content => "content",
            ContextKind::Popup => "popup",
            ContextKind::Options => "options",
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
