//! Browser capabilities the contexts depend on.
//!
//! Production builds implement these over the extension APIs and the live
//! document. [`sim`](crate::sim) has in-memory versions.

use crate::error::ContextResult;
use crate::highlight::{TextNode, TextRange};
use async_trait::async_trait;
use extkit_types::{ScrollBehavior, ScrollBlock, TabId, TabInfo};
use serde::{Deserialize, Serialize};

/// The `tabs` API plus the bits of `runtime` the UI needs.
#[async_trait]
pub trait TabsApi: Send + Sync {
    /// The active tab of the current window, if any.
    async fn active_tab(&self) -> ContextResult<Option<TabInfo>>;

    /// Opens `url` in a new tab.
    async fn create_tab(&self, url: &str) -> ContextResult<TabId>;

    /// Opens a generated document (an object URL in the browser) in a new tab.
    async fn open_document(&self, mime_type: &str, content: &str) -> ContextResult<TabId>;

    /// Captures the visible area of the active tab as a PNG data URL.
    async fn capture_visible_tab(&self) -> ContextResult<String>;

    /// Absolute URL of a file packaged with the extension.
    fn extension_url(&self, path: &str) -> String;

    /// Adds an entry to the page and selection context menus.
    async fn create_context_menu(&self, item: &ContextMenuItem) -> ContextResult<()>;
}

/// Where a context-menu entry is offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuContext {
    Selection,
    Page,
}

/// A context-menu entry owned by the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMenuItem {
    pub id: String,
    pub title: String,
    pub contexts: Vec<MenuContext>,
}

/// Handle to an element of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// A key press seen by the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub alt: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            alt: false,
        }
    }

    /// The key pressed with Alt held.
    pub fn alt(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            alt: true,
        }
    }
}

/// Scroll geometry of the page, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollMetrics {
    pub scroll_y: f64,
    pub scroll_height: f64,
    pub viewport_height: f64,
}

impl ScrollMetrics {
    /// How far down the page is scrolled, 0 to 100. Pages that do not
    /// scroll report 0.
    pub fn percent(&self) -> u32 {
        let scrollable = self.scroll_height - self.viewport_height;
        if scrollable <= 0.0 {
            return 0;
        }
        (self.scroll_y / scrollable * 100.0).round().clamp(0.0, 100.0) as u32
    }
}

/// The document a content script runs in.
pub trait PageDocument: Send + Sync {
    fn title(&self) -> String;
    fn url(&self) -> String;
    /// Rendered text of the body.
    fn body_text(&self) -> String;
    /// Text nodes under the body, in document order.
    fn text_nodes(&self) -> Vec<TextNode>;
    fn image_count(&self) -> usize;
    fn link_count(&self) -> usize;
    fn form_count(&self) -> usize;
    fn script_count(&self) -> usize;
    fn last_modified(&self) -> String;
    fn scroll_metrics(&self) -> ScrollMetrics;

    /// The user's current text selection, empty when nothing is selected.
    fn selected_text(&self) -> String;

    /// First element matching `selector`.
    fn query_selector(&self, selector: &str) -> Option<ElementId>;

    fn scroll_into_view(&self, element: ElementId, behavior: ScrollBehavior, block: ScrollBlock);

    fn add_class(&self, element: ElementId, class: &str);

    /// Returns false if the element is gone or lacked the class.
    fn remove_class(&self, element: ElementId, class: &str) -> bool;

    /// Elements carrying `class`, in document order.
    fn elements_with_class(&self, class: &str) -> Vec<ElementId>;

    /// Appends a `div.extension-badge` with `text` to the body.
    fn append_badge(&self, text: &str) -> ElementId;

    /// Detaches an element. Returns false if it was already gone.
    fn remove_element(&self, element: ElementId) -> bool;

    /// Adds or replaces the `<style>` element with this id.
    fn inject_style(&self, id: &str, css: &str);

    /// Removes the `<style>` element with this id, if present.
    fn remove_style(&self, id: &str) -> bool;
}

/// Named highlight ranges (the CSS Custom Highlight API).
pub trait HighlightRegistry: Send + Sync {
    /// Older engines lack the API; every other call is then a no-op.
    fn is_supported(&self) -> bool;
    fn has(&self, name: &str) -> bool;
    fn set(&self, name: &str, ranges: Vec<TextRange>);
    fn delete(&self, name: &str) -> bool;
}

/// Reads the user's text selection in a tab.
#[async_trait]
pub trait SelectionProvider: Send + Sync {
    /// The selected text, empty when nothing is selected.
    async fn selected_text(&self, tab: TabId) -> ContextResult<String>;
}
