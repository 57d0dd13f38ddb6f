//! In-memory browser capabilities for tests and the command-line driver.

use crate::error::{ContextError, ContextResult};
use crate::highlight::{TextNode, TextRange};
use crate::host::{
    ContextMenuItem, ElementId, HighlightRegistry, PageDocument, ScrollMetrics, SelectionProvider,
    TabsApi,
};
use crate::toast::{Notifier, Toast, ToastKind};
use async_trait::async_trait;
use extkit_types::{ScrollBehavior, ScrollBlock, TabId, TabInfo};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

const EXTENSION_ORIGIN: &str = "chrome-extension://extkit";
const BADGE_CLASS: &str = "extension-badge";

#[derive(Debug, Default)]
struct SimElement {
    selector: Option<String>,
    text: String,
    classes: BTreeSet<String>,
}

#[derive(Debug, Default)]
struct Dom {
    next_id: u64,
    elements: BTreeMap<u64, SimElement>,
}

impl Dom {
    fn insert(&mut self, element: SimElement) -> ElementId {
        self.next_id += 1;
        self.elements.insert(self.next_id, element);
        ElementId(self.next_id)
    }
}

/// A static page.
pub struct InMemoryPage {
    title: String,
    url: String,
    nodes: Vec<TextNode>,
    counts: [usize; 4],
    last_modified: String,
    dom: Mutex<Dom>,
    selection: Mutex<String>,
    scroll: Mutex<ScrollMetrics>,
    styles: Mutex<BTreeMap<String, String>>,
    scrolled: Mutex<Vec<(String, ScrollBehavior, ScrollBlock)>>,
}

impl InMemoryPage {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            nodes: Vec::new(),
            counts: [0; 4],
            last_modified: "01/01/2026 00:00:00".to_string(),
            dom: Mutex::new(Dom::default()),
            selection: Mutex::new(String::new()),
            scroll: Mutex::new(ScrollMetrics::default()),
            styles: Mutex::new(BTreeMap::new()),
            scrolled: Mutex::new(Vec::new()),
        }
    }

    /// Appends a paragraph of text as one text node.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let id = self.nodes.len();
        self.nodes.push(TextNode::new(id, text));
        self
    }

    /// Makes `selector` match an element.
    pub fn with_element(mut self, selector: impl Into<String>) -> Self {
        self.dom.get_mut().unwrap().insert(SimElement {
            selector: Some(selector.into()),
            ..SimElement::default()
        });
        self
    }

    /// Image, link, form and script counts.
    pub fn with_counts(mut self, images: usize, links: usize, forms: usize, scripts: usize) -> Self {
        self.counts = [images, links, forms, scripts];
        self
    }

    pub fn with_last_modified(mut self, value: impl Into<String>) -> Self {
        self.last_modified = value.into();
        self
    }

    pub fn set_scroll(&self, metrics: ScrollMetrics) {
        *self.scroll.lock().unwrap() = metrics;
    }

    pub fn set_selection(&self, text: impl Into<String>) {
        *self.selection.lock().unwrap() = text.into();
    }

    /// Whether the element matching `selector` carries `class`.
    pub fn has_class(&self, selector: &str, class: &str) -> bool {
        self.dom
            .lock()
            .unwrap()
            .elements
            .values()
            .any(|e| e.selector.as_deref() == Some(selector) && e.classes.contains(class))
    }

    /// Text of every badge still attached.
    pub fn badges(&self) -> Vec<String> {
        self.dom
            .lock()
            .unwrap()
            .elements
            .values()
            .filter(|e| e.classes.contains(BADGE_CLASS))
            .map(|e| e.text.clone())
            .collect()
    }

    /// CSS of the style element with `id`, if injected.
    pub fn style(&self, id: &str) -> Option<String> {
        self.styles.lock().unwrap().get(id).cloned()
    }

    pub fn style_ids(&self) -> Vec<String> {
        self.styles.lock().unwrap().keys().cloned().collect()
    }

    /// Every successful scroll request, in order.
    pub fn scrolled(&self) -> Vec<(String, ScrollBehavior, ScrollBlock)> {
        self.scrolled.lock().unwrap().clone()
    }
}

impl PageDocument for InMemoryPage {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn url(&self) -> String {
        self.url.clone()
    }

    fn body_text(&self) -> String {
        self.nodes
            .iter()
            .map(|n| n.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn text_nodes(&self) -> Vec<TextNode> {
        self.nodes.clone()
    }

    fn image_count(&self) -> usize {
        self.counts[0]
    }

    fn link_count(&self) -> usize {
        self.counts[1]
    }

    fn form_count(&self) -> usize {
        self.counts[2]
    }

    fn script_count(&self) -> usize {
        self.counts[3]
    }

    fn last_modified(&self) -> String {
        self.last_modified.clone()
    }

    fn scroll_metrics(&self) -> ScrollMetrics {
        *self.scroll.lock().unwrap()
    }

    fn selected_text(&self) -> String {
        self.selection.lock().unwrap().clone()
    }

    fn query_selector(&self, selector: &str) -> Option<ElementId> {
        self.dom
            .lock()
            .unwrap()
            .elements
            .iter()
            .find(|(_, e)| e.selector.as_deref() == Some(selector))
            .map(|(id, _)| ElementId(*id))
    }

    fn scroll_into_view(&self, element: ElementId, behavior: ScrollBehavior, block: ScrollBlock) {
        let selector = self
            .dom
            .lock()
            .unwrap()
            .elements
            .get(&element.0)
            .and_then(|e| e.selector.clone())
            .unwrap_or_default();
        self.scrolled
            .lock()
            .unwrap()
            .push((selector, behavior, block));
    }

    fn add_class(&self, element: ElementId, class: &str) {
        if let Some(e) = self.dom.lock().unwrap().elements.get_mut(&element.0) {
            e.classes.insert(class.to_string());
        }
    }

    fn remove_class(&self, element: ElementId, class: &str) -> bool {
        self.dom
            .lock()
            .unwrap()
            .elements
            .get_mut(&element.0)
            .is_some_and(|e| e.classes.remove(class))
    }

    fn elements_with_class(&self, class: &str) -> Vec<ElementId> {
        self.dom
            .lock()
            .unwrap()
            .elements
            .iter()
            .filter(|(_, e)| e.classes.contains(class))
            .map(|(id, _)| ElementId(*id))
            .collect()
    }

    fn append_badge(&self, text: &str) -> ElementId {
        self.dom.lock().unwrap().insert(SimElement {
            selector: None,
            text: text.to_string(),
            classes: BTreeSet::from([BADGE_CLASS.to_string()]),
        })
    }

    fn remove_element(&self, element: ElementId) -> bool {
        self.dom.lock().unwrap().elements.remove(&element.0).is_some()
    }

    fn inject_style(&self, id: &str, css: &str) {
        self.styles
            .lock()
            .unwrap()
            .insert(id.to_string(), css.to_string());
    }

    fn remove_style(&self, id: &str) -> bool {
        self.styles.lock().unwrap().remove(id).is_some()
    }
}

/// Highlight registry backed by a map.
pub struct InMemoryHighlights {
    supported: bool,
    entries: Mutex<HashMap<String, Vec<TextRange>>>,
}

impl InMemoryHighlights {
    pub fn new() -> Self {
        Self {
            supported: true,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// An engine without the highlight API.
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    pub fn ranges(&self, name: &str) -> Option<Vec<TextRange>> {
        self.entries.lock().unwrap().get(name).cloned()
    }
}

impl Default for InMemoryHighlights {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightRegistry for InMemoryHighlights {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn has(&self, name: &str) -> bool {
        self.entries.lock().unwrap().contains_key(name)
    }

    fn set(&self, name: &str, ranges: Vec<TextRange>) {
        self.entries.lock().unwrap().insert(name.to_string(), ranges);
    }

    fn delete(&self, name: &str) -> bool {
        self.entries.lock().unwrap().remove(name).is_some()
    }
}

/// Tabs API over a fixed active tab.
pub struct InMemoryTabs {
    active: Option<TabInfo>,
    screenshot: Option<String>,
    next_id: Mutex<u32>,
    opened: Mutex<Vec<String>>,
    documents: Mutex<Vec<(String, String)>>,
    menus: Mutex<Vec<ContextMenuItem>>,
}

impl InMemoryTabs {
    pub fn new(active: Option<TabInfo>) -> Self {
        Self {
            active,
            screenshot: Some("data:image/png;base64,iVBORw0KGgo=".to_string()),
            next_id: Mutex::new(1000),
            opened: Mutex::new(Vec::new()),
            documents: Mutex::new(Vec::new()),
            menus: Mutex::new(Vec::new()),
        }
    }

    /// Capture fails, as it does on privileged pages.
    pub fn without_capture(mut self) -> Self {
        self.screenshot = None;
        self
    }

    /// URLs opened with `create_tab`.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    /// `(mime type, content)` of documents opened with `open_document`.
    pub fn documents(&self) -> Vec<(String, String)> {
        self.documents.lock().unwrap().clone()
    }

    /// Context-menu entries registered so far.
    pub fn menus(&self) -> Vec<ContextMenuItem> {
        self.menus.lock().unwrap().clone()
    }

    fn allocate(&self) -> TabId {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        TabId::new(*next)
    }
}

#[async_trait]
impl TabsApi for InMemoryTabs {
    async fn active_tab(&self) -> ContextResult<Option<TabInfo>> {
        Ok(self.active.clone())
    }

    async fn create_tab(&self, url: &str) -> ContextResult<TabId> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(self.allocate())
    }

    async fn open_document(&self, mime_type: &str, content: &str) -> ContextResult<TabId> {
        self.documents
            .lock()
            .unwrap()
            .push((mime_type.to_string(), content.to_string()));
        Ok(self.allocate())
    }

    async fn capture_visible_tab(&self) -> ContextResult<String> {
        self.screenshot
            .clone()
            .ok_or_else(|| ContextError::Tabs("cannot capture this page".to_string()))
    }

    fn extension_url(&self, path: &str) -> String {
        format!("{EXTENSION_ORIGIN}/{path}")
    }

    async fn create_context_menu(&self, item: &ContextMenuItem) -> ContextResult<()> {
        let mut menus = self.menus.lock().unwrap();
        if menus.iter().any(|m| m.id == item.id) {
            return Err(ContextError::Tabs(format!(
                "cannot create item with duplicate id {}",
                item.id
            )));
        }
        menus.push(item.clone());
        Ok(())
    }
}

/// Reports the same selection in every tab.
pub struct FixedSelection(pub String);

#[async_trait]
impl SelectionProvider for FixedSelection {
    async fn selected_text(&self, _tab: TabId) -> ContextResult<String> {
        Ok(self.0.clone())
    }
}

/// Remembers every toast.
#[derive(Default)]
pub struct RecordingNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Toast> {
        self.toasts.lock().unwrap().last().cloned()
    }

    pub fn messages(&self) -> Vec<String> {
        self.toasts().into_iter().map(|t| t.message).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, kind: ToastKind) {
        self.toasts.lock().unwrap().push(Toast {
            message: message.to_string(),
            kind,
        });
    }
}
