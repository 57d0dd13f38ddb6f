//! The per-tab content script.

use crate::highlight::{HighlightOutcome, Highlighter};
use crate::host::{HighlightRegistry, KeyPress, PageDocument};
use async_trait::async_trait;
use extkit_messaging::{ExtensionBus, MessageHandler, MessageSender, serve};
use extkit_observer::{ChangeObserver, DetectorConfig, MutationDetector, ObserveTarget};
use extkit_storage::{Partition, StorageService};
use extkit_types::constants::{CUSTOM_CSS_KEY, HIGHLIGHT_NAME, SETTINGS_KEY, scroll_key};
use extkit_types::{
    ContextKind, CssInjection, HighlightRequest, Message, MessageResponse, PageInfo, ScrollRequest,
    Settings, TabInfo, now_millis,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Styles every active content script injects.
pub const BASE_STYLES: &str = r#"::highlight(extension-highlight) {
  background-color: #ffeb3b;
  color: inherit;
  text-decoration: none;
}
.extension-tooltip {
  position: absolute !important;
  background: #333 !important;
  color: white !important;
  padding: 8px 12px !important;
  border-radius: 4px !important;
  z-index: 10000 !important;
  pointer-events: none !important;
}
.extension-badge {
  position: fixed !important;
  top: 20px !important;
  right: 20px !important;
  background: #4CAF50 !important;
  color: white !important;
  z-index: 10000 !important;
}"#;

const BASE_STYLE_ID: &str = "extension-base-styles";
const CUSTOM_STYLE_ID: &str = "extension-custom-css";
const INJECTED_STYLE_ID: &str = "extension-injected-css";
const HIGHLIGHT_COLOR_STYLE_ID: &str = "extension-highlight-color";

/// Class put on an element scrolled to by `SCROLL_TO_ELEMENT`, and swept
/// by the Alt+E toggle.
const HIGHLIGHT_CLASS: &str = "extension-highlight";
const BADGE_CLASS: &str = "extension-badge";

const ELEMENT_HIGHLIGHT_DURATION: Duration = Duration::from_secs(2);
const BADGE_DURATION: Duration = Duration::from_secs(5);
const SCROLL_DEBOUNCE: Duration = Duration::from_millis(500);

/// Page-side capabilities a content script needs.
#[derive(Clone)]
pub struct ContentHost {
    pub page: Arc<dyn PageDocument>,
    pub highlights: Arc<dyn HighlightRegistry>,
    pub observer: Arc<dyn ChangeObserver>,
}

/// Data of a successful `HIGHLIGHT_TEXT` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSummary {
    pub matches: usize,
    pub cleared: bool,
}

/// Saved under `scroll_<url>` when scroll tracking is on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollPosition {
    pub position: f64,
    pub percent: u32,
    pub timestamp: u64,
}

#[derive(Default)]
struct ContentState {
    settings: Settings,
    initialized: bool,
    active_highlight: Option<String>,
    adaptation_passes: u64,
}

/// State shared with the detector and scroll worker tasks.
struct Shared {
    page: Arc<dyn PageDocument>,
    highlighter: Highlighter,
    storage: StorageService,
    scroll_key: String,
    state: Mutex<ContentState>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ContentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn record_scroll(&self) -> bool {
        let tracking = self.state().settings.track_scroll;
        if !tracking {
            return false;
        }
        let metrics = self.page.scroll_metrics();
        let position = ScrollPosition {
            position: metrics.scroll_y,
            percent: metrics.percent(),
            timestamp: now_millis(),
        };
        self.storage
            .set_item(&self.scroll_key, &position, Partition::Local)
            .await
    }

    /// Highlights `text`, or clears the highlight if one is showing.
    fn toggle_highlight(&self, text: &str) -> HighlightOutcome {
        let outcome = self.highlighter.toggle(self.page.as_ref(), text);
        self.note_highlight(text, outcome);
        outcome
    }

    fn note_highlight(&self, text: &str, outcome: HighlightOutcome) {
        match outcome {
            HighlightOutcome::Applied(_) => {
                self.state().active_highlight = Some(text.to_string());
            }
            HighlightOutcome::Cleared => self.state().active_highlight = None,
            HighlightOutcome::NotFound | HighlightOutcome::Unsupported(_) => {}
        }
    }

    /// Shows a word-count badge for a few seconds.
    fn show_page_stats(&self) {
        let words = self.page.body_text().split_whitespace().count();
        let badge = self.page.append_badge(&format!("Words: {words}"));
        let page = self.page.clone();
        after(BADGE_DURATION, move || {
            page.remove_element(badge);
        });
    }

    /// Alt+E: hides extension UI if any is showing, otherwise shows the
    /// stats badge.
    fn toggle_ui(&self) {
        let page = self.page.as_ref();
        let highlighted = page.elements_with_class(HIGHLIGHT_CLASS);
        let badges = page.elements_with_class(BADGE_CLASS);
        if highlighted.is_empty() && badges.is_empty() {
            self.show_page_stats();
            return;
        }
        for element in highlighted {
            page.remove_class(element, HIGHLIGHT_CLASS);
        }
        for badge in badges {
            page.remove_element(badge);
        }
    }

    /// Runs after a significant DOM change: new content may contain the
    /// highlighted text.
    fn readapt(&self) {
        let text = {
            let mut state = self.state();
            state.adaptation_passes += 1;
            state.active_highlight.clone()
        };
        if let Some(text) = text {
            let outcome = self.highlighter.apply(self.page.as_ref(), &text);
            debug!("Re-applied highlight after DOM change: {:?}", outcome);
        }
    }
}

struct ScrollWorker {
    events: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

/// The content script loaded in one tab.
pub struct ContentScript {
    tab: TabInfo,
    shared: Arc<Shared>,
    detector: Mutex<MutationDetector>,
    scroll_worker: Mutex<Option<ScrollWorker>>,
}

impl ContentScript {
    pub fn new(
        tab: TabInfo,
        storage: StorageService,
        host: ContentHost,
        detector_config: DetectorConfig,
    ) -> Self {
        let scroll_key = scroll_key(&tab.url);
        Self {
            tab,
            shared: Arc::new(Shared {
                page: host.page,
                highlighter: Highlighter::new(host.highlights, HIGHLIGHT_NAME),
                storage,
                scroll_key,
                state: Mutex::new(ContentState::default()),
            }),
            detector: Mutex::new(MutationDetector::new(host.observer, detector_config)),
            scroll_worker: Mutex::new(None),
        }
    }

    pub fn tab(&self) -> &TabInfo {
        &self.tab
    }

    /// Loads settings and, when the extension is enabled, injects styles,
    /// starts the DOM-change detector and begins serving tab messages.
    ///
    /// Returns the receive loop's handle, or `None` when the script stays
    /// dormant (disabled, no stored settings, or already initialized).
    pub async fn init(self: &Arc<Self>, bus: &ExtensionBus) -> Option<JoinHandle<()>> {
        if self.is_initialized() {
            return None;
        }
        info!("Content script initializing on: {}", self.tab.url);

        let stored: Option<Settings> = self.shared.storage.get_item(SETTINGS_KEY, Partition::Local).await;
        let Some(settings) = stored.filter(|s| s.enabled) else {
            info!("Extension is disabled, content script will not run");
            return None;
        };
        let custom_css = self.load_custom_css(&settings).await;

        {
            let mut state = self.shared.state();
            state.settings = settings;
            state.initialized = true;
        }
        let listener = bus.listen(ContextKind::Content, Some(self.tab.id));
        self.activate(custom_css.as_deref());
        info!("Content script initialized successfully");
        Some(serve(listener, self.clone()))
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.state().initialized
    }

    pub fn settings(&self) -> Settings {
        self.shared.state().settings.clone()
    }

    /// How many times the detector reported a significant change.
    pub fn adaptation_passes(&self) -> u64 {
        self.shared.state().adaptation_passes
    }

    pub fn active_highlight(&self) -> Option<String> {
        self.shared.state().active_highlight.clone()
    }

    pub fn detector_active(&self) -> bool {
        self.detector().is_active()
    }

    /// Current page metrics.
    pub fn page_info(&self) -> PageInfo {
        let page = &self.shared.page;
        PageInfo {
            title: page.title(),
            url: page.url(),
            word_count: page.body_text().split_whitespace().count(),
            images: page.image_count(),
            links: page.link_count(),
            forms: page.form_count(),
            scripts: page.script_count(),
            last_modified: page.last_modified(),
        }
    }

    /// Saves the scroll position now when tracking is on. Returns whether
    /// a position was stored.
    pub async fn record_scroll(&self) -> bool {
        self.shared.record_scroll().await
    }

    /// A page scroll event. With tracking on, the position is saved once
    /// scrolling has paused for half a second. Returns whether the event
    /// was queued.
    pub fn on_scroll(&self) -> bool {
        if !self.shared.state().settings.track_scroll {
            return false;
        }
        self.scroll_worker()
            .as_ref()
            .is_some_and(|worker| worker.events.send(()).is_ok())
    }

    /// A key press on the page. Alt+H toggles a highlight of the current
    /// selection and Alt+E toggles the extension's page UI. Returns whether
    /// the key was consumed.
    pub fn on_key_down(&self, key: &KeyPress) -> bool {
        if !key.alt || !self.is_active() {
            return false;
        }
        match key.key.as_str() {
            "e" => {
                self.shared.toggle_ui();
                true
            }
            "h" => {
                let selection = self.shared.page.selected_text();
                let text = selection.trim();
                if !text.is_empty() {
                    let outcome = self.shared.toggle_highlight(text);
                    debug!("Alt+H highlight: {:?}", outcome);
                }
                true
            }
            _ => false,
        }
    }

    fn is_active(&self) -> bool {
        let state = self.shared.state();
        state.initialized && state.settings.enabled
    }

    fn detector(&self) -> MutexGuard<'_, MutationDetector> {
        self.detector.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn scroll_worker(&self) -> MutexGuard<'_, Option<ScrollWorker>> {
        self.scroll_worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn load_custom_css(&self, settings: &Settings) -> Option<String> {
        if !settings.custom_css {
            return None;
        }
        self.shared
            .storage
            .get_item::<String>(CUSTOM_CSS_KEY, Partition::Local)
            .await
            .filter(|css| !css.trim().is_empty())
    }

    fn activate(&self, custom_css: Option<&str>) {
        let page = &self.shared.page;
        page.inject_style(BASE_STYLE_ID, BASE_STYLES);
        if let Some(css) = custom_css {
            page.inject_style(CUSTOM_STYLE_ID, css);
        }
        let shared = self.shared.clone();
        self.detector()
            .start(move || shared.readapt(), ObserveTarget::DocumentBody);

        let (events, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(debounce_scroll(rx, SCROLL_DEBOUNCE, self.shared.clone()));
        if let Some(previous) = self.scroll_worker().replace(ScrollWorker { events, task }) {
            previous.task.abort();
        }

        if self.shared.state().settings.flag("showStats") == Some(true) {
            self.shared.show_page_stats();
        }
    }

    fn deactivate(&self) {
        self.detector().stop();
        if let Some(worker) = self.scroll_worker().take() {
            worker.task.abort();
        }
        self.shared.highlighter.clear();
        self.shared.state().active_highlight = None;
        let page = &self.shared.page;
        for badge in page.elements_with_class(BADGE_CLASS) {
            page.remove_element(badge);
        }
        page.remove_style(BASE_STYLE_ID);
        page.remove_style(CUSTOM_STYLE_ID);
    }

    fn highlight(&self, request: HighlightRequest) -> MessageResponse {
        let text = request.text.trim();
        if text.is_empty() {
            return MessageResponse::failure("No text to highlight");
        }
        let page = self.shared.page.as_ref();
        if let Some(color) = &request.color {
            page.inject_style(
                HIGHLIGHT_COLOR_STYLE_ID,
                &format!("::highlight({HIGHLIGHT_NAME}) {{ background-color: {color}; }}"),
            );
        }

        let outcome = if request.permanent == Some(true) {
            let outcome = self.shared.highlighter.apply(page, text);
            self.shared.note_highlight(text, outcome);
            outcome
        } else {
            self.shared.toggle_highlight(text)
        };

        let summary = HighlightSummary {
            matches: outcome.matches(),
            cleared: outcome == HighlightOutcome::Cleared,
        };
        MessageResponse::ok_with(&summary)
            .unwrap_or_else(|_| MessageResponse::failure("Failed to highlight text"))
    }

    fn scroll_to(&self, request: ScrollRequest) -> MessageResponse {
        let page = &self.shared.page;
        let Some(element) = page.query_selector(&request.selector) else {
            debug!("No element matches {}", request.selector);
            return MessageResponse::ok();
        };
        page.scroll_into_view(
            element,
            request.behavior.unwrap_or_default(),
            request.block.unwrap_or_default(),
        );
        page.add_class(element, HIGHLIGHT_CLASS);
        let page = page.clone();
        after(ELEMENT_HIGHLIGHT_DURATION, move || {
            page.remove_class(element, HIGHLIGHT_CLASS);
        });
        MessageResponse::ok()
    }

    fn inject_css(&self, injection: CssInjection) -> MessageResponse {
        let page = &self.shared.page;
        if injection.remove == Some(true) {
            page.remove_style(INJECTED_STYLE_ID);
        } else {
            page.inject_style(INJECTED_STYLE_ID, &injection.css);
        }
        MessageResponse::ok()
    }

    async fn apply_settings(&self, settings: Settings) -> MessageResponse {
        let custom_css = self.load_custom_css(&settings).await;
        let was_enabled = {
            let mut state = self.shared.state();
            let was = state.settings.enabled;
            state.settings = settings;
            was
        };
        let enabled = self.shared.state().settings.enabled;
        match (was_enabled, enabled) {
            (false, true) => {
                info!("Extension enabled; content script resuming");
                self.activate(custom_css.as_deref());
            }
            (true, false) => {
                info!("Extension disabled; content script pausing");
                self.deactivate();
            }
            _ => {}
        }
        MessageResponse::ok()
    }
}

#[async_trait]
impl MessageHandler for ContentScript {
    async fn handle(&self, message: Message, _sender: &MessageSender) -> MessageResponse {
        match message {
            Message::HighlightText(request) => self.highlight(request),
            Message::GetPageInfo => MessageResponse::ok_with(&self.page_info())
                .unwrap_or_else(|_| MessageResponse::failure("Failed to get page info")),
            Message::ScrollToElement(request) => self.scroll_to(request),
            Message::InjectCss(injection) => self.inject_css(injection),
            Message::SettingsUpdated(settings) => self.apply_settings(settings).await,
            Message::GetTabInfo | Message::ToggleFeature(_) | Message::SaveData(_) => {
                MessageResponse::unknown_type()
            }
        }
    }
}

/// Runs `f` once `delay` has elapsed.
fn after<F>(delay: Duration, f: F)
where
    F: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        f();
    });
}

/// Saves the scroll position once events stop arriving for `delay`.
async fn debounce_scroll(
    mut events: mpsc::UnboundedReceiver<()>,
    delay: Duration,
    shared: Arc<Shared>,
) {
    while events.recv().await.is_some() {
        loop {
            tokio::select! {
                next = events.recv() => match next {
                    Some(()) => {}
                    None => return,
                },
                () = tokio::time::sleep(delay) => break,
            }
        }
        if shared.record_scroll().await {
            debug!("Saved scroll position for {}", shared.scroll_key);
        }
    }
}
