use extkit_contexts::sim::{InMemoryHighlights, InMemoryPage};
use extkit_contexts::{
    BASE_STYLES, ContentHost, ContentScript, HighlightRegistry, HighlightSummary, KeyPress,
    ScrollMetrics, ScrollPosition,
};
use extkit_messaging::{ExtensionBus, MessageSender, Messenger, MessagingError};
use extkit_observer::observer::mock::ManualObserver;
use extkit_observer::{AddedNode, DetectorConfig, MutationRecord};
use extkit_storage::{ExtensionStorage, Partition, StorageService};
use extkit_types::constants::{CUSTOM_CSS_KEY, HIGHLIGHT_NAME, SETTINGS_KEY, scroll_key};
use extkit_types::{
    ContextKind, CssInjection, HighlightRequest, Message, PageInfo, ScrollBehavior, ScrollBlock,
    ScrollRequest, Settings, TabId, TabInfo, UNKNOWN_MESSAGE_TYPE,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const TAB: TabId = TabId::new(3);

struct Fixture {
    bus: Arc<ExtensionBus>,
    storage: StorageService,
    page: Arc<InMemoryPage>,
    highlights: Arc<InMemoryHighlights>,
    observer: ManualObserver,
    content: Arc<ContentScript>,
}

fn page() -> InMemoryPage {
    InMemoryPage::new("Rust Book", "https://doc.rust-lang.org/book/")
        .with_text("Ownership is Rust's most unique feature")
        .with_text("  and it enables Rust to make memory safety guarantees ")
        .with_text("without a garbage collector.")
        .with_element("#ch04")
        .with_counts(4, 120, 1, 9)
        .with_last_modified("10/16/2026 09:30:00")
}

async fn fixture(settings: Option<Settings>) -> Fixture {
    fixture_with(settings, InMemoryHighlights::new()).await
}

async fn fixture_with(settings: Option<Settings>, highlights: InMemoryHighlights) -> Fixture {
    let storage = StorageService::new(ExtensionStorage::in_memory());
    if let Some(settings) = &settings {
        storage.set_item(SETTINGS_KEY, settings, Partition::Local).await;
    }
    let page = Arc::new(page());
    let highlights = Arc::new(highlights);
    let observer = ManualObserver::new();
    let content = Arc::new(ContentScript::new(
        TabInfo::new(TAB, "Rust Book", "https://doc.rust-lang.org/book/"),
        storage.clone(),
        ContentHost {
            page: page.clone(),
            highlights: highlights.clone(),
            observer: Arc::new(observer.clone()),
        },
        DetectorConfig::default(),
    ));
    Fixture {
        bus: Arc::new(ExtensionBus::default()),
        storage,
        page,
        highlights,
        observer,
        content,
    }
}

fn popup(bus: &Arc<ExtensionBus>) -> Messenger {
    Messenger::new(bus.clone(), MessageSender::new(ContextKind::Popup))
}

fn highlight(text: &str) -> Message {
    Message::HighlightText(HighlightRequest::new(text))
}

// ── Initialization ──────────────────────────────────────────────

#[tokio::test]
async fn stays_dormant_without_settings() {
    let f = fixture(None).await;
    assert!(f.content.init(&f.bus).await.is_none());
    assert!(!f.content.is_initialized());
    assert_eq!(f.bus.listener_count(), 0);
    assert_eq!(f.observer.live_count(), 0);
    assert!(f.page.style_ids().is_empty());
}

#[tokio::test]
async fn stays_dormant_when_disabled() {
    let disabled = Settings {
        enabled: false,
        ..Default::default()
    };
    let f = fixture(Some(disabled)).await;
    assert!(f.content.init(&f.bus).await.is_none());

    let err = popup(&f.bus)
        .send_to_tab(TAB, Message::GetPageInfo)
        .await
        .unwrap_err();
    assert!(matches!(err, MessagingError::NoReceiver { .. }));
}

#[tokio::test]
async fn enabled_init_injects_styles_and_observes() {
    let f = fixture(Some(Settings::default())).await;
    assert!(f.content.init(&f.bus).await.is_some());
    assert!(f.content.is_initialized());
    assert_eq!(f.page.style("extension-base-styles").as_deref(), Some(BASE_STYLES));
    assert_eq!(f.observer.live_count(), 1);
    assert!(f.content.detector_active());
}

#[tokio::test]
async fn init_twice_is_noop() {
    let f = fixture(Some(Settings::default())).await;
    assert!(f.content.init(&f.bus).await.is_some());
    assert!(f.content.init(&f.bus).await.is_none());
    assert_eq!(f.bus.listener_count(), 1);
    assert_eq!(f.observer.live_count(), 1);
}

#[tokio::test]
async fn custom_css_injected_when_enabled() {
    let settings = Settings {
        custom_css: true,
        ..Default::default()
    };
    let f = fixture(Some(settings)).await;
    f.storage
        .set_item(CUSTOM_CSS_KEY, "body { font-size: 20px; }", Partition::Local)
        .await;
    f.content.init(&f.bus).await;
    assert_eq!(
        f.page.style("extension-custom-css").as_deref(),
        Some("body { font-size: 20px; }")
    );
}

#[tokio::test]
async fn custom_css_ignored_when_flag_off() {
    let f = fixture(Some(Settings::default())).await;
    f.storage
        .set_item(CUSTOM_CSS_KEY, "body { color: red; }", Partition::Local)
        .await;
    f.content.init(&f.bus).await;
    assert_eq!(f.page.style("extension-custom-css"), None);
}

// ── HIGHLIGHT_TEXT ──────────────────────────────────────────────

#[tokio::test]
async fn highlight_toggles() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    let popup = popup(&f.bus);

    let response = popup.send_to_tab(TAB, highlight("  rust ")).await.unwrap();
    let summary: HighlightSummary = response.data_as().unwrap().unwrap();
    assert_eq!(summary, HighlightSummary { matches: 2, cleared: false });
    assert_eq!(f.highlights.ranges(HIGHLIGHT_NAME).map(|r| r.len()), Some(2));
    assert_eq!(f.content.active_highlight().as_deref(), Some("rust"));

    let response = popup.send_to_tab(TAB, highlight("rust")).await.unwrap();
    let summary: HighlightSummary = response.data_as().unwrap().unwrap();
    assert!(summary.cleared);
    assert!(f.highlights.ranges(HIGHLIGHT_NAME).is_none());
    assert_eq!(f.content.active_highlight(), None);
}

#[tokio::test]
async fn permanent_highlight_does_not_toggle() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    let popup = popup(&f.bus);
    let mut request = HighlightRequest::new("garbage");
    request.permanent = Some(true);
    request.color = Some("#00ff00".into());

    for _ in 0..2 {
        let response = popup
            .send_to_tab(TAB, Message::HighlightText(request.clone()))
            .await
            .unwrap();
        let summary: HighlightSummary = response.data_as().unwrap().unwrap();
        assert_eq!(summary.matches, 1);
    }
    assert!(f.page.style("extension-highlight-color").unwrap().contains("#00ff00"));
}

#[tokio::test]
async fn highlight_blank_text_fails() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    let response = popup(&f.bus).send_to_tab(TAB, highlight("   ")).await.unwrap();
    assert!(!response.success);
}

#[tokio::test]
async fn highlight_without_api_still_succeeds() {
    let f = fixture_with(Some(Settings::default()), InMemoryHighlights::unsupported()).await;
    f.content.init(&f.bus).await;
    let response = popup(&f.bus).send_to_tab(TAB, highlight("memory")).await.unwrap();
    assert!(response.success);
    assert_eq!(f.content.active_highlight(), None);
}

// ── GET_PAGE_INFO / SCROLL_TO_ELEMENT / INJECT_CSS ──────────────

#[tokio::test]
async fn page_info_reports_metrics() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    let response = popup(&f.bus).send_to_tab(TAB, Message::GetPageInfo).await.unwrap();
    let info: PageInfo = response.data_as().unwrap().unwrap();
    assert_eq!(
        info,
        PageInfo {
            title: "Rust Book".into(),
            url: "https://doc.rust-lang.org/book/".into(),
            word_count: 19,
            images: 4,
            links: 120,
            forms: 1,
            scripts: 9,
            last_modified: "10/16/2026 09:30:00".into(),
        }
    );
}

#[tokio::test]
async fn scroll_to_element_uses_defaults() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    let popup = popup(&f.bus);

    let found = popup
        .send_to_tab(TAB, Message::ScrollToElement(ScrollRequest::new("#ch04")))
        .await
        .unwrap();
    let missing = popup
        .send_to_tab(TAB, Message::ScrollToElement(ScrollRequest::new("#nope")))
        .await
        .unwrap();
    assert!(found.success && missing.success);
    assert_eq!(
        f.page.scrolled(),
        vec![("#ch04".to_string(), ScrollBehavior::Smooth, ScrollBlock::Center)]
    );
}

#[tokio::test(start_paused = true)]
async fn scrolled_element_is_marked_for_two_seconds() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    popup(&f.bus)
        .send_to_tab(TAB, Message::ScrollToElement(ScrollRequest::new("#ch04")))
        .await
        .unwrap();
    assert!(f.page.has_class("#ch04", "extension-highlight"));

    tokio::time::sleep(Duration::from_millis(1_900)).await;
    assert!(f.page.has_class("#ch04", "extension-highlight"));
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!f.page.has_class("#ch04", "extension-highlight"));
}

#[tokio::test]
async fn inject_css_adds_and_removes() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    let popup = popup(&f.bus);

    popup
        .send_to_tab(
            TAB,
            Message::InjectCss(CssInjection {
                css: "p { color: blue; }".into(),
                remove: None,
            }),
        )
        .await
        .unwrap();
    assert_eq!(
        f.page.style("extension-injected-css").as_deref(),
        Some("p { color: blue; }")
    );

    popup
        .send_to_tab(
            TAB,
            Message::InjectCss(CssInjection {
                css: String::new(),
                remove: Some(true),
            }),
        )
        .await
        .unwrap();
    assert_eq!(f.page.style("extension-injected-css"), None);
}

#[tokio::test]
async fn background_only_messages_are_unknown() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    let response = popup(&f.bus).send_to_tab(TAB, Message::GetTabInfo).await.unwrap();
    assert_eq!(response.error.as_deref(), Some(UNKNOWN_MESSAGE_TYPE));
}

// ── SETTINGS_UPDATED ────────────────────────────────────────────

#[tokio::test]
async fn disabling_stops_detector_and_clears_highlight() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    let popup = popup(&f.bus);
    popup.send_to_tab(TAB, highlight("Rust")).await.unwrap();

    let disabled = Settings {
        enabled: false,
        ..Default::default()
    };
    popup
        .notify_tab(TAB, Message::SettingsUpdated(disabled))
        .await
        .unwrap();

    assert!(!f.content.detector_active());
    assert_eq!(f.observer.live_count(), 0);
    assert!(f.highlights.ranges(HIGHLIGHT_NAME).is_none());
    assert_eq!(f.page.style("extension-base-styles"), None);

    popup
        .notify_tab(TAB, Message::SettingsUpdated(Settings::default()))
        .await
        .unwrap();
    assert!(f.content.detector_active());
    assert_eq!(f.observer.live_count(), 1);
}

// ── DOM changes ─────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn significant_change_reapplies_highlight() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    popup(&f.bus).send_to_tab(TAB, highlight("rust")).await.unwrap();
    f.highlights.set(HIGHLIGHT_NAME, Vec::new());

    f.observer
        .emit(vec![MutationRecord::child_list(vec![AddedNode::element("main", 12)])]);
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(f.content.adaptation_passes(), 1);
    assert_eq!(f.highlights.ranges(HIGHLIGHT_NAME).map(|r| r.len()), Some(2));
}

#[tokio::test(start_paused = true)]
async fn insignificant_change_is_ignored() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    f.observer
        .emit(vec![MutationRecord::child_list(vec![AddedNode::element("li", 40)])]);
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(f.content.adaptation_passes(), 0);
}

// ── Page stats badge ────────────────────────────────────────────

fn show_stats() -> Settings {
    let mut settings = Settings::default();
    settings.set_flag("showStats", true).unwrap();
    settings
}

#[tokio::test(start_paused = true)]
async fn stats_badge_shown_for_five_seconds() {
    let f = fixture(Some(show_stats())).await;
    f.content.init(&f.bus).await;
    assert_eq!(f.page.badges(), vec!["Words: 19".to_string()]);

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert_eq!(f.page.badges().len(), 1);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(f.page.badges().is_empty());
}

#[tokio::test]
async fn no_badge_without_show_stats() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    assert!(f.page.badges().is_empty());
}

// ── Keyboard shortcuts ──────────────────────────────────────────

#[tokio::test]
async fn alt_e_toggles_extension_ui() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;

    assert!(f.content.on_key_down(&KeyPress::alt("e")));
    assert_eq!(f.page.badges(), vec!["Words: 19".to_string()]);

    assert!(f.content.on_key_down(&KeyPress::alt("e")));
    assert!(f.page.badges().is_empty());
}

#[tokio::test]
async fn alt_e_clears_element_marks() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    popup(&f.bus)
        .send_to_tab(TAB, Message::ScrollToElement(ScrollRequest::new("#ch04")))
        .await
        .unwrap();

    f.content.on_key_down(&KeyPress::alt("e"));
    assert!(!f.page.has_class("#ch04", "extension-highlight"));
    assert!(f.page.badges().is_empty());
}

#[tokio::test]
async fn alt_h_toggles_selection_highlight() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    f.page.set_selection(" memory safety ");

    assert!(f.content.on_key_down(&KeyPress::alt("h")));
    assert_eq!(f.content.active_highlight().as_deref(), Some("memory safety"));
    assert!(f.highlights.has(HIGHLIGHT_NAME));

    assert!(f.content.on_key_down(&KeyPress::alt("h")));
    assert_eq!(f.content.active_highlight(), None);
    assert!(!f.highlights.has(HIGHLIGHT_NAME));
}

#[tokio::test]
async fn alt_h_without_selection_does_nothing() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    assert!(f.content.on_key_down(&KeyPress::alt("h")));
    assert_eq!(f.content.active_highlight(), None);
}

#[tokio::test]
async fn shortcuts_need_alt_and_an_active_script() {
    let dormant = fixture(None).await;
    dormant.content.init(&dormant.bus).await;
    assert!(!dormant.content.on_key_down(&KeyPress::alt("e")));
    assert!(dormant.page.badges().is_empty());

    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    assert!(!f.content.on_key_down(&KeyPress::new("e")));
    assert!(!f.content.on_key_down(&KeyPress::alt("x")));
    assert!(f.page.badges().is_empty());
}

// ── Scroll tracking ─────────────────────────────────────────────

#[tokio::test]
async fn scroll_not_recorded_unless_tracking() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    assert!(!f.content.record_scroll().await);
}

#[tokio::test]
async fn scroll_recorded_per_url() {
    let settings = Settings {
        track_scroll: true,
        ..Default::default()
    };
    let f = fixture(Some(settings)).await;
    f.content.init(&f.bus).await;
    f.page.set_scroll(ScrollMetrics {
        scroll_y: 500.0,
        scroll_height: 3000.0,
        viewport_height: 1000.0,
    });

    assert!(f.content.record_scroll().await);
    let saved: ScrollPosition = f
        .storage
        .get_item(&scroll_key("https://doc.rust-lang.org/book/"), Partition::Local)
        .await
        .unwrap();
    assert_eq!(saved.position, 500.0);
    assert_eq!(saved.percent, 25);
}

#[tokio::test(start_paused = true)]
async fn scroll_events_are_debounced() {
    let settings = Settings {
        track_scroll: true,
        ..Default::default()
    };
    let f = fixture(Some(settings)).await;
    f.content.init(&f.bus).await;
    let mut changes = f.storage.subscribe(Partition::Local);
    let key = scroll_key("https://doc.rust-lang.org/book/");

    for y in [100.0, 300.0, 500.0] {
        f.page.set_scroll(ScrollMetrics {
            scroll_y: y,
            scroll_height: 3000.0,
            viewport_height: 1000.0,
        });
        assert!(f.content.on_scroll());
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!f.storage.has_item(&key, Partition::Local).await);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let saved: ScrollPosition = f.storage.get_item(&key, Partition::Local).await.unwrap();
    assert_eq!(saved.position, 500.0);
    assert_eq!(saved.percent, 25);

    // Exactly one write precedes the marker.
    f.storage.set_item("marker", &true, Partition::Local).await;
    assert!(changes.recv().await.unwrap().contains_key(&key));
    assert!(changes.recv().await.unwrap().contains_key("marker"));
}

#[tokio::test]
async fn scroll_events_ignored_unless_tracking() {
    let f = fixture(Some(Settings::default())).await;
    f.content.init(&f.bus).await;
    assert!(!f.content.on_scroll());
}

#[test]
fn scroll_percent_of_unscrollable_page_is_zero() {
    let metrics = ScrollMetrics {
        scroll_y: 0.0,
        scroll_height: 800.0,
        viewport_height: 900.0,
    };
    assert_eq!(metrics.percent(), 0);
}
