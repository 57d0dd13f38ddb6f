use extkit_contexts::sim::{
    FixedSelection, InMemoryHighlights, InMemoryPage, InMemoryTabs, RecordingNotifier,
};
use extkit_contexts::{
    Background, BackgroundConfig, ContentHost, ContentScript, ContextError, Popup, ToastKind,
};
use extkit_messaging::{ExtensionBus, MessageSender, Messenger};
use extkit_observer::DetectorConfig;
use extkit_observer::observer::mock::ManualObserver;
use extkit_storage::{ExtensionStorage, Partition, StorageService};
use extkit_types::constants::{HELP_URL, SETTINGS_KEY, STATS_KEY};
use extkit_types::{ContextKind, Settings, Stats, TabId, TabInfo};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const TAB: TabId = TabId::new(11);

struct Fixture {
    storage: StorageService,
    tabs: Arc<InMemoryTabs>,
    notifier: Arc<RecordingNotifier>,
    background: Arc<Background>,
    popup: Popup,
    _content: Option<Arc<ContentScript>>,
}

fn active_tab() -> TabInfo {
    TabInfo::new(TAB, "Example", "https://example.com/")
}

async fn fixture(tab: Option<TabInfo>, with_content: bool, selection: &str) -> Fixture {
    fixture_with(InMemoryTabs::new(tab), with_content, selection).await
}

async fn fixture_with(tabs: InMemoryTabs, with_content: bool, selection: &str) -> Fixture {
    let storage = StorageService::new(ExtensionStorage::in_memory());
    storage
        .set_item(SETTINGS_KEY, &Settings::default(), Partition::Local)
        .await;
    let bus = Arc::new(ExtensionBus::default());
    let tabs = Arc::new(tabs);

    let selection = Arc::new(FixedSelection(selection.to_string()));

    let background = Arc::new(Background::new(
        BackgroundConfig::default(),
        storage.clone(),
        tabs.clone(),
        selection.clone(),
    ));
    background.start(&bus).await;

    let content = if with_content {
        let page = InMemoryPage::new("Example", "https://example.com/")
            .with_text("Example Domain")
            .with_text("This domain is for use in illustrative examples.");
        let content = Arc::new(ContentScript::new(
            active_tab(),
            storage.clone(),
            ContentHost {
                page: Arc::new(page),
                highlights: Arc::new(InMemoryHighlights::new()),
                observer: Arc::new(ManualObserver::new()),
            },
            DetectorConfig::default(),
        ));
        content.init(&bus).await;
        Some(content)
    } else {
        None
    };

    let notifier = Arc::new(RecordingNotifier::new());
    let mut popup = Popup::new(
        storage.clone(),
        Messenger::new(bus.clone(), MessageSender::new(ContextKind::Popup)),
        tabs.clone(),
        selection,
        notifier.clone(),
    );
    popup.init().await.unwrap();

    Fixture {
        storage,
        tabs,
        notifier,
        background,
        popup,
        _content: content,
    }
}

// ── init ────────────────────────────────────────────────────────

#[tokio::test]
async fn init_loads_tab_settings_and_stats() {
    let f = fixture(Some(active_tab()), false, "").await;
    assert_eq!(f.popup.current_tab(), Some(&active_tab()));
    assert_eq!(f.popup.settings(), &Settings::default());
    assert_eq!(f.popup.stats(), &Stats::default());
    assert_eq!(f.popup.status_label(), "Active");
}

// ── highlight_selection ─────────────────────────────────────────

#[tokio::test]
async fn highlight_selection_counts_and_toasts() {
    let mut f = fixture(Some(active_tab()), true, "illustrative").await;
    f.popup.highlight_selection().await.unwrap();

    assert_eq!(f.popup.stats().highlight_count, 1);
    let stored: Stats = f.storage.get_item(STATS_KEY, Partition::Local).await.unwrap();
    assert_eq!(stored.highlight_count, 1);
    let toast = f.notifier.last().unwrap();
    assert_eq!(toast.kind, ToastKind::Success);
    assert_eq!(toast.message, "Text highlighted successfully!");
}

#[tokio::test]
async fn highlight_without_selection_warns() {
    let mut f = fixture(Some(active_tab()), true, "").await;
    let err = f.popup.highlight_selection().await.unwrap_err();
    assert!(matches!(err, ContextError::NoSelection));
    assert_eq!(f.notifier.last().unwrap().kind, ToastKind::Warning);
    assert_eq!(f.popup.stats().highlight_count, 0);
}

#[tokio::test]
async fn highlight_without_tab_reports_error() {
    let mut f = fixture(None, false, "text").await;
    let err = f.popup.highlight_selection().await.unwrap_err();
    assert!(matches!(err, ContextError::NoActiveTab));
    assert_eq!(
        f.notifier.messages(),
        vec!["No active tab found".to_string()]
    );
}

#[tokio::test]
async fn highlight_on_tab_without_content_script_fails_gracefully() {
    let mut f = fixture(Some(active_tab()), false, "text").await;
    let err = f.popup.highlight_selection().await.unwrap_err();
    assert!(matches!(err, ContextError::Messaging(_)));
    assert_eq!(f.notifier.last().unwrap().message, "Failed to highlight text");
}

// ── page_info / screenshot ──────────────────────────────────────

#[tokio::test]
async fn page_info_opens_summary_document() {
    let mut f = fixture(Some(active_tab()), true, "").await;
    let info = f.popup.page_info().await.unwrap();
    assert_eq!(info.word_count, 10);

    let documents = f.tabs.documents();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].0, "text/plain");
    assert!(documents[0].1.starts_with("Title: Example\nURL: https://example.com/\nWords: 10"));
    assert_eq!(f.notifier.last().unwrap().message, "Page info opened in new tab");
}

#[tokio::test]
async fn screenshot_counts() {
    let mut f = fixture(Some(active_tab()), false, "").await;
    let shot = f.popup.take_screenshot().await.unwrap();
    assert!(shot.file_name.starts_with("screenshot-"));
    assert!(shot.file_name.ends_with(".png"));
    assert!(shot.data_url.starts_with("data:image/png"));
    assert_eq!(f.popup.stats().screenshot_count, 1);
}

#[tokio::test]
async fn screenshot_failure_toasts() {
    let mut f = fixture_with(InMemoryTabs::new(Some(active_tab())).without_capture(), false, "").await;
    assert!(f.popup.take_screenshot().await.is_err());
    assert_eq!(f.notifier.last().unwrap().message, "Failed to take screenshot");
    assert_eq!(f.popup.stats().screenshot_count, 0);
}

// ── set_setting ─────────────────────────────────────────────────

#[tokio::test]
async fn set_setting_persists_and_notifies() {
    let mut f = fixture(Some(active_tab()), true, "").await;
    f.popup.set_setting("notifications", false).await.unwrap();

    let stored: Settings = f.storage.get_item(SETTINGS_KEY, Partition::Local).await.unwrap();
    assert!(!stored.notifications);
    assert!(!f.background.settings().await.notifications);
    assert_eq!(f.notifier.last().unwrap().message, "notifications disabled");
}

#[tokio::test]
async fn set_setting_survives_missing_content_script() {
    let mut f = fixture(Some(active_tab()), false, "").await;
    f.popup.set_setting("trackScroll", true).await.unwrap();
    assert_eq!(f.notifier.last().unwrap().message, "trackScroll enabled");
}

#[tokio::test]
async fn set_setting_rejects_non_flag() {
    let mut f = fixture(Some(active_tab()), false, "").await;
    assert!(f.popup.set_setting("fontSize", true).await.is_err());
    assert_eq!(f.notifier.last().unwrap().kind, ToastKind::Error);
}

#[tokio::test]
async fn disabling_updates_status() {
    let mut f = fixture(Some(active_tab()), false, "").await;
    f.popup.set_setting("enabled", false).await.unwrap();
    assert_eq!(f.popup.status_label(), "Disabled");
}

// ── Footer links ────────────────────────────────────────────────

#[tokio::test]
async fn footer_links_open_tabs() {
    let f = fixture(Some(active_tab()), false, "").await;
    f.popup.open_options().await.unwrap();
    f.popup.open_help().await.unwrap();
    assert_eq!(
        f.tabs.opened(),
        vec![
            "chrome-extension://extkit/options/options.html".to_string(),
            HELP_URL.to_string()
        ]
    );
}
