//! Extension kit simulator
//!
//! Boots every context of the extension against in-memory browser
//! capabilities, with both storage partitions persisted under a data
//! directory, and drives one popup/options session:
//! 1. Install (first run only) and start the background worker
//! 2. Load a content script into a simulated tab
//! 3. Highlight text, collect page info and flip a setting from the popup
//! 4. Export a backup from the options page
//!
//! Usage:
//!   extkit --data-dir ./extkit-data --url https://example.com/ --highlight example

use anyhow::{Context, Result};
use clap::Parser;
use extkit_contexts::sim::{FixedSelection, InMemoryHighlights, InMemoryPage, InMemoryTabs};
use extkit_contexts::{
    Background, BackgroundConfig, Backup, ContentHost, ContentScript, InstallReason, OptionsPage,
    Popup, ToastBoard, ToastConfig,
};
use extkit_messaging::{ExtensionBus, MessageSender, Messenger};
use extkit_observer::observer::mock::ManualObserver;
use extkit_observer::{AddedNode, DetectorConfig, MutationRecord};
use extkit_storage::{ExtensionStorage, FileBackend, FileBackendConfig, Partition, StorageService};
use extkit_types::constants::{CONTEXT_MENU_ID, EXTENSION_NAME, SETTINGS_KEY, VERSION};
use extkit_types::{ContextKind, TabId, TabInfo};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "extkit")]
#[command(about = "Run the extension contexts against a simulated browser")]
struct Args {
    /// Directory holding the persisted storage partitions
    #[arg(short, long, default_value = "extkit-data")]
    data_dir: PathBuf,

    /// URL of the simulated active tab
    #[arg(short, long, default_value = "https://example.com/")]
    url: String,

    /// Text selected on the page before highlighting
    #[arg(long, default_value = "example")]
    highlight: String,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("{} {} starting...", EXTENSION_NAME, VERSION);

    tokio::fs::create_dir_all(&args.data_dir)
        .await
        .with_context(|| format!("Failed to create {}", args.data_dir.display()))?;
    let storage = StorageService::new(ExtensionStorage::new(
        Arc::new(FileBackend::new(FileBackendConfig::local(args.data_dir.clone()))),
        Arc::new(FileBackend::new(FileBackendConfig::sync(args.data_dir.clone()))),
    ));
    let first_run = !storage.has_item(SETTINGS_KEY, Partition::Local).await;

    let bus = Arc::new(ExtensionBus::default());
    let tab = TabInfo::new(TabId::new(1), "Example Domain", args.url.clone());
    let tabs = Arc::new(InMemoryTabs::new(Some(tab.clone())));
    let toasts = Arc::new(ToastBoard::new(ToastConfig::default()));
    let selection = Arc::new(FixedSelection(args.highlight.clone()));

    // Background
    let background = Arc::new(Background::new(
        BackgroundConfig::default(),
        storage.clone(),
        tabs.clone(),
        selection.clone(),
    ));
    if first_run {
        background
            .on_installed(InstallReason::Install)
            .await
            .context("Failed to run install handler")?;
    }
    background.on_startup();
    let _background_task = background.start(&bus).await;

    // Content script
    let page = Arc::new(
        InMemoryPage::new(tab.title.clone(), args.url.clone())
            .with_text("Example Domain")
            .with_text("This domain is for use in illustrative examples in documents.")
            .with_element("#more")
            .with_counts(0, 1, 0, 0),
    );
    let observer = ManualObserver::new();
    let content = Arc::new(ContentScript::new(
        tab.clone(),
        storage.clone(),
        ContentHost {
            page,
            highlights: Arc::new(InMemoryHighlights::new()),
            observer: Arc::new(observer.clone()),
        },
        DetectorConfig::default(),
    ));
    let _content_task = content.init(&bus).await;

    // Popup
    let mut popup = Popup::new(
        storage.clone(),
        Messenger::new(bus.clone(), MessageSender::new(ContextKind::Popup)),
        tabs.clone(),
        selection,
        toasts.clone(),
    );
    popup.init().await.context("Failed to open popup")?;
    info!("Popup status: {}", popup.status_label());

    // User-input failures are already reported as toasts.
    let _ = popup.highlight_selection().await;
    if let Ok(info) = popup.page_info().await {
        info!("Page info:\n{}", info.summary());
    }

    // A late-loading widget adds a large container; the content script
    // re-applies its highlight once the burst settles.
    observer.emit(vec![MutationRecord::child_list(vec![AddedNode::element("section", 8)])]);
    tokio::time::sleep(Duration::from_millis(600)).await;
    info!("Content adaptation passes: {}", content.adaptation_passes());

    if let Some(selection) = background
        .on_context_menu_clicked(CONTEXT_MENU_ID, Some(&tab))
        .await
        .context("Failed to handle context menu click")?
    {
        info!("Context menu saw selection: {}", selection);
    }

    let _ = popup.set_setting("trackScroll", true).await;
    if content.on_scroll() {
        tokio::time::sleep(Duration::from_millis(600)).await;
    }

    // Options
    let mut options = OptionsPage::new(
        storage.clone(),
        Messenger::new(bus.clone(), MessageSender::new(ContextKind::Options)),
        toasts.clone(),
    );
    options.load().await;
    options.add_keyword(&args.highlight).await;

    let backup = options.export_data().await;
    let backup_path = args.data_dir.join(Backup::file_name());
    tokio::fs::write(&backup_path, backup.to_json_pretty()?)
        .await
        .with_context(|| format!("Failed to write backup to {}", backup_path.display()))?;
    info!("Backup written to {}", backup_path.display());

    let quota = storage.get_quota_info().await;
    info!(
        "Sync quota: {} of {} bytes ({:.2}%)",
        quota.bytes_in_use, quota.quota, quota.percent_used
    );
    let stats = popup.stats();
    info!(
        "Stats: {} highlights, {} screenshots, {} min",
        stats.highlight_count,
        stats.screenshot_count,
        stats.total_minutes()
    );

    info!(
        "Session finished; {} tab(s) opened, keep-alive ticks: {}",
        tabs.opened().len() + tabs.documents().len(),
        background.keep_alive().ticks()
    );
    Ok(())
}
