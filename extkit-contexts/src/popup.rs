//! The toolbar popup.

use crate::error::{ContextError, ContextResult};
use crate::host::{SelectionProvider, TabsApi};
use crate::toast::{Notifier, ToastKind};
use extkit_messaging::Messenger;
use extkit_storage::{Partition, StorageService};
use extkit_types::constants::{HELP_URL, OPTIONS_PAGE, SETTINGS_KEY, STATS_KEY};
use extkit_types::{
    HighlightRequest, Message, MessageResponse, PageInfo, Settings, Stats, TabId, TabInfo,
    now_millis,
};
use std::sync::Arc;
use tracing::{error, info};

/// A captured screenshot, ready to be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screenshot {
    pub file_name: String,
    pub data_url: String,
}

/// The popup page, alive while it is open.
pub struct Popup {
    storage: StorageService,
    messenger: Messenger,
    tabs: Arc<dyn TabsApi>,
    selection: Arc<dyn SelectionProvider>,
    notifier: Arc<dyn Notifier>,
    current_tab: Option<TabInfo>,
    settings: Settings,
    stats: Stats,
}

impl Popup {
    pub fn new(
        storage: StorageService,
        messenger: Messenger,
        tabs: Arc<dyn TabsApi>,
        selection: Arc<dyn SelectionProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            storage,
            messenger,
            tabs,
            selection,
            notifier,
            current_tab: None,
            settings: Settings::default(),
            stats: Stats::default(),
        }
    }

    /// Loads the active tab, settings and stats.
    pub async fn init(&mut self) -> ContextResult<()> {
        match self.tabs.active_tab().await {
            Ok(tab) => self.current_tab = tab,
            Err(e) => {
                error!("Failed to initialize popup: {}", e);
                self.notifier
                    .notify("Failed to initialize extension", ToastKind::Error);
                return Err(e);
            }
        }
        self.settings = self
            .storage
            .get_with_default(SETTINGS_KEY, Settings::default(), Partition::Local)
            .await;
        self.stats = self
            .storage
            .get_with_default(STATS_KEY, Stats::default(), Partition::Local)
            .await;
        info!("Popup initialized successfully");
        Ok(())
    }

    pub fn current_tab(&self) -> Option<&TabInfo> {
        self.current_tab.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Status line shown in the header.
    pub fn status_label(&self) -> &'static str {
        if self.settings.enabled { "Active" } else { "Disabled" }
    }

    fn require_tab(&self) -> ContextResult<TabId> {
        match &self.current_tab {
            Some(tab) => Ok(tab.id),
            None => {
                self.notifier.notify("No active tab found", ToastKind::Error);
                Err(ContextError::NoActiveTab)
            }
        }
    }

    async fn save_stats(&self) {
        if !self
            .storage
            .set_item(STATS_KEY, &self.stats, Partition::Local)
            .await
        {
            error!("Failed to save stats");
        }
    }

    /// Highlights the page's selected text in the active tab.
    pub async fn highlight_selection(&mut self) -> ContextResult<()> {
        let tab = self.require_tab()?;
        let result = self.request_highlight(tab).await;
        match &result {
            Ok(()) => {
                self.stats.highlight_count += 1;
                self.save_stats().await;
                self.notifier
                    .notify("Text highlighted successfully!", ToastKind::Success);
            }
            Err(ContextError::NoSelection) => self
                .notifier
                .notify("Please select text on the page first", ToastKind::Warning),
            Err(e) => {
                error!("Error highlighting text: {}", e);
                self.notifier.notify("Failed to highlight text", ToastKind::Error);
            }
        }
        result
    }

    async fn request_highlight(&self, tab: TabId) -> ContextResult<()> {
        let text = self.selection.selected_text(tab).await?;
        if text.trim().is_empty() {
            return Err(ContextError::NoSelection);
        }
        let response = self
            .messenger
            .send_to_tab(tab, Message::HighlightText(HighlightRequest::new(text)))
            .await?;
        accepted(response).map(|_| ())
    }

    /// Fetches page metrics from the content script and opens the report
    /// in a new tab.
    pub async fn page_info(&mut self) -> ContextResult<PageInfo> {
        let tab = self.require_tab()?;
        let result = self.request_page_info(tab).await;
        match &result {
            Ok(_) => self
                .notifier
                .notify("Page info opened in new tab", ToastKind::Success),
            Err(e) => {
                error!("Error getting page info: {}", e);
                self.notifier.notify("Failed to get page info", ToastKind::Error);
            }
        }
        result
    }

    async fn request_page_info(&self, tab: TabId) -> ContextResult<PageInfo> {
        let response = self
            .messenger
            .send_to_tab(tab, Message::GetPageInfo)
            .await?;
        let info: PageInfo = accepted(response)?
            .data_as()?
            .ok_or_else(|| ContextError::Rejected("empty page info".to_string()))?;
        self.tabs.open_document("text/plain", &info.summary()).await?;
        Ok(info)
    }

    /// Captures the visible tab.
    pub async fn take_screenshot(&mut self) -> ContextResult<Screenshot> {
        self.require_tab()?;
        match self.tabs.capture_visible_tab().await {
            Ok(data_url) => {
                self.stats.screenshot_count += 1;
                self.save_stats().await;
                self.notifier.notify("Screenshot saved!", ToastKind::Success);
                Ok(Screenshot {
                    file_name: format!("screenshot-{}.png", now_millis()),
                    data_url,
                })
            }
            Err(e) => {
                error!("Error taking screenshot: {}", e);
                self.notifier
                    .notify("Failed to take screenshot", ToastKind::Error);
                Err(e)
            }
        }
    }

    /// Flips one boolean setting, persists it and tells the other contexts.
    ///
    /// Delivery of the change notification is best-effort: the tab may have
    /// no content script and the background may be restarting.
    pub async fn set_setting(&mut self, name: &str, value: bool) -> ContextResult<()> {
        if let Err(e) = self.settings.set_flag(name, value) {
            self.notifier
                .notify("Failed to update setting", ToastKind::Error);
            return Err(e.into());
        }
        if !self
            .storage
            .set_item(SETTINGS_KEY, &self.settings, Partition::Local)
            .await
        {
            self.notifier
                .notify("Failed to update setting", ToastKind::Error);
            return Err(ContextError::StorageWrite(SETTINGS_KEY.to_string()));
        }

        let update = Message::SettingsUpdated(self.settings.clone());
        if let Some(tab) = &self.current_tab {
            self.messenger.notify_tab(tab.id, update.clone()).await;
        }
        self.messenger.notify(update).await;

        let state = if value { "enabled" } else { "disabled" };
        self.notifier
            .notify(&format!("{name} {state}"), ToastKind::Success);
        Ok(())
    }

    pub async fn open_options(&self) -> ContextResult<TabId> {
        let url = self.tabs.extension_url(OPTIONS_PAGE);
        self.tabs.create_tab(&url).await
    }

    pub async fn open_help(&self) -> ContextResult<TabId> {
        self.tabs.create_tab(HELP_URL).await
    }
}

fn accepted(response: MessageResponse) -> ContextResult<MessageResponse> {
    if response.success {
        Ok(response)
    } else {
        Err(ContextError::Rejected(
            response.error.unwrap_or_else(|| "request failed".to_string()),
        ))
    }
}
