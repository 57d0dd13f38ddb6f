//! The background service worker.

use crate::error::ContextResult;
use crate::host::{ContextMenuItem, MenuContext, SelectionProvider, TabsApi};
use crate::keepalive::KeepAlive;
use async_trait::async_trait;
use extkit_messaging::{ExtensionBus, MessageHandler, MessageSender, serve};
use extkit_storage::{Partition, StorageService};
use extkit_types::constants::{CONTEXT_MENU_ID, EXTENSION_NAME, OPTIONS_PAGE, SETTINGS_KEY};
use extkit_types::{
    ContextKind, FeatureToggle, Message, MessageResponse, SaveDataRequest, Settings, TabInfo,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Configuration for the background context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Keep-alive timer period (ms).
    pub keep_alive_ms: u64,
    /// Page opened after first install.
    pub options_page: String,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            keep_alive_ms: 20_000,
            options_page: OPTIONS_PAGE.to_string(),
        }
    }
}

/// Why `runtime.onInstalled` fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallReason {
    Install,
    Update,
    ChromeUpdate,
    SharedModuleUpdate,
}

/// The background context. Always listening while alive.
pub struct Background {
    config: BackgroundConfig,
    storage: StorageService,
    tabs: Arc<dyn TabsApi>,
    selection: Arc<dyn SelectionProvider>,
    settings: RwLock<Settings>,
    keep_alive: KeepAlive,
}

impl Background {
    pub fn new(
        config: BackgroundConfig,
        storage: StorageService,
        tabs: Arc<dyn TabsApi>,
        selection: Arc<dyn SelectionProvider>,
    ) -> Self {
        let keep_alive = KeepAlive::new(Duration::from_millis(config.keep_alive_ms));
        Self {
            config,
            storage,
            tabs,
            selection,
            settings: RwLock::new(Settings::default()),
            keep_alive,
        }
    }

    /// Loads the cached settings, arms the keep-alive and starts serving
    /// runtime messages.
    pub async fn start(self: &Arc<Self>, bus: &ExtensionBus) -> JoinHandle<()> {
        let stored = self
            .storage
            .get_with_default(SETTINGS_KEY, Settings::default(), Partition::Local)
            .await;
        *self.settings.write().await = stored;
        self.keep_alive.reset();

        let listener = bus.listen(ContextKind::Background, None);
        info!("Background listening");
        serve(listener, self.clone())
    }

    /// Handles `runtime.onInstalled`. Every reason registers the context
    /// menu; a fresh install also writes the default settings and opens the
    /// options page.
    pub async fn on_installed(&self, reason: InstallReason) -> ContextResult<()> {
        info!("Extension installed: {:?}", reason);
        let menu = ContextMenuItem {
            id: CONTEXT_MENU_ID.to_string(),
            title: EXTENSION_NAME.to_string(),
            contexts: vec![MenuContext::Selection, MenuContext::Page],
        };
        if let Err(e) = self.tabs.create_context_menu(&menu).await {
            warn!("Failed to create context menu: {}", e);
        }
        if reason != InstallReason::Install {
            return Ok(());
        }

        let defaults = Settings::default();
        if !self
            .storage
            .set_item(SETTINGS_KEY, &defaults, Partition::Local)
            .await
        {
            error!("Failed to write default settings");
        }
        *self.settings.write().await = defaults;

        let url = self.tabs.extension_url(&self.config.options_page);
        self.tabs.create_tab(&url).await?;
        Ok(())
    }

    /// Handles `contextMenus.onClicked`. Reads the selection in `tab` when
    /// our entry was clicked; returns it when non-empty.
    pub async fn on_context_menu_clicked(
        &self,
        menu_id: &str,
        tab: Option<&TabInfo>,
    ) -> ContextResult<Option<String>> {
        if menu_id != CONTEXT_MENU_ID {
            debug!("Ignoring click on menu item {}", menu_id);
            return Ok(None);
        }
        let Some(tab) = tab else {
            return Ok(None);
        };
        let selection = self.selection.selected_text(tab.id).await?;
        if selection.is_empty() {
            return Ok(None);
        }
        info!("Selected text: {}", selection);
        Ok(Some(selection))
    }

    pub fn on_startup(&self) {
        info!("Extension started");
    }

    pub fn on_tab_activated(&self) {
        self.keep_alive.reset();
    }

    pub fn on_tab_updated(&self) {
        self.keep_alive.reset();
    }

    /// The most recently seen settings.
    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    pub fn keep_alive(&self) -> &KeepAlive {
        &self.keep_alive
    }

    fn tab_info(sender: &MessageSender) -> MessageResponse {
        match &sender.tab {
            Some(tab) => {
                let info = TabInfo::new(tab.id, tab.title.clone(), tab.url.clone());
                MessageResponse::ok_with(&info)
                    .unwrap_or_else(|_| MessageResponse::failure("Failed to get tab info"))
            }
            None => MessageResponse::failure("No tab information available"),
        }
    }

    async fn toggle_feature(&self, toggle: FeatureToggle) -> MessageResponse {
        // Read-modify-write without compare-and-set; concurrent writers race
        // and the last write wins.
        let mut settings = self
            .storage
            .get_with_default(SETTINGS_KEY, Settings::default(), Partition::Local)
            .await;
        if let Err(e) = settings.set_flag(&toggle.feature, toggle.enabled) {
            error!("Error toggling feature: {}", e);
            return MessageResponse::failure("Failed to toggle feature");
        }
        if !self
            .storage
            .set_item(SETTINGS_KEY, &settings, Partition::Local)
            .await
        {
            return MessageResponse::failure("Failed to toggle feature");
        }

        let response = MessageResponse::ok_with(&settings)
            .unwrap_or_else(|_| MessageResponse::failure("Failed to toggle feature"));
        *self.settings.write().await = settings;
        response
    }

    async fn save_data(&self, request: SaveDataRequest) -> MessageResponse {
        if self
            .storage
            .set_item(&request.key, &request.value, Partition::Local)
            .await
        {
            MessageResponse::ok()
        } else {
            MessageResponse::failure("Failed to save data")
        }
    }
}

#[async_trait]
impl MessageHandler for Background {
    async fn handle(&self, message: Message, sender: &MessageSender) -> MessageResponse {
        self.keep_alive.reset();
        match message {
            Message::GetTabInfo => Self::tab_info(sender),
            Message::ToggleFeature(toggle) => self.toggle_feature(toggle).await,
            Message::SaveData(request) => self.save_data(request).await,
            Message::SettingsUpdated(settings) => {
                *self.settings.write().await = settings;
                MessageResponse::ok()
            }
            Message::HighlightText(_)
            | Message::GetPageInfo
            | Message::ScrollToElement(_)
            | Message::InjectCss(_) => MessageResponse::unknown_type(),
        }
    }
}
