//! The options page: full settings editor, keywords, custom CSS and backups.

use crate::error::{ContextError, ContextResult};
use crate::toast::{Notifier, ToastKind};
use chrono::{SecondsFormat, Utc};
use extkit_messaging::Messenger;
use extkit_storage::{Partition, StorageService};
use extkit_types::constants::{
    CUSTOM_CSS_KEY, DEVELOPER_URL, DOCUMENTATION_URL, KEYWORDS_KEY, RELEASES_URL, SETTINGS_KEY,
    STATS_KEY, SUPPORT_URL, VERSION,
};
use extkit_types::{Message, Settings, now_millis};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{error, info};

/// Exported backup document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub settings: Settings,
    pub keywords: Vec<String>,
    pub custom_css: String,
    pub stats: Value,
    pub export_date: String,
    pub version: String,
}

impl Backup {
    /// Suggested download name.
    pub fn file_name() -> String {
        format!("chrome-extension-template-backup-{}.json", now_millis())
    }

    pub fn to_json_pretty(&self) -> ContextResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// The options page, alive while it is open.
pub struct OptionsPage {
    storage: StorageService,
    messenger: Messenger,
    notifier: Arc<dyn Notifier>,
    settings: Settings,
    keywords: Vec<String>,
}

impl OptionsPage {
    pub fn new(storage: StorageService, messenger: Messenger, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            storage,
            messenger,
            notifier,
            settings: Settings::default(),
            keywords: Vec::new(),
        }
    }

    /// Loads settings and keywords.
    pub async fn load(&mut self) {
        self.settings = self
            .storage
            .get_with_default(SETTINGS_KEY, Settings::default(), Partition::Local)
            .await;
        self.keywords = self
            .storage
            .get_with_default(KEYWORDS_KEY, Vec::new(), Partition::Local)
            .await;
        info!("Options page initialized successfully");
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// Links shown in the About section.
    pub fn about_links() -> [(&'static str, &'static str); 4] {
        [
            ("Documentation", DOCUMENTATION_URL),
            ("Report Issues", SUPPORT_URL),
            ("Releases", RELEASES_URL),
            ("Developer", DEVELOPER_URL),
        ]
    }

    /// Changes one setting by wire name and saves.
    pub async fn update_setting(&mut self, key: &str, value: Value) -> bool {
        let mut patch = Map::new();
        patch.insert(key.to_string(), value);
        if let Err(e) = self.settings.merge(&patch) {
            error!("Failed to save settings: {}", e);
            self.notifier.notify("Failed to save settings", ToastKind::Error);
            return false;
        }
        self.save_settings().await
    }

    /// Persists settings and broadcasts the change.
    async fn save_settings(&self) -> bool {
        if !self
            .storage
            .set_item(SETTINGS_KEY, &self.settings, Partition::Local)
            .await
        {
            self.notifier.notify("Failed to save settings", ToastKind::Error);
            return false;
        }
        self.messenger
            .notify(Message::SettingsUpdated(self.settings.clone()))
            .await;
        true
    }

    async fn save_keywords(&self) -> bool {
        let saved = self
            .storage
            .set_item(KEYWORDS_KEY, &self.keywords, Partition::Local)
            .await;
        if !saved {
            self.notifier.notify("Failed to save keywords", ToastKind::Error);
        }
        saved
    }

    /// Adds a keyword. Blank and duplicate keywords are ignored.
    pub async fn add_keyword(&mut self, raw: &str) -> bool {
        let keyword = raw.trim();
        if keyword.is_empty() || self.keywords.iter().any(|k| k == keyword) {
            return false;
        }
        self.keywords.push(keyword.to_string());
        self.save_keywords().await
    }

    pub async fn remove_keyword(&mut self, keyword: &str) -> bool {
        let Some(index) = self.keywords.iter().position(|k| k == keyword) else {
            return false;
        };
        self.keywords.remove(index);
        self.save_keywords().await
    }

    pub async fn save_all(&mut self) -> bool {
        let saved = self.save_settings().await && self.save_keywords().await;
        if saved {
            self.notifier
                .notify("All settings saved successfully", ToastKind::Success);
        }
        saved
    }

    /// Restores default settings and clears keywords and custom CSS.
    pub async fn reset_all(&mut self) -> bool {
        self.settings = Settings::default();
        self.keywords.clear();
        let saved = self.save_settings().await
            && self.save_keywords().await
            && self.storage.set_item(CUSTOM_CSS_KEY, "", Partition::Local).await;
        if saved {
            self.notifier.notify(
                "All settings have been reset to default values",
                ToastKind::Success,
            );
        } else {
            self.notifier.notify("Failed to reset settings", ToastKind::Error);
        }
        saved
    }

    pub async fn custom_css(&self) -> String {
        self.storage
            .get_with_default(CUSTOM_CSS_KEY, String::new(), Partition::Local)
            .await
    }

    pub async fn save_custom_css(&self, css: &str) -> bool {
        let saved = self.storage.set_item(CUSTOM_CSS_KEY, css, Partition::Local).await;
        if saved {
            self.notifier
                .notify("Custom CSS saved successfully", ToastKind::Success);
        }
        saved
    }

    pub async fn reset_custom_css(&self) -> bool {
        let saved = self.storage.set_item(CUSTOM_CSS_KEY, "", Partition::Local).await;
        if saved {
            self.notifier.notify("Custom CSS reset", ToastKind::Success);
        }
        saved
    }

    /// Builds a backup of everything the user configured.
    pub async fn export_data(&self) -> Backup {
        let backup = Backup {
            settings: self.settings.clone(),
            keywords: self.keywords.clone(),
            custom_css: self.custom_css().await,
            stats: self
                .storage
                .get_with_default(STATS_KEY, Value::Object(Map::new()), Partition::Local)
                .await,
            export_date: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            version: VERSION.to_string(),
        };
        self.notifier
            .notify("Data exported successfully", ToastKind::Success);
        backup
    }

    /// Restores a backup produced by [`export_data`](Self::export_data).
    ///
    /// The document must have a `settings` object and a `keywords` array.
    /// Settings are merged over the current ones; keywords are replaced.
    pub async fn import_data(&mut self, text: &str) -> ContextResult<()> {
        match self.apply_backup(text).await {
            Ok(()) => {
                self.notifier
                    .notify("Data imported successfully", ToastKind::Success);
                Ok(())
            }
            Err(e) => {
                error!("Failed to import data: {}", e);
                self.notifier.notify(
                    "Failed to import data. Please check the file format.",
                    ToastKind::Error,
                );
                Err(e)
            }
        }
    }

    async fn apply_backup(&mut self, text: &str) -> ContextResult<()> {
        let document: Value = serde_json::from_str(text)?;
        let Some(patch) = document.get("settings").and_then(Value::as_object) else {
            return Err(ContextError::InvalidBackup("missing settings object".to_string()));
        };
        let Some(keywords) = document.get("keywords").and_then(Value::as_array) else {
            return Err(ContextError::InvalidBackup("missing keywords array".to_string()));
        };
        let keywords = keywords
            .iter()
            .map(|k| {
                k.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ContextError::InvalidBackup("keyword is not a string".to_string()))
            })
            .collect::<ContextResult<Vec<_>>>()?;

        let mut settings = self.settings.clone();
        settings.merge(patch)?;
        self.settings = settings;
        self.keywords = keywords;

        if !self.save_settings().await {
            return Err(ContextError::StorageWrite(SETTINGS_KEY.to_string()));
        }
        if !self.save_keywords().await {
            return Err(ContextError::StorageWrite(KEYWORDS_KEY.to_string()));
        }
        if let Some(css) = document
            .get("customCss")
            .and_then(Value::as_str)
            .filter(|css| !css.is_empty())
            && !self.storage.set_item(CUSTOM_CSS_KEY, css, Partition::Local).await
        {
            return Err(ContextError::StorageWrite(CUSTOM_CSS_KEY.to_string()));
        }
        Ok(())
    }

    /// Wipes both storage partitions.
    pub async fn clear_all_data(&mut self) -> bool {
        let cleared = self.storage.clear(Partition::Local).await
            && self.storage.clear(Partition::Sync).await;
        if cleared {
            self.settings = Settings::default();
            self.keywords.clear();
            self.notifier
                .notify("All data has been cleared", ToastKind::Success);
        } else {
            self.notifier.notify("Failed to clear data", ToastKind::Error);
        }
        cleared
    }
}
