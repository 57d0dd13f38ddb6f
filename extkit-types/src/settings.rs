//! The persisted settings object shared by every context.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// User settings, stored under [`SETTINGS_KEY`](crate::constants::SETTINGS_KEY).
///
/// Missing fields take their defaults so partially written objects from
/// older versions still load. Keys this version does not know are kept in
/// `extra` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub enabled: bool,
    pub notifications: bool,
    pub track_scroll: bool,
    pub auto_highlight: bool,
    pub theme: Theme,
    pub highlight_color: String,
    pub font_size: FontSize,
    pub collect_stats: bool,
    pub local_storage: bool,
    pub debug: bool,
    pub custom_css: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            notifications: true,
            track_scroll: false,
            auto_highlight: false,
            theme: Theme::Light,
            highlight_color: "#ffeb3b".to_string(),
            font_size: FontSize::Medium,
            collect_stats: true,
            local_storage: false,
            debug: false,
            custom_css: false,
            extra: Map::new(),
        }
    }
}

impl Settings {
    fn flag_mut(&mut self, feature: &str) -> Option<&mut bool> {
        match feature {
            "enabled" => Some(&mut self.enabled),
            "notifications" => Some(&mut self.notifications),
            "trackScroll" => Some(&mut self.track_scroll),
            "autoHighlight" => Some(&mut self.auto_highlight),
            "collectStats" => Some(&mut self.collect_stats),
            "localStorage" => Some(&mut self.local_storage),
            "debug" => Some(&mut self.debug),
            "customCss" => Some(&mut self.custom_css),
            _ => None,
        }
    }

    /// Reads a boolean setting by its wire name.
    #[must_use]
    pub fn flag(&self, feature: &str) -> Option<bool> {
        match feature {
            "enabled" => Some(self.enabled),
            "notifications" => Some(self.notifications),
            "trackScroll" => Some(self.track_scroll),
            "autoHighlight" => Some(self.auto_highlight),
            "collectStats" => Some(self.collect_stats),
            "localStorage" => Some(self.local_storage),
            "debug" => Some(self.debug),
            "customCss" => Some(self.custom_css),
            _ => self.extra.get(feature).and_then(Value::as_bool),
        }
    }

    /// Sets a boolean setting by its wire name.
    ///
    /// Unknown names are stored in `extra`; typed non-boolean fields
    /// (`theme`, `highlightColor`, `fontSize`) are rejected.
    pub fn set_flag(&mut self, feature: &str, enabled: bool) -> Result<()> {
        if let Some(flag) = self.flag_mut(feature) {
            *flag = enabled;
            return Ok(());
        }
        if matches!(feature, "theme" | "highlightColor" | "fontSize") {
            return Err(Error::NotAFlag(feature.to_string()));
        }
        self.extra.insert(feature.to_string(), Value::Bool(enabled));
        Ok(())
    }

    /// Shallow merge: every key of `patch` overwrites the current value.
    pub fn merge(&mut self, patch: &Map<String, Value>) -> Result<()> {
        let mut current = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            current.insert(key.clone(), value.clone());
        }
        *self = serde_json::from_value(Value::Object(current))?;
        Ok(())
    }
}
