//! Payload shapes carried in the `data` field of a message or response.

use crate::TabId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity of the tab a message came from, or the active tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub title: String,
    pub url: String,
    pub id: TabId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
}

impl TabInfo {
    pub fn new(id: TabId, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            id,
            fav_icon_url: None,
        }
    }
}

/// Page metrics reported by a content script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub title: String,
    pub url: String,
    pub word_count: usize,
    pub images: usize,
    pub links: usize,
    pub forms: usize,
    pub scripts: usize,
    pub last_modified: String,
}

impl PageInfo {
    /// Plain-text report shown to the user.
    pub fn summary(&self) -> String {
        format!(
            "Title: {}\nURL: {}\nWords: {}\nImages: {}\nLinks: {}\nForms: {}\nScripts: {}\nLast Modified: {}",
            self.title,
            self.url,
            self.word_count,
            self.images,
            self.links,
            self.forms,
            self.scripts,
            self.last_modified,
        )
    }
}

/// Request to highlight every occurrence of a piece of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent: Option<bool>,
}

impl HighlightRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            permanent: None,
        }
    }
}

/// Flip a single boolean setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureToggle {
    pub feature: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBehavior {
    #[default]
    Smooth,
    Instant,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollBlock {
    Start,
    #[default]
    Center,
    End,
    Nearest,
}

/// Scroll the first element matching `selector` into view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollRequest {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<ScrollBehavior>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<ScrollBlock>,
}

impl ScrollRequest {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            behavior: None,
            block: None,
        }
    }
}

/// Add (or remove) a stylesheet in the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssInjection {
    pub css: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remove: Option<bool>,
}

/// Persist an arbitrary JSON value under `key` in device-local storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDataRequest {
    pub key: String,
    pub value: Value,
}

/// Usage counters shown in the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    pub total_pages: u64,
    /// Accumulated time in milliseconds.
    pub total_time: u64,
    pub highlight_count: u64,
    pub screenshot_count: u64,
}

impl Stats {
    /// Accumulated time in whole minutes.
    #[must_use]
    pub fn total_minutes(&self) -> u64 {
        self.total_time / crate::constants::MILLISECONDS_PER_MINUTE
    }
}
