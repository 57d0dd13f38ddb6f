//! Extension-wide constants: metadata, links and storage keys.

/// Human readable extension name.
pub const EXTENSION_NAME: &str = "Chrome Extension Template";

/// Extension version, also written into exported backups.
pub const VERSION: &str = "1.0.0";

const REPO_BASE_URL: &str = "https://github.com/Jin-HoMLee/chrome-extension-template";

pub const HELP_URL: &str = "https://github.com/Jin-HoMLee/chrome-extension-template#readme";
pub const SUPPORT_URL: &str = "https://github.com/Jin-HoMLee/chrome-extension-template/issues";
pub const DOCUMENTATION_URL: &str = REPO_BASE_URL;
pub const RELEASES_URL: &str = "https://github.com/Jin-HoMLee/chrome-extension-template/releases";
pub const DEVELOPER_URL: &str = "https://github.com/Jin-HoMLee";

/// Extension-relative path of the options page.
pub const OPTIONS_PAGE: &str = "options/options.html";

/// Id of the extension's page and selection context-menu entry.
pub const CONTEXT_MENU_ID: &str = "extension-template-menu";

/// Storage key of the persisted [`Settings`](crate::Settings) object.
pub const SETTINGS_KEY: &str = "settings";
/// Storage key of the usage counters.
pub const STATS_KEY: &str = "stats";
/// Storage key of the keyword list managed on the options page.
pub const KEYWORDS_KEY: &str = "keywords";
/// Storage key of the user's custom stylesheet.
pub const CUSTOM_CSS_KEY: &str = "customCss";
/// Prefix of per-page scroll position keys (`scroll_<url>`).
pub const SCROLL_KEY_PREFIX: &str = "scroll_";

/// Name under which page highlights are registered.
pub const HIGHLIGHT_NAME: &str = "extension-highlight";

/// Total byte quota of the sync-replicated partition.
pub const SYNC_QUOTA_BYTES: u64 = 102_400;
/// Per-item byte quota of the sync-replicated partition.
pub const SYNC_QUOTA_BYTES_PER_ITEM: u64 = 8_192;

/// Milliseconds in one minute, used when rendering accumulated time.
pub const MILLISECONDS_PER_MINUTE: u64 = 60_000;

/// Builds the storage key under which a page's scroll position is saved.
pub fn scroll_key(url: &str) -> String {
    format!("{SCROLL_KEY_PREFIX}{url}")
}
