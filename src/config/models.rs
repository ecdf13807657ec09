use crate::canon::ChapterRef;
use crate::pagination::{MAX_FONT_SIZE, MIN_FONT_SIZE, PageLayout};
use serde::Deserialize;
use std::time::Duration;

/// Flattened app configuration; the on-disk form is grouped into tables.
#[derive(Debug, Clone, Deserialize, serde::Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "crate::config::defaults::default_cache_dir")]
    pub cache_dir: String,
    #[serde(default = "crate::config::defaults::default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "crate::config::defaults::default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "crate::config::defaults::default_translation")]
    pub translation: String,
    #[serde(default = "crate::config::defaults::default_parallel_translation")]
    pub parallel_translation: String,
    #[serde(default)]
    pub parallel_mode: bool,
    #[serde(default)]
    pub book_mode: bool,
    #[serde(default = "crate::config::defaults::default_font_size")]
    pub font_size: f32,
    #[serde(default = "crate::config::defaults::default_line_spacing")]
    pub line_spacing: f32,
    #[serde(default = "crate::config::defaults::default_page_width")]
    pub page_width: f32,
    #[serde(default = "crate::config::defaults::default_page_height")]
    pub page_height: f32,
    #[serde(default = "crate::config::defaults::default_start_book")]
    pub start_book: usize,
    #[serde(default = "crate::config::defaults::default_start_chapter")]
    pub start_chapter: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: crate::config::defaults::default_log_level(),
            cache_dir: crate::config::defaults::default_cache_dir(),
            api_base_url: crate::config::defaults::default_api_base_url(),
            http_timeout_secs: crate::config::defaults::default_http_timeout_secs(),
            translation: crate::config::defaults::default_translation(),
            parallel_translation: crate::config::defaults::default_parallel_translation(),
            parallel_mode: false,
            book_mode: false,
            font_size: crate::config::defaults::default_font_size(),
            line_spacing: crate::config::defaults::default_line_spacing(),
            page_width: crate::config::defaults::default_page_width(),
            page_height: crate::config::defaults::default_page_height(),
            start_book: crate::config::defaults::default_start_book(),
            start_chapter: crate::config::defaults::default_start_chapter(),
        }
    }
}

impl AppConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    /// Configured start chapter, clamped into the canonical table.
    pub fn start_position(&self) -> ChapterRef {
        ChapterRef::new(self.start_book, self.start_chapter).clamped()
    }

    pub fn page_layout(&self) -> PageLayout {
        PageLayout {
            width: self.page_width,
            height: self.page_height,
            font_size: self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE),
            line_spacing: self.line_spacing.max(0.0),
        }
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
