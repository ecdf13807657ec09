use super::defaults;
use super::models::{AppConfig, LogLevel};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    remote: RemoteConfig,
    #[serde(default)]
    reading: ReadingConfig,
    #[serde(default)]
    layout: LayoutConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            log_level: tables.logging.log_level,
            cache_dir: tables.storage.cache_dir,
            api_base_url: tables.remote.api_base_url,
            http_timeout_secs: tables.remote.http_timeout_secs,
            translation: tables.reading.translation,
            parallel_translation: tables.reading.parallel_translation,
            parallel_mode: tables.reading.parallel_mode,
            book_mode: tables.reading.book_mode,
            start_book: tables.reading.start_book,
            start_chapter: tables.reading.start_chapter,
            font_size: tables.layout.font_size,
            line_spacing: tables.layout.line_spacing,
            page_width: tables.layout.page_width,
            page_height: tables.layout.page_height,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            storage: StorageConfig {
                cache_dir: config.cache_dir.clone(),
            },
            remote: RemoteConfig {
                api_base_url: config.api_base_url.clone(),
                http_timeout_secs: config.http_timeout_secs,
            },
            reading: ReadingConfig {
                translation: config.translation.clone(),
                parallel_translation: config.parallel_translation.clone(),
                parallel_mode: config.parallel_mode,
                book_mode: config.book_mode,
                start_book: config.start_book,
                start_chapter: config.start_chapter,
            },
            layout: LayoutConfig {
                font_size: config.font_size,
                line_spacing: config.line_spacing,
                page_width: config.page_width,
                page_height: config.page_height,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_cache_dir")]
    cache_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            cache_dir: defaults::default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct RemoteConfig {
    #[serde(default = "defaults::default_api_base_url")]
    api_base_url: String,
    #[serde(default = "defaults::default_http_timeout_secs")]
    http_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        RemoteConfig {
            api_base_url: defaults::default_api_base_url(),
            http_timeout_secs: defaults::default_http_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct ReadingConfig {
    #[serde(default = "defaults::default_translation")]
    translation: String,
    #[serde(default = "defaults::default_parallel_translation")]
    parallel_translation: String,
    #[serde(default)]
    parallel_mode: bool,
    #[serde(default)]
    book_mode: bool,
    #[serde(default = "defaults::default_start_book")]
    start_book: usize,
    #[serde(default = "defaults::default_start_chapter")]
    start_chapter: u32,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        ReadingConfig {
            translation: defaults::default_translation(),
            parallel_translation: defaults::default_parallel_translation(),
            parallel_mode: false,
            book_mode: false,
            start_book: defaults::default_start_book(),
            start_chapter: defaults::default_start_chapter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LayoutConfig {
    #[serde(default = "defaults::default_font_size")]
    font_size: f32,
    #[serde(default = "defaults::default_line_spacing")]
    line_spacing: f32,
    #[serde(default = "defaults::default_page_width")]
    page_width: f32,
    #[serde(default = "defaults::default_page_height")]
    page_height: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            font_size: defaults::default_font_size(),
            line_spacing: defaults::default_line_spacing(),
            page_width: defaults::default_page_width(),
            page_height: defaults::default_page_height(),
        }
    }
}
