pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}

pub(crate) fn default_cache_dir() -> String {
    "cache".to_string()
}

pub(crate) fn default_api_base_url() -> String {
    "https://bible-api.com".to_string()
}

pub(crate) fn default_http_timeout_secs() -> u64 {
    15
}

pub(crate) fn default_translation() -> String {
    "web".to_string()
}

pub(crate) fn default_parallel_translation() -> String {
    "kjv".to_string()
}

pub(crate) fn default_font_size() -> f32 {
    19.0
}

pub(crate) fn default_line_spacing() -> f32 {
    7.0
}

pub(crate) fn default_page_width() -> f32 {
    700.0
}

pub(crate) fn default_page_height() -> f32 {
    500.0
}

pub(crate) fn default_start_book() -> usize {
    42
}

pub(crate) fn default_start_chapter() -> u32 {
    3
}
