//! Configuration loading for the verse viewer.
//!
//! Settings live in `conf/config.toml`, grouped into `[logging]`, `[storage]`,
//! `[remote]`, `[reading]` and `[layout]` tables. Missing or invalid entries
//! fall back to defaults so the reader can always start.

mod defaults;
mod io;
mod models;
mod tables;

pub use io::{load_config, serialize_config};
pub use models::{AppConfig, LogLevel};
