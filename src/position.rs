//! Last reading position, remembered across runs.
//!
//! Stored as a tiny TOML file under `.cache/`, outside the chapter cache root
//! so clearing cached chapters keeps the position.

use crate::canon::ChapterRef;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const STATE_DIR: &str = ".cache";

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReadingPosition {
    pub book: usize,
    pub chapter: u32,
    pub translation: String,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default)]
    pub page: usize,
}

impl ReadingPosition {
    pub fn chapter_ref(&self) -> ChapterRef {
        ChapterRef::new(self.book, self.chapter).clamped()
    }
}

pub fn position_path() -> PathBuf {
    Path::new(STATE_DIR).join("position.toml")
}

/// Load the saved position, if any.
pub fn load_last_position(path: &Path) -> Option<ReadingPosition> {
    let data = fs::read_to_string(path).ok()?;
    let position: ReadingPosition = toml::from_str(&data).ok()?;
    ChapterRef::new(position.book, position.chapter)
        .is_valid()
        .then_some(position)
}

/// Persist the position. Errors are ignored so quitting never blocks.
pub fn save_last_position(path: &Path, position: &ReadingPosition) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Ok(contents) = toml::to_string(position) {
        if let Ok(mut file) = fs::File::create(path) {
            let _ = file.write_all(contents.as_bytes());
            debug!(path = %path.display(), "Saved reading position");
        }
    }
}
