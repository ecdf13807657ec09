//! Recently read chapters, newest first, remembered across runs.
//!
//! Entries are recorded by the worker once a window reset has loaded its
//! chapter, so a navigation that never finishes leaves no trace.

use crate::canon::ChapterRef;
use crate::model::{Chapter, unix_now};
use crate::position::STATE_DIR;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const MAX_RECENT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RecentEntry {
    pub book: String,
    pub book_index: usize,
    pub chapter: u32,
    pub translation: String,
    /// Unix seconds.
    pub accessed_at: u64,
}

impl RecentEntry {
    pub fn chapter_ref(&self) -> ChapterRef {
        ChapterRef::new(self.book_index, self.chapter).clamped()
    }

    fn same_chapter(&self, other: &RecentEntry) -> bool {
        self.translation == other.translation
            && self.book_index == other.book_index
            && self.chapter == other.chapter
    }
}

#[derive(Debug, Default)]
pub struct RecentReading {
    path: Option<PathBuf>,
    entries: Vec<RecentEntry>,
}

impl RecentReading {
    /// A list that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the list stored at `path`. A missing or unreadable file starts
    /// an empty list that will be written there on the next record.
    pub fn open(path: &Path) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str::<Vec<RecentEntry>>(&data) {
                Ok(mut entries) => {
                    entries.retain(|e| ChapterRef::new(e.book_index, e.chapter).is_valid());
                    entries.truncate(MAX_RECENT);
                    entries
                }
                Err(err) => {
                    warn!(path = %path.display(), "Ignoring unreadable recent list: {err}");
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };
        Self {
            path: Some(path.to_path_buf()),
            entries,
        }
    }

    pub fn entries(&self) -> &[RecentEntry] {
        &self.entries
    }

    /// Move `chapter` to the front, dropping an older entry for the same
    /// chapter and translation.
    pub fn record(&mut self, chapter: &Chapter) {
        let entry = RecentEntry {
            book: chapter.book.clone(),
            book_index: chapter.book_index,
            chapter: chapter.chapter,
            translation: chapter.translation.clone(),
            accessed_at: unix_now(),
        };
        self.entries.retain(|e| !e.same_chapter(&entry));
        self.entries.insert(0, entry);
        self.entries.truncate(MAX_RECENT);
        self.save();
    }

    /// Best-effort write; a failure only costs the list.
    fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&self.entries) {
            Ok(contents) => match fs::write(path, contents) {
                Ok(()) => debug!(path = %path.display(), entries = self.entries.len(), "Saved recent list"),
                Err(err) => warn!(path = %path.display(), "Failed to save recent list: {err}"),
            },
            Err(err) => warn!("Failed to encode recent list: {err}"),
        }
    }
}

pub fn recent_path() -> PathBuf {
    Path::new(STATE_DIR).join("recent.json")
}
