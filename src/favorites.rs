//! Saved verses with optional notes.

use crate::canon::ChapterRef;
use crate::model::unix_now;
use crate::position::STATE_DIR;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Favorite {
    pub book: String,
    pub book_index: usize,
    pub chapter: u32,
    pub verse: u32,
    pub translation: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub note: String,
    /// Unix seconds.
    pub added_at: u64,
}

impl Favorite {
    /// "John 3:16 (web)"
    pub fn display(&self) -> String {
        format!(
            "{} {}:{} ({})",
            self.book, self.chapter, self.verse, self.translation
        )
    }

    fn is_verse(&self, at: ChapterRef, verse: u32, translation: &str) -> bool {
        self.book_index == at.book
            && self.chapter == at.chapter
            && self.verse == verse
            && self.translation == translation
    }
}

/// `Favorites::default()` is never written to disk.
#[derive(Debug, Default)]
pub struct Favorites {
    path: Option<PathBuf>,
    items: Vec<Favorite>,
}

impl Favorites {
    pub fn open(path: &Path) -> Self {
        let items = fs::read_to_string(path)
            .ok()
            .and_then(|data| match serde_json::from_str::<Vec<Favorite>>(&data) {
                Ok(items) => Some(items),
                Err(err) => {
                    warn!(path = %path.display(), "Ignoring unreadable favorites: {err}");
                    None
                }
            })
            .unwrap_or_default();
        Self {
            path: Some(path.to_path_buf()),
            items,
        }
    }

    pub fn all(&self) -> &[Favorite] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has(&self, at: ChapterRef, verse: u32, translation: &str) -> bool {
        self.items.iter().any(|f| f.is_verse(at, verse, translation))
    }

    /// Save a verse. Returns false when it is already saved or outside canon.
    pub fn add(
        &mut self,
        at: ChapterRef,
        verse: u32,
        translation: &str,
        text: &str,
        note: &str,
    ) -> bool {
        if !at.is_valid() || verse == 0 || self.has(at, verse, translation) {
            return false;
        }
        self.items.push(Favorite {
            book: at.book_name().to_string(),
            book_index: at.book,
            chapter: at.chapter,
            verse,
            translation: translation.to_string(),
            text: text.to_string(),
            note: note.to_string(),
            added_at: unix_now(),
        });
        self.save();
        true
    }

    pub fn remove(&mut self, at: ChapterRef, verse: u32, translation: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|f| !f.is_verse(at, verse, translation));
        let removed = self.items.len() != before;
        if removed {
            self.save();
        }
        removed
    }

    pub fn update_note(&mut self, at: ChapterRef, verse: u32, translation: &str, note: &str) -> bool {
        let Some(item) = self
            .items
            .iter_mut()
            .find(|f| f.is_verse(at, verse, translation))
        else {
            return false;
        };
        item.note = note.to_string();
        self.save();
        true
    }

    fn save(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&self.items) {
            Ok(contents) => match fs::write(path, contents) {
                Ok(()) => debug!(path = %path.display(), count = self.items.len(), "Saved favorites"),
                Err(err) => warn!(path = %path.display(), "Failed to save favorites: {err}"),
            },
            Err(err) => warn!("Failed to encode favorites: {err}"),
        }
    }
}

pub fn favorites_path() -> PathBuf {
    Path::new(STATE_DIR).join("favorites.json")
}
