//! On-disk chapter cache.
//!
//! Each chapter lives in its own JSON file at
//! `<root>/<translation>/<book abbrev>/<chapter>.json`. Every operation takes
//! one coarse lock: the worker thread writes while the interactive thread may
//! ask for stats or a wipe at the same time.

use crate::canon::{BOOKS, book_for_title};
use crate::model::{CacheStats, Chapter, ChapterKey, Verse};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

pub const CACHE_EXTENSION: &str = "json";

#[derive(Debug)]
pub struct ChapterCache {
    root: PathBuf,
    lock: Mutex<()>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheEntry {
    book: String,
    chapter: u32,
    translation: String,
    #[serde(default)]
    fetched_at: u64,
    verses: Vec<CachedVerse>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedVerse {
    number: u32,
    text: String,
    #[serde(default)]
    raw_text: String,
}

/// Only the verse count matters when scanning for stats.
#[derive(Deserialize)]
struct VerseCountProbe {
    #[serde(default)]
    verses: Vec<serde::de::IgnoredAny>,
}

impl ChapterCache {
    /// Open (and create if needed) a cache rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache root {}", root.display()))?;
        debug!(root = %root.display(), "Opened chapter cache");
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn has(&self, key: &ChapterKey) -> bool {
        let _guard = self.guard();
        self.entry_path(key).is_file()
    }

    /// Read one chapter. A missing or malformed entry yields a chapter with
    /// `is_loaded == false`; this never fails.
    pub fn load(&self, key: &ChapterKey) -> Chapter {
        let _guard = self.guard();
        let path = self.entry_path(key);
        let mut chapter = unloaded_for_key(key);

        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) => {
                debug!(path = %path.display(), "Cache miss: {err}");
                return chapter;
            }
        };
        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(path = %path.display(), "Ignoring malformed cache entry: {err}");
                return chapter;
            }
        };

        chapter.book = entry.book;
        chapter.chapter = entry.chapter;
        chapter.translation = entry.translation;
        chapter.fetched_at = entry.fetched_at;
        // Stored text is already display text; it comes back exactly as saved.
        chapter.verses = entry
            .verses
            .into_iter()
            .map(|v| Verse {
                number: v.number,
                text: v.text,
                raw_text: (!v.raw_text.is_empty()).then_some(v.raw_text),
            })
            .collect();
        chapter.from_cache = true;
        chapter.is_loaded = true;
        debug!(
            translation = %key.translation,
            book = %key.book_abbrev,
            chapter = key.chapter,
            verses = chapter.verses.len(),
            "Cache hit"
        );
        chapter
    }

    /// Persist a chapter. The book abbreviation is derived from
    /// `chapter.book`; returns `false` when no book matches or the write fails.
    pub fn save(&self, chapter: &Chapter) -> bool {
        let _guard = self.guard();
        let Some(book_index) = book_for_title(&chapter.book) else {
            warn!(book = %chapter.book, "No canonical book matches chapter; not caching");
            return false;
        };
        let key = ChapterKey::new(&chapter.translation, BOOKS[book_index].abbrev, chapter.chapter);
        let path = self.entry_path(&key);
        if let Some(parent) = path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), "Failed to create cache directory: {err}");
                return false;
            }
        }

        let entry = CacheEntry {
            book: chapter.book.clone(),
            chapter: chapter.chapter,
            translation: chapter.translation.clone(),
            fetched_at: chapter.fetched_at,
            verses: chapter
                .verses
                .iter()
                .map(|v| CachedVerse {
                    number: v.number,
                    text: v.text.clone(),
                    raw_text: v.raw_text.clone().unwrap_or_default(),
                })
                .collect(),
        };
        let contents = match serde_json::to_string_pretty(&entry) {
            Ok(contents) => contents,
            Err(err) => {
                warn!("Failed to serialize chapter for cache: {err}");
                return false;
            }
        };
        match fs::write(&path, contents) {
            Ok(()) => {
                debug!(path = %path.display(), "Saved chapter to cache");
                true
            }
            Err(err) => {
                warn!(path = %path.display(), "Failed to write cache entry: {err}");
                false
            }
        }
    }

    /// Drop one cached chapter so the next load refetches it.
    pub fn invalidate(&self, key: &ChapterKey) -> bool {
        let _guard = self.guard();
        let path = self.entry_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "Invalidated cached chapter");
                true
            }
            Err(_) => false,
        }
    }

    /// Walk the whole store, counting chapters, verses and bytes.
    pub fn stats(&self) -> CacheStats {
        let _guard = self.guard();
        let mut stats = CacheStats::default();
        let Ok(translations) = fs::read_dir(&self.root) else {
            return stats;
        };
        for translation_dir in translations.flatten() {
            let path = translation_dir.path();
            if !path.is_dir() {
                continue;
            }
            let code = translation_dir.file_name().to_string_lossy().into_owned();
            let mut chapters = 0usize;
            scan_entries(&path, &mut |file| {
                chapters += 1;
                stats.total_chapters += 1;
                stats.total_bytes += fs::metadata(file).map(|m| m.len()).unwrap_or(0);
                stats.total_verses += fs::read_to_string(file)
                    .ok()
                    .and_then(|data| serde_json::from_str::<VerseCountProbe>(&data).ok())
                    .map(|probe| probe.verses.len())
                    .unwrap_or(0);
            });
            stats.by_translation.insert(code, chapters);
        }
        stats
    }

    /// Destroy and recreate the store root.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.guard();
        if self.root.exists() {
            fs::remove_dir_all(&self.root)
                .with_context(|| format!("Failed to remove cache root {}", self.root.display()))?;
        }
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to recreate cache root {}", self.root.display()))?;
        info!(root = %self.root.display(), "Cleared chapter cache");
        Ok(())
    }

    fn entry_path(&self, key: &ChapterKey) -> PathBuf {
        self.root
            .join(&key.translation)
            .join(&key.book_abbrev)
            .join(format!("{}.{CACHE_EXTENSION}", key.chapter))
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn unloaded_for_key(key: &ChapterKey) -> Chapter {
    let book_index = BOOKS
        .iter()
        .position(|b| b.abbrev == key.book_abbrev)
        .unwrap_or_default();
    let mut chapter = Chapter::unloaded(book_index, key.chapter, &key.translation);
    chapter.book_abbrev = key.book_abbrev.clone();
    chapter
}

fn scan_entries(dir: &Path, visit: &mut dyn FnMut(&Path)) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan_entries(&path, visit);
        } else if path.extension().is_some_and(|ext| ext == CACHE_EXTENSION) {
            visit(&path);
        }
    }
}
