//! Plain data shared by the cache, fetcher, window and paginator.

use crate::canon::{ChapterRef, book_info};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Text shown in place of a chapter that could not be fetched or parsed.
pub const LOAD_ERROR_TEXT: &str = "Error loading content. Please check internet connection.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verse {
    pub number: u32,
    /// Display text with markup removed.
    pub text: String,
    /// Original annotated text, kept only when it carries inline markup.
    pub raw_text: Option<String>,
}

impl Verse {
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
            raw_text: None,
        }
    }
}

/// Identity of a cached chapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChapterKey {
    pub translation: String,
    pub book_abbrev: String,
    pub chapter: u32,
}

impl ChapterKey {
    pub fn new(translation: &str, book_abbrev: &str, chapter: u32) -> Self {
        Self {
            translation: translation.to_string(),
            book_abbrev: book_abbrev.to_string(),
            chapter,
        }
    }

    pub fn for_ref(translation: &str, at: ChapterRef) -> Self {
        Self::new(translation, at.book_abbrev(), at.chapter)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub book: String,
    pub book_abbrev: String,
    pub book_index: usize,
    pub chapter: u32,
    pub translation: String,
    pub verses: Vec<Verse>,
    /// Unix seconds.
    pub fetched_at: u64,
    pub from_cache: bool,
    pub is_loaded: bool,
}

impl Chapter {
    /// An empty, not-loaded chapter for the given coordinate.
    pub fn unloaded(book_index: usize, chapter: u32, translation: &str) -> Self {
        let info = book_info(book_index);
        Self {
            book: info.map(|b| b.name.to_string()).unwrap_or_default(),
            book_abbrev: info.map(|b| b.abbrev.to_string()).unwrap_or_default(),
            book_index,
            chapter,
            translation: translation.to_string(),
            verses: Vec::new(),
            fetched_at: 0,
            from_cache: false,
            is_loaded: false,
        }
    }

    /// The single-verse stand-in for a chapter whose fetch or parse failed.
    /// Marked loaded so the window still advances past it.
    pub fn load_failure(book_index: usize, chapter: u32, translation: &str) -> Self {
        let mut out = Self::unloaded(book_index, chapter, translation);
        out.verses.push(Verse::new(1, LOAD_ERROR_TEXT));
        out.fetched_at = unix_now();
        out.is_loaded = true;
        out
    }

    pub fn key(&self) -> ChapterKey {
        ChapterKey::new(&self.translation, &self.book_abbrev, self.chapter)
    }

    pub fn position(&self) -> ChapterRef {
        ChapterRef::new(self.book_index, self.chapter)
    }

    pub fn title(&self) -> String {
        format!("{} {}", self.book, self.chapter)
    }
}

/// One fixed-size page of pre-wrapped lines.
///
/// `line_verses[i]` names the verse that produced `lines[i]`; `None` marks a
/// blank spacer line in parallel layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub lines: Vec<String>,
    pub line_verses: Vec<Option<u32>>,
    pub secondary_lines: Vec<String>,
    pub secondary_line_verses: Vec<Option<u32>>,
    pub start_verse: u32,
    pub end_verse: u32,
    /// Index of the source chapter within the window.
    pub chapter_index: usize,
    pub is_chapter_start: bool,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.secondary_lines.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_chapters: usize,
    pub total_verses: usize,
    pub total_bytes: u64,
    pub by_translation: BTreeMap<String, usize>,
}

impl CacheStats {
    pub fn human_size(&self) -> String {
        let bytes = self.total_bytes;
        if bytes < 1024 {
            format!("{bytes} B")
        } else if bytes < 1 << 20 {
            format!("{} KB", bytes / 1024)
        } else {
            format!("{} MB", bytes >> 20)
        }
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
