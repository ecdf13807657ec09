//! Verse text normalization and lookup helpers.

use crate::model::Chapter;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_STRONGS_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<s>\s*[gh]?\d+\s*</s>").unwrap());
static RE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static RE_SPACE_BEFORE_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+([,.;:!?])").unwrap());

/// Collapse runs of whitespace (newlines included) to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    RE_WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Remove inline study markup, including the numbers inside `<S>..</S>` spans.
pub fn strip_tags(text: &str) -> String {
    if !text.contains('<') {
        return collapse_whitespace(text);
    }
    let without_numbers = RE_STRONGS_SPAN.replace_all(text, " ");
    let without_tags = RE_TAG.replace_all(&without_numbers, " ");
    let collapsed = collapse_whitespace(&without_tags);
    RE_SPACE_BEFORE_PUNCT
        .replace_all(&collapsed, "$1")
        .into_owned()
}

/// Split a fetched verse into (clean text, raw annotated text).
///
/// The raw form is only returned when it differs from the clean form.
pub fn split_annotated(text: &str) -> (String, Option<String>) {
    let composed: String = text.nfc().collect();
    let raw = collapse_whitespace(&composed);
    let clean = strip_tags(&raw);
    if clean == raw {
        (clean, None)
    } else {
        (clean, Some(raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub book_index: usize,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    /// Byte offset of the match inside `text`.
    pub match_pos: usize,
    pub match_len: usize,
}

/// Every occurrence of `query` in the clean text of the given chapters.
pub fn search_verses<'a>(
    chapters: impl IntoIterator<Item = &'a Chapter>,
    query: &str,
    case_sensitive: bool,
) -> Vec<SearchMatch> {
    let mut matches = Vec::new();
    if query.is_empty() {
        return matches;
    }
    let needle = if case_sensitive {
        query.to_string()
    } else {
        query.to_lowercase()
    };
    for chapter in chapters {
        for verse in &chapter.verses {
            let haystack = if case_sensitive {
                verse.text.clone()
            } else {
                verse.text.to_lowercase()
            };
            for (pos, _) in haystack.match_indices(&needle) {
                matches.push(SearchMatch {
                    book_index: chapter.book_index,
                    chapter: chapter.chapter,
                    verse: verse.number,
                    text: verse.text.clone(),
                    match_pos: pos,
                    match_len: needle.len(),
                });
            }
        }
    }
    matches
}
