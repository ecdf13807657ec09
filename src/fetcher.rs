//! Remote chapter fetching.
//!
//! The transport sits behind [`HttpSource`] so tests can script responses.
//! Any failure (transport, status, JSON shape, no verses) collapses into
//! [`Chapter::load_failure`]; callers never see an error value.

use crate::cache::ChapterCache;
use crate::canon::book_info;
use crate::model::{Chapter, Verse, unix_now};
use crate::text_utils::split_annotated;
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Minimal blocking GET. Implementations enforce their own timeout.
pub trait HttpSource: Send + Sync {
    fn get(&self, url: &str) -> Result<String>;
}

pub struct ReqwestSource {
    client: reqwest::blocking::Client,
}

impl ReqwestSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("verse-viewer/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl HttpSource for ReqwestSource {
    fn get(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("GET {url}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("GET {url} returned {status}"));
        }
        response.text().context("Reading response body")
    }
}

#[derive(Deserialize)]
struct ApiChapter {
    #[serde(default)]
    verses: Vec<ApiVerse>,
}

#[derive(Deserialize)]
struct ApiVerse {
    verse: u32,
    text: String,
}

pub struct Fetcher<H: HttpSource> {
    http: H,
    cache: Arc<ChapterCache>,
    base_url: String,
}

impl<H: HttpSource> Fetcher<H> {
    pub fn new(http: H, cache: Arc<ChapterCache>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            cache,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch one chapter, saving it to the cache on success.
    pub fn fetch(&self, book_index: usize, chapter: u32, translation: &str) -> Chapter {
        let Some(url) = self.chapter_url(book_index, chapter, translation) else {
            warn!(book_index, chapter, "Fetch requested for unknown book");
            return Chapter::load_failure(book_index, chapter, translation);
        };
        info!(book_index, chapter, %translation, %url, "Fetching chapter");

        let body = match self.http.get(&url) {
            Ok(body) if !body.trim().is_empty() => body,
            Ok(_) => {
                warn!(%url, "Empty response body");
                return Chapter::load_failure(book_index, chapter, translation);
            }
            Err(err) => {
                warn!(%url, "Fetch failed: {err:#}");
                return Chapter::load_failure(book_index, chapter, translation);
            }
        };

        let verses = match parse_verses(&body) {
            Ok(verses) => verses,
            Err(err) => {
                warn!(%url, "Unusable chapter response: {err:#}");
                return Chapter::load_failure(book_index, chapter, translation);
            }
        };

        let mut out = Chapter::unloaded(book_index, chapter, translation);
        out.verses = verses;
        out.fetched_at = unix_now();
        out.is_loaded = true;
        if !self.cache.save(&out) {
            debug!(key = ?out.key(), "Cache write skipped; chapter will be refetched next time");
        }
        out
    }

    fn chapter_url(&self, book_index: usize, chapter: u32, translation: &str) -> Option<String> {
        let info = book_info(book_index)?;
        let mut reference = format!("{}+{}", info.abbrev, chapter);
        if info.chapters == 1 {
            // Single-chapter books need an explicit range or the remote
            // answers with only the first verse.
            reference.push_str(&format!(":1-{}", single_chapter_verse_count(info.abbrev)));
        }
        Some(format!(
            "{}/{}?translation={}",
            self.base_url, reference, translation
        ))
    }
}

/// Verse count requested for books that consist of a single chapter.
pub fn single_chapter_verse_count(abbrev: &str) -> u32 {
    match abbrev {
        "oba" => 21,
        "2jn" => 13,
        "3jn" => 14,
        _ => 25,
    }
}

fn parse_verses(body: &str) -> Result<Vec<Verse>> {
    let parsed: ApiChapter = serde_json::from_str(body).context("Parsing chapter JSON")?;
    let verses: Vec<Verse> = parsed
        .verses
        .into_iter()
        .filter_map(|v| {
            let (text, raw_text) = split_annotated(&v.text);
            (!text.is_empty()).then_some(Verse {
                number: v.verse,
                text,
                raw_text,
            })
        })
        .collect();
    if verses.is_empty() {
        return Err(anyhow!("response contained no verses"));
    }
    Ok(verses)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::LOAD_ERROR_TEXT;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::{SystemTime, UNIX_EPOCH};

    /// Scripted HTTP source that records every requested URL.
    #[derive(Clone)]
    pub(crate) struct MockHttp {
        body: Option<String>,
        pub(crate) requests: Arc<Mutex<Vec<String>>>,
    }

    impl MockHttp {
        pub(crate) fn ok(body: &str) -> Self {
            Self {
                body: Some(body.to_string()),
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                body: None,
                requests: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests
                .lock()
                .expect("requests lock should be available")
                .len()
        }
    }

    impl HttpSource for MockHttp {
        fn get(&self, url: &str) -> Result<String> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(url.to_string());
            }
            self.body
                .clone()
                .ok_or_else(|| anyhow!("simulated network failure"))
        }
    }

    pub(crate) const SAMPLE_BODY: &str = r#"{
        "reference": "John 3",
        "verses": [
            {"book_id": "JHN", "book_name": "John", "chapter": 3, "verse": 1, "text": "Now there was a man of the Pharisees,\nnamed Nicodemus,  a ruler of the Jews.\n"},
            {"book_id": "JHN", "book_name": "John", "chapter": 3, "verse": 2, "text": "The same came to Jesus by night.\n"},
            {"book_id": "JHN", "book_name": "John", "chapter": 3, "verse": 3, "text": "   \n"}
        ],
        "translation_id": "kjv"
    }"#;

    pub(crate) fn unique_temp_path(prefix: &str) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("verse_viewer_fetch_{prefix}_{now}"))
    }

    #[test]
    fn successful_fetch_normalizes_and_caches() {
        let root = unique_temp_path("success");
        let cache = Arc::new(ChapterCache::open(&root).expect("cache should open"));
        let http = MockHttp::ok(SAMPLE_BODY);
        let fetcher = Fetcher::new(http.clone(), Arc::clone(&cache), "https://bible-api.com/");

        let chapter = fetcher.fetch(42, 3, "kjv");

        assert!(chapter.is_loaded);
        assert!(!chapter.from_cache);
        assert_eq!(chapter.verses.len(), 2);
        assert_eq!(
            chapter.verses[0].text,
            "Now there was a man of the Pharisees, named Nicodemus, a ruler of the Jews."
        );
        assert_eq!(chapter.book_abbrev, "jhn");
        assert!(cache.has(&chapter.key()));
        assert_eq!(
            http.requests.lock().expect("requests lock").as_slice(),
            ["https://bible-api.com/jhn+3?translation=kjv"]
        );
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn network_failure_yields_single_error_verse() {
        let root = unique_temp_path("network");
        let cache = Arc::new(ChapterCache::open(&root).expect("cache should open"));
        let fetcher = Fetcher::new(MockHttp::failing(), Arc::clone(&cache), "https://x");

        let chapter = fetcher.fetch(0, 1, "web");

        assert!(chapter.is_loaded);
        assert_eq!(chapter.verses, vec![Verse::new(1, LOAD_ERROR_TEXT)]);
        assert!(!cache.has(&chapter.key()));
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn parse_failure_yields_single_error_verse() {
        let root = unique_temp_path("parse");
        let cache = Arc::new(ChapterCache::open(&root).expect("cache should open"));
        for body in ["<html>502</html>", r#"{"reference":"John 3","verses":[]}"#] {
            let fetcher = Fetcher::new(MockHttp::ok(body), Arc::clone(&cache), "https://x");
            let chapter = fetcher.fetch(42, 3, "web");
            assert!(chapter.is_loaded);
            assert_eq!(chapter.verses.len(), 1);
            assert_eq!(chapter.verses[0].text, LOAD_ERROR_TEXT);
        }
        let _ = std::fs::remove_dir_all(root);
    }

    #[test]
    fn single_chapter_books_request_explicit_range() {
        let root = unique_temp_path("range");
        let cache = Arc::new(ChapterCache::open(&root).expect("cache should open"));
        let http = MockHttp::failing();
        let fetcher = Fetcher::new(http.clone(), cache, "https://bible-api.com");

        fetcher.fetch(62, 1, "web");
        fetcher.fetch(64, 1, "web");

        let requests = http.requests.lock().expect("requests lock").clone();
        assert_eq!(requests[0], "https://bible-api.com/2jn+1:1-13?translation=web");
        assert_eq!(requests[1], "https://bible-api.com/jud+1:1-25?translation=web");
        let _ = std::fs::remove_dir_all(root);
    }
}
