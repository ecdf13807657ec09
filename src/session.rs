//! Interactive-thread controller for one reader.
//!
//! The session owns navigation state and the built pages. The chapter window
//! is shared with the worker thread: every window mutation happens inside a
//! worker task, and the session only observes the window under its lock and
//! through the `is_loading` / `needs_repagination` flags. Nothing here blocks
//! on I/O except the explicit `wait_idle`.

use crate::canon::{BOOKS, ChapterRef, TRANSLATIONS, parse_reference};
use crate::config::AppConfig;
use crate::history::NavHistory;
use crate::loader::ChapterSource;
use crate::model::{Chapter, ChapterKey, Page};
use crate::pagination::{PageLayout, TextMeasure, build_pages, clamp_page_index};
use crate::position::ReadingPosition;
use crate::recent::{RecentEntry, RecentReading};
use crate::text_utils::{SearchMatch, search_verses};
use crate::window::ChapterWindow;
use crate::worker::{TaskQueue, Worker};
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Window state shared between the session and the worker.
#[derive(Default)]
pub struct SharedWindow {
    window: Mutex<ChapterWindow>,
    is_loading: AtomicBool,
    needs_repagination: AtomicBool,
    /// Live parallel-mode switch. Tasks read it when they run.
    parallel: AtomicBool,
}

impl SharedWindow {
    pub fn lock(&self) -> MutexGuard<'_, ChapterWindow> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    pub fn parallel_enabled(&self) -> bool {
        self.parallel.load(Ordering::SeqCst)
    }

    fn mark_dirty(&self) {
        self.needs_repagination.store(true, Ordering::SeqCst);
    }

    fn finish_loading(&self) {
        self.is_loading.store(false, Ordering::SeqCst);
    }
}

/// Clears `is_loading` when a task ends, whether it returns or panics.
struct LoadingGuard<'a>(&'a SharedWindow);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.finish_loading();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Top,
    Bottom,
}

/// Translation and layout choices a session starts with.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub translation: String,
    pub parallel_translation: String,
    pub parallel_mode: bool,
    pub layout: PageLayout,
    /// Where finished resets are recorded; `None` keeps the list in memory.
    pub recent_path: Option<PathBuf>,
}

impl From<&AppConfig> for SessionSettings {
    fn from(config: &AppConfig) -> Self {
        SessionSettings {
            translation: config.translation.clone(),
            parallel_translation: config.parallel_translation.clone(),
            parallel_mode: config.parallel_mode,
            layout: config.page_layout(),
            recent_path: Some(crate::recent::recent_path()),
        }
    }
}

pub struct ReaderSession {
    shared: Arc<SharedWindow>,
    worker: Worker,
    source: Arc<dyn ChapterSource>,
    measure: Box<dyn TextMeasure + Send + Sync>,
    layout: PageLayout,
    position: ChapterRef,
    translation: String,
    parallel_translation: String,
    history: NavHistory,
    recent: Arc<Mutex<RecentReading>>,
    pages: Vec<Page>,
    page_idx: usize,
}

impl ReaderSession {
    /// Start the worker. The window stays empty until the first navigation.
    pub fn new(
        source: Arc<dyn ChapterSource>,
        settings: SessionSettings,
        measure: Box<dyn TextMeasure + Send + Sync>,
    ) -> Result<Self> {
        let worker = Worker::spawn().context("Failed to start chapter worker")?;
        let shared = SharedWindow::default();
        shared.parallel.store(settings.parallel_mode, Ordering::SeqCst);
        let recent = match &settings.recent_path {
            Some(path) => RecentReading::open(path),
            None => RecentReading::in_memory(),
        };
        Ok(Self {
            shared: Arc::new(shared),
            worker,
            source,
            measure,
            layout: settings.layout,
            position: ChapterRef::FIRST,
            translation: settings.translation,
            parallel_translation: settings.parallel_translation,
            history: NavHistory::new(),
            recent: Arc::new(Mutex::new(recent)),
            pages: Vec::new(),
            page_idx: 0,
        })
    }

    pub fn position(&self) -> ChapterRef {
        self.position
    }

    pub fn translation(&self) -> &str {
        &self.translation
    }

    pub fn parallel_translation(&self) -> &str {
        &self.parallel_translation
    }

    pub fn is_parallel(&self) -> bool {
        self.shared.parallel_enabled()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.is_loading()
    }

    pub fn history(&self) -> &NavHistory {
        &self.history
    }

    /// Chapters whose reset finished loading, newest first.
    pub fn recent(&self) -> Vec<RecentEntry> {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries()
            .to_vec()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_index(&self) -> usize {
        self.page_idx
    }

    pub fn current_page(&self) -> Option<&Page> {
        self.pages.get(self.page_idx)
    }

    pub fn layout(&self) -> PageLayout {
        self.layout
    }

    /// Copy of the window as it is right now.
    pub fn window_snapshot(&self) -> ChapterWindow {
        self.shared.lock().clone()
    }

    /// Handle used to stop the worker from outside the session.
    pub fn worker_queue(&self) -> Arc<TaskQueue> {
        Arc::clone(self.worker.queue())
    }

    pub fn reading_position(&self) -> ReadingPosition {
        ReadingPosition {
            book: self.position.book,
            chapter: self.position.chapter,
            translation: self.translation.clone(),
            parallel: self.is_parallel(),
            page: self.page_idx,
        }
    }

    /// Resume a saved position, including its page once pages are rebuilt.
    pub fn restore(&mut self, saved: &ReadingPosition) {
        if is_known_translation(&saved.translation) {
            self.translation = saved.translation.clone();
        }
        self.shared.parallel.store(saved.parallel, Ordering::SeqCst);
        self.navigate_to(saved.chapter_ref());
        self.page_idx = saved.page;
    }

    /// Make `at` the current chapter and reload the window around it.
    pub fn navigate_to(&mut self, at: ChapterRef) -> bool {
        if !at.is_valid() {
            warn!(book = at.book, chapter = at.chapter, "Ignoring navigation outside canon");
            return false;
        }
        self.position = at;
        self.history.push(at);
        self.page_idx = 0;
        self.init_buffer(false);
        true
    }

    pub fn next_sequential(&mut self) -> bool {
        let mut at = self.position;
        at.advance() && self.navigate_to(at)
    }

    pub fn prev_sequential(&mut self) -> bool {
        let mut at = self.position;
        at.retreat() && self.navigate_to(at)
    }

    pub fn next_book(&mut self) -> bool {
        if self.position.book + 1 >= BOOKS.len() {
            return false;
        }
        self.navigate_to(ChapterRef::new(self.position.book + 1, 1))
    }

    pub fn prev_book(&mut self) -> bool {
        match self.position.book.checked_sub(1) {
            Some(book) => self.navigate_to(ChapterRef::new(book, 1)),
            None => false,
        }
    }

    /// Navigate to a typed reference. Returns the requested verse.
    pub fn jump_to(&mut self, reference: &str) -> Option<u32> {
        let (at, verse) = parse_reference(reference)?;
        info!(%reference, target = %at, verse, "Jumping to reference");
        self.navigate_to(at).then_some(verse)
    }

    pub fn go_back(&mut self) -> bool {
        match self.history.back() {
            Some(at) => {
                self.revisit(at);
                true
            }
            None => false,
        }
    }

    pub fn go_forward(&mut self) -> bool {
        match self.history.forward() {
            Some(at) => {
                self.revisit(at);
                true
            }
            None => false,
        }
    }

    fn revisit(&mut self, at: ChapterRef) {
        self.position = at;
        self.page_idx = 0;
        self.init_buffer(false);
    }

    pub fn set_translation(&mut self, code: &str) -> bool {
        if !is_known_translation(code) {
            warn!(%code, "Unknown translation");
            return false;
        }
        if self.translation != code {
            self.translation = code.to_string();
            self.init_buffer(false);
        }
        true
    }

    pub fn set_parallel_translation(&mut self, code: &str) -> bool {
        if !is_known_translation(code) {
            warn!(%code, "Unknown parallel translation");
            return false;
        }
        if self.parallel_translation != code {
            self.parallel_translation = code.to_string();
            if self.is_parallel() {
                self.init_buffer(false);
            }
        }
        true
    }

    /// Enabling reloads the whole window; disabling only drops the secondary
    /// sequence.
    pub fn set_parallel_mode(&mut self, enabled: bool) {
        if self.shared.parallel.swap(enabled, Ordering::SeqCst) == enabled {
            return;
        }
        info!(enabled, "Parallel mode changed");
        if enabled {
            self.init_buffer(false);
        } else {
            self.shared.lock().set_parallel(false);
            self.shared.mark_dirty();
        }
    }

    pub fn toggle_parallel_mode(&mut self) {
        self.set_parallel_mode(!self.is_parallel());
    }

    /// Drop the cached copy of the current chapter and reload the window.
    pub fn force_refresh(&mut self) {
        info!(at = %self.position, "Forcing refresh of current chapter");
        self.init_buffer(true);
    }

    /// Queue a window reset at the current position, superseding any queued
    /// work.
    fn init_buffer(&mut self, invalidate: bool) {
        self.shared.is_loading.store(true, Ordering::SeqCst);
        let shared = Arc::clone(&self.shared);
        let source = Arc::clone(&self.source);
        let target = self.position;
        let primary = self.translation.clone();
        let secondary = self.parallel_translation.clone();
        let recent = Arc::clone(&self.recent);

        self.worker.push_task(
            move || {
                let _loading = LoadingGuard(&shared);
                if invalidate {
                    source.invalidate(&ChapterKey::for_ref(&primary, target));
                    if shared.parallel_enabled() {
                        source.invalidate(&ChapterKey::for_ref(&secondary, target));
                    }
                }
                {
                    // Read under the lock `set_parallel_mode` takes when disabling.
                    let mut window = shared.lock();
                    window.reset(target, shared.parallel_enabled());
                }
                shared.mark_dirty();
                let Some(loaded) =
                    load_edge(&shared, source.as_ref(), target, &primary, &secondary, Edge::Bottom)
                else {
                    debug!(at = %target, "Window reset left its chapter unloaded");
                    return;
                };
                if let Some(next) = target.next() {
                    load_edge(&shared, source.as_ref(), next, &primary, &secondary, Edge::Bottom);
                }
                recent
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record(&loaded);
                debug!(at = %target, "Window reset complete");
            },
            true,
        );
    }

    /// Append the successor of the last window chapter. Returns whether a
    /// load was queued.
    pub fn grow_bottom(&mut self) -> bool {
        self.grow(Edge::Bottom)
    }

    /// Prepend the predecessor of the first window chapter.
    pub fn grow_top(&mut self) -> bool {
        self.grow(Edge::Top)
    }

    fn grow(&mut self, edge: Edge) -> bool {
        if self.shared.is_loading() || self.shared.lock().is_empty() {
            return false;
        }
        if self.shared.is_loading.swap(true, Ordering::SeqCst) {
            return false;
        }
        let shared = Arc::clone(&self.shared);
        let source = Arc::clone(&self.source);
        let primary = self.translation.clone();
        let secondary = self.parallel_translation.clone();

        self.worker.push_task(
            move || {
                let _loading = LoadingGuard(&shared);
                let target = {
                    let window = shared.lock();
                    match edge {
                        Edge::Bottom => window.last_position().and_then(ChapterRef::next),
                        Edge::Top => window.first_position().and_then(ChapterRef::prev),
                    }
                };
                match target {
                    Some(at) => {
                        load_edge(&shared, source.as_ref(), at, &primary, &secondary, edge);
                    }
                    None => debug!(?edge, "Window already at canonical bound"),
                }
            },
            false,
        );
        true
    }

    /// Rebuild pages when the worker changed the window since the last build.
    pub fn rebuild_pages_if_needed(&mut self) -> bool {
        if !self.shared.needs_repagination.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.rebuild_pages();
        true
    }

    pub fn rebuild_pages(&mut self) {
        let window = self.shared.lock();
        if window.is_empty() {
            return;
        }
        self.pages = build_pages(
            window.primary(),
            window.secondary(),
            window.is_parallel(),
            self.measure.as_ref(),
            &self.layout,
        );
        drop(window);
        self.page_idx = clamp_page_index(self.page_idx, self.pages.len());
        debug!(pages = self.pages.len(), page = self.page_idx, "Rebuilt pages");
    }

    pub fn set_layout(&mut self, layout: PageLayout) {
        if self.layout != layout {
            self.layout = layout;
            self.shared.mark_dirty();
        }
    }

    /// Next page; on the last page this asks the window to grow downward.
    pub fn page_next(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        if self.page_idx + 1 >= self.pages.len() {
            self.grow_bottom();
        }
        if self.page_idx + 1 < self.pages.len() {
            self.page_idx += 1;
        }
    }

    /// Previous page; on the first page this asks the window to grow upward.
    pub fn page_prev(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        if self.page_idx == 0 {
            self.grow_top();
        } else {
            self.page_idx -= 1;
        }
    }

    /// Search the verses currently held in the primary window.
    pub fn search(&self, query: &str, case_sensitive: bool) -> Vec<SearchMatch> {
        let window = self.shared.lock();
        search_verses(window.primary(), query, case_sensitive)
    }

    /// Plain-text export of one loaded window chapter.
    pub fn chapter_text(&self, index: usize) -> Option<String> {
        let window = self.shared.lock();
        let chapter = window.primary().get(index).filter(|c| c.is_loaded)?;
        let mut out = format!("{} ({})\n\n", chapter.title(), chapter.translation);
        for verse in &chapter.verses {
            let _ = writeln!(out, "{} {}", verse.number, verse.text);
        }
        Some(out)
    }

    pub fn wait_idle(&self) {
        self.worker.wait_idle();
    }

    pub fn shutdown(&mut self) {
        self.worker.shutdown();
    }
}

fn is_known_translation(code: &str) -> bool {
    TRANSLATIONS.iter().any(|(known, _)| *known == code)
}

fn resolve(source: &dyn ChapterSource, at: ChapterRef, translation: &str) -> Chapter {
    let mut chapter = source.load_or_fetch(at.book, at.chapter, translation);
    chapter.book_index = at.book;
    chapter.book_abbrev = at.book_abbrev().to_string();
    chapter
}

/// Load `at` into one edge of the window. The lock is released between the
/// primary and secondary loads so the primary shows up first. Returns the
/// primary chapter when it loaded.
fn load_edge(
    shared: &SharedWindow,
    source: &dyn ChapterSource,
    at: ChapterRef,
    primary: &str,
    secondary: &str,
    edge: Edge,
) -> Option<Chapter> {
    let chapter = resolve(source, at, primary);
    let loaded = chapter.is_loaded.then(|| chapter.clone());
    let parallel = {
        let mut window = shared.lock();
        match edge {
            Edge::Bottom => window.push_back(chapter),
            Edge::Top => window.push_front(chapter),
        }
        debug_assert!(window.is_contiguous());
        window.is_parallel()
    };
    shared.mark_dirty();
    debug!(%at, ?edge, "Loaded primary chapter into window");

    if !parallel {
        return loaded;
    }
    let counterpart = resolve(source, at, secondary);
    let mut window = shared.lock();
    match edge {
        Edge::Bottom => window.push_back_secondary(counterpart),
        Edge::Top => window.push_front_secondary(counterpart),
    }
    drop(window);
    shared.mark_dirty();
    loaded
}
