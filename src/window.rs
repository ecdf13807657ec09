//! Bounded sliding window of loaded chapters.
//!
//! The window keeps a primary sequence and, in parallel mode, a secondary
//! sequence in a second translation. Both hold at most [`BUF_MAX`] chapters.
//! The anchor is the logical left edge and keeps moving with eviction even
//! though the evicted chapter is gone.

use crate::canon::ChapterRef;
use crate::model::Chapter;
use std::collections::VecDeque;
use tracing::debug;

/// Maximum chapters retained per translation.
pub const BUF_MAX: usize = 5;

#[derive(Debug, Clone)]
pub struct ChapterWindow {
    primary: VecDeque<Chapter>,
    secondary: VecDeque<Chapter>,
    anchor: ChapterRef,
    parallel: bool,
}

impl Default for ChapterWindow {
    fn default() -> Self {
        Self::new(ChapterRef::FIRST)
    }
}

impl ChapterWindow {
    pub fn new(anchor: ChapterRef) -> Self {
        Self {
            primary: VecDeque::with_capacity(BUF_MAX + 1),
            secondary: VecDeque::with_capacity(BUF_MAX + 1),
            anchor,
            parallel: false,
        }
    }

    pub fn primary(&self) -> &VecDeque<Chapter> {
        &self.primary
    }

    pub fn secondary(&self) -> &VecDeque<Chapter> {
        &self.secondary
    }

    pub fn anchor(&self) -> ChapterRef {
        self.anchor
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn len(&self) -> usize {
        self.primary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty()
    }

    pub fn first_position(&self) -> Option<ChapterRef> {
        self.primary.front().map(Chapter::position)
    }

    pub fn last_position(&self) -> Option<ChapterRef> {
        self.primary.back().map(Chapter::position)
    }

    /// Drop both sequences and restart at `anchor`.
    pub fn reset(&mut self, anchor: ChapterRef, parallel: bool) {
        self.primary.clear();
        self.secondary.clear();
        self.anchor = anchor;
        self.parallel = parallel;
    }

    /// Turning parallel mode off discards the secondary sequence; turning it
    /// on only flips the flag (the caller is expected to reset).
    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
        if !parallel {
            self.secondary.clear();
        }
    }

    /// Append to the primary sequence. On overflow the first chapter of both
    /// sequences is evicted and the anchor advances one chapter.
    pub fn push_back(&mut self, chapter: Chapter) {
        self.primary.push_back(chapter);
        if self.primary.len() > BUF_MAX {
            if let Some(evicted) = self.primary.pop_front() {
                debug!(evicted = %evicted.title(), "Evicted chapter from window top");
                if self.secondary.front().map(Chapter::position) == Some(evicted.position()) {
                    self.secondary.pop_front();
                }
            }
            // Clamped: at the final chapter the anchor simply stays put.
            self.anchor.advance();
        }
    }

    /// Prepend to the primary sequence and move the anchor onto it. On
    /// overflow the last chapter of both sequences is evicted.
    pub fn push_front(&mut self, chapter: Chapter) {
        self.anchor = chapter.position();
        self.primary.push_front(chapter);
        if self.primary.len() > BUF_MAX {
            if let Some(evicted) = self.primary.pop_back() {
                debug!(evicted = %evicted.title(), "Evicted chapter from window bottom");
                if self.secondary.back().map(Chapter::position) == Some(evicted.position()) {
                    self.secondary.pop_back();
                }
            }
        }
    }

    /// Append the secondary-translation counterpart of the last primary chapter.
    /// Ignored when parallel mode is off.
    pub fn push_back_secondary(&mut self, chapter: Chapter) {
        if !self.parallel {
            return;
        }
        self.secondary.push_back(chapter);
        while self.secondary.len() > BUF_MAX {
            self.secondary.pop_front();
        }
    }

    /// Prepend the secondary-translation counterpart of the first primary chapter.
    pub fn push_front_secondary(&mut self, chapter: Chapter) {
        if !self.parallel {
            return;
        }
        self.secondary.push_front(chapter);
        while self.secondary.len() > BUF_MAX {
            self.secondary.pop_back();
        }
    }

    /// Primary chapter at `index` paired with its secondary counterpart, if any.
    pub fn pair(&self, index: usize) -> Option<(&Chapter, Option<&Chapter>)> {
        let primary = self.primary.get(index)?;
        let secondary = self
            .secondary
            .get(index)
            .filter(|c| c.position() == primary.position());
        Some((primary, secondary))
    }

    /// Every adjacent pair of primary chapters is a canonical successor pair.
    pub fn is_contiguous(&self) -> bool {
        self.primary
            .iter()
            .zip(self.primary.iter().skip(1))
            .all(|(a, b)| a.position().next() == Some(b.position()))
    }
}
