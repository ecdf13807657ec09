//! Back/forward list of visited chapters.

use crate::canon::ChapterRef;
use std::collections::VecDeque;

pub const MAX_HISTORY: usize = 50;

#[derive(Debug, Clone, Default)]
pub struct NavHistory {
    entries: VecDeque<ChapterRef>,
    /// Index of the current entry; meaningless while `entries` is empty.
    cursor: usize,
}

impl NavHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<ChapterRef> {
        self.entries.get(self.cursor).copied()
    }

    /// Record a visit. Drops the forward tail; revisiting the current entry
    /// is a no-op.
    pub fn push(&mut self, at: ChapterRef) {
        if self.current() == Some(at) {
            return;
        }
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push_back(at);
        if self.entries.len() > MAX_HISTORY {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() - 1;
    }

    pub fn can_go_back(&self) -> bool {
        !self.entries.is_empty() && self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn back(&mut self) -> Option<ChapterRef> {
        if !self.can_go_back() {
            return None;
        }
        self.cursor -= 1;
        self.current()
    }

    pub fn forward(&mut self) -> Option<ChapterRef> {
        if !self.can_go_forward() {
            return None;
        }
        self.cursor += 1;
        self.current()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
