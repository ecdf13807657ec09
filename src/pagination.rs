//! Pagination of window chapters into fixed-size pages.
//!
//! Verses are word-wrapped with a caller-provided measurement and laid onto
//! pages greedily: a verse goes on the current page unless its wrapped block
//! would overflow the page, in which case the page closes first. A page with
//! no content never closes, so a single verse taller than the page still
//! makes progress. The output depends only on the inputs.

use crate::model::{Chapter, Page};
use std::collections::VecDeque;

/// Vertical gap after each verse block (px).
pub const VERSE_GAP: f32 = 14.0;
/// Space reserved at the bottom of every page (px).
pub const FOOTER_ROOM: f32 = 50.0;
/// Space taken by the chapter heading on a chapter's first page (px).
pub const HEADING_HEIGHT: f32 = 42.0;
/// Horizontal margin subtracted from the text width in single layout (px).
pub const SINGLE_MARGIN: f32 = 60.0;
/// Total gutter between and around the two columns in parallel layout (px).
pub const PARALLEL_GUTTER: f32 = 80.0;
/// Horizontal margin inside each parallel column (px).
pub const COLUMN_MARGIN: f32 = 5.0;
const CONTINUATION_INDENT: &str = "    ";

pub const MIN_FONT_SIZE: f32 = 10.0;
pub const MAX_FONT_SIZE: f32 = 48.0;

/// Text width measurement used for wrapping.
pub trait TextMeasure {
    fn measure(&self, text: &str, font_size: f32) -> f32;
}

impl<F> TextMeasure for F
where
    F: Fn(&str, f32) -> f32,
{
    fn measure(&self, text: &str, font_size: f32) -> f32 {
        self(text, font_size)
    }
}

/// Fixed advance per character, expressed as a fraction of the font size.
#[derive(Debug, Clone, Copy)]
pub struct MonospaceMeasure {
    pub advance: f32,
}

impl Default for MonospaceMeasure {
    fn default() -> Self {
        Self { advance: 0.5 }
    }
}

impl TextMeasure for MonospaceMeasure {
    fn measure(&self, text: &str, font_size: f32) -> f32 {
        text.chars().count() as f32 * font_size * self.advance
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
    pub line_spacing: f32,
}

impl PageLayout {
    pub fn line_height(&self) -> f32 {
        self.font_size + self.line_spacing
    }

    fn content_limit(&self) -> f32 {
        self.height - FOOTER_ROOM
    }
}

/// Build every page for the current window contents.
pub fn build_pages(
    primary: &VecDeque<Chapter>,
    secondary: &VecDeque<Chapter>,
    parallel: bool,
    measure: &dyn TextMeasure,
    layout: &PageLayout,
) -> Vec<Page> {
    let mut pages = Vec::new();
    for (index, chapter) in primary.iter().enumerate() {
        if !chapter.is_loaded || chapter.verses.is_empty() {
            continue;
        }
        if parallel {
            let counterpart = secondary
                .get(index)
                .filter(|c| c.is_loaded && c.position() == chapter.position());
            layout_parallel(&mut pages, index, chapter, counterpart, measure, layout);
        } else {
            layout_single(&mut pages, index, chapter, measure, layout);
        }
    }
    pages
}

/// Clamp a previously selected page index into `0..page_count`.
pub fn clamp_page_index(index: usize, page_count: usize) -> usize {
    index.min(page_count.saturating_sub(1))
}

fn layout_single(
    pages: &mut Vec<Page>,
    chapter_index: usize,
    chapter: &Chapter,
    measure: &dyn TextMeasure,
    layout: &PageLayout,
) {
    let mut current = open_page(chapter_index, true, chapter.verses[0].number);
    let mut used = HEADING_HEIGHT;

    for verse in &chapter.verses {
        let block = verse_block(
            verse.number,
            &verse.text,
            layout.width - SINGLE_MARGIN,
            measure,
            layout,
        );
        let block_height = block.len() as f32 * layout.line_height() + VERSE_GAP;
        if used + block_height > layout.content_limit() && !current.lines.is_empty() {
            pages.push(std::mem::replace(
                &mut current,
                open_page(chapter_index, false, verse.number),
            ));
            used = 0.0;
        }
        current
            .line_verses
            .extend(std::iter::repeat_n(Some(verse.number), block.len()));
        current.lines.extend(block);
        current.end_verse = verse.number;
        used += block_height;
    }

    if !current.is_empty() {
        pages.push(current);
    }
}

fn layout_parallel(
    pages: &mut Vec<Page>,
    chapter_index: usize,
    chapter: &Chapter,
    counterpart: Option<&Chapter>,
    measure: &dyn TextMeasure,
    layout: &PageLayout,
) {
    let column_width = (layout.width - PARALLEL_GUTTER) / 2.0;
    let secondary_verses = counterpart.map(|c| c.verses.as_slice()).unwrap_or(&[]);
    let rows = chapter.verses.len().max(secondary_verses.len());
    let last_primary = chapter.verses.last().map(|v| v.number).unwrap_or(1);

    let mut current = open_page(chapter_index, true, chapter.verses[0].number);
    let mut used = HEADING_HEIGHT;

    for row in 0..rows {
        let left = chapter.verses.get(row);
        let right = secondary_verses.get(row);
        let left_block = left
            .map(|v| verse_block(v.number, &v.text, column_width - COLUMN_MARGIN, measure, layout))
            .unwrap_or_default();
        let right_block = right
            .map(|v| verse_block(v.number, &v.text, column_width - COLUMN_MARGIN, measure, layout))
            .unwrap_or_default();

        let tallest = left_block.len().max(right_block.len());
        let row_height = tallest as f32 * layout.line_height() + VERSE_GAP;
        if used + row_height > layout.content_limit() && !current.is_empty() {
            let start = left.map(|v| v.number).unwrap_or(last_primary);
            pages.push(std::mem::replace(
                &mut current,
                open_page(chapter_index, false, start),
            ));
            used = 0.0;
        }

        push_column(
            &mut current.lines,
            &mut current.line_verses,
            left_block,
            left.map(|v| v.number),
            tallest,
        );
        push_column(
            &mut current.secondary_lines,
            &mut current.secondary_line_verses,
            right_block,
            right.map(|v| v.number),
            tallest,
        );
        if let Some(verse) = left {
            current.end_verse = verse.number;
        }
        used += row_height;
    }

    if !current.is_empty() {
        pages.push(current);
    }
}

/// Append one column's block, padded to `rows` lines plus a spacer line so
/// later rows stay aligned across columns.
fn push_column(
    lines: &mut Vec<String>,
    verses: &mut Vec<Option<u32>>,
    block: Vec<String>,
    verse: Option<u32>,
    rows: usize,
) {
    let written = block.len();
    lines.extend(block);
    verses.extend(std::iter::repeat_n(verse, written));
    for _ in written..=rows {
        lines.push(String::new());
        verses.push(None);
    }
}

fn open_page(chapter_index: usize, is_chapter_start: bool, start_verse: u32) -> Page {
    Page {
        chapter_index,
        is_chapter_start,
        start_verse,
        end_verse: start_verse,
        ..Page::default()
    }
}

/// Wrap one verse under its number label; continuation lines are indented.
/// Always yields at least one line.
fn verse_block(
    number: u32,
    text: &str,
    available_width: f32,
    measure: &dyn TextMeasure,
    layout: &PageLayout,
) -> Vec<String> {
    let label = format!("{number} ");
    let label_width = measure.measure(&label, layout.font_size);
    let wrapped = wrap_text(text, measure, layout.font_size, available_width - label_width);
    if wrapped.is_empty() {
        return vec![label.trim_end().to_string()];
    }
    wrapped
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                format!("{label}{line}")
            } else {
                format!("{CONTINUATION_INDENT}{line}")
            }
        })
        .collect()
}

/// Greedy word wrap. A single word wider than `max_width` gets its own line.
/// A non-positive width produces no lines.
/// Greedy word wrap. A word wider than `max_width` gets a line of its own;
/// with no usable width every word does.
pub fn wrap_text(text: &str, measure: &dyn TextMeasure, font_size: f32, max_width: f32) -> Vec<String> {
    if max_width <= 0.0 {
        return text.split_whitespace().map(str::to_string).collect();
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure.measure(&candidate, font_size) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Verse;

    fn layout(height: f32) -> PageLayout {
        PageLayout {
            width: 700.0,
            height,
            font_size: 20.0,
            line_spacing: 6.0,
        }
    }

    fn chapter_with(book: usize, number: u32, verses: Vec<Verse>) -> Chapter {
        let mut out = Chapter::unloaded(book, number, "web");
        out.verses = verses;
        out.is_loaded = true;
        out
    }

    fn short_verses(count: u32) -> Vec<Verse> {
        (1..=count)
            .map(|n| Verse::new(n, format!("Verse {n} is short.")))
            .collect()
    }

    fn long_verses(count: u32, words: usize) -> Vec<Verse> {
        (1..=count)
            .map(|n| {
                let text = (0..words)
                    .map(|w| format!("word{w}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                Verse::new(n, text)
            })
            .collect()
    }

    /// Height a parallel page consumed: every row is its block lines plus one
    /// spacer line, charged as `VERSE_GAP` instead of a full line.
    fn parallel_used_height(page: &Page, page_layout: &PageLayout) -> (usize, f32) {
        let mut rows = 0;
        for idx in 0..page.lines.len() {
            let filled = page.line_verses[idx].is_some() || page.secondary_line_verses[idx].is_some();
            let after_spacer = idx == 0
                || (page.line_verses[idx - 1].is_none() && page.secondary_line_verses[idx - 1].is_none());
            if filled && after_spacer {
                rows += 1;
            }
        }
        let heading = if page.is_chapter_start { HEADING_HEIGHT } else { 0.0 };
        let used = (page.lines.len() - rows) as f32 * page_layout.line_height()
            + rows as f32 * VERSE_GAP
            + heading;
        (rows, used)
    }

    fn secondary_attributions(pages: &[Page]) -> Vec<u32> {
        let mut out: Vec<u32> = Vec::new();
        for page in pages {
            for verse in page.secondary_line_verses.iter().flatten() {
                if out.last() != Some(verse) {
                    out.push(*verse);
                }
            }
        }
        out
    }

    fn attributions(pages: &[Page], chapter_index: usize) -> Vec<u32> {
        let mut out: Vec<u32> = Vec::new();
        for page in pages.iter().filter(|p| p.chapter_index == chapter_index) {
            for verse in page.line_verses.iter().flatten() {
                if out.last() != Some(verse) {
                    out.push(*verse);
                }
            }
        }
        out
    }

    #[test]
    fn short_chapter_fits_on_one_page() {
        let window = VecDeque::from([chapter_with(0, 1, short_verses(10))]);
        let pages = build_pages(
            &window,
            &VecDeque::new(),
            false,
            &MonospaceMeasure::default(),
            &layout(2000.0),
        );
        assert_eq!(pages.len(), 1);
        let verses: Vec<u32> = pages[0].line_verses.iter().flatten().copied().collect();
        assert_eq!(verses, (1..=10).collect::<Vec<_>>());
        assert!(pages[0].is_chapter_start);
        assert_eq!((pages[0].start_verse, pages[0].end_verse), (1, 10));
    }

    #[test]
    fn long_chapters_split_and_cover_every_verse_in_order() {
        let window = VecDeque::from([
            chapter_with(0, 1, long_verses(30, 40)),
            chapter_with(0, 2, long_verses(12, 25)),
        ]);
        let page_layout = layout(500.0);
        let pages = build_pages(
            &window,
            &VecDeque::new(),
            false,
            &MonospaceMeasure::default(),
            &page_layout,
        );
        assert!(pages.len() > 2);
        assert_eq!(attributions(&pages, 0), (1..=30).collect::<Vec<_>>());
        assert_eq!(attributions(&pages, 1), (1..=12).collect::<Vec<_>>());

        for page in &pages {
            assert_eq!(page.lines.len(), page.line_verses.len());
            let distinct = page.end_verse - page.start_verse + 1;
            if distinct > 1 {
                let text_height = page.lines.len() as f32 * page_layout.line_height();
                assert!(text_height <= page_layout.height - FOOTER_ROOM);
            }
        }
        let starts = pages.iter().filter(|p| p.is_chapter_start).count();
        assert_eq!(starts, 2);
    }

    #[test]
    fn oversized_verse_still_gets_its_own_page() {
        let mut huge = long_verses(1, 400).remove(0);
        huge.number = 2;
        let window = VecDeque::from([chapter_with(
            0,
            1,
            vec![Verse::new(1, "short"), huge, Verse::new(3, "after")],
        )]);
        let page_layout = layout(300.0);
        let pages = build_pages(
            &window,
            &VecDeque::new(),
            false,
            &MonospaceMeasure::default(),
            &page_layout,
        );
        assert_eq!(pages.len(), 3);
        assert_eq!(attributions(&pages, 0), vec![1, 2, 3]);
        let huge_page = &pages[1];
        assert!(!huge_page.is_chapter_start);
        assert_eq!((huge_page.start_verse, huge_page.end_verse), (2, 2));
        assert!(huge_page.lines.len() as f32 * page_layout.line_height() > 300.0);
    }

    #[test]
    fn parallel_columns_stay_row_aligned() {
        let mut left = long_verses(4, 30);
        left[1] = Verse::new(2, "tiny");
        let right = short_verses(3);
        let window = VecDeque::from([chapter_with(42, 1, left)]);
        let secondary = VecDeque::from([chapter_with(42, 1, right)]);
        let pages = build_pages(
            &window,
            &secondary,
            true,
            &MonospaceMeasure::default(),
            &layout(5000.0),
        );
        assert_eq!(pages.len(), 1);
        let page = &pages[0];
        assert_eq!(page.lines.len(), page.secondary_lines.len());
        assert_eq!(page.lines.len(), page.line_verses.len());
        assert_eq!(page.secondary_lines.len(), page.secondary_line_verses.len());

        // Row starts line up: wherever the left column begins verse N, the
        // right column begins verse N too (when it has one).
        for (idx, verse) in page.line_verses.iter().enumerate() {
            let starts_row = verse.is_some() && (idx == 0 || page.line_verses[idx - 1] != *verse);
            if starts_row && verse.is_some_and(|n| n <= 3) {
                assert_eq!(page.secondary_line_verses[idx], *verse);
            }
        }
        assert!(!page.secondary_line_verses.contains(&Some(4)));
        assert!(page.line_verses.contains(&Some(4)));
    }

    #[test]
    fn parallel_pages_break_within_height_budget() {
        let window = VecDeque::from([chapter_with(42, 1, long_verses(24, 20))]);
        let secondary = VecDeque::from([chapter_with(42, 1, long_verses(24, 26))]);
        let page_layout = layout(500.0);
        let pages = build_pages(
            &window,
            &secondary,
            true,
            &MonospaceMeasure::default(),
            &page_layout,
        );
        assert!(pages.len() > 2);
        assert_eq!(pages.iter().filter(|p| p.is_chapter_start).count(), 1);
        assert_eq!(attributions(&pages, 0), (1..=24).collect::<Vec<_>>());
        assert_eq!(secondary_attributions(&pages), (1..=24).collect::<Vec<_>>());

        for (number, page) in pages.iter().enumerate() {
            assert_eq!(page.lines.len(), page.secondary_lines.len());
            assert_eq!(page.lines.len(), page.line_verses.len());
            let first = page.line_verses.iter().flatten().next().copied();
            assert_eq!(first, Some(page.start_verse));
            if number > 0 {
                assert_eq!(page.start_verse, pages[number - 1].end_verse + 1);
            }
            let (rows, used) = parallel_used_height(page, &page_layout);
            if rows > 1 {
                assert!(used <= page_layout.height - FOOTER_ROOM);
            }
        }
    }

    #[test]
    fn longer_secondary_continues_past_primary_end() {
        let window = VecDeque::from([chapter_with(42, 1, long_verses(3, 20))]);
        let secondary = VecDeque::from([chapter_with(42, 1, long_verses(12, 20))]);
        let page_layout = layout(400.0);
        let pages = build_pages(
            &window,
            &secondary,
            true,
            &MonospaceMeasure::default(),
            &page_layout,
        );
        assert!(pages.len() > 1);
        assert_eq!(attributions(&pages, 0), vec![1, 2, 3]);
        assert_eq!(secondary_attributions(&pages), (1..=12).collect::<Vec<_>>());

        // Pages holding only secondary rows are labelled with the last
        // primary verse.
        let tail = pages.last().expect("at least one page");
        assert!(tail.line_verses.iter().all(Option::is_none));
        assert!(tail.secondary_line_verses.iter().any(Option::is_some));
        assert_eq!((tail.start_verse, tail.end_verse), (3, 3));
        for page in &pages {
            assert_eq!(page.lines.len(), page.secondary_lines.len());
            let (rows, used) = parallel_used_height(page, &page_layout);
            if rows > 1 {
                assert!(used <= page_layout.height - FOOTER_ROOM);
            }
        }
    }

    #[test]
    fn narrow_columns_keep_every_word() {
        let verses: Vec<Verse> = (1..=120)
            .map(|n| Verse::new(n, format!("Blessed are the undefiled {n}")))
            .collect();
        let window = VecDeque::from([chapter_with(18, 119, verses.clone())]);
        let secondary = VecDeque::from([chapter_with(18, 119, verses)]);
        let narrow = PageLayout {
            width: 150.0,
            height: 500.0,
            font_size: 19.0,
            line_spacing: 7.0,
        };
        let pages = build_pages(
            &window,
            &secondary,
            true,
            &MonospaceMeasure::default(),
            &narrow,
        );
        let lines_of = |verse: u32| -> Vec<String> {
            pages
                .iter()
                .flat_map(|p| p.lines.iter().zip(&p.line_verses))
                .filter(|(_, v)| **v == Some(verse))
                .map(|(line, _)| line.trim().to_string())
                .collect()
        };
        assert_eq!(
            lines_of(100),
            vec!["100 Blessed", "are", "the", "undefiled", "100"]
        );
        let words: Vec<String> = lines_of(7).join(" ").split_whitespace().map(str::to_string).collect();
        assert_eq!(words, vec!["7", "Blessed", "are", "the", "undefiled", "7"]);
    }

    #[test]
    fn identical_inputs_produce_identical_pages() {
        let window = VecDeque::from([chapter_with(0, 1, long_verses(20, 35))]);
        let measure = MonospaceMeasure::default();
        let a = build_pages(&window, &VecDeque::new(), false, &measure, &layout(450.0));
        let b = build_pages(&window, &VecDeque::new(), false, &measure, &layout(450.0));
        assert_eq!(a, b);
    }

    #[test]
    fn unloaded_chapters_are_skipped_and_closures_measure() {
        let mut pending = chapter_with(0, 1, short_verses(3));
        pending.is_loaded = false;
        let window = VecDeque::from([pending, chapter_with(0, 2, short_verses(2))]);
        let measure = |text: &str, size: f32| text.len() as f32 * size * 0.6;
        let pages = build_pages(&window, &VecDeque::new(), false, &measure, &layout(800.0));
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].chapter_index, 1);
    }

    #[test]
    fn clamp_page_index_never_underflows() {
        assert_eq!(clamp_page_index(7, 3), 2);
        assert_eq!(clamp_page_index(1, 3), 1);
        assert_eq!(clamp_page_index(4, 0), 0);
    }

    #[test]
    fn wrap_text_respects_width() {
        let measure = MonospaceMeasure { advance: 1.0 };
        let lines = wrap_text("aa bb cc dd", &measure, 1.0, 5.0);
        assert_eq!(lines, vec!["aa bb", "cc dd"]);
        assert_eq!(wrap_text("aa bb", &measure, 1.0, 0.0), vec!["aa", "bb"]);
        assert_eq!(wrap_text("aa bb", &measure, 1.0, -3.0), vec!["aa", "bb"]);
        assert!(wrap_text("   ", &measure, 1.0, 0.0).is_empty());
        assert_eq!(wrap_text("abcdefgh ij", &measure, 1.0, 5.0), vec!["abcdefgh", "ij"]);
    }
}
