//! Canonical book table and chapter arithmetic.
//!
//! Everything that walks the corpus in reading order goes through
//! [`ChapterRef::advance`] and [`ChapterRef::retreat`], so the window and the
//! navigation helpers share one notion of "next" and "previous".

/// One entry of the canonical book table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookInfo {
    pub name: &'static str,
    pub abbrev: &'static str,
    pub chapters: u32,
}

const fn book(name: &'static str, abbrev: &'static str, chapters: u32) -> BookInfo {
    BookInfo {
        name,
        abbrev,
        chapters,
    }
}

pub const BOOKS: [BookInfo; 66] = [
    book("Genesis", "gen", 50),
    book("Exodus", "exo", 40),
    book("Leviticus", "lev", 27),
    book("Numbers", "num", 36),
    book("Deuteronomy", "deu", 34),
    book("Joshua", "jos", 24),
    book("Judges", "jdg", 21),
    book("Ruth", "rut", 4),
    book("1 Samuel", "1sa", 31),
    book("2 Samuel", "2sa", 24),
    book("1 Kings", "1ki", 22),
    book("2 Kings", "2ki", 25),
    book("1 Chronicles", "1ch", 29),
    book("2 Chronicles", "2ch", 36),
    book("Ezra", "ezr", 10),
    book("Nehemiah", "neh", 13),
    book("Esther", "est", 10),
    book("Job", "job", 42),
    book("Psalms", "psa", 150),
    book("Proverbs", "pro", 31),
    book("Ecclesiastes", "ecc", 12),
    book("Song of Solomon", "sng", 8),
    book("Isaiah", "isa", 66),
    book("Jeremiah", "jer", 52),
    book("Lamentations", "lam", 5),
    book("Ezekiel", "ezk", 48),
    book("Daniel", "dan", 12),
    book("Hosea", "hos", 14),
    book("Joel", "jol", 3),
    book("Amos", "amo", 9),
    book("Obadiah", "oba", 1),
    book("Jonah", "jon", 4),
    book("Micah", "mic", 7),
    book("Nahum", "nam", 3),
    book("Habakkuk", "hab", 3),
    book("Zephaniah", "zep", 3),
    book("Haggai", "hag", 2),
    book("Zechariah", "zec", 14),
    book("Malachi", "mal", 4),
    book("Matthew", "mat", 28),
    book("Mark", "mrk", 16),
    book("Luke", "luk", 24),
    book("John", "jhn", 21),
    book("Acts", "act", 28),
    book("Romans", "rom", 16),
    book("1 Corinthians", "1co", 16),
    book("2 Corinthians", "2co", 13),
    book("Galatians", "gal", 6),
    book("Ephesians", "eph", 6),
    book("Philippians", "php", 4),
    book("Colossians", "col", 4),
    book("1 Thessalonians", "1th", 5),
    book("2 Thessalonians", "2th", 3),
    book("1 Timothy", "1ti", 6),
    book("2 Timothy", "2ti", 4),
    book("Titus", "tit", 3),
    book("Philemon", "phm", 1),
    book("Hebrews", "heb", 13),
    book("James", "jas", 5),
    book("1 Peter", "1pe", 5),
    book("2 Peter", "2pe", 3),
    book("1 John", "1jn", 5),
    book("2 John", "2jn", 1),
    book("3 John", "3jn", 1),
    book("Jude", "jud", 1),
    book("Revelation", "rev", 22),
];

/// Translations the remote source is known to serve: (code, display name).
pub const TRANSLATIONS: [(&str, &str); 4] = [
    ("web", "World English Bible"),
    ("kjv", "King James Version"),
    ("bsb", "Berean Standard Bible"),
    ("bbe", "Bible in Basic English"),
];

pub fn book_info(index: usize) -> Option<&'static BookInfo> {
    BOOKS.get(index)
}

pub fn translation_name(code: &str) -> Option<&'static str> {
    TRANSLATIONS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

/// A (book, chapter) coordinate. `book` indexes [`BOOKS`]; `chapter` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChapterRef {
    pub book: usize,
    pub chapter: u32,
}

impl ChapterRef {
    pub const FIRST: ChapterRef = ChapterRef {
        book: 0,
        chapter: 1,
    };

    pub fn new(book: usize, chapter: u32) -> Self {
        Self { book, chapter }
    }

    pub fn last() -> Self {
        let book = BOOKS.len() - 1;
        Self {
            book,
            chapter: BOOKS[book].chapters,
        }
    }

    pub fn is_valid(self) -> bool {
        book_info(self.book).is_some_and(|info| (1..=info.chapters).contains(&self.chapter))
    }

    /// Clamp an arbitrary coordinate into canonical bounds.
    pub fn clamped(self) -> Self {
        let book = self.book.min(BOOKS.len() - 1);
        let chapter = self.chapter.clamp(1, BOOKS[book].chapters);
        Self { book, chapter }
    }

    /// Step to the canonical successor. Returns `false` and leaves `self`
    /// untouched when already at the final chapter of the final book.
    pub fn advance(&mut self) -> bool {
        match self.next() {
            Some(next) => {
                *self = next;
                true
            }
            None => false,
        }
    }

    /// Step to the canonical predecessor. Returns `false` and leaves `self`
    /// untouched at (book 0, chapter 1).
    pub fn retreat(&mut self) -> bool {
        match self.prev() {
            Some(prev) => {
                *self = prev;
                true
            }
            None => false,
        }
    }

    pub fn next(self) -> Option<Self> {
        let info = book_info(self.book)?;
        if self.chapter < info.chapters {
            return Some(Self::new(self.book, self.chapter + 1));
        }
        book_info(self.book + 1).map(|_| Self::new(self.book + 1, 1))
    }

    pub fn prev(self) -> Option<Self> {
        if self.chapter > 1 {
            return Some(Self::new(self.book, self.chapter - 1));
        }
        let book = self.book.checked_sub(1)?;
        book_info(book).map(|info| Self::new(book, info.chapters))
    }

    pub fn book_name(self) -> &'static str {
        book_info(self.book).map(|info| info.name).unwrap_or("Unknown")
    }

    pub fn book_abbrev(self) -> &'static str {
        book_info(self.book).map(|info| info.abbrev).unwrap_or("")
    }
}

impl std::fmt::Display for ChapterRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.book_name(), self.chapter)
    }
}

/// Resolve a display title such as "1 John 3" to its book index.
///
/// The longest matching name or abbreviation wins so numbered books are not
/// swallowed by their unnumbered namesakes.
pub fn book_for_title(title: &str) -> Option<usize> {
    longest_prefix_match(&title.trim().to_lowercase()).map(|(idx, _)| idx)
}

fn longest_prefix_match(lowered: &str) -> Option<(usize, usize)> {
    let mut best: Option<(usize, usize)> = None;
    for (idx, info) in BOOKS.iter().enumerate() {
        for candidate in [info.name.to_lowercase(), info.abbrev.to_string()] {
            if !lowered.starts_with(&candidate) {
                continue;
            }
            // Only accept a match that ends on a word boundary.
            let rest = &lowered[candidate.len()..];
            let boundary = rest
                .chars()
                .next()
                .is_none_or(|c| !c.is_alphabetic());
            if boundary && best.is_none_or(|(_, len)| candidate.len() > len) {
                best = Some((idx, candidate.len()));
            }
        }
    }
    best
}

/// Parse a human reference like `"john 3:16"`, `"1co 13"` or `"psa"`.
///
/// Returns the chapter (clamped into the book) and the verse, defaulting to 1.
/// A lone number after a single-chapter book is the verse: `"jude 9"`.
pub fn parse_reference(input: &str) -> Option<(ChapterRef, u32)> {
    let lowered = input.trim().to_lowercase().replace(':', " ");
    if lowered.is_empty() {
        return None;
    }
    let (book, matched) = longest_prefix_match(&lowered)?;
    let numbers: Vec<u32> = lowered[matched..]
        .split(|c: char| c.is_whitespace() || c == '.')
        .filter(|part| !part.is_empty())
        .map_while(|part| part.parse::<u32>().ok())
        .take(2)
        .collect();

    let (chapter, verse) = match numbers.as_slice() {
        [verse] if BOOKS[book].chapters == 1 => (1, *verse),
        [chapter] => (*chapter, 1),
        [chapter, verse, ..] => (*chapter, *verse),
        [] => (1, 1),
    };
    let verse = verse.max(1);
    let chapter = chapter.clamp(1, BOOKS[book].chapters);
    Some((ChapterRef::new(book, chapter), verse))
}

/// Three consecutive canonical chapters for a given 1-based day of the year.
pub fn daily_reading(day_of_year: u32) -> Vec<ChapterRef> {
    let start = day_of_year.saturating_sub(1) as usize * 3;
    let mut out = Vec::with_capacity(3);
    for target in start..start + 3 {
        let mut seen = 0usize;
        for (idx, info) in BOOKS.iter().enumerate() {
            let count = info.chapters as usize;
            if seen + count > target {
                out.push(ChapterRef::new(idx, (target - seen + 1) as u32));
                break;
            }
            seen += count;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_has_canonical_shape() {
        let total: u32 = BOOKS.iter().map(|b| b.chapters).sum();
        assert_eq!(BOOKS.len(), 66);
        assert_eq!(total, 1189);
        assert_eq!(BOOKS[42].abbrev, "jhn");
    }

    #[test]
    fn retreat_at_first_chapter_is_rejected() {
        let mut at = ChapterRef::FIRST;
        assert!(!at.retreat());
        assert_eq!(at, ChapterRef::FIRST);
    }

    #[test]
    fn advance_at_last_chapter_is_rejected() {
        let mut at = ChapterRef::last();
        assert!(!at.advance());
        assert_eq!(at, ChapterRef::new(65, 22));
    }

    #[test]
    fn advance_and_retreat_cross_book_boundaries() {
        let mut at = ChapterRef::new(0, 50);
        assert!(at.advance());
        assert_eq!(at, ChapterRef::new(1, 1));
        assert!(at.retreat());
        assert_eq!(at, ChapterRef::new(0, 50));
    }

    #[test]
    fn numbered_books_win_over_their_namesakes() {
        assert_eq!(book_for_title("1 John 3"), Some(61));
        assert_eq!(book_for_title("John 3"), Some(42));
        assert_eq!(book_for_title("Song of Solomon 2"), Some(21));
        assert_eq!(book_for_title("Nothing 1"), None);
    }

    #[test]
    fn parse_reference_handles_names_abbrevs_and_clamping() {
        assert_eq!(
            parse_reference("John 3:16"),
            Some((ChapterRef::new(42, 3), 16))
        );
        assert_eq!(parse_reference("jhn 3"), Some((ChapterRef::new(42, 3), 1)));
        assert_eq!(parse_reference("Jude 9"), Some((ChapterRef::new(64, 1), 9)));
        assert_eq!(parse_reference("jude 1:4"), Some((ChapterRef::new(64, 1), 4)));
        assert_eq!(parse_reference("oba 3"), Some((ChapterRef::new(30, 1), 3)));
        assert_eq!(parse_reference("3 john 0"), Some((ChapterRef::new(63, 1), 1)));
        assert_eq!(parse_reference("gen"), Some((ChapterRef::new(0, 1), 1)));
        assert_eq!(parse_reference("   "), None);
        assert_eq!(parse_reference("zzz 1"), None);
    }

    #[test]
    fn daily_reading_walks_three_chapters_per_day() {
        assert_eq!(
            daily_reading(1),
            vec![
                ChapterRef::new(0, 1),
                ChapterRef::new(0, 2),
                ChapterRef::new(0, 3)
            ]
        );
        assert_eq!(daily_reading(17)[2], ChapterRef::new(1, 1));
        assert!(daily_reading(400).is_empty());
    }
}
