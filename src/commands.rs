//! Line-oriented reading loop.
//!
//! Each input line is one command. After every command the loop waits for
//! the worker, rebuilds pages when the window changed, and prints the
//! current page.

use crate::canon::ChapterRef;
use crate::favorites::Favorites;
use crate::model::{Chapter, Page};
use crate::pagination::{MAX_FONT_SIZE, MIN_FONT_SIZE, MonospaceMeasure, PARALLEL_GUTTER};
use crate::position::ReadingPosition;
use crate::session::ReaderSession;
use crate::window::ChapterWindow;
use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

const FONT_STEP: f32 = 2.0;

pub const HELP: &str = "\
n / p          next / previous page
] / [          next / previous chapter
} / {          next / previous book
home / end     first / last chapter
b / f          back / forward
g REF          go to a reference, e.g. g john 3:16
/TEXT ?TEXT    search the window (ignoring / matching case)
t CODE         primary translation
t2 CODE        parallel translation
P              toggle parallel mode
r              refresh the current chapter
+ / -          font size
x [N]          export window chapter N (default: current)
w              window summary
h              recently read
fav V [NOTE]   save verse V of the current chapter
unfav V        forget verse V
note V TEXT    set the note on a saved verse
favs           list saved verses
q              quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    NextPage,
    PrevPage,
    NextChapter,
    PrevChapter,
    NextBook,
    PrevBook,
    FirstChapter,
    LastChapter,
    Back,
    Forward,
    Jump(String),
    Search { query: String, case_sensitive: bool },
    Translation(String),
    ParallelTranslation(String),
    ToggleParallel,
    Refresh,
    FontSize(f32),
    Export(Option<usize>),
    Window,
    Recent,
    Favorite { verse: u32, note: String },
    Unfavorite(u32),
    Note { verse: u32, note: String },
    Favorites,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if let Some(query) = line.strip_prefix('/') {
        return Some(Command::Search {
            query: query.trim().to_string(),
            case_sensitive: false,
        });
    }
    if let Some(query) = line.strip_prefix('?') {
        return Some(Command::Search {
            query: query.trim().to_string(),
            case_sensitive: true,
        });
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let command = match (word, rest) {
        ("n", "") => Command::NextPage,
        ("p", "") => Command::PrevPage,
        ("]", "") => Command::NextChapter,
        ("[", "") => Command::PrevChapter,
        ("}", "") => Command::NextBook,
        ("{", "") => Command::PrevBook,
        ("home", "") => Command::FirstChapter,
        ("end", "") => Command::LastChapter,
        ("b", "") => Command::Back,
        ("f", "") => Command::Forward,
        ("g", reference) if !reference.is_empty() => Command::Jump(reference.to_string()),
        ("t", code) if !code.is_empty() => Command::Translation(code.to_lowercase()),
        ("t2", code) if !code.is_empty() => Command::ParallelTranslation(code.to_lowercase()),
        ("P", "") => Command::ToggleParallel,
        ("r", "") => Command::Refresh,
        ("+", "") => Command::FontSize(FONT_STEP),
        ("-", "") => Command::FontSize(-FONT_STEP),
        ("x", "") => Command::Export(None),
        ("x", index) => Command::Export(Some(index.parse().ok()?)),
        ("w", "") => Command::Window,
        ("h", "") => Command::Recent,
        ("fav", args) => {
            let (verse, note) = verse_and_text(args)?;
            Command::Favorite { verse, note }
        }
        ("unfav", verse) => Command::Unfavorite(verse.parse().ok()?),
        ("note", args) => {
            let (verse, note) = verse_and_text(args)?;
            Command::Note { verse, note }
        }
        ("favs", "") => Command::Favorites,
        ("help", "") => Command::Help,
        ("q" | "quit", "") => Command::Quit,
        _ => return None,
    };
    Some(command)
}

fn verse_and_text(args: &str) -> Option<(u32, String)> {
    let (verse, text) = args.split_once(char::is_whitespace).unwrap_or((args, ""));
    Some((verse.parse().ok()?, text.trim().to_string()))
}

/// Run commands from `input` until it ends or `q` is entered. `latest` is
/// kept current for the Ctrl+C handler.
pub fn run_interactive(
    session: &mut ReaderSession,
    favorites: &mut Favorites,
    latest: &Arc<Mutex<ReadingPosition>>,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    let queue = session.worker_queue();
    writeln!(out, "Type 'help' for commands.")?;
    print_current_page(session, out)?;
    for line in input.lines() {
        let line = line.context("Failed to read command")?;
        if line.trim().is_empty() {
            continue;
        }
        let Some(command) = parse_command(&line) else {
            writeln!(out, "Unknown command: {}", line.trim())?;
            continue;
        };
        debug!(?command, "Reader command");
        if command == Command::Quit || queue.is_shutdown() {
            break;
        }
        let show_page = apply(session, favorites, command, out)?;
        session.wait_idle();
        session.rebuild_pages_if_needed();
        *latest.lock().unwrap_or_else(PoisonError::into_inner) = session.reading_position();
        if show_page {
            print_current_page(session, out)?;
        }
    }
    Ok(())
}

/// Apply one command. Returns whether the current page should be shown.
fn apply(
    session: &mut ReaderSession,
    favorites: &mut Favorites,
    command: Command,
    out: &mut impl Write,
) -> Result<bool> {
    let moved = match command {
        Command::NextPage => {
            session.page_next();
            true
        }
        Command::PrevPage => {
            session.page_prev();
            true
        }
        Command::NextChapter => session.next_sequential(),
        Command::PrevChapter => session.prev_sequential(),
        Command::NextBook => session.next_book(),
        Command::PrevBook => session.prev_book(),
        Command::FirstChapter => session.navigate_to(ChapterRef::FIRST),
        Command::LastChapter => session.navigate_to(ChapterRef::last()),
        Command::Back => session.go_back(),
        Command::Forward => session.go_forward(),
        Command::Jump(reference) => match session.jump_to(&reference) {
            Some(verse) => {
                writeln!(out, "{} (verse {verse})", session.position())?;
                true
            }
            None => {
                writeln!(out, "Unknown reference: {reference}")?;
                return Ok(false);
            }
        },
        Command::Search {
            query,
            case_sensitive,
        } => {
            let hits = session.search(&query, case_sensitive);
            writeln!(out, "{} matches for \"{query}\"", hits.len())?;
            for hit in &hits {
                let at = ChapterRef::new(hit.book_index, hit.chapter);
                writeln!(out, "  {at}:{} {}", hit.verse, hit.text)?;
            }
            return Ok(false);
        }
        Command::Translation(code) => session.set_translation(&code),
        Command::ParallelTranslation(code) => session.set_parallel_translation(&code),
        Command::ToggleParallel => {
            session.toggle_parallel_mode();
            true
        }
        Command::Refresh => {
            session.force_refresh();
            true
        }
        Command::FontSize(step) => {
            let mut layout = session.layout();
            layout.font_size = (layout.font_size + step).clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
            session.set_layout(layout);
            true
        }
        Command::Export(index) => {
            let index = index
                .or_else(|| session.current_page().map(|p| p.chapter_index))
                .unwrap_or(0);
            match session.chapter_text(index) {
                Some(text) => write!(out, "{text}")?,
                None => writeln!(out, "No loaded chapter at window slot {index}")?,
            }
            return Ok(false);
        }
        Command::Window => {
            print_window_summary(&session.window_snapshot(), out)?;
            let history = session.history();
            if !history.is_empty() {
                writeln!(out, "history: {} chapters", history.len())?;
            }
            return Ok(false);
        }
        Command::Recent => {
            for entry in session.recent() {
                writeln!(out, "  {} ({})", entry.chapter_ref(), entry.translation)?;
            }
            return Ok(false);
        }
        Command::Favorite { verse, note } => {
            let at = session.position();
            let text = verse_text(&session.window_snapshot(), at, verse).unwrap_or_default();
            if favorites.add(at, verse, session.translation(), &text, &note) {
                writeln!(out, "Saved {at}:{verse}")?;
            } else {
                writeln!(out, "{at}:{verse} not saved")?;
            }
            return Ok(false);
        }
        Command::Unfavorite(verse) => {
            let at = session.position();
            if !favorites.remove(at, verse, session.translation()) {
                writeln!(out, "{at}:{verse} was not saved")?;
            }
            return Ok(false);
        }
        Command::Note { verse, note } => {
            let at = session.position();
            if !favorites.update_note(at, verse, session.translation(), &note) {
                writeln!(out, "{at}:{verse} is not saved")?;
            }
            return Ok(false);
        }
        Command::Favorites => {
            if favorites.is_empty() {
                writeln!(out, "No saved verses")?;
            }
            for favorite in favorites.all() {
                writeln!(out, "  {} {}", favorite.display(), favorite.text)?;
                if !favorite.note.is_empty() {
                    writeln!(out, "    note: {}", favorite.note)?;
                }
            }
            return Ok(false);
        }
        Command::Help => {
            writeln!(out, "{HELP}")?;
            return Ok(false);
        }
        Command::Quit => return Ok(false),
    };
    if !moved {
        writeln!(out, "Nothing to do there")?;
    }
    Ok(moved)
}

fn verse_text(window: &ChapterWindow, at: ChapterRef, verse: u32) -> Option<String> {
    window
        .primary()
        .iter()
        .find(|c| c.position() == at)?
        .verses
        .iter()
        .find(|v| v.number == verse)
        .map(|v| v.text.clone())
}

fn print_window_summary(window: &ChapterWindow, out: &mut impl Write) -> Result<()> {
    writeln!(out, "anchor {}, {} chapters", window.anchor(), window.len())?;
    for index in 0..window.len() {
        if let Some((chapter, counterpart)) = window.pair(index) {
            let parallel = counterpart
                .map(|c| format!(" | {}", c.translation))
                .unwrap_or_default();
            writeln!(
                out,
                "  {} ({}, {} verses){parallel}",
                chapter.title(),
                chapter.translation,
                chapter.verses.len()
            )?;
        }
    }
    Ok(())
}

fn print_current_page(session: &ReaderSession, out: &mut impl Write) -> Result<()> {
    let Some(page) = session.current_page() else {
        writeln!(out, "(nothing loaded)")?;
        return Ok(());
    };
    let window = session.window_snapshot();
    let history = session.history();
    let mut flags = String::new();
    if session.is_parallel() {
        flags.push_str(&format!(" + {}", session.parallel_translation()));
    }
    if history.can_go_back() {
        flags.push_str(" <b");
    }
    if history.can_go_forward() {
        flags.push_str(" f>");
    }
    if session.is_loading() {
        flags.push_str(" (loading)");
    }
    writeln!(
        out,
        "[{} | {}{flags} | page {}/{}]",
        session.position(),
        session.translation(),
        session.page_index() + 1,
        session.pages().len()
    )?;
    write_page(&window, page, session.page_index(), session.pages().len(), session, out)
}

/// Print one page; parallel pages print as two monospace columns.
pub fn write_page(
    window: &ChapterWindow,
    page: &Page,
    index: usize,
    total: usize,
    session: &ReaderSession,
    out: &mut impl Write,
) -> Result<()> {
    let layout = session.layout();
    let char_width = layout.font_size * MonospaceMeasure::default().advance;
    let column = ((layout.width - PARALLEL_GUTTER) / 2.0 / char_width).max(20.0) as usize;
    let title = window
        .primary()
        .get(page.chapter_index)
        .map(Chapter::title)
        .unwrap_or_default();
    writeln!(
        out,
        "--- Page {}/{} | {} {}-{} ---",
        index + 1,
        total,
        title,
        page.start_verse,
        page.end_verse
    )?;
    if page.secondary_lines.is_empty() {
        for line in &page.lines {
            writeln!(out, "{line}")?;
        }
    } else {
        let rows = page.lines.len().max(page.secondary_lines.len());
        for row in 0..rows {
            let left = page.lines.get(row).map(String::as_str).unwrap_or("");
            let right = page.secondary_lines.get(row).map(String::as_str).unwrap_or("");
            writeln!(out, "{left:<column$} | {right}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ChapterSource;
    use crate::model::Verse;
    use crate::pagination::PageLayout;
    use crate::session::SessionSettings;
    use std::io::Cursor;

    struct ShortChapters;

    impl ChapterSource for ShortChapters {
        fn load_or_fetch(&self, book_index: usize, chapter: u32, translation: &str) -> Chapter {
            let mut out = Chapter::unloaded(book_index, chapter, translation);
            out.verses = (1..=4)
                .map(|n| Verse::new(n, format!("{translation} {chapter}:{n} text")))
                .collect();
            out.is_loaded = true;
            out
        }
    }

    fn reader() -> ReaderSession {
        let settings = SessionSettings {
            translation: "web".to_string(),
            parallel_translation: "kjv".to_string(),
            parallel_mode: false,
            layout: PageLayout {
                width: 700.0,
                height: 2000.0,
                font_size: 19.0,
                line_spacing: 7.0,
            },
            recent_path: None,
        };
        ReaderSession::new(
            Arc::new(ShortChapters),
            settings,
            Box::new(MonospaceMeasure::default()),
        )
        .expect("session should start")
    }

    fn run(session: &mut ReaderSession, favorites: &mut Favorites, script: &str) -> String {
        let latest = Arc::new(Mutex::new(session.reading_position()));
        let mut out = Vec::new();
        run_interactive(session, favorites, &latest, Cursor::new(script), &mut out)
            .expect("script should run");
        assert_eq!(
            *latest.lock().expect("latest lock"),
            session.reading_position()
        );
        String::from_utf8(out).expect("utf8 output")
    }

    #[test]
    fn commands_parse_with_arguments() {
        assert_eq!(parse_command(" n "), Some(Command::NextPage));
        assert_eq!(
            parse_command("g 1 john 3:2"),
            Some(Command::Jump("1 john 3:2".to_string()))
        );
        assert_eq!(
            parse_command("/Love"),
            Some(Command::Search {
                query: "Love".to_string(),
                case_sensitive: false
            })
        );
        assert_eq!(parse_command("t KJV"), Some(Command::Translation("kjv".to_string())));
        assert_eq!(parse_command("x 2"), Some(Command::Export(Some(2))));
        assert_eq!(
            parse_command("fav 16 memorize this"),
            Some(Command::Favorite {
                verse: 16,
                note: "memorize this".to_string()
            })
        );
        assert_eq!(parse_command("x two"), None);
        assert_eq!(parse_command("g"), None);
        assert_eq!(parse_command("n 3"), None);
    }

    #[test]
    fn script_drives_navigation_and_growth() {
        let mut session = reader();
        let mut favorites = Favorites::default();
        session.navigate_to(ChapterRef::new(42, 3));
        session.wait_idle();
        session.rebuild_pages_if_needed();

        run(&mut session, &mut favorites, "n\nn\n");
        assert_eq!(session.pages().len(), 3);
        assert_eq!(session.window_snapshot().last_position(), Some(ChapterRef::new(42, 5)));

        let output = run(&mut session, &mut favorites, "]\nb\n[\n/:2\nw\nq\nn\n");
        assert_eq!(session.position(), ChapterRef::new(42, 2));
        assert!(output.contains("2 matches for \":2\""));
        assert!(output.contains("anchor John 2, 2 chapters"));
        assert!(session.history().can_go_back());
        assert!(!session.history().can_go_forward());
        session.shutdown();
    }

    #[test]
    fn paging_back_from_first_page_grows_upward() {
        let mut session = reader();
        let mut favorites = Favorites::default();
        session.navigate_to(ChapterRef::new(42, 3));
        session.wait_idle();
        session.rebuild_pages_if_needed();
        assert_eq!(session.window_snapshot().len(), 2);

        run(&mut session, &mut favorites, "p\n");
        let window = session.window_snapshot();
        assert_eq!(window.first_position(), Some(ChapterRef::new(42, 2)));
        assert_eq!(window.last_position(), Some(ChapterRef::new(42, 4)));
        session.shutdown();
    }

    #[test]
    fn favorites_and_translation_commands() {
        let mut session = reader();
        let mut favorites = Favorites::default();
        session.navigate_to(ChapterRef::new(42, 3));
        session.wait_idle();
        session.rebuild_pages_if_needed();

        let output = run(
            &mut session,
            &mut favorites,
            "fav 2 look again\nnote 2 read twice\nfavs\nt bsb\nx 0\nh\n",
        );
        assert!(favorites.has(ChapterRef::new(42, 3), 2, "web"));
        assert_eq!(favorites.all()[0].text, "web 3:2 text");
        assert_eq!(favorites.all()[0].note, "read twice");
        assert!(output.contains("John 3:2 (web) web 3:2 text"));
        assert!(output.contains("John 3 (bsb)\n\n1 bsb 3:1 text"));
        assert!(output.contains("  John 3 (bsb)\n  John 3 (web)"));
        assert_eq!(session.translation(), "bsb");
        session.shutdown();
    }
}
