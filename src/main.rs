//! Entry point for the verse viewer.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml`.
//! - Wire the chapter cache, fetcher and loader into a reader session.
//! - Print the loaded window (or its pages) once the worker settles, or hand
//!   stdin to the reading loop with `--interactive`.

mod cache;
mod canon;
mod commands;
mod config;
mod favorites;
mod fetcher;
mod history;
mod loader;
mod model;
mod pagination;
mod position;
mod recent;
mod session;
mod text_utils;
mod window;
mod worker;

use crate::cache::ChapterCache;
use crate::canon::{daily_reading, translation_name};
use crate::commands::{run_interactive, write_page};
use crate::config::{AppConfig, load_config, serialize_config};
use crate::favorites::{Favorites, favorites_path};
use crate::fetcher::{Fetcher, ReqwestSource};
use crate::loader::{ChapterSource, Loader};
use crate::pagination::MonospaceMeasure;
use crate::position::{ReadingPosition, load_last_position, position_path, save_last_position};
use crate::session::{ReaderSession, SessionSettings};
use anyhow::{Context, Result, anyhow};
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: verse-viewer [REFERENCE] [--parallel] [--pages] [--plan DAY] \
                     [-i|--interactive] [--stats] [--clear-cache] [--refresh] \
                     [--print-config] [--config PATH]";

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CliArgs {
    reference: Option<String>,
    parallel: bool,
    pages: bool,
    plan: Option<u32>,
    interactive: bool,
    print_config: bool,
    stats: bool,
    clear_cache: bool,
    refresh: bool,
    config_path: Option<PathBuf>,
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let args = parse_args(env::args().skip(1))?;
    let config_path = args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("conf/config.toml"));
    let config = load_config(&config_path);
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        translation = %config.translation,
        parallel = %config.parallel_translation,
        cache_dir = %config.cache_dir,
        level = %config.log_level,
        "Starting verse viewer"
    );
    if args.print_config {
        let text = serialize_config(&config).context("Failed to serialize config")?;
        print!("{text}");
        return Ok(());
    }

    let cache = Arc::new(
        ChapterCache::open(&config.cache_dir)
            .with_context(|| format!("Failed to open chapter cache at {}", config.cache_dir))?,
    );
    if args.clear_cache || args.stats {
        return run_cache_command(&cache, &args);
    }

    let http = ReqwestSource::new(config.http_timeout())?;
    let fetcher = Fetcher::new(http, Arc::clone(&cache), config.api_base_url.clone());
    let source: Arc<dyn ChapterSource> = Arc::new(Loader::new(Arc::clone(&cache), fetcher));

    let mut settings = SessionSettings::from(&config);
    settings.parallel_mode |= args.parallel;
    let mut session = ReaderSession::new(source, settings, Box::new(MonospaceMeasure::default()))?;

    let latest = Arc::new(Mutex::new(session.reading_position()));
    install_ctrlc_handler(&session, Arc::clone(&latest));

    open_start_position(&mut session, &args, &config)?;
    if args.refresh {
        session.force_refresh();
    }
    session.wait_idle();
    session.rebuild_pages_if_needed();

    if args.interactive {
        let mut favorites = Favorites::open(&favorites_path());
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        run_interactive(&mut session, &mut favorites, &latest, stdin.lock(), &mut stdout)?;
    } else if args.pages || config.book_mode {
        print_pages(&session)?;
    } else {
        print_window(&session);
    }

    let position = session.reading_position();
    *latest.lock().unwrap_or_else(PoisonError::into_inner) = position.clone();
    save_last_position(&position_path(), &position);
    session.shutdown();
    Ok(())
}

fn open_start_position(
    session: &mut ReaderSession,
    args: &CliArgs,
    config: &AppConfig,
) -> Result<()> {
    if let Some(reference) = &args.reference {
        session
            .jump_to(reference)
            .ok_or_else(|| anyhow!("Unknown reference: {reference}"))?;
        return Ok(());
    }
    if let Some(day) = args.plan {
        let reading = daily_reading(day);
        let first = reading
            .first()
            .copied()
            .ok_or_else(|| anyhow!("No reading planned for day {day}"))?;
        let names: Vec<String> = reading.iter().map(ToString::to_string).collect();
        println!("Day {day}: {}", names.join(", "));
        session.navigate_to(first);
        return Ok(());
    }
    match load_last_position(&position_path()) {
        Some(saved) => {
            info!(book = saved.book, chapter = saved.chapter, "Resuming from saved position");
            session.restore(&saved);
            if args.parallel {
                session.set_parallel_mode(true);
            }
        }
        None => {
            session.navigate_to(config.start_position());
        }
    }
    Ok(())
}

fn run_cache_command(cache: &ChapterCache, args: &CliArgs) -> Result<()> {
    if args.clear_cache {
        cache.clear().context("Failed to clear chapter cache")?;
        println!("Cleared chapter cache at {}", cache.root().display());
    }
    if args.stats {
        let stats = cache.stats();
        println!(
            "{} chapters, {} verses, {}",
            stats.total_chapters,
            stats.total_verses,
            stats.human_size()
        );
        for (translation, count) in &stats.by_translation {
            let name = translation_name(translation).unwrap_or(translation.as_str());
            println!("  {name}: {count} chapters");
        }
    }
    Ok(())
}

fn install_ctrlc_handler(session: &ReaderSession, latest: Arc<Mutex<ReadingPosition>>) {
    let queue = session.worker_queue();
    if let Err(err) = ctrlc::set_handler(move || {
        info!(pending = queue.pending(), "Received Ctrl+C; saving position and stopping worker");
        let position = latest.lock().unwrap_or_else(PoisonError::into_inner).clone();
        save_last_position(&position_path(), &position);
        queue.request_shutdown();
        std::process::exit(130);
    }) {
        warn!("Failed to install Ctrl+C signal handler: {err}");
    }
}

fn print_window(session: &ReaderSession) {
    let window = session.window_snapshot();
    for index in 0..window.len() {
        let Some((chapter, counterpart)) = window.pair(index) else {
            continue;
        };
        println!("== {} ({}) ==", chapter.title(), chapter.translation);
        for verse in &chapter.verses {
            println!("{} {}", verse.number, verse.text);
            let parallel = counterpart.and_then(|other| {
                other
                    .verses
                    .iter()
                    .find(|v| v.number == verse.number)
                    .map(|v| (other.translation.as_str(), v))
            });
            if let Some((code, other)) = parallel {
                println!("  [{code}] {}", other.text);
            }
        }
        println!();
    }
}

fn print_pages(session: &ReaderSession) -> Result<()> {
    let window = session.window_snapshot();
    let pages = session.pages();
    let mut stdout = io::stdout().lock();
    for (number, page) in pages.iter().enumerate() {
        write_page(&window, page, number, pages.len(), session, &mut stdout)?;
    }
    stdout.flush().context("Failed to write pages")
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs> {
    let mut out = CliArgs::default();
    let mut args = args.into_iter();
    let mut words = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--parallel" => out.parallel = true,
            "--pages" => out.pages = true,
            "-i" | "--interactive" => out.interactive = true,
            "--print-config" => out.print_config = true,
            "--stats" => out.stats = true,
            "--clear-cache" => out.clear_cache = true,
            "--refresh" => out.refresh = true,
            "--plan" => {
                let day = args
                    .next()
                    .and_then(|day| day.parse::<u32>().ok())
                    .ok_or_else(|| anyhow!("--plan needs a day number\n{USAGE}"))?;
                out.plan = Some(day);
            }
            "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| anyhow!("--config needs a path\n{USAGE}"))?;
                out.config_path = Some(PathBuf::from(path));
            }
            "-h" | "--help" => return Err(anyhow!(USAGE)),
            flag if flag.starts_with("--") => {
                return Err(anyhow!("Unknown option {flag}\n{USAGE}"));
            }
            _ => words.push(arg),
        }
    }
    if !words.is_empty() {
        out.reference = Some(words.join(" "));
    }
    Ok(out)
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
