//! MiniRead entrypoint.
use anyhow::{Context, Result};
use clap::Parser;
use core_config::{Config, DEFAULT_MAX_RECENT_FILES, SettingsStore, load_from};
use core_events::{ChannelSink, EVENTS_EMITTED, ReaderEvent, SINK_SEND_FAILURES};
use core_io::{DocumentError, ParseCache, supported_extensions};
use core_state::{LineReader, NavOutcome};
use core_terminal::{CrosstermBackend, Frame, TerminalBackend};
use core_text::{CellMeasure, View};
use crossbeam_channel::Receiver;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

const PLACEHOLDER: &str = "No content - pass a file to open";
/// Columns assumed by `--dump` when neither `--width` nor a terminal is available.
const FALLBACK_COLUMNS: u16 = 80;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(
    name = "miniread",
    version,
    about = "Single-line terminal reader",
    after_help = formats_help()
)]
struct Args {
    /// File to open. If omitted the last file read is reopened.
    pub path: Option<PathBuf>,
    /// Optional tuning file path (overrides discovery of `miniread.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Settings store path (defaults to `~/.miniread/config.json`).
    #[arg(long = "store")]
    pub store: Option<PathBuf>,
    /// Display width in cells; defaults to terminal columns minus margins.
    #[arg(long = "width")]
    pub width: Option<u32>,
    /// Print every display line from the resume position and exit.
    #[arg(long = "dump")]
    pub dump: bool,
}

fn formats_help() -> String {
    let patterns: Vec<String> = supported_extensions()
        .iter()
        .map(|ext| format!("*.{ext}"))
        .collect();
    format!("Supported formats: {}", patterns.join(" "))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Advance,
    Retreat,
    FirstLine,
    LastLine,
    Quit,
}

fn command_for(key: &KeyEvent) -> Option<Command> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return (key.code == KeyCode::Char('c')).then_some(Command::Quit);
    }
    match key.code {
        KeyCode::Right | KeyCode::Down | KeyCode::Char(' ' | 'j' | 'l') => Some(Command::Advance),
        KeyCode::Left | KeyCode::Up | KeyCode::Char('k' | 'h') => Some(Command::Retreat),
        KeyCode::Home | KeyCode::Char('g') => Some(Command::FirstLine),
        KeyCode::End | KeyCode::Char('G') => Some(Command::LastLine),
        KeyCode::Esc | KeyCode::Char('q') => Some(Command::Quit),
        _ => None,
    }
}

/// Reader plus the persistence around it.
struct Session {
    reader: LineReader,
    events: Receiver<ReaderEvent>,
    store: Option<SettingsStore>,
    cache: ParseCache,
    /// Key under which the reading position is stored.
    file_key: Option<String>,
    file_name: String,
    progress: f64,
    notice: Option<String>,
    save_interval: u32,
    turns_since_save: u32,
}

impl Session {
    fn new(config: &Config, store: Option<SettingsStore>) -> Self {
        let (sink, events) = ChannelSink::pair();
        let reader = LineReader::with_config(config.reader_config()).with_sink(sink);
        Self {
            reader,
            events,
            store,
            cache: ParseCache::default(),
            file_key: None,
            file_name: String::new(),
            progress: 0.0,
            notice: None,
            save_interval: config.file.view.position_save_interval.max(1),
            turns_since_save: 0,
        }
    }

    /// Load `path`, resume at the saved offset and record it as recent.
    fn open(&mut self, path: &Path) -> Result<(), DocumentError> {
        let doc = self.cache.get_or_parse(path)?;
        let key = std::fs::canonicalize(path)
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .into_owned();
        self.reader.load(&doc.content);
        self.file_name = doc.file_name.clone();
        if let Some(store) = self.store.as_mut() {
            let saved = store.reading_position(&key);
            self.reader
                .seek_to_offset(i64::try_from(saved).unwrap_or(i64::MAX));
            if let Err(e) = store.add_recent_file(&key, DEFAULT_MAX_RECENT_FILES) {
                warn!(target: "runtime", error = %e, "recent_files_save_failed");
            }
        }
        info!(
            target: "runtime",
            chars = self.reader.len(),
            offset = self.reader.current_offset(),
            "document_opened"
        );
        self.file_key = Some(key);
        self.drain_events();
        Ok(())
    }

    /// Apply a navigation command. Returns `false` on quit.
    fn apply(&mut self, command: Command, view: &View<'_>) -> bool {
        let moved = match command {
            Command::Advance => self.reader.advance(view) == NavOutcome::Moved,
            Command::Retreat => self.reader.retreat(view) == NavOutcome::Moved,
            Command::FirstLine => {
                self.reader.first_line();
                true
            }
            Command::LastLine => {
                self.reader.last_line(view);
                true
            }
            Command::Quit => return false,
        };
        if moved {
            self.note_turn();
        }
        self.drain_events();
        true
    }

    fn drain_events(&mut self) {
        for event in self.events.try_iter() {
            if event.is_boundary() {
                debug!(
                    target: "runtime",
                    ?event,
                    offset = self.reader.current_offset(),
                    "boundary_reached"
                );
            }
            match event {
                ReaderEvent::ProgressChanged(p) => {
                    self.progress = p;
                    self.notice = None;
                }
                ReaderEvent::ReachedEnd => self.notice = Some("end of document".to_string()),
                ReaderEvent::ReachedStart => self.notice = Some("start of document".to_string()),
            }
        }
    }

    fn note_turn(&mut self) {
        self.turns_since_save += 1;
        if self.turns_since_save >= self.save_interval {
            self.save_position();
        }
    }

    fn save_position(&mut self) {
        self.turns_since_save = 0;
        let (Some(store), Some(key)) = (self.store.as_mut(), self.file_key.as_deref()) else {
            return;
        };
        if let Err(e) = store.save_reading_position(key, self.reader.current_offset()) {
            warn!(target: "runtime", error = %e, "position_save_failed");
        }
    }

    fn display_line<'s>(&'s self, view: &View<'_>) -> &'s str {
        if self.reader.is_empty() {
            PLACEHOLDER
        } else {
            self.reader.current_line(view)
        }
    }

    fn status(&self) -> String {
        let name = if self.file_name.is_empty() {
            "MiniRead"
        } else {
            self.file_name.as_str()
        };
        let mut status = format!("{name}  {:.1}%", self.progress * 100.0);
        if let Some(notice) = &self.notice {
            status.push_str("  ");
            status.push_str(notice);
        }
        status
    }
}

/// Print every display line from the current position to the end.
fn dump(session: &Session, width: u32, out: &mut impl Write) -> Result<()> {
    if session.reader.is_empty() {
        writeln!(out, "{PLACEHOLDER}")?;
        return Ok(());
    }
    // Dumping must not disturb the saved position, so walk a private copy.
    let mut reader = LineReader::with_config(*session.reader.config());
    reader.load(session.reader.document().as_str());
    reader.seek_to_offset(i64::try_from(session.reader.current_offset()).unwrap_or(i64::MAX));
    let measure = CellMeasure;
    let view = View::new(width, &measure);
    loop {
        writeln!(out, "{}", reader.current_line(&view))?;
        if reader.advance(&view) != NavOutcome::Moved {
            break;
        }
    }
    out.flush()?;
    Ok(())
}

fn run_interactive(session: &mut Session, config: &Config, fixed_width: Option<u32>) -> Result<()> {
    let mut backend = CrosstermBackend::new();
    let title = if session.file_name.is_empty() {
        "MiniRead".to_string()
    } else {
        format!("MiniRead - {}", session.file_name)
    };
    backend.set_title(&title)?;
    let mut guard = backend.enter_guard()?;
    let measure = CellMeasure;
    let margin = config.file.view.margin;
    let (cols, _) = guard.backend().size()?;
    let mut width = fixed_width.unwrap_or_else(|| config.text_width(cols));

    loop {
        let view = View::new(width, &measure);
        let status = session.status();
        guard.backend().draw(&Frame {
            line: session.display_line(&view),
            status: &status,
            margin,
        })?;

        match event::read().context("reading terminal event")? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let Some(command) = command_for(&key) else {
                    continue;
                };
                if !session.apply(command, &view) {
                    break;
                }
            }
            Event::Resize(cols, _) if fixed_width.is_none() => {
                let new_width = config.text_width(cols);
                if new_width != width {
                    width = new_width;
                    session.reader.on_width_changed(width);
                }
            }
            _ => {}
        }
    }
    session.save_position();
    Ok(())
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_dir = Path::new(".");
    let log_path = log_dir.join("miniread.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(log_dir, "miniread.log");
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_ansi(false)
        .with_writer(nb_writer)
        .try_init()
        .ok()
        .map(|_| guard)
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn open_store(args: &Args) -> Option<SettingsStore> {
    let path = args.store.clone().or_else(SettingsStore::default_path)?;
    match SettingsStore::open(&path) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(target: "runtime", error = %e, "settings_store_unavailable");
            None
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", dump = args.dump, "startup");

    let config = load_from(args.config.clone())?;
    let store = open_store(&args);
    let mut session = Session::new(&config, store);

    let path = args.path.clone().or_else(|| {
        session
            .store
            .as_ref()
            .and_then(SettingsStore::last_file)
            .map(PathBuf::from)
    });
    if let Some(path) = path.as_deref()
        && let Err(e) = session.open(path)
    {
        error!(target: "runtime", error = %e, "open_failed");
        if args.dump {
            return Err(e).with_context(|| format!("opening {}", path.display()));
        }
        session.notice = Some(format!("open failed: {e}"));
    }

    if args.dump {
        let width = args.width.unwrap_or_else(|| {
            let cols = crossterm::terminal::size()
                .map(|(c, _)| c)
                .unwrap_or(FALLBACK_COLUMNS);
            config.text_width(cols)
        });
        let stdout = std::io::stdout();
        dump(&session, width, &mut stdout.lock())?;
    } else {
        run_interactive(&mut session, &config, args.width)?;
    }

    info!(
        target: "runtime",
        events_emitted = EVENTS_EMITTED.load(Ordering::Relaxed),
        sink_send_failures = SINK_SEND_FAILURES.load(Ordering::Relaxed),
        slow_path_retreats = session.reader.slow_path_retreats(),
        history_evictions = session.reader.history_evictions(),
        cache_hits = session.cache.hits(),
        "shutdown"
    );
    Ok(())
}
