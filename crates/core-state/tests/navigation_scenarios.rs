//! End-to-end navigation scenarios against the public reader API.

use std::sync::{Arc, Mutex, MutexGuard};

use core_events::{ChannelSink, ReaderEvent};
use core_state::{LineReader, NavOutcome, ReaderConfig};
use core_text::{Measure, View};
use pretty_assertions::assert_eq;
use tracing::Level;
use tracing::subscriber::with_default;
use tracing_subscriber::fmt::MakeWriter;

fn ascii_len(s: &str) -> u32 {
    s.chars().count() as u32
}

/// Ideographs are 10 units wide, the quote marks and full stop 2.
fn ideograph_units(s: &str) -> u32 {
    s.chars()
        .map(|c| match c {
            '“' | '”' | '。' => 2,
            _ => 10,
        })
        .sum()
}

static ASCII: fn(&str) -> u32 = ascii_len;
static IDEOGRAPH: fn(&str) -> u32 = ideograph_units;

fn ascii_view(width: u32) -> View<'static> {
    View::new(width, &ASCII as &dyn Measure)
}

#[derive(Clone)]
struct BufferWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

struct LockedWriter<'a> {
    guard: MutexGuard<'a, Vec<u8>>,
}

impl std::io::Write for LockedWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for BufferWriter {
    type Writer = LockedWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LockedWriter {
            guard: self.inner.lock().expect("log buffer poisoned"),
        }
    }
}

#[test]
fn basic_advance_then_retreat() {
    let mut reader = LineReader::new();
    reader.load("aaaaa bbbbb ccccc");
    let view = ascii_view(6);
    assert_eq!(reader.current_tail(), "aaaaa bbbbb ccccc");
    assert_eq!(reader.current_line(&view), "aaaaa ");
    assert_eq!(reader.advance(&view), NavOutcome::Moved);
    assert_eq!(reader.current_offset(), 6);
    assert_eq!(reader.retreat(&view), NavOutcome::Moved);
    assert_eq!(reader.current_offset(), 0);
    assert_eq!(reader.slow_path_retreats(), 0);
}

#[test]
fn short_document_reaches_end_immediately() {
    let (sink, rx) = ChannelSink::pair();
    let mut reader = LineReader::new().with_sink(sink);
    reader.load("hi");
    assert_eq!(rx.try_recv().unwrap(), ReaderEvent::ProgressChanged(0.0));

    assert_eq!(reader.advance(&ascii_view(80)), NavOutcome::ReachedEnd);
    assert_eq!(reader.current_offset(), 0);
    assert_eq!(rx.try_recv().unwrap(), ReaderEvent::ReachedEnd);
    assert!(rx.try_recv().is_err());
}

#[test]
fn retreat_at_start_signals_and_stays() {
    let (sink, rx) = ChannelSink::pair();
    let mut reader = LineReader::new().with_sink(sink);
    reader.load("aaaaa bbbbb ccccc");
    let _ = rx.try_recv();
    assert_eq!(reader.retreat(&ascii_view(6)), NavOutcome::ReachedStart);
    assert_eq!(reader.current_offset(), 0);
    assert_eq!(rx.try_recv().unwrap(), ReaderEvent::ReachedStart);
}

#[test]
fn quoted_span_is_kept_whole() {
    let mut reader = LineReader::new();
    reader.load("他说“你好”。");
    let view = View::new(42, &IDEOGRAPH as &dyn Measure);
    // Strict fit stops after 好; the closing quote and full stop are pulled in.
    assert_eq!(reader.current_line(&view), "他说“你好”。");
    assert_eq!(reader.advance(&view), NavOutcome::ReachedEnd);
}

#[test]
fn resize_forces_estimated_retreat() {
    let mut reader = LineReader::new();
    reader.load("aaaaa bbbbb ccccc ddddd eeeee fffff");
    let narrow = ascii_view(6);
    for _ in 0..4 {
        assert_eq!(reader.advance(&narrow), NavOutcome::Moved);
    }
    let before = reader.current_offset();
    assert_eq!(before, 24);

    reader.on_width_changed(10);
    assert_eq!(reader.history_depth(), 0);
    assert_eq!(reader.current_offset(), before);

    assert_eq!(reader.retreat(&ascii_view(10)), NavOutcome::Moved);
    assert!(reader.current_offset() < before);
    assert_eq!(reader.slow_path_retreats(), 1);
}

#[test]
fn retreat_continues_after_history_is_exhausted() {
    let mut reader = LineReader::with_config(ReaderConfig {
        history_capacity: 2,
        ..ReaderConfig::default()
    });
    reader.load("aaaaa bbbbb ccccc ddddd eeeee fffff");
    let view = ascii_view(6);
    for _ in 0..4 {
        assert_eq!(reader.advance(&view), NavOutcome::Moved);
    }
    assert_eq!(reader.current_offset(), 24);
    assert_eq!(reader.history_depth(), 2);
    assert_eq!(reader.history_evictions(), 2);

    assert_eq!(reader.retreat(&view), NavOutcome::Moved);
    assert_eq!(reader.current_offset(), 18);
    assert_eq!(reader.retreat(&view), NavOutcome::Moved);
    assert_eq!(reader.current_offset(), 12);
    assert_eq!(reader.slow_path_retreats(), 0);

    // 0 and 6 were evicted; this one has to estimate.
    assert_eq!(reader.retreat(&view), NavOutcome::Moved);
    assert!(reader.current_offset() < 12);
    assert_eq!(reader.slow_path_retreats(), 1);
}

#[test]
fn slow_path_is_logged_on_reader_target() {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_target(true)
        .with_ansi(false)
        .without_time()
        .with_writer(BufferWriter {
            inner: buffer.clone(),
        })
        .finish();

    with_default(subscriber, || {
        let mut reader = LineReader::new();
        reader.load("aaaaa bbbbb ccccc ddddd");
        reader.seek_to_offset(18);
        reader.retreat(&ascii_view(6));
    });

    let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
    assert!(log_output.contains("INFO state.reader:"));
    assert!(log_output.contains("document_loaded"));
    assert!(log_output.contains("retreat_slow_path"));
}

#[test]
fn seek_round_trips_through_current_offset() {
    let mut reader = LineReader::new();
    reader.load(&"lorem ipsum dolor sit amet ".repeat(50));
    let view = ascii_view(17);
    for _ in 0..7 {
        reader.advance(&view);
    }
    let saved = reader.current_offset();

    let mut restored = LineReader::new();
    restored.load(&"lorem ipsum dolor sit amet ".repeat(50));
    restored.seek_to_offset(saved as i64);
    assert_eq!(restored.current_offset(), saved);
    assert_eq!(restored.current_line(&view), reader.current_line(&view));
}

#[test]
fn last_line_then_advance_reaches_end() {
    let mut reader = LineReader::new();
    reader.load(&"The quick brown fox, jumps over the lazy dog. ".repeat(40));
    let view = ascii_view(23);
    reader.last_line(&view);
    assert!(reader.current_offset() > 0);
    assert_eq!(reader.advance(&view), NavOutcome::ReachedEnd);
    assert_eq!(reader.retreat(&view), NavOutcome::Moved);
    reader.first_line();
    assert_eq!(reader.current_offset(), 0);
}

#[test]
fn progress_follows_position() {
    let mut reader = LineReader::new();
    reader.load("0123456789");
    assert_eq!(reader.progress(), 0.0);
    reader.seek_to_offset(5);
    assert_eq!(reader.progress(), 0.5);
    reader.load("");
    assert_eq!(reader.progress(), 0.0);
}
