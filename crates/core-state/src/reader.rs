//! Lazy single-line navigation over a flattened document.
//!
//! No line index is ever built. The engine keeps one char offset (the start
//! of the visible display line) and derives every line on demand from the
//! text after it and the width supplied by the host on each call.
//!
//! Forward moves are exact. Backward moves use the bounded
//! [`PositionHistory`] when it still holds the previous start, and otherwise
//! estimate: sample the text before the cursor, derive an average line
//! length, jump back three average lines and walk forward again. The
//! estimate may settle on a different (still valid) boundary than a full
//! re-layout from offset 0 would; that trade keeps every call bounded by the
//! sample size instead of the document size.

use core_events::{EventSink, NoopEventSink, ReaderEvent};
use core_text::{BreakPolicy, Document, View, collapse_whitespace};
use tracing::{debug, info, trace};

use crate::history::{POSITION_HISTORY_MAX, PositionHistory};

/// Chars sampled before the cursor to estimate line length on a slow retreat.
pub const RETREAT_SAMPLE_CHARS: usize = 200;
/// Chars sampled at the end of the document by `last_line`.
pub const TAIL_SAMPLE_CHARS: usize = 500;
/// Average lines stepped back before walking forward again.
const ESTIMATE_BACKOFF_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReaderConfig {
    pub history_capacity: usize,
    pub retreat_sample_chars: usize,
    pub tail_sample_chars: usize,
    pub breaks: BreakPolicy,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            history_capacity: POSITION_HISTORY_MAX,
            retreat_sample_chars: RETREAT_SAMPLE_CHARS,
            tail_sample_chars: TAIL_SAMPLE_CHARS,
            breaks: BreakPolicy::default(),
        }
    }
}

/// Result of a navigation call. Boundary outcomes leave the engine unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Moved,
    ReachedEnd,
    ReachedStart,
}

pub struct LineReader {
    doc: Document,
    /// Char offset of the first char of the visible line.
    position: usize,
    history: PositionHistory,
    config: ReaderConfig,
    last_width: Option<u32>,
    sink: Box<dyn EventSink>,
    slow_path_retreats: u64,
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LineReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineReader")
            .field("len", &self.doc.len())
            .field("position", &self.position)
            .field("history_depth", &self.history.len())
            .field("last_width", &self.last_width)
            .finish()
    }
}

impl LineReader {
    pub fn new() -> Self {
        Self::with_config(ReaderConfig::default())
    }

    pub fn with_config(config: ReaderConfig) -> Self {
        Self {
            doc: Document::new(),
            position: 0,
            history: PositionHistory::new(config.history_capacity),
            config,
            last_width: None,
            sink: Box::new(NoopEventSink),
            slow_path_retreats: 0,
        }
    }

    /// Route signals to `sink`.
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Character count of the loaded document.
    pub fn len(&self) -> usize {
        self.doc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    pub fn history_depth(&self) -> usize {
        self.history.len()
    }

    /// Number of retreats that had to estimate instead of using history.
    pub fn slow_path_retreats(&self) -> u64 {
        self.slow_path_retreats
    }

    /// History entries dropped by the capacity bound since construction.
    pub fn history_evictions(&self) -> u64 {
        self.history.evicted()
    }

    /// Replace the document. Linear in `raw.len()`, width-independent.
    pub fn load(&mut self, raw: &str) {
        let norm = collapse_whitespace(raw);
        let (line_terminators, collapsed_runs) = (norm.line_terminators, norm.collapsed_runs);
        self.doc = Document::from_normalized(norm.normalized);
        self.position = 0;
        self.history.clear();
        info!(
            target: "state.reader",
            chars = self.doc.len(),
            bytes = self.doc.as_str().len(),
            line_terminators,
            collapsed_runs,
            "document_loaded"
        );
        self.emit_progress();
    }

    /// Remaining text from the cursor; the host lays out the visible line from it.
    pub fn current_tail(&self) -> &str {
        self.doc.tail(self.position)
    }

    /// The display line at the cursor for `view`.
    pub fn current_line(&self, view: &View<'_>) -> &str {
        let k = self.config.breaks.break_length(self.current_tail(), view);
        self.doc.slice(self.position, self.position + k)
    }

    pub fn current_offset(&self) -> usize {
        self.position
    }

    /// `position / length`, or `0.0` for an empty document.
    pub fn progress(&self) -> f64 {
        if self.doc.is_empty() {
            0.0
        } else {
            self.position as f64 / self.doc.len() as f64
        }
    }

    /// Move to the next display line.
    pub fn advance(&mut self, view: &View<'_>) -> NavOutcome {
        self.observe_width(view.width);
        let tail = self.current_tail();
        if tail.is_empty() {
            return self.boundary(NavOutcome::ReachedEnd);
        }
        let k = self.config.breaks.break_length(tail, view);
        if self.position + k >= self.doc.len() {
            trace!(target: "state.reader", position = self.position, k, "advance_at_end");
            return self.boundary(NavOutcome::ReachedEnd);
        }
        self.history.push(self.position);
        self.position += k;
        self.emit_progress();
        NavOutcome::Moved
    }

    /// Move to the previous display line.
    pub fn retreat(&mut self, view: &View<'_>) -> NavOutcome {
        self.observe_width(view.width);
        if self.position == 0 {
            return self.boundary(NavOutcome::ReachedStart);
        }
        if let Some(previous) = self.history.pop_before(self.position) {
            self.position = previous;
            self.emit_progress();
            return NavOutcome::Moved;
        }

        let from = self.position;
        let to = self.estimate_line_start(from, self.config.retreat_sample_chars, view);
        self.history.clear();
        self.slow_path_retreats += 1;
        debug!(target: "state.reader", from, to, width = view.width, "retreat_slow_path");
        self.position = to;
        self.emit_progress();
        NavOutcome::Moved
    }

    /// Jump to a char offset, clamped into `[0, len - 1]` (0 when empty). The
    /// offset is used as-is, without realigning to a break boundary.
    pub fn seek_to_offset(&mut self, index: i64) {
        let clamped = match self.doc.len() {
            0 => 0,
            len => usize::try_from(index.max(0))
                .unwrap_or(usize::MAX)
                .min(len - 1),
        };
        trace!(target: "state.reader", requested = index, clamped, "seek");
        self.history.clear();
        self.position = clamped;
        self.emit_progress();
    }

    /// Jump to `floor(len * fraction)`; the fraction is clamped to `[0, 1]`
    /// and NaN reads as 0.
    pub fn seek_to_progress(&mut self, fraction: f64) {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let index = (self.doc.len() as f64 * fraction).floor() as i64;
        self.seek_to_offset(index);
    }

    pub fn first_line(&mut self) {
        self.seek_to_offset(0);
    }

    /// Jump to the start of the final display line, estimated from a sample
    /// of the document tail.
    pub fn last_line(&mut self, view: &View<'_>) {
        self.observe_width(view.width);
        if self.doc.is_empty() {
            self.first_line();
            return;
        }
        let end = self.doc.len();
        let target = self.estimate_line_start(end, self.config.tail_sample_chars, view);
        debug!(target: "state.reader", from = self.position, to = target, "last_line");
        self.history.clear();
        self.position = target;
        self.emit_progress();
    }

    /// Invalidate break positions computed under the previous width. The
    /// cursor offset is kept; the visible line may start mid-line afterwards.
    pub fn on_width_changed(&mut self, new_width: u32) {
        debug!(
            target: "state.reader",
            old = ?self.last_width,
            new = new_width,
            history_depth = self.history.len(),
            "width_changed"
        );
        self.history.clear();
        self.last_width = Some(new_width);
    }

    fn observe_width(&mut self, width: u32) {
        match self.last_width {
            Some(old) if old != width => self.on_width_changed(width),
            Some(_) => {}
            None => self.last_width = Some(width),
        }
    }

    fn boundary(&mut self, outcome: NavOutcome) -> NavOutcome {
        let event = match outcome {
            NavOutcome::ReachedEnd => ReaderEvent::ReachedEnd,
            NavOutcome::ReachedStart => ReaderEvent::ReachedStart,
            NavOutcome::Moved => return outcome,
        };
        self.sink.emit(event);
        outcome
    }

    fn emit_progress(&mut self) {
        let progress = self.progress();
        self.sink.emit(ReaderEvent::ProgressChanged(progress));
    }

    /// Start of the last display line that begins strictly before `end`,
    /// found by walking forward from an estimated earlier start.
    ///
    /// Precondition: `0 < end <= len`.
    fn estimate_line_start(&self, end: usize, sample_chars: usize, view: &View<'_>) -> usize {
        let average = self.average_line_len(end, sample_chars, view);
        let mut cursor = end.saturating_sub(average.saturating_mul(ESTIMATE_BACKOFF_LINES));
        loop {
            let k = self
                .config
                .breaks
                .break_length(self.doc.tail(cursor), view)
                .max(1);
            if cursor + k >= end {
                return cursor;
            }
            cursor += k;
        }
    }

    /// Average display-line length over up to `sample_chars` chars before `end`.
    fn average_line_len(&self, end: usize, sample_chars: usize, view: &View<'_>) -> usize {
        let start = end.saturating_sub(sample_chars.max(1));
        let sample_len = end - start;
        let mut lines = 0usize;
        let mut offset = start;
        while offset < end {
            let k = self
                .config
                .breaks
                .break_length(self.doc.slice(offset, end), view)
                .max(1);
            offset += k;
            lines += 1;
        }
        sample_len.div_ceil(lines.max(1)).max(1)
    }
}
