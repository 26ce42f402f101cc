//! Load-time normalization: the document becomes a single paragraph.
//!
//! CR, CRLF and LF all count as whitespace; every whitespace run collapses to
//! one ASCII space and the result is trimmed. Runs in one pass over the input.

/// Normalized text plus counters used for load telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    pub normalized: String,
    /// Line terminators seen (a CRLF pair counts once).
    pub line_terminators: usize,
    /// Whitespace runs that were rewritten (longer than one char or not a plain space).
    pub collapsed_runs: usize,
}

pub fn collapse_whitespace(input: &str) -> NormalizedText {
    let mut out = String::with_capacity(input.len());
    let mut line_terminators = 0usize;
    let mut collapsed_runs = 0usize;
    let mut run_len = 0usize;
    let mut run_plain = true;
    let mut prev_cr = false;

    for ch in input.chars() {
        if ch.is_whitespace() {
            match ch {
                '\n' if prev_cr => {}
                '\n' | '\r' => line_terminators += 1,
                _ => {}
            }
            prev_cr = ch == '\r';
            run_len += 1;
            run_plain &= ch == ' ';
            continue;
        }
        prev_cr = false;
        if run_len > 0 {
            // Leading whitespace is dropped rather than emitted.
            let leading = out.is_empty();
            if !leading {
                out.push(' ');
            }
            if leading || run_len > 1 || !run_plain {
                collapsed_runs += 1;
            }
            run_len = 0;
            run_plain = true;
        }
        out.push(ch);
    }
    if run_len > 0 {
        collapsed_runs += 1;
    }

    NormalizedText {
        normalized: out,
        line_terminators,
        collapsed_runs,
    }
}
