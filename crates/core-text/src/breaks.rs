//! Soft line-break decisions.
//!
//! `break_length` answers: how many chars of `text` form the next display
//! line at the given width. The search is lazy. Only the prefix that is
//! actually measured gets scanned, so asking about the tail of a very long
//! document costs O(line), not O(document).
//!
//! Decision order:
//! 1. largest prefix `k` that fits (galloping probe + binary search); `k >= 1`
//! 2. a sentence ender right after `k` is pulled in if it fits the punctuation tolerance
//! 3. an unmatched opening quote extends the line to its closing quote
//!    (plus one trailing clause mark) if that fits the quote tolerance
//! 4. otherwise back off to the nearest break-worthy char in the last
//!    `backtrack_window` of the prefix: sentence enders, clause pauses,
//!    other punctuation, then spaces
//!
//! Pure and deterministic for identical `(text, measure, width)`.

use std::str::CharIndices;

use tracing::trace;

use crate::View;

pub const SENTENCE_ENDERS: &[char] = &['。', '！', '？', '；', '.', '!', '?', ';'];
pub const CLAUSE_PAUSES: &[char] = &['，', ',', '、'];
pub const OTHER_BREAKS: &[char] = &[
    '：', ':', ')', '）', ']', '】', '》', '〉', '>', '」', '』', '”', '’',
];
const SPACES: &[char] = &[' '];

const OPEN_QUOTES: &[char] = &['“', '「', '『'];
const CLOSE_QUOTES: &[char] = &['”', '」', '』'];
const ASCII_QUOTE: char = '"';

/// First probe length of the galloping search.
const INITIAL_PROBE: usize = 32;

/// Tunables for the break heuristics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakPolicy {
    /// Overflow allowed to pull a trailing sentence ender onto the line.
    pub punct_tolerance: f64,
    /// Overflow allowed to finish a quoted span on the line.
    pub quote_tolerance: f64,
    /// How far past `k` to look for a closing quote, as a fraction of `k`.
    pub quote_lookahead: f64,
    /// Fraction of the fitting prefix searched backwards for a break char.
    pub backtrack_window: f64,
}

impl Default for BreakPolicy {
    fn default() -> Self {
        Self {
            punct_tolerance: 1.10,
            quote_tolerance: 1.15,
            quote_lookahead: 0.5,
            backtrack_window: 0.3,
        }
    }
}

/// [`BreakPolicy::break_length`] with the default policy.
pub fn break_length(text: &str, view: &View<'_>) -> usize {
    BreakPolicy::default().break_length(text, view)
}

impl BreakPolicy {
    /// Number of chars of `text` forming the next display line. Returns 0
    /// only for empty text and at least 1 otherwise, whatever the width.
    pub fn break_length(&self, text: &str, view: &View<'_>) -> usize {
        if text.is_empty() {
            return 0;
        }
        let mut prefix = Prefix::new(text);
        let k = fit_length(&mut prefix, view);
        if k == 0 {
            trace!(target: "text.breaks", width = view.width, "single_char_overflow");
            return 1;
        }
        let Some(next) = prefix.char_at(k) else {
            return k;
        };

        if SENTENCE_ENDERS.contains(&next)
            && prefix.reach(k + 1) == k + 1
            && view.fits_within(prefix.head(k + 1), self.punct_tolerance)
        {
            trace!(target: "text.breaks", k, "punctuation_extension");
            return k + 1;
        }

        if let Some(end) = self.quote_extension(&mut prefix, k, view) {
            trace!(target: "text.breaks", k, end, "quote_extension");
            return end;
        }

        self.backtrack(&mut prefix, k)
    }

    fn quote_extension(
        &self,
        prefix: &mut Prefix<'_>,
        k: usize,
        view: &View<'_>,
    ) -> Option<usize> {
        let quotes = QuoteBalance::of(prefix.head(k));
        if !quotes.is_open() {
            return None;
        }
        let lookahead = ((k as f64 * self.quote_lookahead).floor() as usize).max(1);
        let close = (k..k + lookahead)
            .map_while(|i| prefix.char_at(i).map(|c| (i, c)))
            .find(|&(_, c)| quotes.closes(c))
            .map(|(i, _)| i)?;

        let mut end = close + 1;
        if !view.fits_within(prefix.head(end), self.quote_tolerance) {
            return None;
        }
        if let Some(c) = prefix.char_at(end)
            && is_clause_mark(c)
            && view.fits_within(prefix.head(end + 1), self.punct_tolerance)
        {
            end += 1;
        }
        Some(end)
    }

    fn backtrack(&self, prefix: &mut Prefix<'_>, k: usize) -> usize {
        let window = ((k as f64 * self.backtrack_window).ceil() as usize).clamp(1, k);
        let lowest = k - window;
        for class in [SENTENCE_ENDERS, CLAUSE_PAUSES, OTHER_BREAKS, SPACES] {
            for i in (lowest..k).rev() {
                if prefix.char_at(i).is_some_and(|c| class.contains(&c)) {
                    return i + 1;
                }
            }
        }
        k
    }
}

fn is_clause_mark(c: char) -> bool {
    SENTENCE_ENDERS.contains(&c) || CLAUSE_PAUSES.contains(&c) || c == '：' || c == ':'
}

/// Largest char count whose prefix fits `view.effective_width()`.
fn fit_length(prefix: &mut Prefix<'_>, view: &View<'_>) -> usize {
    let width = view.effective_width();
    let fits = |prefix: &Prefix<'_>, n: usize| view.measure(prefix.head(n)) <= width;

    let mut lo = 0usize;
    let mut probe = INITIAL_PROBE;
    let hi = loop {
        let n = prefix.reach(probe);
        if !fits(prefix, n) {
            break n;
        }
        lo = n;
        if n < probe {
            // Whole text fits.
            return n;
        }
        probe = probe.saturating_mul(2);
    };

    // Invariant: `lo` fits, `hi` does not.
    let mut hi = hi;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        if fits(prefix, mid) {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Lazily indexed char boundaries of a text.
struct Prefix<'t> {
    text: &'t str,
    /// `bounds[n]` is the byte length of the first `n` chars.
    bounds: Vec<usize>,
    chars: CharIndices<'t>,
    exhausted: bool,
}

impl<'t> Prefix<'t> {
    fn new(text: &'t str) -> Self {
        Self {
            text,
            bounds: vec![0],
            chars: text.char_indices(),
            exhausted: false,
        }
    }

    /// Index up to `n` chars; returns how many are available (`<= n`).
    fn reach(&mut self, n: usize) -> usize {
        while self.bounds.len() <= n && !self.exhausted {
            match self.chars.next() {
                Some((byte, c)) => self.bounds.push(byte + c.len_utf8()),
                None => self.exhausted = true,
            }
        }
        n.min(self.bounds.len() - 1)
    }

    /// First `n` chars; `n` must already be reached.
    fn head(&self, n: usize) -> &'t str {
        &self.text[..self.bounds[n.min(self.bounds.len() - 1)]]
    }

    fn char_at(&mut self, i: usize) -> Option<char> {
        if self.reach(i + 1) <= i {
            return None;
        }
        self.text[self.bounds[i]..self.bounds[i + 1]].chars().next()
    }
}

/// Quote state of a prefix. Double-quote variants are interchangeable: any
/// closer ends the innermost open span, and an ASCII `"` closes when a span
/// is open and opens one otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QuoteBalance {
    depth: usize,
}

impl QuoteBalance {
    fn of(text: &str) -> Self {
        let mut depth = 0usize;
        for c in text.chars() {
            if OPEN_QUOTES.contains(&c) {
                depth += 1;
            } else if CLOSE_QUOTES.contains(&c) {
                depth = depth.saturating_sub(1);
            } else if c == ASCII_QUOTE {
                depth = if depth > 0 { depth - 1 } else { 1 };
            }
        }
        Self { depth }
    }

    fn is_open(&self) -> bool {
        self.depth > 0
    }

    fn closes(&self, c: char) -> bool {
        self.is_open() && (CLOSE_QUOTES.contains(&c) || c == ASCII_QUOTE)
    }
}
