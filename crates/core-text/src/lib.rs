//! Flattened document buffer plus the width and line-break primitives the
//! reader engine is built on.
//!
//! A [`Document`] is one continuous paragraph: every run of whitespace
//! (line terminators included) is collapsed to a single space on load. All
//! public offsets are counted in Unicode scalar values (`char`s), never bytes.

pub mod breaks;
pub mod measure;
pub mod normalize;
pub mod width;

pub use breaks::{BreakPolicy, break_length};
pub use measure::{CellMeasure, Measure, View};
pub use normalize::{NormalizedText, collapse_whitespace};
pub use width::egc_width;

/// Every `CHECKPOINT_STRIDE`-th character gets its byte offset recorded so
/// char -> byte conversion never scans more than one stride.
const CHECKPOINT_STRIDE: usize = 64;

/// Immutable, normalized text with a cached character count.
#[derive(Debug, Clone, Default)]
pub struct Document {
    text: String,
    len: usize,
    /// Byte offsets of chars `0, STRIDE, 2*STRIDE, ..`. Empty for pure ASCII
    /// text where char and byte offsets coincide.
    checkpoints: Vec<usize>,
}

impl Document {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize raw text and build the offset index. Linear in `raw.len()`;
    /// no layout work happens here.
    pub fn from_raw(raw: &str) -> Self {
        Self::from_normalized(collapse_whitespace(raw).normalized)
    }

    /// Wrap text that is already normalized.
    pub fn from_normalized(text: String) -> Self {
        let mut len = 0usize;
        let mut checkpoints = Vec::new();
        if text.is_ascii() {
            len = text.len();
        } else {
            checkpoints.reserve(text.len() / CHECKPOINT_STRIDE + 1);
            for (byte, _) in text.char_indices() {
                if len % CHECKPOINT_STRIDE == 0 {
                    checkpoints.push(byte);
                }
                len += 1;
            }
        }
        Self {
            text,
            len,
            checkpoints,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Character count.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte offset of the char at `char_idx`; `char_idx >= len` maps to the end.
    pub fn byte_offset(&self, char_idx: usize) -> usize {
        if char_idx >= self.len {
            return self.text.len();
        }
        if self.checkpoints.is_empty() {
            return char_idx;
        }
        let base = self.checkpoints[char_idx / CHECKPOINT_STRIDE];
        let rem = char_idx % CHECKPOINT_STRIDE;
        self.text[base..]
            .char_indices()
            .nth(rem)
            .map(|(b, _)| base + b)
            .unwrap_or(self.text.len())
    }

    /// Text from `char_idx` to the end of the document.
    pub fn tail(&self, char_idx: usize) -> &str {
        &self.text[self.byte_offset(char_idx)..]
    }

    /// Text in the char range `start..end` (clamped).
    pub fn slice(&self, start: usize, end: usize) -> &str {
        let end = end.min(self.len);
        let start = start.min(end);
        &self.text[self.byte_offset(start)..self.byte_offset(end)]
    }
}
