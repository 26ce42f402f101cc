//! Grapheme cluster cell widths.
//!
//! `egc_width` is the single width authority behind [`crate::CellMeasure`].
//! The classifier favours over-estimation for pictographic sequences: an extra
//! blank cell is harmless on a one-line display, an overflowing glyph is not.
//!
//! Invariant: the width of a cluster never depends on its neighbours, so the
//! width of a string is the sum over its clusters and prefixes never measure
//! wider than the whole string.

use unicode_width::UnicodeWidthChar;

const ZWJ: char = '\u{200D}';
const KEYCAP_COMBINING: char = '\u{20E3}';

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

// Rough Extended Pictographic heuristic (main emoji blocks + misc symbols/dingbats).
fn is_extended_pictographic(c: char) -> bool {
    ('\u{1F300}'..='\u{1FAFF}').contains(&c) || ('\u{2600}'..='\u{27BF}').contains(&c)
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
        || ('\u{1AB0}'..='\u{1AFF}').contains(&c)
        || ('\u{1DC0}'..='\u{1DFF}').contains(&c)
        || ('\u{20D0}'..='\u{20FF}').contains(&c)
        || ('\u{FE20}'..='\u{FE2F}').contains(&c)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EgcKind {
    Narrow,
    Wide,
    /// Any emoji form: single pictograph, flag, keycap, ZWJ or modifier sequence.
    Emoji,
    Zero,
}

fn classify(egc: &str) -> EgcKind {
    let mut chars = egc.chars();
    let Some(first) = chars.next() else {
        return EgcKind::Zero;
    };
    if first.is_ascii() && egc.len() == 1 {
        return EgcKind::Narrow;
    }

    let mut base: Option<char> = None;
    for c in egc.chars() {
        if is_extended_pictographic(c) || is_regional_indicator(c) || c == KEYCAP_COMBINING {
            return EgcKind::Emoji;
        }
        if base.is_none() && !is_combining_mark(c) && c != ZWJ {
            base = Some(c);
        }
    }

    match base.and_then(UnicodeWidthChar::width) {
        Some(2) => EgcKind::Wide,
        Some(0) => EgcKind::Zero,
        _ => EgcKind::Narrow,
    }
}

/// Display width in terminal cells of one grapheme cluster. Empty input is 0.
///
/// Precondition: `egc` is a single cluster (callers segment first).
#[inline]
pub fn egc_width(egc: &str) -> u16 {
    match classify(egc) {
        EgcKind::Zero => 0,
        EgcKind::Narrow => 1,
        EgcKind::Wide | EgcKind::Emoji => 2,
    }
}
