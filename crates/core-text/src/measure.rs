//! Host-supplied text measurement.
//!
//! The engine never knows about fonts. Each call receives a [`View`]: the
//! available width and a [`Measure`] giving the advance width of a string in
//! the active font, in the same unit as the width.
//!
//! Contract: `measure` must be monotonic in prefix length (a prefix is never
//! wider than the whole string). The break search relies on it and does not
//! check it.

use unicode_segmentation::UnicodeSegmentation;

use crate::egc_width;

pub trait Measure {
    fn measure(&self, text: &str) -> u32;
}

impl<F> Measure for F
where
    F: Fn(&str) -> u32,
{
    fn measure(&self, text: &str) -> u32 {
        self(text)
    }
}

/// Terminal-cell measurement: sum of grapheme cluster widths.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellMeasure;

impl Measure for CellMeasure {
    fn measure(&self, text: &str) -> u32 {
        text.graphemes(true).map(|g| u32::from(egc_width(g))).sum()
    }
}

/// Per-call view parameters. Not stored by the engine beyond the width it
/// uses to detect resizes.
#[derive(Clone, Copy)]
pub struct View<'a> {
    pub width: u32,
    pub measure: &'a dyn Measure,
}

impl<'a> View<'a> {
    pub fn new(width: u32, measure: &'a dyn Measure) -> Self {
        Self { width, measure }
    }

    /// Width used for layout; zero is treated as one unit so break search
    /// always terminates with forward progress.
    pub fn effective_width(&self) -> u32 {
        self.width.max(1)
    }

    pub fn measure(&self, text: &str) -> u32 {
        self.measure.measure(text)
    }

    /// `true` when `text` fits inside `effective_width * tolerance`.
    pub fn fits_within(&self, text: &str, tolerance: f64) -> bool {
        f64::from(self.measure(text)) <= f64::from(self.effective_width()) * tolerance
    }
}

impl std::fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View").field("width", &self.width).finish()
    }
}
