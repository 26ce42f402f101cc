//! Terminal backend for the single-line reader view.
//!
//! The screen holds one display line, vertically centered, and a status row
//! at the bottom. Everything else stays blank.

use anyhow::Result;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{
        self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, SetTitle,
        disable_raw_mode, enable_raw_mode,
    },
};
use std::io::{Write, stdout};
use unicode_segmentation::UnicodeSegmentation;

/// What to show on one redraw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub line: &'a str,
    pub status: &'a str,
    /// Blank columns left of the display line.
    pub margin: u16,
}

pub trait TerminalBackend {
    fn enter(&mut self) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    fn set_title(&mut self, title: &str) -> Result<()>;
    /// `(columns, rows)`.
    fn size(&self) -> Result<(u16, u16)>;
    fn draw(&mut self, frame: &Frame<'_>) -> Result<()>;
}

pub struct CrosstermBackend {
    entered: bool,
}

/// RAII guard ensuring terminal state restoration even if caller early-returns or panics.
pub struct TerminalGuard<'a> {
    backend: &'a mut CrosstermBackend,
    active: bool,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { entered: false }
    }

    /// Enter and return a guard that will leave on drop.
    pub fn enter_guard(&mut self) -> Result<TerminalGuard<'_>> {
        self.enter()?;
        Ok(TerminalGuard {
            backend: self,
            active: true,
        })
    }
}

impl TerminalGuard<'_> {
    pub fn backend(&mut self) -> &mut CrosstermBackend {
        &mut *self.backend
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            execute!(stdout(), EnterAlternateScreen, Hide)?;
            self.entered = true;
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            execute!(stdout(), LeaveAlternateScreen, Show)?;
            disable_raw_mode()?;
            self.entered = false;
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> Result<()> {
        execute!(stdout(), SetTitle(title))?;
        Ok(())
    }

    fn size(&self) -> Result<(u16, u16)> {
        Ok(terminal::size()?)
    }

    fn draw(&mut self, frame: &Frame<'_>) -> Result<()> {
        let (cols, rows) = self.size()?;
        let mut out = stdout();
        queue!(out, Clear(ClearType::All))?;
        let text_cols = cols.saturating_sub(frame.margin.saturating_mul(2));
        let line_row = rows.saturating_sub(1) / 2;
        queue!(
            out,
            MoveTo(frame.margin, line_row),
            Print(clip_to_cells(frame.line, text_cols))
        )?;
        if rows > 1 {
            queue!(
                out,
                MoveTo(0, rows - 1),
                SetAttribute(Attribute::Reverse),
                Print(pad_to_cells(frame.status, cols)),
                SetAttribute(Attribute::Reset)
            )?;
        }
        out.flush()?;
        Ok(())
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl Drop for TerminalGuard<'_> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.backend.leave();
        }
    }
}

/// Longest grapheme-aligned prefix of `text` that fits in `cols` cells.
pub fn clip_to_cells(text: &str, cols: u16) -> &str {
    let mut used = 0u32;
    for (idx, g) in text.grapheme_indices(true) {
        used += u32::from(core_text::egc_width(g));
        if used > u32::from(cols) {
            return &text[..idx];
        }
    }
    text
}

/// `text` clipped to `cols` cells and space-padded to exactly that width.
pub fn pad_to_cells(text: &str, cols: u16) -> String {
    let clipped = clip_to_cells(text, cols);
    let used: u32 = clipped
        .graphemes(true)
        .map(|g| u32::from(core_text::egc_width(g)))
        .sum();
    let pad = u32::from(cols).saturating_sub(used) as usize;
    format!("{clipped}{}", " ".repeat(pad))
}
