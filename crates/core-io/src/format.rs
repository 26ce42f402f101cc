use std::path::Path;

use crate::{DocumentError, clean_lines, decode_text, epub, html};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFormat {
    PlainText,
    Html,
    Epub,
}

/// Extension (lower-case, no dot) to extraction strategy.
const FORMAT_TABLE: &[(&str, DocumentFormat)] = &[
    ("txt", DocumentFormat::PlainText),
    ("md", DocumentFormat::PlainText),
    ("html", DocumentFormat::Html),
    ("htm", DocumentFormat::Html),
    ("epub", DocumentFormat::Epub),
];

impl DocumentFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        FORMAT_TABLE
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, format)| *format)
    }

    pub fn from_path(path: &Path) -> Result<Self, DocumentError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        Self::from_extension(&ext).ok_or(DocumentError::UnsupportedFormat(ext))
    }

    /// Extract newline-separated text from the file contents.
    pub fn extract(self, bytes: &[u8]) -> Result<String, DocumentError> {
        match self {
            DocumentFormat::PlainText => Ok(clean_lines(&decode_text(bytes)?)),
            DocumentFormat::Html => Ok(html::extract_text(&decode_text(bytes)?)),
            DocumentFormat::Epub => epub::extract_text(bytes),
        }
    }
}

pub fn supported_extensions() -> Vec<&'static str> {
    FORMAT_TABLE.iter().map(|(ext, _)| *ext).collect()
}
