//! Document loading: turns a file on disk into the raw text handed to the
//! reader engine.
//!
//! The format is chosen from the file extension through a fixed strategy
//! table ([`DocumentFormat`]). Extraction produces newline-separated text;
//! the engine flattens it on load.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

pub mod cache;
pub mod decode;
pub mod epub;
pub mod format;
pub mod html;
mod zip;

#[cfg(test)]
mod test_support;

pub use cache::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, ParseCache};
pub use decode::{clean_lines, decode_text};
pub use format::{DocumentFormat, supported_extensions};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("unsupported file format: {0:?}")]
    UnsupportedFormat(String),
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot decode text: {0}")]
    Decode(String),
    #[error("malformed archive: {0}")]
    Archive(String),
}

impl DocumentError {
    pub(crate) fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            DocumentError::NotFound(path.to_path_buf())
        } else {
            DocumentError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Extracted text plus the name shown in the host's status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub file_name: String,
    pub content: String,
    pub format: DocumentFormat,
}

/// Read and extract `path`. Existence is checked before the format so a
/// mistyped path reports `NotFound` whatever its extension.
pub fn parse_file(path: &Path) -> Result<ParsedDocument, DocumentError> {
    if !path.exists() {
        return Err(DocumentError::NotFound(path.to_path_buf()));
    }
    let format = DocumentFormat::from_path(path)?;
    let bytes = fs::read(path).map_err(|e| DocumentError::from_io(path, e))?;
    debug!(target: "io", bytes = bytes.len(), ?format, "file_read");
    let content = format.extract(&bytes)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!(
        target: "io",
        bytes = bytes.len(),
        chars = content.chars().count(),
        ?format,
        "document_parsed"
    );
    Ok(ParsedDocument {
        file_name,
        content,
        format,
    })
}
