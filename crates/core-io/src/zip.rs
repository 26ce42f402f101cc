//! Read-only zip access over an in-memory archive: central directory lookup
//! plus stored and deflated entries. Enough for EPUB containers; no zip64,
//! encryption or multi-disk support.

use miniz_oxide::inflate::decompress_to_vec_with_limit;
use tracing::trace;

use crate::DocumentError;

const EOCD_SIGNATURE: u32 = 0x0605_4b50;
const CENTRAL_SIGNATURE: u32 = 0x0201_4b50;
const LOCAL_SIGNATURE: u32 = 0x0403_4b50;
const EOCD_LEN: usize = 22;
const CENTRAL_HEADER_LEN: usize = 46;
const LOCAL_HEADER_LEN: usize = 30;
const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;
/// Inflated size ceiling for a single entry.
const MAX_ENTRY_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    pub name: String,
    method: u16,
    compressed_size: usize,
    local_offset: usize,
}

#[derive(Debug)]
pub struct ZipArchive<'a> {
    bytes: &'a [u8],
    entries: Vec<ZipEntry>,
}

impl<'a> ZipArchive<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self, DocumentError> {
        let eocd = find_eocd(bytes)?;
        let count = usize::from(u16_at(bytes, eocd + 10)?);
        let mut at = u32_at(bytes, eocd + 16)? as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            if u32_at(bytes, at)? != CENTRAL_SIGNATURE {
                return Err(malformed("bad central directory entry"));
            }
            let name_len = usize::from(u16_at(bytes, at + 28)?);
            let extra_len = usize::from(u16_at(bytes, at + 30)?);
            let comment_len = usize::from(u16_at(bytes, at + 32)?);
            let name_start = at + CENTRAL_HEADER_LEN;
            let name = bytes
                .get(name_start..name_start + name_len)
                .ok_or_else(|| malformed("truncated entry name"))?;
            entries.push(ZipEntry {
                name: String::from_utf8_lossy(name).into_owned(),
                method: u16_at(bytes, at + 10)?,
                compressed_size: u32_at(bytes, at + 20)? as usize,
                local_offset: u32_at(bytes, at + 42)? as usize,
            });
            at = name_start + name_len + extra_len + comment_len;
        }
        trace!(target: "io", entries = entries.len(), "zip_directory_read");
        Ok(Self { bytes, entries })
    }

    /// Entries in central directory order.
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>, DocumentError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| DocumentError::Archive(format!("missing entry {name:?}")))?;
        self.read_entry(entry)
    }

    fn read_entry(&self, entry: &ZipEntry) -> Result<Vec<u8>, DocumentError> {
        let at = entry.local_offset;
        if u32_at(self.bytes, at)? != LOCAL_SIGNATURE {
            return Err(malformed("bad local header"));
        }
        let name_len = usize::from(u16_at(self.bytes, at + 26)?);
        let extra_len = usize::from(u16_at(self.bytes, at + 28)?);
        let start = at + LOCAL_HEADER_LEN + name_len + extra_len;
        let data = self
            .bytes
            .get(start..start + entry.compressed_size)
            .ok_or_else(|| malformed("truncated entry data"))?;
        match entry.method {
            METHOD_STORED => Ok(data.to_vec()),
            METHOD_DEFLATE => decompress_to_vec_with_limit(data, MAX_ENTRY_BYTES).map_err(|e| {
                DocumentError::Archive(format!("inflating {:?}: {:?}", entry.name, e.status))
            }),
            other => Err(DocumentError::Archive(format!(
                "compression method {other} in {:?}",
                entry.name
            ))),
        }
    }
}

/// The end-of-central-directory record sits in the last 22 bytes plus an
/// optional comment of up to 64 KiB.
fn find_eocd(bytes: &[u8]) -> Result<usize, DocumentError> {
    let last = bytes
        .len()
        .checked_sub(EOCD_LEN)
        .ok_or_else(|| malformed("not a zip archive"))?;
    let first = last.saturating_sub(usize::from(u16::MAX));
    (first..=last)
        .rev()
        .find(|&at| bytes[at..at + 4] == EOCD_SIGNATURE.to_le_bytes())
        .ok_or_else(|| malformed("not a zip archive"))
}

fn malformed(what: &str) -> DocumentError {
    DocumentError::Archive(what.to_string())
}

fn u16_at(bytes: &[u8], at: usize) -> Result<u16, DocumentError> {
    bytes
        .get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| malformed("truncated record"))
}

fn u32_at(bytes: &[u8], at: usize) -> Result<u32, DocumentError> {
    bytes
        .get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| malformed("truncated record"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::zip_bytes;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_stored_and_deflated_entries() {
        let body = "chapter text ".repeat(50);
        let bytes = zip_bytes(&[
            ("mimetype", b"application/epub+zip".as_slice(), false),
            ("OEBPS/one.xhtml", body.as_bytes(), true),
        ]);
        let archive = ZipArchive::new(&bytes).unwrap();
        let names: Vec<_> = archive.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["mimetype", "OEBPS/one.xhtml"]);
        assert_eq!(archive.read("mimetype").unwrap(), b"application/epub+zip");
        assert_eq!(archive.read("OEBPS/one.xhtml").unwrap(), body.as_bytes());
        assert!(archive.contains("mimetype"));
        assert!(!archive.contains("OEBPS/two.xhtml"));
    }

    #[test]
    fn missing_entry_is_an_archive_error() {
        let bytes = zip_bytes(&[("a.txt", b"a".as_slice(), false)]);
        let archive = ZipArchive::new(&bytes).unwrap();
        assert!(matches!(archive.read("b.txt"), Err(DocumentError::Archive(_))));
    }

    #[test]
    fn non_zip_bytes_are_rejected() {
        assert!(matches!(ZipArchive::new(b"PK\x03\x04"), Err(DocumentError::Archive(_))));
        assert!(matches!(
            ZipArchive::new(&[0u8; 64]),
            Err(DocumentError::Archive(_))
        ));
    }

    #[test]
    fn truncated_entry_data_is_rejected() {
        let mut bytes = zip_bytes(&[("a.txt", b"abcdef".as_slice(), false)]);
        // Shift the local data out of range by corrupting the extra-field length.
        bytes[28] = 0xFF;
        bytes[29] = 0xFF;
        let archive = ZipArchive::new(&bytes).unwrap();
        assert!(matches!(archive.read("a.txt"), Err(DocumentError::Archive(_))));
    }
}
