//! EPUB text extraction.
//!
//! `META-INF/container.xml` names the package document; its spine gives the
//! reading order of the XHTML chapters, each run through the HTML extractor.
//! An archive without a usable package falls back to every XHTML entry in
//! archive order.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::{debug, warn};

use crate::zip::ZipArchive;
use crate::{DocumentError, clean_lines, html};

const CONTAINER_PATH: &str = "META-INF/container.xml";
const DOCUMENT_MEDIA_TYPES: &[&str] = &["application/xhtml+xml", "text/html"];
const DOCUMENT_SUFFIXES: &[&str] = &[".xhtml", ".html", ".htm"];

pub fn extract_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let archive = ZipArchive::new(bytes)?;
    let chapters = match package_path(&archive)? {
        Some(opf) => spine_documents(&archive, &opf)?,
        None => {
            warn!(target: "io", "epub_package_missing_scanning_entries");
            archive
                .entries()
                .iter()
                .map(|e| e.name.clone())
                .filter(|name| is_document_path(name))
                .collect()
        }
    };

    let mut parts = Vec::with_capacity(chapters.len());
    for path in &chapters {
        let data = match archive.read(path) {
            Ok(data) => data,
            Err(e) => {
                warn!(target: "io", path = %path, error = %e, "epub_chapter_skipped");
                continue;
            }
        };
        let text = html::extract_text(&String::from_utf8_lossy(&data));
        if !text.is_empty() {
            parts.push(text);
        }
    }
    debug!(target: "io", chapters = chapters.len(), with_text = parts.len(), "epub_extracted");
    Ok(clean_lines(&parts.join("\n")))
}

fn package_path(archive: &ZipArchive<'_>) -> Result<Option<String>, DocumentError> {
    if !archive.contains(CONTAINER_PATH) {
        return Ok(None);
    }
    let container = archive.read(CONTAINER_PATH)?;
    let path = elements(&container, CONTAINER_PATH)?
        .into_iter()
        .find(|e| e.name == "rootfile")
        .and_then(|e| e.attr("full-path").map(str::to_string))
        .filter(|p| archive.contains(p));
    Ok(path)
}

/// Chapter paths in spine order, resolved against the package directory.
/// An empty spine yields every document in manifest order.
fn spine_documents(archive: &ZipArchive<'_>, opf: &str) -> Result<Vec<String>, DocumentError> {
    let package = elements(&archive.read(opf)?, opf)?;
    let base = opf.rsplit_once('/').map_or("", |(dir, _)| dir);

    let mut manifest = HashMap::new();
    let mut manifest_order = Vec::new();
    let mut spine = Vec::new();
    for element in &package {
        match element.name.as_str() {
            "item" => {
                let (Some(id), Some(href)) = (element.attr("id"), element.attr("href")) else {
                    continue;
                };
                let is_document = element
                    .attr("media-type")
                    .is_some_and(|t| DOCUMENT_MEDIA_TYPES.contains(&t));
                if is_document {
                    let path = resolve(base, href);
                    manifest_order.push(path.clone());
                    manifest.insert(id.to_string(), path);
                }
            }
            "itemref" => {
                if element.attr("linear") != Some("no")
                    && let Some(idref) = element.attr("idref")
                {
                    spine.push(idref.to_string());
                }
            }
            _ => {}
        }
    }

    if spine.is_empty() {
        return Ok(manifest_order);
    }
    Ok(spine
        .iter()
        .filter_map(|idref| manifest.get(idref).cloned())
        .collect())
}

/// Start or empty element with its attributes, names without prefixes.
#[derive(Debug)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
}

impl Element {
    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn elements(xml: &[u8], source: &str) -> Result<Vec<Element>, DocumentError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let attrs = e
                    .attributes()
                    .flatten()
                    .map(|attr| {
                        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
                        let value = reader
                            .decoder()
                            .decode(&attr.value)
                            .map(|v| html::decode_entities(&v))
                            .unwrap_or_default();
                        (key, value)
                    })
                    .collect();
                out.push(Element { name, attrs });
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(DocumentError::Archive(format!("{source}: {e}"))),
        }
        buf.clear();
    }
    Ok(out)
}

/// Join `href` onto the package directory, dropping any fragment and
/// resolving `.`/`..` segments and percent escapes.
fn resolve(base: &str, href: &str) -> String {
    let href = href.split_once('#').map_or(href, |(path, _)| path);
    let mut parts: Vec<&str> = base.split('/').filter(|p| !p.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    percent_decode(&parts.join("/"))
}

fn percent_decode(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(hex) = path.get(i + 1..i + 3)
            && let Ok(byte) = u8::from_str_radix(hex, 16)
        {
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn is_document_path(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    DOCUMENT_SUFFIXES.iter().any(|s| lower.ends_with(s))
}
