//! Byte decoding and line cleanup shared by every format.

use encoding_rs::{Encoding, GBK, UTF_8, WINDOWS_1252};
use tracing::debug;

use crate::DocumentError;

/// Encodings tried in order when no BOM is present. GBK decoding covers
/// GB2312 and the GB18030 extensions.
const FALLBACK_CHAIN: &[&Encoding] = &[UTF_8, GBK];

/// Decode by BOM when one is present (UTF-8, UTF-16 LE/BE), otherwise the
/// first of UTF-8 and GBK that decodes without errors, otherwise Latin-1
/// (windows-1252), which maps every byte. Only malformed BOM-tagged input
/// fails.
pub fn decode_text(bytes: &[u8]) -> Result<String, DocumentError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return encoding
            .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
            .map(|text| text.into_owned())
            .ok_or_else(|| DocumentError::Decode(format!("malformed {} after BOM", encoding.name())));
    }
    for encoding in FALLBACK_CHAIN {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            if *encoding != UTF_8 {
                debug!(target: "io", encoding = encoding.name(), "decode_fallback");
            }
            return Ok(text.into_owned());
        }
    }
    debug!(target: "io", "decode_latin1_fallback");
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    Ok(text.into_owned())
}

/// Unify line endings, drop blank lines and trim the ends.
pub fn clean_lines(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    unified
        .split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
