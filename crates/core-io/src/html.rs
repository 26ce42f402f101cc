//! Plain-text extraction from HTML.
//!
//! Not a parser: comments and `<script>`/`<style>` blocks are dropped, every
//! remaining tag becomes a line break, and character references are decoded.
//! Good enough for saved articles and simple e-book chapters.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::clean_lines;

static HIDDEN_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("hidden block regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[xX][0-9a-fA-F]{1,6}|#[0-9]{1,7}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("entity regex")
});

pub fn extract_text(html: &str) -> String {
    let visible = HIDDEN_BLOCKS.replace_all(html, "");
    let untagged = TAG.replace_all(&visible, "\n");
    let decoded = decode_entities(&untagged);
    clean_lines(&decoded)
}

/// Replace known character references; unknown ones are left as written.
pub fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures<'_>| match decode_entity(&caps[1]) {
            Some(c) => c.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Decode the body of a reference (`amp`, `#39`, `#x4F60`).
pub fn decode_entity(entity: &str) -> Option<char> {
    if let Some(numeric) = entity.strip_prefix('#') {
        return decode_numeric(numeric);
    }
    let c = match entity {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "laquo" => '«',
        "raquo" => '»',
        "ndash" => '–',
        "mdash" => '—',
        "hellip" => '…',
        "middot" => '·',
        "copy" => '©',
        "reg" => '®',
        "aacute" => 'á',
        "eacute" => 'é',
        "iacute" => 'í',
        "oacute" => 'ó',
        "uacute" => 'ú',
        "ntilde" => 'ñ',
        "uuml" => 'ü',
        "agrave" => 'à',
        "egrave" => 'è',
        "ccedil" => 'ç',
        "iexcl" => '¡',
        "iquest" => '¿',
        _ => return None,
    };
    Some(c)
}

fn decode_numeric(digits: &str) -> Option<char> {
    let value = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    match value {
        0 => None,
        // nbsp
        0xA0 => Some(' '),
        _ => char::from_u32(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn drops_scripts_styles_and_comments() {
        let html = "<html><head><style>p { color: red }</style>\
                    <script type=\"text/javascript\">var a = '<p>';</script></head>\
                    <body><!-- hidden --><p>Hello</p><p>World</p></body></html>";
        assert_eq!(extract_text(html), "Hello\nWorld");
    }

    #[test]
    fn tags_split_lines_and_entities_decode() {
        let html = "<h1>Tom &amp; Jerry</h1><p>&ldquo;Hi&rdquo; &#x4F60;&#22909;&nbsp;!</p>";
        assert_eq!(extract_text(html), "Tom & Jerry\n“Hi” 你好 !");
    }

    #[test]
    fn unknown_entities_are_kept() {
        assert_eq!(decode_entities("a &bogus; b &#0; c"), "a &bogus; b &#0; c");
    }

    #[test]
    fn numeric_references() {
        assert_eq!(decode_entity("#39"), Some('\''));
        assert_eq!(decode_entity("#160"), Some(' '));
        assert_eq!(decode_entity("#xD800"), None);
        assert_eq!(decode_entity("eacute"), Some('é'));
    }
}
