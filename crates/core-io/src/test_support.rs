use miniz_oxide::deflate::compress_to_vec;

/// Build a zip archive in memory. Each entry is `(name, data, deflate)`;
/// CRCs are left zero since the reader does not check them.
pub(crate) fn zip_bytes(files: &[(&str, &[u8], bool)]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut central = Vec::new();
    for &(name, data, deflate) in files {
        let (method, stored) = if deflate {
            (8u16, compress_to_vec(data, 6))
        } else {
            (0u16, data.to_vec())
        };
        let offset = out.len() as u32;

        put_u32(&mut out, 0x0403_4b50);
        put_u16(&mut out, 20);
        put_u16(&mut out, 0);
        put_u16(&mut out, method);
        put_u16(&mut out, 0);
        put_u16(&mut out, 0);
        put_u32(&mut out, 0);
        put_u32(&mut out, stored.len() as u32);
        put_u32(&mut out, data.len() as u32);
        put_u16(&mut out, name.len() as u16);
        put_u16(&mut out, 0);
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&stored);

        put_u32(&mut central, 0x0201_4b50);
        put_u16(&mut central, 20);
        put_u16(&mut central, 20);
        put_u16(&mut central, 0);
        put_u16(&mut central, method);
        put_u16(&mut central, 0);
        put_u16(&mut central, 0);
        put_u32(&mut central, 0);
        put_u32(&mut central, stored.len() as u32);
        put_u32(&mut central, data.len() as u32);
        put_u16(&mut central, name.len() as u16);
        put_u16(&mut central, 0);
        put_u16(&mut central, 0);
        put_u16(&mut central, 0);
        put_u16(&mut central, 0);
        put_u32(&mut central, 0);
        put_u32(&mut central, offset);
        central.extend_from_slice(name.as_bytes());
    }
    let central_offset = out.len() as u32;
    let central_len = central.len() as u32;
    out.extend_from_slice(&central);

    put_u32(&mut out, 0x0605_4b50);
    put_u16(&mut out, 0);
    put_u16(&mut out, 0);
    put_u16(&mut out, files.len() as u16);
    put_u16(&mut out, files.len() as u16);
    put_u32(&mut out, central_len);
    put_u32(&mut out, central_offset);
    put_u16(&mut out, 0);
    out
}

/// Minimal EPUB: container, package document with the given spine, and the
/// chapter files themselves.
pub(crate) fn epub_bytes(chapters: &[(&str, &str)], spine: &[&str]) -> Vec<u8> {
    let container = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
    let manifest: String = chapters
        .iter()
        .map(|(id, _)| {
            format!(r#"<item id="{id}" href="text/{id}.xhtml" media-type="application/xhtml+xml"/>"#)
        })
        .collect();
    let itemrefs: String = spine
        .iter()
        .map(|id| format!(r#"<itemref idref="{id}"/>"#))
        .collect();
    let opf = format!(
        r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <manifest><item id="css" href="style.css" media-type="text/css"/>{manifest}</manifest>
  <spine>{itemrefs}</spine>
</package>"#
    );
    let docs: Vec<(String, String)> = chapters
        .iter()
        .map(|(id, body)| {
            (
                format!("OEBPS/text/{id}.xhtml"),
                format!(
                    r#"<?xml version="1.0" encoding="utf-8"?><html xmlns="http://www.w3.org/1999/xhtml"><head><style>p {{ margin: 0 }}</style></head><body>{body}</body></html>"#
                ),
            )
        })
        .collect();

    let mut files: Vec<(&str, &[u8], bool)> = vec![
        ("mimetype", b"application/epub+zip".as_slice(), false),
        ("META-INF/container.xml", container.as_bytes(), true),
        ("OEBPS/content.opf", opf.as_bytes(), true),
        ("OEBPS/style.css", b"p { margin: 0 }".as_slice(), false),
    ];
    for (name, doc) in &docs {
        files.push((name.as_str(), doc.as_bytes(), true));
    }
    zip_bytes(&files)
}

fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}
