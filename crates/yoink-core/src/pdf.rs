//! PDF metadata access: title extraction from the document Info dictionary.

use std::path::Path;

use lopdf::{Document, Object};

/// Extract the document title from the PDF Info dictionary.
///
/// Returns `None` when the file is not parseable as a PDF, has no Info
/// dictionary, or the title is missing/empty. Callers treat a missing title
/// as "fall back to another name", so parse failures are not errors here.
pub fn title_from_metadata(path: &Path) -> Option<String> {
    let doc = Document::load(path).ok()?;
    let info = doc.trailer.get(b"Info").ok()?;
    let dict = match info {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok()?,
        Object::Dictionary(d) => d,
        _ => return None,
    };
    let raw = dict.get(b"Title").ok()?.as_str().ok()?;
    let title = decode_text_string(raw);
    let trimmed = title.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Decode a PDF text string: UTF-16BE when it carries the BOM, otherwise
/// treated as Latin-1 (a practical superset of PDFDocEncoding).
fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}
