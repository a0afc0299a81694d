//! Destination filename derivation and sanitization.

use std::path::Path;

use crate::manifest::Entry;
use crate::pdf;

/// How output files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingMode {
    /// `{id}.pdf` (default).
    #[default]
    ByItem,
    /// Title from the PDF metadata, falling back to the manifest title
    /// override, then the id.
    ByTitle,
}

/// Derive the destination filename for a fetched document.
///
/// `downloaded` is the temp file holding the fresh payload; `by-title` mode
/// reads the title out of it.
pub fn destination_name(entry: &Entry, mode: NamingMode, downloaded: &Path) -> String {
    let stem = match mode {
        NamingMode::ByItem => entry.id.clone(),
        NamingMode::ByTitle => pdf::title_from_metadata(downloaded)
            .or_else(|| entry.title.clone())
            .unwrap_or_else(|| {
                tracing::debug!(id = %entry.id, "no title in PDF metadata, naming by id");
                entry.id.clone()
            }),
    };
    let mut name = sanitize_filename(&stem);
    if name.is_empty() {
        name = sanitize_filename(&entry.id);
    }
    if name.is_empty() {
        name = "document".to_string();
    }
    format!("{}.pdf", name)
}

/// Sanitizes a candidate filename for safe use on Linux.
///
/// - Replaces NUL, `/`, `\`, and control characters with `_`
/// - Trims leading/trailing spaces and dots
/// - Collapses consecutive underscores
/// - Limits length to 255 bytes (Linux NAME_MAX)
pub fn sanitize_filename(name: &str) -> String {
    const NAME_MAX: usize = 255;

    let mut out = String::with_capacity(name.len());
    let mut prev_underscore = false;

    for c in name.chars() {
        let replacement = if c == '\0' || c == '/' || c == '\\' || c.is_control() {
            '_'
        } else if c == ' ' || c == '\t' {
            '_'
        } else {
            c
        };

        if replacement == '_' {
            if !prev_underscore {
                out.push('_');
            }
            prev_underscore = true;
        } else {
            out.push(replacement);
            prev_underscore = false;
        }
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '\t' || c == '.' || c == '_');

    if trimmed.len() > NAME_MAX {
        let mut take = NAME_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].to_string()
    } else {
        trimmed.to_string()
    }
}
