//! Redirect-based document URL resolution.
//!
//! Some document portals expose a stable lookup URL per identifier that
//! redirects to the current PDF location. Entries without a direct `url`
//! are resolved by requesting `base_url` + url-encoded id, following
//! redirects, and accepting the effective URL only if it points at a PDF.

use std::time::Duration;

use super::FetchOptions;
use crate::retry::FetchError;

/// Resolve the final PDF URL for `id` through the portal's redirect chain.
///
/// Performs a GET (some portals block HEAD) and discards the body; the
/// caller downloads the document separately.
pub fn resolve_document_url(
    base_url: &str,
    id: &str,
    opts: FetchOptions,
) -> Result<String, FetchError> {
    let lookup = format!("{}{}", base_url, encode_id(id));

    let mut easy = curl::easy::Easy::new();
    easy.url(&lookup)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.timeout(Duration::from_secs(60).min(opts.request_timeout))?;
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| Ok(data.len()))?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }

    let effective = easy
        .effective_url()?
        .map(str::to_string)
        .unwrap_or_else(|| lookup.clone());
    if is_pdf_url(&effective) {
        Ok(effective)
    } else {
        Err(FetchError::NotPdf {
            effective_url: effective,
        })
    }
}

/// Url-encode an identifier for use in a lookup query (space becomes `+`).
fn encode_id(id: &str) -> String {
    url::form_urlencoded::byte_serialize(id.as_bytes()).collect()
}

/// True if the URL plausibly points at a PDF document.
fn is_pdf_url(u: &str) -> bool {
    match url::Url::parse(u) {
        Ok(parsed) => parsed.path().to_ascii_lowercase().ends_with(".pdf"),
        Err(_) => u.to_ascii_lowercase().contains(".pdf"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_id_plain() {
        assert_eq!(encode_id("slva446"), "slva446");
    }

    #[test]
    fn encode_id_reserved_chars() {
        assert_eq!(encode_id("LM317 rev C"), "LM317+rev+C");
        assert_eq!(encode_id("a&b"), "a%26b");
    }

    #[test]
    fn pdf_url_by_path() {
        assert!(is_pdf_url("https://docs.example.com/lit/slva446.pdf"));
        assert!(is_pdf_url("https://docs.example.com/lit/SLVA446.PDF?ts=1"));
    }

    #[test]
    fn non_pdf_url_rejected() {
        assert!(!is_pdf_url("https://docs.example.com/search?q=slva446"));
        assert!(!is_pdf_url("https://docs.example.com/lit/slva446.html"));
    }
}
