//! Typed download manifest: a schema-versioned list of document entries.
//!
//! Parsing fails closed: an unsupported version or a malformed entry rejects
//! the whole manifest before any download is dispatched.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// The only manifest schema version this build understands.
pub const SUPPORTED_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse manifest: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unsupported manifest version {0} (supported: {SUPPORTED_VERSION})")]
    UnsupportedVersion(u32),
    #[error("manifest has no entries")]
    Empty,
    #[error("entry #{0} has a blank id")]
    BlankId(usize),
    #[error("duplicate entry id {0:?}")]
    DuplicateId(String),
    #[error("entry {id:?} has no url and the manifest has no base_url")]
    MissingUrl { id: String },
    #[error("entry {id:?} has an invalid url: {reason}")]
    InvalidUrl { id: String, reason: String },
    #[error("invalid base_url: {0}")]
    InvalidBaseUrl(String),
}

/// One document to keep up to date.
#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    /// Unique key; also the default output filename stem.
    pub id: String,
    /// Direct download URL. When absent, the fetcher resolves the document
    /// through the manifest-level `base_url` redirect.
    #[serde(default)]
    pub url: Option<String>,
    /// Display title override used by `by-title` naming when the PDF
    /// metadata has none.
    #[serde(default)]
    pub title: Option<String>,
}

/// Parsed and validated manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub version: u32,
    /// Optional resolver base: entries without a direct `url` are fetched by
    /// following redirects from `base_url` + url-encoded id.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default, rename = "entry")]
    pub entries: Vec<Entry>,
}

impl Manifest {
    /// Parse a manifest from TOML text and validate it.
    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = toml::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let text = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    fn validate(&self) -> Result<(), ManifestError> {
        if self.version != SUPPORTED_VERSION {
            return Err(ManifestError::UnsupportedVersion(self.version));
        }
        if self.entries.is_empty() {
            return Err(ManifestError::Empty);
        }
        if let Some(base) = &self.base_url {
            url::Url::parse(base).map_err(|e| ManifestError::InvalidBaseUrl(e.to_string()))?;
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.id.trim().is_empty() {
                return Err(ManifestError::BlankId(index));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(ManifestError::DuplicateId(entry.id.clone()));
            }
            match &entry.url {
                Some(u) => {
                    url::Url::parse(u).map_err(|e| ManifestError::InvalidUrl {
                        id: entry.id.clone(),
                        reason: e.to_string(),
                    })?;
                }
                None => {
                    if self.base_url.is_none() {
                        return Err(ManifestError::MissingUrl {
                            id: entry.id.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let m = Manifest::parse(
            r#"
            version = 1

            [[entry]]
            id = "slva446"
            url = "https://docs.example.com/slva446.pdf"
        "#,
        )
        .unwrap();
        assert_eq!(m.version, 1);
        assert_eq!(m.entries.len(), 1);
        assert_eq!(m.entries[0].id, "slva446");
        assert!(m.entries[0].title.is_none());
    }

    #[test]
    fn parse_base_url_entry_without_url() {
        let m = Manifest::parse(
            r#"
            version = 1
            base_url = "https://docs.example.com/find?q="

            [[entry]]
            id = "tps7a47"
        "#,
        )
        .unwrap();
        assert!(m.entries[0].url.is_none());
        assert!(m.base_url.is_some());
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = Manifest::parse(
            r#"
            version = 2

            [[entry]]
            id = "x"
            url = "https://example.com/x.pdf"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::UnsupportedVersion(2)));
    }

    #[test]
    fn rejects_missing_version() {
        let err = Manifest::parse(
            r#"
            [[entry]]
            id = "x"
            url = "https://example.com/x.pdf"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn rejects_empty_entries() {
        let err = Manifest::parse("version = 1\n").unwrap_err();
        assert!(matches!(err, ManifestError::Empty));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Manifest::parse(
            r#"
            version = 1

            [[entry]]
            id = "a"
            url = "https://example.com/a.pdf"

            [[entry]]
            id = "a"
            url = "https://example.com/b.pdf"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateId(id) if id == "a"));
    }

    #[test]
    fn rejects_entry_without_url_or_base() {
        let err = Manifest::parse(
            r#"
            version = 1

            [[entry]]
            id = "orphan"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::MissingUrl { id } if id == "orphan"));
    }

    #[test]
    fn rejects_blank_id() {
        let err = Manifest::parse(
            r#"
            version = 1

            [[entry]]
            id = "  "
            url = "https://example.com/x.pdf"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::BlankId(0)));
    }

    #[test]
    fn rejects_invalid_url() {
        let err = Manifest::parse(
            r#"
            version = 1

            [[entry]]
            id = "bad"
            url = "not a url"
        "#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidUrl { id, .. } if id == "bad"));
    }
}
