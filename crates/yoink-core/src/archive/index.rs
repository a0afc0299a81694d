//! Persisted archive index (JSON in the output root) so fingerprint state
//! survives across runs.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One superseded version of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub fingerprint: String,
    /// Filename inside the history directory.
    pub file: String,
    pub archived_at: DateTime<Utc>,
}

/// Current state of one entry: fingerprint, filename, and its history
/// (most-recent-first, append-only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub fingerprint: String,
    /// Current filename inside the output root.
    pub file: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
}

/// Mapping entry id → archive record. BTreeMap keeps the serialized index
/// stable across runs, so an unchanged run rewrites nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArchiveIndex {
    #[serde(default)]
    pub records: BTreeMap<String, ArchiveRecord>,
}

impl ArchiveIndex {
    /// Load the index from `path`. A missing file is an empty index; a
    /// malformed one is a reported error (store corruption is never
    /// silently swallowed).
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(e).with_context(|| format!("read archive index: {}", path.display()))
            }
        };
        serde_json::from_slice(&bytes)
            .with_context(|| format!("parse archive index: {}", path.display()))
    }

    /// Write the index via temp-then-rename so a crash never leaves a
    /// half-written index behind.
    pub fn save_atomic(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serialize archive index")?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("write archive index: {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("rename archive index into place: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let idx = ArchiveIndex::load(&dir.path().join("index.json")).unwrap();
        assert!(idx.records.is_empty());
    }

    #[test]
    fn corrupt_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");
        std::fs::write(&path, b"{ not json").unwrap();
        assert!(ArchiveIndex::load(&path).is_err());
    }

    #[test]
    fn save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut idx = ArchiveIndex::default();
        idx.records.insert(
            "slva446".to_string(),
            ArchiveRecord {
                fingerprint: "abc123".to_string(),
                file: "slva446.pdf".to_string(),
                updated_at: Utc::now(),
                history: vec![],
            },
        );
        idx.save_atomic(&path).unwrap();

        let loaded = ArchiveIndex::load(&path).unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records["slva446"].fingerprint, "abc123");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn unchanged_index_serializes_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.json");

        let mut idx = ArchiveIndex::default();
        idx.records.insert(
            "b".to_string(),
            ArchiveRecord {
                fingerprint: "2".to_string(),
                file: "b.pdf".to_string(),
                updated_at: Utc::now(),
                history: vec![],
            },
        );
        idx.records.insert(
            "a".to_string(),
            ArchiveRecord {
                fingerprint: "1".to_string(),
                file: "a.pdf".to_string(),
                updated_at: Utc::now(),
                history: vec![],
            },
        );
        idx.save_atomic(&path).unwrap();
        let first = std::fs::read(&path).unwrap();

        let reloaded = ArchiveIndex::load(&path).unwrap();
        reloaded.save_atomic(&path).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }
}
