//! Durable archive of downloaded documents.
//!
//! Layout: current files live in the output root, superseded versions move
//! into an `archive/` subdirectory with a timestamp-suffixed name, and a
//! small JSON index maps entry id → current fingerprint + history. All
//! visible mutations go through rename, so a crash never corrupts the
//! current file; correctness relies on the filesystem's atomic rename, not
//! an in-process lock (overlapping independent runs are best-effort).

mod index;

pub use index::{ArchiveIndex, ArchiveRecord, HistoryRecord};

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

use crate::checksum;
use crate::namer;
use crate::storage::{self, StorageWriter, TEMP_SUFFIX};

/// Name of the persisted index file inside the output root.
pub const INDEX_FILE: &str = "index.json";

/// Subdirectory holding superseded versions.
pub const HISTORY_DIR: &str = "archive";

/// On-disk archive rooted at the output directory.
pub struct ArchiveStore {
    root: PathBuf,
    history_dir: PathBuf,
    index_path: PathBuf,
    index: ArchiveIndex,
}

impl ArchiveStore {
    /// Open (or create) the archive at `root`. Loads the index; a corrupt
    /// index file is a hard error. Orphaned `.part` files from an aborted
    /// run are swept away.
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)
            .with_context(|| format!("create output dir: {}", root.display()))?;
        let history_dir = root.join(HISTORY_DIR);
        fs::create_dir_all(&history_dir)
            .with_context(|| format!("create history dir: {}", history_dir.display()))?;
        let index_path = root.join(INDEX_FILE);
        let index = ArchiveIndex::load(&index_path)?;

        let store = Self {
            root: root.to_path_buf(),
            history_dir,
            index_path,
            index,
        };
        store.sweep_orphans();
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Temp download target for an entry. The id is tagged with a short
    /// content hash so two ids that sanitize identically never share a
    /// scratch file.
    pub fn scratch_path(&self, id: &str) -> PathBuf {
        let tag = &checksum::sha256_bytes(id.as_bytes())[..8];
        let file = format!(".{}-{}.pdf", namer::sanitize_filename(id), tag);
        storage::temp_path(&self.root.join(file))
    }

    /// Current fingerprint and path for an entry, if the archived file is
    /// still present on disk. A record whose file was removed out from
    /// under us reads as absent, so the next run re-downloads it.
    pub fn read_current(&self, id: &str) -> Option<(&str, PathBuf)> {
        let rec = self.index.records.get(id)?;
        let path = self.root.join(&rec.file);
        if !path.exists() {
            return None;
        }
        Some((rec.fingerprint.as_str(), path))
    }

    /// The id currently owning `name` in the output root, if any.
    pub fn owner_of_name(&self, name: &str) -> Option<&str> {
        self.index
            .records
            .iter()
            .find(|(_, rec)| rec.file == name)
            .map(|(id, _)| id.as_str())
    }

    /// Promote a verified download into the current slot for `id`:
    /// demote the prior version into the history directory, finalize the
    /// temp writer onto `final_name` (atomic rename), update the record,
    /// and persist the index.
    ///
    /// Fails without touching anything if `final_name` is owned by a
    /// different id.
    pub fn promote(
        &mut self,
        id: &str,
        writer: StorageWriter,
        fingerprint: &str,
        final_name: &str,
    ) -> Result<PathBuf> {
        if let Some(owner) = self.owner_of_name(final_name) {
            if owner != id {
                anyhow::bail!(
                    "naming conflict: {:?} already names entry {:?}",
                    final_name,
                    owner
                );
            }
        }

        let now = Utc::now();
        let dest = self.root.join(final_name);

        let mut history_entry = None;
        if let Some(rec) = self.index.records.get(id) {
            let old_path = self.root.join(&rec.file);
            if old_path.exists() {
                let archived = self.unique_history_name(&rec.file, now);
                let archived_path = self.history_dir.join(&archived);
                fs::rename(&old_path, &archived_path).with_context(|| {
                    format!(
                        "archive {} to {}",
                        old_path.display(),
                        archived_path.display()
                    )
                })?;
                history_entry = Some(HistoryRecord {
                    fingerprint: rec.fingerprint.clone(),
                    file: archived,
                    archived_at: now,
                });
            } else {
                tracing::warn!(id, file = %rec.file, "current file missing from disk, not archiving");
            }
        }

        writer.finalize(&dest)?;

        let rec = self
            .index
            .records
            .entry(id.to_string())
            .or_insert_with(|| ArchiveRecord {
                fingerprint: String::new(),
                file: String::new(),
                updated_at: now,
                history: Vec::new(),
            });
        if let Some(h) = history_entry {
            rec.history.insert(0, h);
        }
        rec.fingerprint = fingerprint.to_string();
        rec.file = final_name.to_string();
        rec.updated_at = now;

        self.index.save_atomic(&self.index_path)?;
        Ok(dest)
    }

    /// Past versions for an entry, most-recent-first.
    pub fn list_history(&self, id: &str) -> &[HistoryRecord] {
        self.index
            .records
            .get(id)
            .map(|r| r.history.as_slice())
            .unwrap_or(&[])
    }

    /// All records, ordered by id.
    pub fn records(&self) -> impl Iterator<Item = (&str, &ArchiveRecord)> {
        self.index
            .records
            .iter()
            .map(|(id, rec)| (id.as_str(), rec))
    }

    /// Timestamp-suffixed name for a demoted file, e.g.
    /// `slva446_20260807_101500.pdf`; a numeric suffix disambiguates
    /// same-second updates.
    fn unique_history_name(&self, file: &str, now: chrono::DateTime<Utc>) -> String {
        let path = Path::new(file);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.to_string());
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let ts = now.format("%Y%m%d_%H%M%S");

        let candidate = format!("{stem}_{ts}{ext}");
        if !self.history_dir.join(&candidate).exists() {
            return candidate;
        }
        let mut n = 1u32;
        loop {
            let candidate = format!("{stem}_{ts}-{n}{ext}");
            if !self.history_dir.join(&candidate).exists() {
                return candidate;
            }
            n += 1;
        }
    }

    fn sweep_orphans(&self) {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(TEMP_SUFFIX) {
                tracing::debug!(file = %name.to_string_lossy(), "removing orphaned temp file");
                let _ = fs::remove_file(entry.path());
            }
        }
    }
}
