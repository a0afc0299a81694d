//! Disk I/O and file lifecycle for downloads.
//!
//! Every download goes to a `.part` temp file first and is only renamed to
//! its final name after the payload and fingerprint are confirmed. A crash
//! mid-download orphans at most the temp file.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(unix)]
use std::os::unix::fs::FileExt;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path
/// (e.g. `slva446.pdf` → `slva446.pdf.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Writer for a temp download file. Cloneable; each `write_at` is
/// independent (pwrite-style), so the fetch callback can stream without
/// holding a cursor.
#[derive(Clone)]
pub struct StorageWriter {
    file: Arc<File>,
    temp_path: PathBuf,
}

impl StorageWriter {
    /// Create a new temp file at `temp_path`. Overwrites if the path already
    /// exists (a leftover from an aborted run).
    pub fn create(temp_path: &Path) -> Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        Ok(StorageWriter {
            file: Arc::new(file),
            temp_path: temp_path.to_path_buf(),
        })
    }

    /// Write `data` at `offset`. Does not change the file's logical cursor.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        let n = self
            .file
            .write_at(data, offset)
            .context("storage write_at failed")?;
        if n != data.len() {
            anyhow::bail!("short write: {} of {}", n, data.len());
        }
        Ok(())
    }

    /// Stub for non-Unix (e.g. Windows): use seek + write.
    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = (*self.file).try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)?;
        Ok(())
    }

    /// Sync file data to disk. Call before `finalize` for durability.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all().context("storage sync failed")?;
        Ok(())
    }

    /// Path to the current temp file.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Atomically rename the temp file to the final path. Consumes the
    /// writer and closes the file. Call `sync` before this if you need
    /// durability. Fails if `final_path` is on a different filesystem.
    pub fn finalize(self, final_path: &Path) -> Result<()> {
        let temp_path = self.temp_path.clone();
        drop(self.file);

        std::fs::rename(&temp_path, final_path).with_context(|| {
            format!(
                "failed to rename {} to {}",
                temp_path.display(),
                final_path.display()
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn temp_path_appends_part() {
        let p = temp_path(Path::new("slva446.pdf"));
        assert_eq!(p.to_string_lossy(), "slva446.pdf.part");
        let p2 = temp_path(Path::new("/tmp/datasheet.pdf"));
        assert_eq!(p2.to_string_lossy(), "/tmp/datasheet.pdf.part");
    }

    #[test]
    fn create_write_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("output.pdf");
        let tp = temp_path(&final_path);

        let writer = StorageWriter::create(&tp).unwrap();
        writer.write_at(0, b"hello ").unwrap();
        writer.write_at(6, b"world").unwrap();
        writer.sync().unwrap();
        writer.finalize(&final_path).unwrap();

        assert!(!tp.exists());
        assert!(final_path.exists());
        let mut f = std::fs::File::open(&final_path).unwrap();
        let mut buf = String::new();
        f.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "hello world");
    }

    #[test]
    fn create_truncates_leftover_temp() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("doc.pdf.part");
        std::fs::write(&tp, b"stale bytes from an aborted run").unwrap();

        let writer = StorageWriter::create(&tp).unwrap();
        writer.write_at(0, b"new").unwrap();
        writer.sync().unwrap();
        let final_p = dir.path().join("doc.pdf");
        writer.finalize(&final_p).unwrap();

        let content = std::fs::read(&final_p).unwrap();
        assert_eq!(content, b"new");
    }
}
