//! `yoink status` – show the current archive records.

use anyhow::Result;
use std::path::Path;
use yoink_core::archive::ArchiveStore;

pub fn run_status(output_dir: &Path) -> Result<()> {
    let store = ArchiveStore::open(output_dir)?;
    let records: Vec<_> = store.records().collect();
    if records.is_empty() {
        println!("No archived documents in {}.", output_dir.display());
        return Ok(());
    }

    println!(
        "{:<20} {:<14} {:<8} {}",
        "ID", "FINGERPRINT", "HISTORY", "FILE"
    );
    for (id, rec) in records {
        let short_fp = &rec.fingerprint[..rec.fingerprint.len().min(12)];
        println!(
            "{:<20} {:<14} {:<8} {}",
            id,
            short_fp,
            rec.history.len(),
            rec.file
        );
    }
    Ok(())
}
