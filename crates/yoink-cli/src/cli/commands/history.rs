//! `yoink history` – show the archived versions of one entry.

use anyhow::Result;
use std::path::Path;
use yoink_core::archive::ArchiveStore;

pub fn run_history(output_dir: &Path, id: &str) -> Result<()> {
    let store = ArchiveStore::open(output_dir)?;

    match store.read_current(id) {
        Some((fingerprint, path)) => {
            let short_fp = &fingerprint[..fingerprint.len().min(12)];
            println!("current  {:<14} {}", short_fp, path.display());
        }
        None => println!("No current record for {:?}.", id),
    }

    let history = store.list_history(id);
    if history.is_empty() {
        println!("No archived versions.");
        return Ok(());
    }
    for h in history {
        let short_fp = &h.fingerprint[..h.fingerprint.len().min(12)];
        println!(
            "{}  {:<14} {}",
            h.archived_at.format("%Y-%m-%d %H:%M:%S"),
            short_fp,
            h.file
        );
    }
    Ok(())
}
