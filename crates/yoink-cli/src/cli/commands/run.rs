//! `yoink run` – fetch every manifest entry and archive changed documents.

use anyhow::Result;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use yoink_core::archive::ArchiveStore;
use yoink_core::config::YoinkConfig;
use yoink_core::coordinator::{self, ProgressEvent, UpdateOptions};
use yoink_core::fetch::FetchOptions;
use yoink_core::manifest::Manifest;
use yoink_core::namer::NamingMode;
use yoink_core::retry::RetryPolicy;

pub async fn run_update_command(
    cfg: &YoinkConfig,
    manifest_path: &Path,
    output_dir: &Path,
    jobs: Option<usize>,
    naming: NamingMode,
) -> Result<()> {
    // Manifest problems are fatal before any fetch is dispatched.
    let manifest = Manifest::load(manifest_path)?;
    let store = ArchiveStore::open(output_dir)?;
    let opts = UpdateOptions {
        jobs: jobs.unwrap_or(cfg.jobs),
        naming,
        fetch: FetchOptions::from_config(cfg),
        retry: RetryPolicy::from_config(cfg.retry.as_ref()),
    };
    tracing::info!(
        entries = manifest.entries.len(),
        jobs = opts.jobs,
        output = %output_dir.display(),
        "starting update run"
    );

    let abort = Arc::new(AtomicBool::new(false));
    {
        let abort = Arc::clone(&abort);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, letting in-flight fetches finish");
                abort.store(true, Ordering::Relaxed);
            }
        });
    }

    // Single consumer owns the display; workers only try_send events.
    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressEvent>(16);
    let progress_handle = tokio::spawn(async move {
        while let Some(ev) = progress_rx.recv().await {
            let kib = ev.bytes as f64 / 1024.0;
            println!(
                "[{}/{}] {:<24} {:>9.1} KiB  {}",
                ev.finished,
                ev.total,
                ev.id,
                kib,
                ev.outcome.label()
            );
        }
    });

    let summary = {
        let tx = progress_tx.clone();
        let abort = Arc::clone(&abort);
        tokio::task::spawn_blocking(move || {
            let mut store = store;
            coordinator::run_update(&manifest, &mut store, &opts, Some(&tx), Some(abort))
        })
        .await
        .map_err(|e| anyhow::anyhow!("update task join: {}", e))??
    };
    drop(progress_tx);
    let _ = progress_handle.await;

    println!(
        "{} updated, {} unchanged, {} failed ({} bytes transferred)",
        summary.updated(),
        summary.unchanged(),
        summary.failed(),
        summary.total_bytes()
    );
    if !summary.is_success() {
        eprintln!("failed entries:");
        for (id, reason) in summary.failures() {
            eprintln!("  {}: {}", id, reason);
        }
        anyhow::bail!(
            "{} of {} entries failed",
            summary.failed(),
            summary.reports.len()
        );
    }
    Ok(())
}
