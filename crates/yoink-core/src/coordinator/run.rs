//! The update run: bounded fetch fan-out, serial compare/promote.

use anyhow::Result;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};

use crate::archive::ArchiveStore;
use crate::checksum;
use crate::fetch;
use crate::manifest::{Entry, Manifest};
use crate::namer;
use crate::retry::{run_with_retry, FetchError, RetryPolicy};
use crate::storage::StorageWriter;

use super::types::{EntryOutcome, EntryReport, ProgressEvent, RunSummary, UpdateOptions};

/// How a worker obtains the document URL for an entry.
#[derive(Clone)]
enum FetchTarget {
    Direct(String),
    /// Follow the portal redirect from `base_url` + encoded id.
    Resolve(String),
}

struct WorkItem {
    entry: Entry,
    target: FetchTarget,
    scratch: PathBuf,
}

/// Payload handed from a fetch worker to the promote loop. The writer holds
/// the verified temp file; promote finalizes it with an atomic rename.
struct FetchedDoc {
    writer: StorageWriter,
    bytes: u64,
    fingerprint: String,
}

/// Changed document waiting for the promote phase.
struct PendingPromote {
    entry: Entry,
    doc: FetchedDoc,
    name: String,
}

/// Runs one update pass over the manifest.
///
/// Fetches run on `opts.jobs` worker threads pulling from a shared queue.
/// All archive decisions happen on the calling thread: `unchanged` and
/// fetch failures are settled as results arrive, while changed documents
/// are held back until every fetch has finished so that destination-name
/// collisions fail every affected entry instead of letting the first one
/// win. Promotes are therefore serialized per identifier by construction.
///
/// Completed entries emit best-effort `ProgressEvent`s (`try_send`, never
/// blocking). A set `abort` flag stops workers from pulling further
/// entries; entries never started report `failed(cancelled)`. Temp files
/// never reach the archive without passing through promote's rename.
pub fn run_update(
    manifest: &Manifest,
    store: &mut ArchiveStore,
    opts: &UpdateOptions,
    progress_tx: Option<&tokio::sync::mpsc::Sender<ProgressEvent>>,
    abort: Option<Arc<AtomicBool>>,
) -> Result<RunSummary> {
    let total = manifest.entries.len();
    let mut queue: VecDeque<WorkItem> = VecDeque::with_capacity(total);
    for entry in &manifest.entries {
        let target = match (&entry.url, &manifest.base_url) {
            (Some(u), _) => FetchTarget::Direct(u.clone()),
            (None, Some(base)) => FetchTarget::Resolve(base.clone()),
            (None, None) => {
                anyhow::bail!(
                    "entry {:?} has no url and the manifest has no base_url",
                    entry.id
                )
            }
        };
        queue.push_back(WorkItem {
            scratch: store.scratch_path(&entry.id),
            entry: entry.clone(),
            target,
        });
    }

    let work = Arc::new(Mutex::new(queue));
    let (tx, rx) = mpsc::channel::<(Entry, Result<FetchedDoc, FetchError>)>();

    let num_workers = opts.jobs.max(1).min(total.max(1));
    let mut handles = Vec::with_capacity(num_workers);
    for _ in 0..num_workers {
        let work = Arc::clone(&work);
        let tx = tx.clone();
        let fetch_opts = opts.fetch;
        let policy = opts.retry;
        let abort = abort.clone();
        handles.push(std::thread::spawn(move || loop {
            if abort.as_ref().is_some_and(|a| a.load(Ordering::Relaxed)) {
                break;
            }
            let Some(item) = work.lock().unwrap().pop_front() else {
                break;
            };
            let res = fetch_one(&item, fetch_opts, &policy);
            let _ = tx.send((item.entry, res));
        }));
    }
    drop(tx);

    let mut progress = Progress {
        tx: progress_tx,
        finished: 0,
        total,
    };
    let mut summary = RunSummary::default();
    let mut pending: Vec<PendingPromote> = Vec::new();

    for (entry, res) in rx {
        let doc = match res {
            Ok(doc) => doc,
            Err(e) => {
                match &e {
                    FetchError::Storage(io) => {
                        tracing::error!(id = %entry.id, "fetch failed on disk I/O: {}", io)
                    }
                    _ => tracing::warn!(id = %entry.id, "fetch failed: {}", e),
                }
                let report = EntryReport {
                    id: entry.id.clone(),
                    outcome: EntryOutcome::Failed(e.to_string()),
                    bytes: 0,
                };
                progress.emit(&report);
                summary.reports.push(report);
                continue;
            }
        };

        if let Some((current_fp, _)) = store.read_current(&entry.id) {
            if current_fp == doc.fingerprint {
                let _ = std::fs::remove_file(doc.writer.temp_path());
                tracing::debug!(id = %entry.id, "up to date");
                let report = EntryReport {
                    id: entry.id.clone(),
                    outcome: EntryOutcome::Unchanged,
                    bytes: doc.bytes,
                };
                progress.emit(&report);
                summary.reports.push(report);
                continue;
            }
        }

        let name = namer::destination_name(&entry, opts.naming, doc.writer.temp_path());
        pending.push(PendingPromote { entry, doc, name });
    }

    for h in handles {
        h.join()
            .unwrap_or_else(|e| panic!("fetch worker panicked: {:?}", e));
    }

    promote_pending(store, pending, &mut summary, &mut progress);

    // Entries the workers never pulled (abort) are reported, not dropped.
    for item in work.lock().unwrap().drain(..) {
        summary.reports.push(EntryReport {
            id: item.entry.id,
            outcome: EntryOutcome::Failed("cancelled".to_string()),
            bytes: 0,
        });
    }

    tracing::info!(
        unchanged = summary.unchanged(),
        updated = summary.updated(),
        failed = summary.failed(),
        bytes = summary.total_bytes(),
        "update run finished"
    );
    Ok(summary)
}

/// Promote all changed documents, failing every entry involved in a
/// destination-name collision so nothing is overwritten silently.
fn promote_pending(
    store: &mut ArchiveStore,
    pending: Vec<PendingPromote>,
    summary: &mut RunSummary,
    progress: &mut Progress<'_>,
) {
    let mut name_counts: HashMap<String, usize> = HashMap::new();
    for p in &pending {
        *name_counts.entry(p.name.clone()).or_default() += 1;
    }

    for p in pending {
        let PendingPromote { entry, doc, name } = p;
        let FetchedDoc {
            writer,
            bytes,
            fingerprint,
        } = doc;

        let conflict = if name_counts[&name] > 1 {
            Some(format!(
                "naming conflict: {} entries resolve to {:?}",
                name_counts[&name], name
            ))
        } else {
            match store.owner_of_name(&name) {
                Some(owner) if owner != entry.id => Some(format!(
                    "naming conflict: {:?} already names entry {:?}",
                    name, owner
                )),
                _ => None,
            }
        };
        if let Some(reason) = conflict {
            let _ = std::fs::remove_file(writer.temp_path());
            tracing::warn!(id = %entry.id, "{}", reason);
            let report = EntryReport {
                id: entry.id.clone(),
                outcome: EntryOutcome::Failed(reason),
                bytes,
            };
            progress.emit(&report);
            summary.reports.push(report);
            continue;
        }

        let temp = writer.temp_path().to_path_buf();
        let report = match store.promote(&entry.id, writer, &fingerprint, &name) {
            Ok(path) => {
                tracing::info!(id = %entry.id, path = %path.display(), "updated");
                EntryReport {
                    id: entry.id.clone(),
                    outcome: EntryOutcome::Updated,
                    bytes,
                }
            }
            Err(e) => {
                let _ = std::fs::remove_file(&temp);
                tracing::error!(id = %entry.id, "promote failed: {:#}", e);
                EntryReport {
                    id: entry.id.clone(),
                    outcome: EntryOutcome::Failed(format!("{:#}", e)),
                    bytes,
                }
            }
        };
        progress.emit(&report);
        summary.reports.push(report);
    }
}

/// Completion-event emitter; dropping events is fine, blocking is not.
struct Progress<'a> {
    tx: Option<&'a tokio::sync::mpsc::Sender<ProgressEvent>>,
    finished: usize,
    total: usize,
}

impl Progress<'_> {
    fn emit(&mut self, report: &EntryReport) {
        self.finished += 1;
        if let Some(tx) = self.tx {
            let _ = tx.try_send(ProgressEvent {
                id: report.id.clone(),
                bytes: report.bytes,
                outcome: report.outcome.clone(),
                finished: self.finished,
                total: self.total,
            });
        }
    }
}

/// One entry's fetch attempt chain: resolve (if needed), stream to the
/// scratch file, fingerprint. Retryable failures go through the backoff
/// policy; the scratch file is removed on final failure.
fn fetch_one(
    item: &WorkItem,
    fetch_opts: fetch::FetchOptions,
    policy: &RetryPolicy,
) -> Result<FetchedDoc, FetchError> {
    let result = run_with_retry(policy, || {
        let url = match &item.target {
            FetchTarget::Direct(u) => u.clone(),
            FetchTarget::Resolve(base) => {
                fetch::resolve_document_url(base, &item.entry.id, fetch_opts)?
            }
        };
        tracing::debug!(id = %item.entry.id, url = %url, "fetching");
        let writer = StorageWriter::create(&item.scratch).map_err(storage_err)?;
        let bytes = fetch::download_to(&url, &writer, fetch_opts)?;
        writer.sync().map_err(storage_err)?;
        Ok((writer, bytes))
    });

    match result {
        Ok((writer, bytes)) => match checksum::sha256_path(writer.temp_path()) {
            Ok(fingerprint) => Ok(FetchedDoc {
                writer,
                bytes,
                fingerprint,
            }),
            Err(e) => {
                let _ = std::fs::remove_file(writer.temp_path());
                Err(storage_err(e))
            }
        },
        Err(e) => {
            let _ = std::fs::remove_file(&item.scratch);
            Err(e)
        }
    }
}

fn storage_err(e: anyhow::Error) -> FetchError {
    FetchError::Storage(std::io::Error::other(format!("{:#}", e)))
}
