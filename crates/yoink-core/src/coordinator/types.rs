//! Outcome and progress types for an update run.

use crate::fetch::FetchOptions;
use crate::namer::NamingMode;
use crate::retry::RetryPolicy;

/// Per-entry result of an update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// Remote content matches the archived fingerprint; nothing touched.
    Unchanged,
    /// A new version was promoted into the archive.
    Updated,
    /// The entry could not be updated; the reason is human-readable.
    Failed(String),
}

impl EntryOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            EntryOutcome::Unchanged => "unchanged",
            EntryOutcome::Updated => "updated",
            EntryOutcome::Failed(_) => "failed",
        }
    }
}

/// Outcome plus transfer accounting for one entry.
#[derive(Debug, Clone)]
pub struct EntryReport {
    pub id: String,
    pub outcome: EntryOutcome,
    /// Bytes transferred for this entry (0 when the fetch never completed).
    pub bytes: u64,
}

/// Completion event emitted per entry for the progress display. Delivery is
/// best-effort (bounded non-blocking enqueue); the summary never depends on
/// these.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub id: String,
    pub bytes: u64,
    pub outcome: EntryOutcome,
    pub finished: usize,
    pub total: usize,
}

/// Aggregated result of a run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<EntryReport>,
}

impl RunSummary {
    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Unchanged))
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Updated))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, EntryOutcome::Failed(_)))
    }

    /// Failed entries with their reasons, in completion order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.reports.iter().filter_map(|r| match &r.outcome {
            EntryOutcome::Failed(reason) => Some((r.id.as_str(), reason.as_str())),
            _ => None,
        })
    }

    /// True when every entry came back `unchanged` or `updated`.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    pub fn total_bytes(&self) -> u64 {
        self.reports.iter().map(|r| r.bytes).sum()
    }

    fn count(&self, pred: impl Fn(&EntryOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Knobs for one update run, built once at startup and passed down.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Number of concurrent fetch workers.
    pub jobs: usize,
    pub naming: NamingMode,
    pub fetch: FetchOptions,
    pub retry: RetryPolicy,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            jobs: 4,
            naming: NamingMode::default(),
            fetch: FetchOptions::default(),
            retry: RetryPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(id: &str, outcome: EntryOutcome) -> EntryReport {
        EntryReport {
            id: id.to_string(),
            outcome,
            bytes: 10,
        }
    }

    #[test]
    fn summary_counts() {
        let summary = RunSummary {
            reports: vec![
                report("a", EntryOutcome::Unchanged),
                report("b", EntryOutcome::Updated),
                report("c", EntryOutcome::Failed("HTTP 404".into())),
            ],
        };
        assert_eq!(summary.unchanged(), 1);
        assert_eq!(summary.updated(), 1);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.is_success());
        assert_eq!(summary.total_bytes(), 30);

        let failures: Vec<_> = summary.failures().collect();
        assert_eq!(failures, vec![("c", "HTTP 404")]);
    }

    #[test]
    fn empty_summary_is_success() {
        assert!(RunSummary::default().is_success());
    }
}
