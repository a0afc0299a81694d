//! Update coordinator.
//!
//! Fans manifest entries out across a bounded worker pool of fetch threads,
//! then applies compare/promote decisions serially against the archive
//! store: unchanged fingerprints are discarded, changed ones are promoted
//! with the prior version demoted into history.

mod run;
mod types;

pub use run::run_update;
pub use types::{EntryOutcome, EntryReport, ProgressEvent, RunSummary, UpdateOptions};
