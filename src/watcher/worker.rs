//! Single consumer of the file-arrival queue.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::ingest::{FileProcessor, FileReport, RecordTally};

/// A file that showed up in the watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArrived {
    pub path: PathBuf,
}

/// Totals accumulated by the worker over its lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchSummary {
    /// Files that were opened and reached cleanup.
    pub files_processed: usize,
    /// Processed files whose content was not a JSON array of records.
    pub files_rejected: usize,
    /// Files that could not be opened or whose processing panicked.
    pub files_failed: usize,
    /// Processed files left in place because disposal failed.
    pub files_retained: usize,
    pub records: RecordTally,
}

impl WatchSummary {
    fn add_report(&mut self, report: &FileReport) {
        self.files_processed += 1;
        if report.rejection.is_some() {
            self.files_rejected += 1;
        }
        if !report.file_removed() {
            self.files_retained += 1;
        }
        self.records.absorb(&report.records);
    }
}

/// Process arrivals one at a time until the queue closes.
///
/// Each file runs on the blocking pool and is awaited before the next task
/// is taken, so files are handled strictly in arrival order.
pub(crate) async fn run(
    processor: Arc<FileProcessor>,
    mut tasks: mpsc::Receiver<FileArrived>,
) -> WatchSummary {
    let mut summary = WatchSummary::default();

    while let Some(FileArrived { path }) = tasks.recv().await {
        crate::log_event!("watcher", "new file detected", "{}", path.display());

        let job = processor.clone();
        let job_path = path.clone();
        match tokio::task::spawn_blocking(move || job.process(&job_path)).await {
            Ok(Ok(report)) => summary.add_report(&report),
            Ok(Err(e)) => {
                tracing::error!("[ingest] {e}");
                summary.files_failed += 1;
            }
            Err(e) => {
                tracing::error!("[watcher] processing {} aborted: {e}", path.display());
                summary.files_failed += 1;
            }
        }
    }

    crate::debug_event!("watcher", "worker drained");
    summary
}
