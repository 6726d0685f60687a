//! Directory watch loop feeding the ingest worker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::WatchError;
use super::worker::{self, FileArrived, WatchSummary};
use crate::ingest::FileProcessor;

/// Capacity of the raw notify event channel.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Watches one directory (non-recursively) and hands every new file to a
/// single [`FileProcessor`] worker.
///
/// The notify subscription lives inside this struct; it is torn down when
/// [`run`](Self::run) returns.
pub struct WatchLoop {
    /// Directory being watched.
    directory: PathBuf,
    /// Shared processor run by the worker.
    processor: Arc<FileProcessor>,
    /// Channel for receiving raw file events.
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    /// The underlying file watcher.
    watcher: notify::RecommendedWatcher,
    /// Capacity of the file-arrival queue.
    queue_capacity: usize,
    /// Enqueue files already present before live events.
    scan_on_start: bool,
}

impl WatchLoop {
    /// Create a builder for configuring the loop.
    pub fn builder() -> WatchLoopBuilder {
        WatchLoopBuilder::new()
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// 1. Subscribes to the directory
    /// 2. Optionally enqueues files already present
    /// 3. Turns create events into [`FileArrived`] tasks for the worker
    /// 4. On shutdown, drops the subscription and lets the worker finish
    ///    what is already queued
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<WatchSummary, WatchError> {
        self.watcher
            .watch(&self.directory, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: self.directory.clone(),
                reason: e.to_string(),
            })?;

        // Subscribe first so nothing lands between the scan and the first event
        let existing = if self.scan_on_start {
            existing_files(&self.directory)?
        } else {
            Vec::new()
        };

        let (task_tx, task_rx) = mpsc::channel(self.queue_capacity);
        let worker = tokio::spawn(worker::run(self.processor.clone(), task_rx));

        crate::log_event!(
            "watcher",
            "started watching directory for new contact files",
            "{}",
            self.directory.display()
        );

        if !existing.is_empty() {
            crate::log_event!("watcher", "found existing files", "{}", existing.len());
        }
        for path in existing {
            if task_tx.send(FileArrived { path }).await.is_err() {
                break;
            }
        }

        'events: loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    crate::log_event!("watcher", "shutdown requested");
                    break;
                }

                res = self.event_rx.recv() => {
                    match res {
                        Some(Ok(event)) => {
                            for path in arrivals(&event) {
                                if task_tx.send(FileArrived { path }).await.is_err() {
                                    tracing::error!("[watcher] worker queue closed");
                                    break 'events;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::error!("[watcher] file watch error: {e}");
                        }
                        None => {
                            tracing::warn!("[watcher] event channel closed");
                            break;
                        }
                    }
                }
            }
        }

        if let Err(e) = self.watcher.unwatch(&self.directory) {
            crate::debug_event!("watcher", "unwatch failed", "{e}");
        }
        drop(self.watcher);

        // Events notify delivered before the unwatch still name files on disk
        let buffered = drain_buffered(&mut self.event_rx, &task_tx).await;
        if buffered > 0 {
            crate::log_event!("watcher", "queued buffered arrivals", "{buffered}");
        }
        drop(task_tx);

        let summary = worker.await.map_err(|e| WatchError::WorkerFailed {
            reason: e.to_string(),
        })?;

        crate::log_event!(
            "watcher",
            "stopped",
            "{} files processed, {} contacts inserted",
            summary.files_processed,
            summary.records.inserted
        );
        Ok(summary)
    }
}

/// Hand every already-buffered event's arrivals to the worker.
///
/// Returns how many files were queued.
async fn drain_buffered(
    event_rx: &mut mpsc::Receiver<notify::Result<Event>>,
    task_tx: &mpsc::Sender<FileArrived>,
) -> usize {
    let mut queued = 0;
    while let Ok(res) = event_rx.try_recv() {
        let Ok(event) = res else { continue };
        for path in arrivals(&event) {
            if task_tx.send(FileArrived { path }).await.is_err() {
                return queued;
            }
            queued += 1;
        }
    }
    queued
}

/// Paths in `event` that count as a newly arrived file.
///
/// Creations and renames into the directory qualify; directories never do.
fn arrivals(event: &Event) -> Vec<PathBuf> {
    match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event
            .paths
            .iter()
            .filter(|path| !path.is_dir())
            .cloned()
            .collect(),
        // Platforms that cannot tell rename sides apart report `Any`
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => event
            .paths
            .iter()
            .filter(|path| path.is_file())
            .cloned()
            .collect(),
        _ => {
            crate::debug_event!("watcher", "ignored", "{:?} {:?}", event.kind, event.paths);
            Vec::new()
        }
    }
}

/// Regular files in `dir`, sorted by name.
fn existing_files(dir: &Path) -> Result<Vec<PathBuf>, WatchError> {
    let to_error = |source| WatchError::ScanFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(to_error)? {
        let path = entry.map_err(to_error)?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Builder for constructing a [`WatchLoop`].
pub struct WatchLoopBuilder {
    directory: Option<PathBuf>,
    processor: Option<Arc<FileProcessor>>,
    queue_capacity: usize,
    scan_on_start: bool,
}

impl WatchLoopBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            directory: None,
            processor: None,
            queue_capacity: 100,
            scan_on_start: false,
        }
    }

    /// Set the directory to watch.
    pub fn directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.directory = Some(path.into());
        self
    }

    /// Set the processor the worker runs.
    pub fn processor(mut self, processor: Arc<FileProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Set the file-arrival queue capacity (minimum 1).
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Enqueue files already in the directory when the loop starts.
    pub fn scan_on_start(mut self, enabled: bool) -> Self {
        self.scan_on_start = enabled;
        self
    }

    /// Build the WatchLoop.
    pub fn build(self) -> Result<WatchLoop, WatchError> {
        let directory = self.directory.ok_or_else(|| WatchError::InitFailed {
            reason: "Directory is required".to_string(),
        })?;

        let processor = self.processor.ok_or_else(|| WatchError::InitFailed {
            reason: "Processor is required".to_string(),
        })?;

        if !directory.is_dir() {
            return Err(WatchError::NotADirectory { path: directory });
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        // Create the notify watcher
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        Ok(WatchLoop {
            directory,
            processor,
            event_rx: rx,
            watcher,
            queue_capacity: self.queue_capacity,
            scan_on_start: self.scan_on_start,
        })
    }
}

impl Default for WatchLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
