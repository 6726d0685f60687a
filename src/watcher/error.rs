//! Error types for the watch loop.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Watch target {path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Cannot scan {path}: {source}")]
    ScanFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Worker stopped abnormally: {reason}")]
    WorkerFailed { reason: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
