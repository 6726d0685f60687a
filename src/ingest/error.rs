//! File-level errors of the ingest pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that end or degrade processing of a whole file.
///
/// Record-level problems are not errors here; they are tallied as
/// [`RecordOutcome`](super::RecordOutcome)s.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error decoding JSON from {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{} does not contain a list of contacts (found {found})", path.display())]
    Shape { path: PathBuf, found: &'static str },

    #[error("cannot delete {}: {source}", path.display())]
    Delete {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot move {} into dead-letter directory {}: {source}", path.display(), dir.display())]
    DeadLetter {
        path: PathBuf,
        dir: PathBuf,
        source: std::io::Error,
    },
}

impl IngestError {
    /// Whether the file content itself was rejected (as opposed to an I/O failure).
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Shape { .. })
    }
}

pub type IngestResult<T> = Result<T, IngestError>;
