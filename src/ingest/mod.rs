//! The contact file ingestion pipeline.
//!
//! [`FileProcessor`] owns the per-file lifecycle: read, validate each
//! record, normalize, deduplicate against the store, insert, then remove the
//! file. Record-level failures never abort a file; file-level failures never
//! escape past cleanup.

mod error;
mod processor;

pub use error::{IngestError, IngestResult};
pub use processor::{Disposal, FileProcessor, FileReport, RecordOutcome, RecordTally};
