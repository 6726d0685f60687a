//! Per-file ingestion.
//!
//! A file moves through `open -> parse -> records -> cleanup -> done`.
//! Open failures end processing with nothing to clean up. Parse and shape
//! failures skip the record loop but still reach cleanup, so the file is
//! removed (or dead-lettered) whatever happened to its contents.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use super::error::{IngestError, IngestResult};
use crate::contact::{ContactId, ValidationError, json_type, normalize_phone, validate};
use crate::store::{ContactStore, StoreError};

/// What happened to a single record.
#[derive(Debug)]
pub enum RecordOutcome {
    Inserted(ContactId),
    Duplicate,
    Invalid(ValidationError),
    Failed(StoreError),
}

/// Per-file record counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecordTally {
    pub inserted: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub failed: usize,
}

impl RecordTally {
    pub fn total(&self) -> usize {
        self.inserted + self.duplicates + self.invalid + self.failed
    }

    pub fn record(&mut self, outcome: &RecordOutcome) {
        match outcome {
            RecordOutcome::Inserted(_) => self.inserted += 1,
            RecordOutcome::Duplicate => self.duplicates += 1,
            RecordOutcome::Invalid(_) => self.invalid += 1,
            RecordOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn absorb(&mut self, other: &RecordTally) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.invalid += other.invalid;
        self.failed += other.failed;
    }
}

/// How the source file was disposed of.
#[derive(Debug)]
pub enum Disposal {
    Deleted,
    DeadLettered(PathBuf),
    /// Disposal failed; the file is still in place.
    Failed(IngestError),
}

/// Result of processing one file.
#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    /// Parse or shape failure that skipped the record loop.
    pub rejection: Option<IngestError>,
    pub records: RecordTally,
    pub disposal: Disposal,
}

impl FileReport {
    /// Whether the file left the watched directory.
    pub fn file_removed(&self) -> bool {
        !matches!(self.disposal, Disposal::Failed(_))
    }
}

/// Reads contact files and feeds their records into a [`ContactStore`].
pub struct FileProcessor {
    store: Arc<dyn ContactStore>,
    dead_letter_dir: Option<PathBuf>,
}

impl FileProcessor {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self {
            store,
            dead_letter_dir: None,
        }
    }

    /// Move unparseable files into `dir` instead of deleting them.
    pub fn with_dead_letter_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dead_letter_dir = Some(dir.into());
        self
    }

    pub fn store(&self) -> &Arc<dyn ContactStore> {
        &self.store
    }

    /// Process one contact file end to end.
    ///
    /// Only an open failure is returned as `Err`; everything after that is
    /// reported in the [`FileReport`].
    pub fn process(&self, path: &Path) -> IngestResult<FileReport> {
        let file = File::open(path).map_err(|source| IngestError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        crate::debug_event!("ingest", "opened", "{}", path.display());

        let source = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        let mut records = RecordTally::default();

        let rejection = match parse_records(path, file) {
            Ok(values) => {
                crate::debug_event!("ingest", "parsed", "{} records", values.len());
                for (index, value) in values.iter().enumerate() {
                    let outcome = self.process_record(value, source.as_deref());
                    log_outcome(path, index, &outcome);
                    records.record(&outcome);
                }
                None
            }
            Err(e) => {
                tracing::error!("[ingest] {e}");
                Some(e)
            }
        };

        let disposal = self.dispose(path, rejection.is_some());
        match &disposal {
            Disposal::Deleted => {}
            Disposal::DeadLettered(target) => {
                tracing::warn!(
                    "[ingest] moved {} to {}",
                    path.display(),
                    target.display()
                );
            }
            Disposal::Failed(e) => tracing::error!("[ingest] {e}"),
        }

        crate::log_event!(
            "ingest",
            "processed and cleaned up",
            "{} (inserted={} duplicates={} invalid={} failed={})",
            path.display(),
            records.inserted,
            records.duplicates,
            records.invalid,
            records.failed
        );

        Ok(FileReport {
            path: path.to_path_buf(),
            rejection,
            records,
            disposal,
        })
    }

    /// Validate, normalize, deduplicate and store one record.
    pub fn process_record(&self, record: &Value, source: Option<&str>) -> RecordOutcome {
        let mut contact = match validate(record) {
            Ok(contact) => contact,
            Err(e) => return RecordOutcome::Invalid(e),
        };
        contact.phone = normalize_phone(&contact.phone);

        match self.store.exists_by_email(&contact.email) {
            Ok(true) => return RecordOutcome::Duplicate,
            Ok(false) => {}
            Err(e) => return RecordOutcome::Failed(e),
        }

        match self.store.insert(&contact, source) {
            Ok(id) => RecordOutcome::Inserted(id),
            // Lost a race with another writer between lookup and insert
            Err(StoreError::DuplicateEmail { .. }) => RecordOutcome::Duplicate,
            Err(e) => RecordOutcome::Failed(e),
        }
    }

    fn dispose(&self, path: &Path, rejected: bool) -> Disposal {
        let result = match (&self.dead_letter_dir, rejected) {
            (Some(dir), true) => dead_letter(path, dir).map(Disposal::DeadLettered),
            _ => fs::remove_file(path)
                .map(|()| Disposal::Deleted)
                .map_err(|source| IngestError::Delete {
                    path: path.to_path_buf(),
                    source,
                }),
        };
        result.unwrap_or_else(Disposal::Failed)
    }
}

fn parse_records(path: &Path, file: File) -> IngestResult<Vec<Value>> {
    let value: Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| IngestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    match value {
        Value::Array(values) => Ok(values),
        other => Err(IngestError::Shape {
            path: path.to_path_buf(),
            found: json_type(&other),
        }),
    }
}

fn log_outcome(path: &Path, index: usize, outcome: &RecordOutcome) {
    match outcome {
        RecordOutcome::Inserted(id) => {
            crate::log_event!("ingest", "inserted", "record {index} of {} as #{id}", path.display())
        }
        RecordOutcome::Duplicate => tracing::warn!(
            "[ingest] duplicate email in record {index} of {}, skipping",
            path.display()
        ),
        RecordOutcome::Invalid(e) => tracing::warn!(
            "[ingest] validation error for record {index} of {}: {e}",
            path.display()
        ),
        RecordOutcome::Failed(e) => tracing::error!(
            "[ingest] storage error for record {index} of {}: {e}",
            path.display()
        ),
    }
}

/// Move `path` into `dir`, prefixed with a timestamp so names never collide.
fn dead_letter(path: &Path, dir: &Path) -> IngestResult<PathBuf> {
    let to_error = |source| IngestError::DeadLetter {
        path: path.to_path_buf(),
        dir: dir.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(to_error)?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.6fZ");
    let target = dir.join(format!("{stamp}-{file_name}"));

    if fs::rename(path, &target).is_err() {
        // rename fails across filesystems
        fs::copy(path, &target).map_err(to_error)?;
        fs::remove_file(path).map_err(to_error)?;
    }
    Ok(target)
}
