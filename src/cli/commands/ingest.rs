//! Ingest command - process named files once, without watching.

use std::path::PathBuf;

use crate::config::Settings;
use crate::ingest::{IngestError, RecordTally};

/// Process each file in order and print a per-file line plus totals.
///
/// Files that cannot be opened are reported and skipped; the command fails
/// only if none of the files could be processed.
pub fn run(files: &[PathBuf], settings: &Settings) -> anyhow::Result<()> {
    let processor = super::build_processor(settings)?;

    let mut totals = RecordTally::default();
    let mut unreadable = 0usize;

    for path in files {
        match processor.process(path) {
            Ok(report) => {
                let status = match &report.rejection {
                    Some(IngestError::Parse { .. }) => "not valid JSON",
                    Some(_) => "not an array of records",
                    None => "ok",
                };
                println!(
                    "{}: {status} ({} inserted, {} duplicate, {} invalid, {} failed)",
                    path.display(),
                    report.records.inserted,
                    report.records.duplicates,
                    report.records.invalid,
                    report.records.failed
                );
                totals.absorb(&report.records);
            }
            Err(e) => {
                eprintln!("{e}");
                unreadable += 1;
            }
        }
    }

    println!(
        "Total: {} records, {} inserted, {} duplicate, {} invalid, {} failed",
        totals.total(),
        totals.inserted,
        totals.duplicates,
        totals.invalid,
        totals.failed
    );

    if unreadable == files.len() {
        anyhow::bail!("none of the {} file(s) could be read", files.len());
    }
    Ok(())
}
