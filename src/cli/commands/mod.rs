//! Command implementations for the CLI.
//!
//! Each command is implemented in its own module.

pub mod ingest;
pub mod init;
pub mod list;
pub mod show;
pub mod watch;

use std::sync::Arc;

use anyhow::Context;

use crate::config::Settings;
use crate::ingest::FileProcessor;
use crate::store::{ContactStore, open_store};

/// Open the configured store, with its path resolved against the workspace.
pub(crate) fn open_configured_store(settings: &Settings) -> anyhow::Result<Arc<dyn ContactStore>> {
    let mut store_config = settings.store.clone();
    store_config.path = settings.resolve(&store_config.path);
    open_store(&store_config)
        .with_context(|| format!("opening contact store at {}", store_config.path.display()))
}

/// Build the file processor described by `settings`.
pub(crate) fn build_processor(settings: &Settings) -> anyhow::Result<FileProcessor> {
    let store = open_configured_store(settings)?;
    let processor = FileProcessor::new(store);
    Ok(match &settings.ingest.dead_letter_dir {
        Some(dir) => processor.with_dead_letter_dir(settings.resolve(dir)),
        None => processor,
    })
}
