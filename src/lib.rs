pub mod cli;
pub mod config;
pub mod contact;
pub mod ingest;
pub mod logging;
pub mod store;
pub mod watcher;

pub use config::Settings;
pub use contact::{Contact, ContactId, ValidationError};
pub use ingest::{FileProcessor, FileReport, IngestError};
pub use store::{ContactFilter, ContactStore, StoreError, open_store};
pub use watcher::{WatchError, WatchLoop, WatchSummary};
