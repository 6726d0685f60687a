//! Directory watcher that turns new files into ingest work.
//!
//! # Architecture
//!
//! ```text
//! notify::RecommendedWatcher (non-recursive, one directory)
//!         |  raw events
//!     WatchLoop  -- filters creates / renames-in
//!         |  FileArrived (bounded queue)
//!       worker   -- one file at a time, on the blocking pool
//!         |
//!   FileProcessor -> ContactStore
//! ```

mod error;
mod watch_loop;
mod worker;

pub use error::WatchError;
pub use watch_loop::{WatchLoop, WatchLoopBuilder};
pub use worker::{FileArrived, WatchSummary};
