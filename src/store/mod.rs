//! Deduplicating contact storage.
//!
//! [`ContactStore`] is the seam the ingest pipeline talks to: an exact-match
//! lookup on the email key plus insert. Two backends are provided:
//! - [`MemoryContactStore`] for tests and throwaway runs
//! - [`SqliteContactStore`] for durable storage
//!
//! Both enforce at most one stored contact per email key (see
//! [`crate::contact::email_key`]).

mod error;
mod memory;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryContactStore;
pub use sqlite::SqliteContactStore;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{StoreBackend, StoreConfig};
use crate::contact::{Contact, ContactId};

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A contact as persisted, with storage metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredContact {
    pub id: ContactId,
    pub contact: Contact,
    /// File name the record was ingested from, when known.
    pub source: Option<String>,
    pub stored_at: DateTime<Utc>,
}

/// Listing filter. Name and email match as case-insensitive substrings.
#[derive(Debug, Clone)]
pub struct ContactFilter {
    pub name: Option<String>,
    pub email: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Default for ContactFilter {
    fn default() -> Self {
        Self {
            name: None,
            email: None,
            limit: Some(DEFAULT_PAGE_SIZE),
            offset: 0,
        }
    }
}

impl ContactFilter {
    /// Filter matching every contact, without paging.
    pub fn all() -> Self {
        Self {
            limit: None,
            ..Self::default()
        }
    }

    pub(crate) fn matches(&self, contact: &Contact) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            needle
                .as_ref()
                .is_none_or(|n| haystack.to_lowercase().contains(&n.to_lowercase()))
        }

        contains(&contact.name, &self.name) && contains(&contact.email, &self.email)
    }
}

/// Keyed contact storage used for deduplication.
///
/// Implementations must be safe to share between threads; the pipeline holds
/// them as `Arc<dyn ContactStore>`.
pub trait ContactStore: Send + Sync {
    /// Backend name for logging.
    fn backend(&self) -> &'static str;

    /// Whether a contact with the same email key is already stored.
    ///
    /// Reflects every successful [`insert`](Self::insert) made before the call.
    fn exists_by_email(&self, email: &str) -> StoreResult<bool>;

    /// Persist a contact.
    ///
    /// Returns [`StoreError::DuplicateEmail`] when the email key is taken.
    fn insert(&self, contact: &Contact, source: Option<&str>) -> StoreResult<ContactId>;

    /// The contact stored under `id`, if any.
    fn get(&self, id: ContactId) -> StoreResult<Option<StoredContact>>;

    /// Stored contacts in insertion order.
    fn list(&self, filter: &ContactFilter) -> StoreResult<Vec<StoredContact>>;

    /// Number of stored contacts.
    fn count(&self) -> StoreResult<usize>;
}

/// Open the store described by `config`.
pub fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn ContactStore>> {
    let store: Arc<dyn ContactStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryContactStore::new()),
        StoreBackend::Sqlite => Arc::new(SqliteContactStore::open(&config.path)?),
    };
    crate::debug_event!("store", "opened", "{}", store.backend());
    Ok(store)
}
