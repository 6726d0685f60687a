//! In-memory contact store.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use super::{ContactFilter, ContactStore, StoreError, StoreResult, StoredContact};
use crate::contact::{Contact, ContactId, email_key};

#[derive(Default)]
struct MemoryState {
    rows: Vec<StoredContact>,
    by_key: HashMap<String, ContactId>,
}

/// Contact store kept entirely in memory. Contents are lost on drop.
#[derive(Default)]
pub struct MemoryContactStore {
    state: RwLock<MemoryState>,
}

impl MemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContactStore for MemoryContactStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        Ok(self.state.read().by_key.contains_key(&email_key(email)))
    }

    fn insert(&self, contact: &Contact, source: Option<&str>) -> StoreResult<ContactId> {
        let key = contact.email_key();
        // Check and insert under one write lock
        let mut state = self.state.write();
        if state.by_key.contains_key(&key) {
            return Err(StoreError::DuplicateEmail {
                email: contact.email.clone(),
            });
        }

        let id = ContactId::new(state.rows.len() as u64 + 1)
            .ok_or_else(|| StoreError::InvalidData("contact id overflow".to_string()))?;
        state.rows.push(StoredContact {
            id,
            contact: contact.clone(),
            source: source.map(str::to_string),
            stored_at: Utc::now(),
        });
        state.by_key.insert(key, id);
        Ok(id)
    }

    fn get(&self, id: ContactId) -> StoreResult<Option<StoredContact>> {
        // Ids are dense and start at 1
        let index = usize::try_from(id.value() - 1).unwrap_or(usize::MAX);
        Ok(self.state.read().rows.get(index).cloned())
    }

    fn list(&self, filter: &ContactFilter) -> StoreResult<Vec<StoredContact>> {
        let state = self.state.read();
        Ok(state
            .rows
            .iter()
            .filter(|row| filter.matches(&row.contact))
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn count(&self) -> StoreResult<usize> {
        Ok(self.state.read().rows.len())
    }
}
