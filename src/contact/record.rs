use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Store-assigned identifier of a persisted contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContactId(NonZeroU64);

impl ContactId {
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn value(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A contact record that passed validation.
///
/// Fields outside the fixed schema are kept in `extra` and written back out
/// flattened next to the known ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Contact {
    pub fn new(name: impl Into<String>, email: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            extra: Map::new(),
        }
    }

    /// Deduplication key for this contact's email.
    pub fn email_key(&self) -> String {
        email_key(&self.email)
    }
}

/// Canonical form of an email used for uniqueness: trimmed and lowercased.
pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_key_trims_and_lowercases() {
        assert_eq!(email_key("  Jane@Example.COM "), "jane@example.com");
    }

    #[test]
    fn test_contact_id_rejects_zero() {
        assert!(ContactId::new(0).is_none());
        assert_eq!(ContactId::new(7).map(|id| id.value()), Some(7));
    }

    #[test]
    fn test_extra_fields_flatten() {
        let mut contact = Contact::new("Jane", "jane@x.com", "+1-555-123-4567");
        contact
            .extra
            .insert("company".to_string(), Value::String("Acme".to_string()));

        let json = serde_json::to_value(&contact).unwrap();
        assert_eq!(json["company"], "Acme");
        assert_eq!(json["email"], "jane@x.com");
    }
}
