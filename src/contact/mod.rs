//! Contact records: the typed record, phone normalization and validation.
//!
//! Records arrive as untyped JSON values. [`validate`] turns a value into a
//! [`Contact`] or reports the first schema violation, and
//! [`normalize_phone`] rewrites phone numbers into the canonical form.

mod normalize;
mod record;
mod validate;

pub use normalize::normalize_phone;
pub use record::{Contact, ContactId, email_key};
pub use validate::{ValidationError, ValidationResult, is_valid_email, validate};
pub(crate) use validate::json_type;
