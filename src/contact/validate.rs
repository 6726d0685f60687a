//! Schema validation for incoming contact records.
//!
//! Checks run in a fixed order and stop at the first violation:
//! object shape, `name`, `email`, `phone`. Unknown fields are allowed.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use super::record::Contact;

/// Upper bound on an address, per RFC 5321 path limits.
const MAX_EMAIL_LEN: usize = 254;

/// WHATWG "valid e-mail address" production.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"#,
    )
    .expect("email pattern compiles")
});

/// First schema violation found in a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("record must be an object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("'{field}' is a required property")]
    MissingField { field: &'static str },

    #[error("'{field}' must be a string, found {found}")]
    WrongType {
        field: &'static str,
        found: &'static str,
    },

    #[error("'{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("'{email}' is not a valid email address")]
    InvalidEmail { email: String },
}

pub type ValidationResult = Result<Contact, ValidationError>;

/// Validate one record and extract it as a [`Contact`].
pub fn validate(record: &Value) -> ValidationResult {
    let Value::Object(fields) = record else {
        return Err(ValidationError::NotAnObject {
            found: json_type(record),
        });
    };

    let name = required_string(fields, "name")?;
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "name" });
    }

    let email = required_string(fields, "email")?;
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail {
            email: email.to_string(),
        });
    }

    let phone = required_string(fields, "phone")?;

    let extra = fields
        .iter()
        .filter(|(key, _)| !matches!(key.as_str(), "name" | "email" | "phone"))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    Ok(Contact {
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        extra,
    })
}

/// Check an address against the email grammar.
pub fn is_valid_email(email: &str) -> bool {
    email.len() <= MAX_EMAIL_LEN && EMAIL_PATTERN.is_match(email)
}

fn required_string<'a>(
    fields: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match fields.get(field) {
        None => Err(ValidationError::MissingField { field }),
        Some(Value::String(value)) => Ok(value),
        Some(other) => Err(ValidationError::WrongType {
            field,
            found: json_type(other),
        }),
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
