//! Show command - display one stored contact.

use anyhow::bail;
use comfy_table::{Table, presets::UTF8_FULL};

use crate::config::Settings;
use crate::contact::ContactId;
use crate::store::StoredContact;

/// Run the show command. Fails when no contact has that id.
pub fn run(id: u64, settings: &Settings) -> anyhow::Result<()> {
    let Some(contact_id) = ContactId::new(id) else {
        bail!("contact {id} not found");
    };

    let store = super::open_configured_store(settings)?;
    match store.get(contact_id)? {
        Some(stored) => {
            println!("{}", render_contact(&stored));
            Ok(())
        }
        None => bail!("contact {id} not found"),
    }
}

fn render_contact(stored: &StoredContact) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Field", "Value"]);

    table.add_row(vec!["id".to_string(), stored.id.to_string()]);
    table.add_row(vec!["name".to_string(), stored.contact.name.clone()]);
    table.add_row(vec!["email".to_string(), stored.contact.email.clone()]);
    table.add_row(vec!["phone".to_string(), stored.contact.phone.clone()]);
    for (key, value) in &stored.contact.extra {
        let value = match value {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        table.add_row(vec![key.clone(), value]);
    }
    table.add_row(vec![
        "source".to_string(),
        stored.source.clone().unwrap_or_default(),
    ]);
    table.add_row(vec!["stored_at".to_string(), stored.stored_at.to_rfc3339()]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Contact;
    use chrono::Utc;

    #[test]
    fn test_renders_extra_fields() {
        let mut contact = Contact::new("Ada", "ada@example.com", "+1-555-123-4567");
        contact
            .extra
            .insert("company".to_string(), serde_json::json!("Analytical"));
        contact.extra.insert("age".to_string(), serde_json::json!(36));

        let rendered = render_contact(&StoredContact {
            id: ContactId::new(1).unwrap(),
            contact,
            source: None,
            stored_at: Utc::now(),
        })
        .to_string();

        assert!(rendered.contains("ada@example.com"));
        assert!(rendered.contains("Analytical"));
        assert!(rendered.contains("36"));
    }
}
