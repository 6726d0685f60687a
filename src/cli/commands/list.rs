//! List command - show stored contacts as a table.

use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};

use crate::config::Settings;
use crate::store::{ContactFilter, StoredContact};

/// Arguments for the list command.
pub struct ListArgs {
    pub name: Option<String>,
    pub email: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

/// Run the list command.
pub fn run(args: ListArgs, settings: &Settings) -> anyhow::Result<()> {
    let store = super::open_configured_store(settings)?;

    let filter = ContactFilter {
        name: args.name,
        email: args.email,
        limit: Some(args.limit),
        offset: args.offset,
    };
    let contacts = store.list(&filter)?;
    let total = store.count()?;

    if contacts.is_empty() {
        println!("No contacts found ({total} stored).");
        return Ok(());
    }

    println!("{}", render_table(&contacts));
    println!(
        "Showing {} of {total} stored contact(s) from {} store.",
        contacts.len(),
        store.backend()
    );
    Ok(())
}

fn render_table(contacts: &[StoredContact]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Name", "Email", "Phone", "Source", "Stored"]);

    for stored in contacts {
        table.add_row(vec![
            stored.id.to_string(),
            stored.contact.name.clone(),
            stored.contact.email.clone(),
            stored.contact.phone.clone(),
            stored.source.clone().unwrap_or_default(),
            stored.stored_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }
    table
}
