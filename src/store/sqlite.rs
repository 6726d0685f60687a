//! SQLite-backed contact store.
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - `email_key` is UNIQUE, so the one-contact-per-email rule holds even
//!   for writers outside this process.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OptionalExtension, Row, ffi, params};
use serde_json::{Map, Value};

use super::{ContactFilter, ContactStore, StoreError, StoreResult, StoredContact};
use crate::contact::{Contact, ContactId, email_key};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQL function applying Rust's Unicode lowercasing; SQLite's `lower()` only
/// folds ASCII.
const FOLD_CASE_FN: &str = "fold_case";

struct Migration {
    version: u32,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    sql: "CREATE TABLE contacts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            email_key TEXT NOT NULL UNIQUE,
            phone TEXT NOT NULL,
            extra TEXT NOT NULL DEFAULT '{}',
            source TEXT,
            stored_at TEXT NOT NULL
        );",
}];

const CONTACT_SELECT_SQL: &str = "SELECT id, name, email, phone, extra, source, stored_at FROM contacts";

/// Durable contact store in a single SQLite database file.
pub struct SqliteContactStore {
    conn: Mutex<Connection>,
}

impl SqliteContactStore {
    /// Open (or create) the database at `path` and apply pending migrations.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let started_at = Instant::now();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self::bootstrap(Connection::open(path)?)?;
        crate::log_event!(
            "store",
            "opened",
            "sqlite {} in {}ms",
            path.display(),
            started_at.elapsed().as_millis()
        );
        Ok(store)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(mut conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        register_functions(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Latest schema version known to this binary.
pub(crate) fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        FOLD_CASE_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text: Option<String> = ctx.get(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

fn apply_migrations(conn: &mut Connection) -> StoreResult<()> {
    let current: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let latest = latest_version();

    if current > latest {
        return Err(StoreError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        tx.execute_batch(migration.sql)?;
        tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))?;
    }
    tx.commit()?;

    crate::debug_event!("store", "migrated", "schema v{current} -> v{latest}");
    Ok(())
}

fn parse_row(row: &Row<'_>) -> rusqlite::Result<(i64, Contact, Option<String>, String)> {
    let extra: String = row.get(4)?;
    let extra: Map<String, Value> = serde_json::from_str(&extra).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let contact = Contact {
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        extra,
    };
    Ok((row.get(0)?, contact, row.get(5)?, row.get(6)?))
}

fn to_stored(
    (id, contact, source, stored_at): (i64, Contact, Option<String>, String),
) -> StoreResult<StoredContact> {
    let id = u64::try_from(id)
        .ok()
        .and_then(ContactId::new)
        .ok_or_else(|| StoreError::InvalidData(format!("contact id {id}")))?;
    let stored_at = DateTime::parse_from_rfc3339(&stored_at)
        .map_err(|e| StoreError::InvalidData(format!("stored_at '{stored_at}': {e}")))?
        .with_timezone(&Utc);

    Ok(StoredContact {
        id,
        contact,
        source,
        stored_at,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl ContactStore for SqliteContactStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn exists_by_email(&self, email: &str) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM contacts WHERE email_key = ?1);",
            params![email_key(email)],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn insert(&self, contact: &Contact, source: Option<&str>) -> StoreResult<ContactId> {
        let extra = serde_json::to_string(&contact.extra)?;
        let conn = self.conn.lock();

        let result = conn.execute(
            "INSERT INTO contacts (name, email, email_key, phone, extra, source, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                contact.name,
                contact.email,
                contact.email_key(),
                contact.phone,
                extra,
                source,
                Utc::now().to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {
                let rowid = conn.last_insert_rowid();
                u64::try_from(rowid)
                    .ok()
                    .and_then(ContactId::new)
                    .ok_or_else(|| StoreError::InvalidData(format!("rowid {rowid}")))
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateEmail {
                email: contact.email.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn get(&self, id: ContactId) -> StoreResult<Option<StoredContact>> {
        let id = i64::try_from(id.value())
            .map_err(|_| StoreError::InvalidData(format!("contact id {id}")))?;
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                &format!("{CONTACT_SELECT_SQL} WHERE id = ?1;"),
                params![id],
                parse_row,
            )
            .optional()?;
        row.map(to_stored).transpose()
    }

    fn list(&self, filter: &ContactFilter) -> StoreResult<Vec<StoredContact>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{CONTACT_SELECT_SQL}
             WHERE (?1 IS NULL OR instr({FOLD_CASE_FN}(name), ?1) > 0)
               AND (?2 IS NULL OR instr({FOLD_CASE_FN}(email), ?2) > 0)
             ORDER BY id
             LIMIT ?3 OFFSET ?4;"
        ))?;

        // Needles are folded here the same way the SQL function folds columns
        let name = filter.name.as_deref().map(str::to_lowercase);
        let email = filter.email.as_deref().map(str::to_lowercase);

        // SQLite treats a negative LIMIT as unbounded
        let limit = filter
            .limit
            .map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
        let offset = i64::try_from(filter.offset).unwrap_or(i64::MAX);

        let rows = stmt.query_map(
            params![name, email, limit, offset],
            parse_row,
        )?;

        rows.map(|row| to_stored(row?)).collect()
    }

    fn count(&self) -> StoreResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM contacts;", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_migrations_set_user_version() {
        let store = SqliteContactStore::open_in_memory().unwrap();
        let version: u32 = store
            .conn
            .lock()
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, latest_version());
    }

    #[test]
    fn test_rejects_newer_schema() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("contacts.db");
        {
            let conn = Connection::open(&db_path).unwrap();
            conn.execute_batch("PRAGMA user_version = 99;").unwrap();
        }

        match SqliteContactStore::open(&db_path) {
            Err(StoreError::UnsupportedSchemaVersion { db_version, .. }) => {
                assert_eq!(db_version, 99)
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("newer schema must be rejected"),
        }
    }

    #[test]
    fn test_insert_exists_and_unique_key() {
        let store = SqliteContactStore::open_in_memory().unwrap();
        let first = store
            .insert(&Contact::new("Jane", "Jane@X.com", "+1-555-123-4567"), Some("a.json"))
            .unwrap();
        assert_eq!(first.value(), 1);

        assert!(store.exists_by_email("jane@x.com").unwrap());
        assert!(!store.exists_by_email("john@x.com").unwrap());

        let err = store
            .insert(&Contact::new("Other", "jane@x.com ", "1"), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail { .. }));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_only_unique_constraint_counts_as_duplicate() {
        let store = SqliteContactStore::open_in_memory().unwrap();
        store.insert(&Contact::new("Jane", "jane@x.com", "1"), None).unwrap();
        let conn = store.conn.lock();

        let insert = "INSERT INTO contacts (name, email, email_key, phone, stored_at)
                      VALUES (?1, ?2, ?3, '1', '2024-01-01T00:00:00+00:00');";
        let unique = conn
            .execute(insert, params!["Other", "jane@x.com", "jane@x.com"])
            .unwrap_err();
        assert!(is_unique_violation(&unique));

        let not_null = conn
            .execute(insert, params![None::<String>, "new@x.com", "new@x.com"])
            .unwrap_err();
        assert!(!is_unique_violation(&not_null));
    }

    #[test]
    fn test_get_by_id() {
        let store = SqliteContactStore::open_in_memory().unwrap();
        let id = store
            .insert(&Contact::new("Jane", "jane@x.com", "1"), Some("a.json"))
            .unwrap();

        let found = store.get(id).unwrap().unwrap();
        assert_eq!(found.contact.email, "jane@x.com");
        assert_eq!(found.source.as_deref(), Some("a.json"));
        assert!(store.get(ContactId::new(42).unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_list_folds_non_ascii_case_like_memory_store() {
        let sqlite = SqliteContactStore::open_in_memory().unwrap();
        let memory = crate::store::MemoryContactStore::new();
        for store in [&sqlite as &dyn ContactStore, &memory as &dyn ContactStore] {
            store.insert(&Contact::new("ÉMILE Zola", "emile@x.fr", "1"), None).unwrap();
            store.insert(&Contact::new("Émilie", "emilie@x.fr", "2"), None).unwrap();
            store.insert(&Contact::new("Other", "other@x.fr", "3"), None).unwrap();
        }

        let filter = ContactFilter {
            name: Some("émil".to_string()),
            ..ContactFilter::all()
        };
        let names = |rows: Vec<StoredContact>| {
            rows.into_iter().map(|r| r.contact.name).collect::<Vec<_>>()
        };
        let from_sqlite = names(sqlite.list(&filter).unwrap());
        assert_eq!(from_sqlite, vec!["ÉMILE Zola", "Émilie"]);
        assert_eq!(from_sqlite, names(memory.list(&filter).unwrap()));
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested/contacts.db");

        {
            let store = SqliteContactStore::open(&db_path).unwrap();
            let mut contact = Contact::new("Jane", "jane@x.com", "+1-555-123-4567");
            contact
                .extra
                .insert("company".to_string(), Value::String("Acme".to_string()));
            store.insert(&contact, Some("batch-1.json")).unwrap();
        }

        let store = SqliteContactStore::open(&db_path).unwrap();
        assert!(store.exists_by_email("jane@x.com").unwrap());

        let rows = store.list(&ContactFilter::all()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].contact.extra["company"], "Acme");
        assert_eq!(rows[0].source.as_deref(), Some("batch-1.json"));
    }

    #[test]
    fn test_list_filters_case_insensitively() {
        let store = SqliteContactStore::open_in_memory().unwrap();
        store.insert(&Contact::new("Jane Doe", "jane@x.com", "1"), None).unwrap();
        store.insert(&Contact::new("John Roe", "john@y.org", "2"), None).unwrap();
        store.insert(&Contact::new("Janet", "janet@y.org", "3"), None).unwrap();

        let janes = store
            .list(&ContactFilter {
                name: Some("JAN".to_string()),
                ..ContactFilter::all()
            })
            .unwrap();
        assert_eq!(janes.len(), 2);
        assert_eq!(janes[0].contact.name, "Jane Doe");

        let org = store
            .list(&ContactFilter {
                email: Some("@y.org".to_string()),
                limit: Some(1),
                offset: 1,
                ..ContactFilter::default()
            })
            .unwrap();
        assert_eq!(org.len(), 1);
        assert_eq!(org[0].contact.name, "Janet");
    }
}
