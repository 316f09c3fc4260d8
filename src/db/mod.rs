use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::store::Store;

mod contacts;
mod feed;
mod schema;
mod tasks;
mod versions;

pub use schema::SCHEMA_VERSION;

const OWNER_SETTING_KEY: &str = "owner_id";

/// SQLite-backed implementation of every repository trait.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at `path`, creating it if needed, running migrations
    pub fn open_at(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let started_at = Instant::now();

        // Create parent directories
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let db = Self::bootstrap(conn)?;
        info!(
            "event=db_open module=db status=ok mode=file duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(db)
    }

    /// Open in-memory database for testing
    pub fn open_memory() -> CoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> CoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    fn migrate(&self) -> CoreResult<()> {
        let version = self.get_schema_version()?;
        if version >= SCHEMA_VERSION {
            return Ok(());
        }

        // Run every pending migration in one transaction for atomicity
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        if version < 1 {
            tx.execute_batch(schema::SCHEMA_V1)?;
        }
        if version < 2 {
            tx.execute_batch(schema::MIGRATION_V2)?;
        }
        tx.execute(
            "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
            [SCHEMA_VERSION],
        )?;
        tx.commit()?;

        info!(
            "event=db_migrate module=db status=ok from_version={} to_version={}",
            version, SCHEMA_VERSION
        );
        Ok(())
    }

    fn get_schema_version(&self) -> CoreResult<i32> {
        let result: Result<i32, _> =
            self.conn
                .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                    row.get(0)
                });

        match result {
            Ok(v) => Ok(v),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(rusqlite::Error::SqliteFailure(err, msg)) => {
                // "no such table" is error code 1 (SQLITE_ERROR)
                if err.code == rusqlite::ErrorCode::Unknown
                    && msg.as_ref().map_or(false, |m| m.contains("no such table"))
                {
                    Ok(0)
                } else {
                    Err(rusqlite::Error::SqliteFailure(err, msg).into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    // ==================== SETTINGS ====================

    pub fn get_setting(&self, key: &str) -> CoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> CoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO app_settings (key, value) VALUES (?, ?)",
            [key, value],
        )?;
        Ok(())
    }

    /// Owner id used by the local CLI; created on first use.
    pub fn local_owner_id(&self) -> CoreResult<Uuid> {
        if let Some(value) = self.get_setting(OWNER_SETTING_KEY)? {
            return Uuid::parse_str(&value)
                .map_err(|e| CoreError::validation(format!("stored owner id is invalid: {e}")));
        }
        let owner_id = Uuid::new_v4();
        self.set_setting(OWNER_SETTING_KEY, &owner_id.to_string())?;
        debug!("event=owner_created module=db owner_id={}", owner_id);
        Ok(owner_id)
    }
}

impl Store for Database {
    /// Runs `f` under `BEGIN IMMEDIATE`.
    ///
    /// The write lock is taken before the first read, so concurrent writers
    /// to the same database (and therefore the same contact) serialize.
    /// Returning `Err` drops the transaction, which rolls it back.
    fn transaction<T, F>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&Self) -> CoreResult<T>,
    {
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }
}

// ==================== ROW HELPERS ====================

/// Fixed-width UTC timestamp; lexical order equals chronological order.
pub(crate) fn ts(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Helper to convert UUID parse errors to rusqlite errors
pub(crate) fn parse_uuid(s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_ts(s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn parse_date(s: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ContactRepository;

    #[test]
    fn test_open_memory() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.get_schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_exist() {
        let db = Database::open_memory().unwrap();

        let tables: Vec<String> = db
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for table in [
            "contacts",
            "contact_emails",
            "contact_phones",
            "tags",
            "contact_tags",
            "contact_versions",
            "contact_merge_records",
            "hidden_feed_contacts",
            "tasks",
            "app_settings",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_reopen_file_keeps_data_and_skips_migration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("contacts.db");

        let owner = {
            let db = Database::open_at(&path).unwrap();
            db.local_owner_id().unwrap()
        };

        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.get_schema_version().unwrap(), SCHEMA_VERSION);
        assert_eq!(db.local_owner_id().unwrap(), owner);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let contact =
            crate::models::Contact::new(owner, "Roll".to_string(), "Back".to_string());

        let result: CoreResult<()> = db.transaction(|store| {
            store.insert_contact(&contact)?;
            Err(CoreError::invalid_state("boom"))
        });
        assert!(result.is_err());
        assert!(db.get_contact(owner, contact.id).unwrap().is_none());

        db.transaction(|store| store.insert_contact(&contact)).unwrap();
        assert!(db.get_contact(owner, contact.id).unwrap().is_some());
    }

    #[test]
    fn test_timestamp_format_is_fixed_width() {
        let a = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let b = DateTime::parse_from_rfc3339("2024-01-01T00:00:00.5Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(ts(&a).len(), ts(&b).len());
        assert!(ts(&a) < ts(&b));
        assert_eq!(parse_ts(&ts(&b)).unwrap(), b);
    }
}
