use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_ts, parse_uuid, ts, Database};
use crate::error::CoreResult;
use crate::models::{Changes, ContactMergeRecord, ContactVersion, Snapshot};
use crate::store::{MergeRepository, VersionRepository};

impl VersionRepository for Database {
    fn max_version(&self, contact_id: Uuid) -> CoreResult<u32> {
        let max: Option<u32> = self.conn.query_row(
            "SELECT MAX(version) FROM contact_versions WHERE contact_id = ?",
            [contact_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0))
    }

    fn insert_version(&self, version: &ContactVersion) -> CoreResult<()> {
        let snapshot = serde_json::to_string(&version.snapshot)?;
        let changes = serde_json::to_string(&version.changes)?;

        self.conn.execute(
            r#"INSERT INTO contact_versions (id, contact_id, version, snapshot, changes, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                version.id.to_string(),
                version.contact_id.to_string(),
                version.version,
                snapshot,
                changes,
                ts(&version.created_at),
            ],
        )?;
        Ok(())
    }

    fn list_versions(&self, contact_id: Uuid) -> CoreResult<Vec<ContactVersion>> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM contact_versions WHERE contact_id = ? ORDER BY version DESC",
        )?;

        let rows = stmt
            .query_map([contact_id.to_string()], VersionRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(VersionRow::into_version).collect()
    }

    fn get_version(&self, contact_id: Uuid, version: u32) -> CoreResult<Option<ContactVersion>> {
        let row = self
            .conn
            .query_row(
                "SELECT * FROM contact_versions WHERE contact_id = ? AND version = ?",
                params![contact_id.to_string(), version],
                VersionRow::from_row,
            )
            .optional()?;

        row.map(VersionRow::into_version).transpose()
    }
}

impl MergeRepository for Database {
    fn insert_merge_record(&self, record: &ContactMergeRecord) -> CoreResult<()> {
        self.conn.execute(
            r#"INSERT INTO contact_merge_records (
                id, owner_id, primary_contact_id, primary_name, secondary_contact_id,
                secondary_name, emails_merged, phones_merged, tags_merged, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                record.id.to_string(),
                record.owner_id.to_string(),
                record.primary_contact_id.to_string(),
                record.primary_name,
                record.secondary_contact_id.to_string(),
                record.secondary_name,
                record.emails_merged,
                record.phones_merged,
                record.tags_merged,
                ts(&record.created_at),
            ],
        )?;
        Ok(())
    }
}

/// Raw row; JSON columns are decoded outside the rusqlite callback so
/// decode failures surface as `Serialization` errors.
struct VersionRow {
    id: Uuid,
    contact_id: Uuid,
    version: u32,
    snapshot: String,
    changes: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl VersionRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let id: String = row.get("id")?;
        let contact_id: String = row.get("contact_id")?;
        let created_at: String = row.get("created_at")?;

        Ok(Self {
            id: parse_uuid(&id)?,
            contact_id: parse_uuid(&contact_id)?,
            version: row.get("version")?,
            snapshot: row.get("snapshot")?,
            changes: row.get("changes")?,
            created_at: parse_ts(&created_at)?,
        })
    }

    fn into_version(self) -> CoreResult<ContactVersion> {
        let snapshot: Snapshot = serde_json::from_str(&self.snapshot)?;
        let changes: Changes = serde_json::from_str(&self.changes)?;

        Ok(ContactVersion {
            id: self.id,
            contact_id: self.contact_id,
            version: self.version,
            snapshot,
            changes,
            created_at: self.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contact, FieldChange, FieldValue, SnapshotField};
    use crate::store::ContactRepository;
    use chrono::Utc;

    fn setup() -> (Database, Contact) {
        let db = Database::open_memory().unwrap();
        let contact = Contact::new(Uuid::new_v4(), "Ver".to_string(), "Sion".to_string());
        db.insert_contact(&contact).unwrap();
        (db, contact)
    }

    fn version(contact_id: Uuid, number: u32) -> ContactVersion {
        ContactVersion {
            id: Uuid::new_v4(),
            contact_id,
            version: number,
            snapshot: Snapshot {
                first_name: "Ver".to_string(),
                last_name: "Sion".to_string(),
                ..Default::default()
            },
            changes: Changes::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_max_version_empty_is_zero() {
        let (db, contact) = setup();
        assert_eq!(db.max_version(contact.id).unwrap(), 0);
    }

    #[test]
    fn test_insert_and_list_versions_newest_first() {
        let (db, contact) = setup();
        db.insert_version(&version(contact.id, 1)).unwrap();

        let mut second = version(contact.id, 2);
        second.changes.insert(
            SnapshotField::Company,
            FieldChange {
                from: FieldValue::Text(None),
                to: FieldValue::Text(Some("Acme".to_string())),
            },
        );
        db.insert_version(&second).unwrap();

        assert_eq!(db.max_version(contact.id).unwrap(), 2);
        let versions = db.list_versions(contact.id).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].version, 2);
        assert_eq!(versions[0].changes, second.changes);

        let first = db.get_version(contact.id, 1).unwrap().unwrap();
        assert!(first.changes.is_empty());
        assert!(db.get_version(contact.id, 3).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_version_number_rejected() {
        let (db, contact) = setup();
        db.insert_version(&version(contact.id, 1)).unwrap();
        let err = db.insert_version(&version(contact.id, 1)).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::Validation(_)));
    }

    #[test]
    fn test_corrupt_snapshot_is_serialization_error() {
        let (db, contact) = setup();
        db.conn
            .execute(
                "INSERT INTO contact_versions (id, contact_id, version, snapshot, changes, created_at)
                 VALUES (?, ?, 1, 'not json', '{}', ?)",
                params![Uuid::new_v4().to_string(), contact.id.to_string(), ts(&Utc::now())],
            )
            .unwrap();

        let err = db.get_version(contact.id, 1).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::Serialization(_)));
    }
}
