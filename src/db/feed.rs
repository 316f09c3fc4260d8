use chrono::Utc;
use log::warn;
use rusqlite::{params, Row};
use uuid::Uuid;

use super::{parse_ts, parse_uuid, ts, Database};
use crate::error::CoreResult;
use crate::models::{
    ActivityItem, Changes, ContactEditedItem, ContactMergedItem, SnapshotField, TaskActivityItem,
};
use crate::store::FeedRepository;

/// Contacts the owner (`?1`) has hidden from the feed.
const HIDDEN_CONTACTS: &str =
    "(SELECT h.contact_id FROM hidden_feed_contacts h WHERE h.owner_id = ?1)";

impl FeedRepository for Database {
    fn hide_contact(&self, owner_id: Uuid, contact_id: Uuid) -> CoreResult<bool> {
        let rows = self.conn.execute(
            "INSERT OR IGNORE INTO hidden_feed_contacts (owner_id, contact_id, created_at)
             VALUES (?, ?, ?)",
            params![owner_id.to_string(), contact_id.to_string(), ts(&Utc::now())],
        )?;
        Ok(rows > 0)
    }

    fn unhide_contact(&self, owner_id: Uuid, contact_id: Uuid) -> CoreResult<bool> {
        let rows = self.conn.execute(
            "DELETE FROM hidden_feed_contacts WHERE owner_id = ? AND contact_id = ?",
            [owner_id.to_string(), contact_id.to_string()],
        )?;
        Ok(rows > 0)
    }

    fn contact_edit_events(&self, owner_id: Uuid, limit: u32) -> CoreResult<Vec<ContactEditedItem>> {
        let sql = format!(
            r#"SELECT v.contact_id, v.version, v.changes, v.created_at,
                      c.first_name || ' ' || c.last_name AS contact_name
               FROM contact_versions v
               JOIN contacts c ON c.id = v.contact_id
               WHERE c.owner_id = ?1 AND v.version > 1
                 AND c.id NOT IN {HIDDEN_CONTACTS}
               ORDER BY v.created_at DESC, v.version DESC
               LIMIT ?2"#
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![owner_id.to_string(), limit], row_to_edit_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    fn merge_events(&self, owner_id: Uuid, limit: u32) -> CoreResult<Vec<ContactMergedItem>> {
        let sql = format!(
            r#"SELECT * FROM contact_merge_records
               WHERE owner_id = ?1
                 AND primary_contact_id NOT IN {HIDDEN_CONTACTS}
                 AND secondary_contact_id NOT IN {HIDDEN_CONTACTS}
               ORDER BY created_at DESC
               LIMIT ?2"#
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![owner_id.to_string(), limit], row_to_merge_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    fn task_events(&self, owner_id: Uuid, limit: u32) -> CoreResult<Vec<ActivityItem>> {
        let mut items = Vec::new();
        for (column, completed) in [("created_at", false), ("completed_at", true)] {
            // NULL NOT IN (...) is NULL, so unlinked tasks need their own branch
            let sql = format!(
                r#"SELECT id, title, contact_id, {column} AS happened_at
                   FROM tasks
                   WHERE owner_id = ?1 AND {column} IS NOT NULL
                     AND (contact_id IS NULL OR contact_id NOT IN {HIDDEN_CONTACTS})
                   ORDER BY {column} DESC
                   LIMIT ?2"#
            );

            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![owner_id.to_string(), limit], row_to_task_event)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            items.extend(rows.into_iter().map(|item| {
                if completed {
                    ActivityItem::TaskCompleted(item)
                } else {
                    ActivityItem::TaskCreated(item)
                }
            }));
        }

        items.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        items.truncate(limit as usize);
        Ok(items)
    }
}

fn row_to_edit_event(row: &Row) -> rusqlite::Result<ContactEditedItem> {
    let contact_id: String = row.get("contact_id")?;
    let changes: String = row.get("changes")?;
    let created_at: String = row.get("created_at")?;
    let version: u32 = row.get("version")?;

    Ok(ContactEditedItem {
        contact_id: parse_uuid(&contact_id)?,
        contact_name: row.get("contact_name")?,
        version,
        changed_fields: changed_fields(&changes, version),
        timestamp: parse_ts(&created_at)?,
    })
}

/// Field names recorded in a changes document. Unreadable documents
/// degrade to an empty list instead of failing the whole feed.
fn changed_fields(changes: &str, version: u32) -> Vec<SnapshotField> {
    match serde_json::from_str::<Changes>(changes) {
        Ok(changes) => changes.fields(),
        Err(err) => {
            warn!(
                "event=feed_changes_unreadable module=db version={} error={}",
                version, err
            );
            Vec::new()
        }
    }
}

fn row_to_merge_event(row: &Row) -> rusqlite::Result<ContactMergedItem> {
    let id: String = row.get("id")?;
    let primary: String = row.get("primary_contact_id")?;
    let secondary: String = row.get("secondary_contact_id")?;
    let created_at: String = row.get("created_at")?;

    Ok(ContactMergedItem {
        merge_id: parse_uuid(&id)?,
        primary_contact_id: parse_uuid(&primary)?,
        secondary_contact_id: parse_uuid(&secondary)?,
        primary_name: row.get("primary_name")?,
        secondary_name: row.get("secondary_name")?,
        emails_merged: row.get("emails_merged")?,
        phones_merged: row.get("phones_merged")?,
        tags_merged: row.get("tags_merged")?,
        timestamp: parse_ts(&created_at)?,
    })
}

fn row_to_task_event(row: &Row) -> rusqlite::Result<TaskActivityItem> {
    let id: String = row.get("id")?;
    let contact_id: Option<String> = row.get("contact_id")?;
    let happened_at: String = row.get("happened_at")?;

    Ok(TaskActivityItem {
        task_id: parse_uuid(&id)?,
        title: row.get("title")?,
        contact_id: contact_id.as_deref().map(parse_uuid).transpose()?,
        timestamp: parse_ts(&happened_at)?,
    })
}
