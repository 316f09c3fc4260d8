use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashSet;
use uuid::Uuid;

use super::{parse_date, parse_ts, parse_uuid, ts, Database};
use crate::error::CoreResult;
use crate::models::*;
use crate::store::{ContactRepository, TagResolver};

const SEARCH_CLAUSE: &str = r#"(?2 IS NULL
    OR LOWER(c.first_name) LIKE ?2 ESCAPE '\'
    OR LOWER(c.last_name) LIKE ?2 ESCAPE '\'
    OR LOWER(c.first_name || ' ' || c.last_name) LIKE ?2 ESCAPE '\'
    OR LOWER(COALESCE(c.company, '')) LIKE ?2 ESCAPE '\'
    OR EXISTS (SELECT 1 FROM contact_emails e
               WHERE e.contact_id = c.id AND e.address_key LIKE ?2 ESCAPE '\'))"#;

impl ContactRepository for Database {
    // ==================== CONTACT CRUD ====================

    fn insert_contact(&self, contact: &Contact) -> CoreResult<()> {
        self.conn.execute(
            r#"INSERT INTO contacts (
                id, owner_id, first_name, last_name, company, title, birthday,
                linkedin_url, notes, is_deleted, deleted_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
            params![
                contact.id.to_string(),
                contact.owner_id.to_string(),
                contact.first_name,
                contact.last_name,
                contact.company,
                contact.title,
                contact.birthday.map(|d| d.format("%Y-%m-%d").to_string()),
                contact.linkedin_url,
                contact.notes,
                contact.is_deleted as i32,
                contact.deleted_at.as_ref().map(ts),
                ts(&contact.created_at),
                ts(&contact.updated_at),
            ],
        )?;
        Ok(())
    }

    fn update_contact(&self, contact: &Contact) -> CoreResult<()> {
        self.conn.execute(
            r#"UPDATE contacts SET
                first_name = ?, last_name = ?, company = ?, title = ?, birthday = ?,
                linkedin_url = ?, notes = ?, updated_at = ?
               WHERE id = ? AND owner_id = ?"#,
            params![
                contact.first_name,
                contact.last_name,
                contact.company,
                contact.title,
                contact.birthday.map(|d| d.format("%Y-%m-%d").to_string()),
                contact.linkedin_url,
                contact.notes,
                ts(&contact.updated_at),
                contact.id.to_string(),
                contact.owner_id.to_string(),
            ],
        )?;
        Ok(())
    }

    fn get_contact(&self, owner_id: Uuid, id: Uuid) -> CoreResult<Option<Contact>> {
        let contact = self
            .conn
            .query_row(
                "SELECT * FROM contacts WHERE id = ? AND owner_id = ?",
                [id.to_string(), owner_id.to_string()],
                row_to_contact,
            )
            .optional()?;
        Ok(contact)
    }

    /// Soft delete: the row, its children and its history are kept.
    fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> CoreResult<bool> {
        let rows = self.conn.execute(
            "UPDATE contacts SET is_deleted = 1, deleted_at = ?1, updated_at = ?1
             WHERE id = ?2 AND is_deleted = 0",
            params![ts(&at), id.to_string()],
        )?;
        Ok(rows > 0)
    }

    fn list_contacts(&self, owner_id: Uuid, query: &ContactQuery) -> CoreResult<Vec<Contact>> {
        // Column and direction come from enums, never from caller text
        let sql = format!(
            r#"SELECT c.* FROM contacts c
               WHERE c.owner_id = ?1 AND c.is_deleted = 0 AND {}
               ORDER BY c.{} COLLATE NOCASE {}, c.id ASC
               LIMIT ?3 OFFSET ?4"#,
            SEARCH_CLAUSE,
            query.sort.as_str(),
            query.order.as_sql()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let contacts = stmt
            .query_map(
                params![
                    owner_id.to_string(),
                    search_pattern(query.search.as_deref()),
                    query.limit,
                    query.offset
                ],
                row_to_contact,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(contacts)
    }

    fn count_contacts(&self, owner_id: Uuid, search: Option<&str>) -> CoreResult<u32> {
        let sql = format!(
            "SELECT COUNT(*) FROM contacts c WHERE c.owner_id = ?1 AND c.is_deleted = 0 AND {}",
            SEARCH_CLAUSE
        );
        let count: u32 = self.conn.query_row(
            &sql,
            params![owner_id.to_string(), search_pattern(search)],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==================== CHILD COLLECTIONS ====================

    fn emails_for_contact(&self, contact_id: Uuid) -> CoreResult<Vec<Email>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, contact_id, address, label, is_primary
             FROM contact_emails WHERE contact_id = ? ORDER BY position ASC",
        )?;

        let emails = stmt
            .query_map([contact_id.to_string()], row_to_email)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(emails)
    }

    fn replace_emails(&self, contact_id: Uuid, emails: &[Email]) -> CoreResult<()> {
        self.conn.execute(
            "DELETE FROM contact_emails WHERE contact_id = ?",
            [contact_id.to_string()],
        )?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO contact_emails
                (id, contact_id, address, address_key, label, is_primary, position)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )?;
        for (position, email) in emails.iter().enumerate() {
            stmt.execute(params![
                email.id.to_string(),
                contact_id.to_string(),
                email.address,
                normalize_email(&email.address),
                email.label.as_str(),
                email.is_primary as i32,
                position as i64,
            ])?;
        }
        Ok(())
    }

    fn phones_for_contact(&self, contact_id: Uuid) -> CoreResult<Vec<Phone>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, contact_id, number, label, is_primary
             FROM contact_phones WHERE contact_id = ? ORDER BY position ASC",
        )?;

        let phones = stmt
            .query_map([contact_id.to_string()], row_to_phone)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(phones)
    }

    fn replace_phones(&self, contact_id: Uuid, phones: &[Phone]) -> CoreResult<()> {
        self.conn.execute(
            "DELETE FROM contact_phones WHERE contact_id = ?",
            [contact_id.to_string()],
        )?;

        let mut stmt = self.conn.prepare(
            "INSERT INTO contact_phones (id, contact_id, number, label, is_primary, position)
             VALUES (?, ?, ?, ?, ?, ?)",
        )?;
        for (position, phone) in phones.iter().enumerate() {
            stmt.execute(params![
                phone.id.to_string(),
                contact_id.to_string(),
                phone.number,
                phone.label.as_str(),
                phone.is_primary as i32,
                position as i64,
            ])?;
        }
        Ok(())
    }

    fn tags_for_contact(&self, contact_id: Uuid) -> CoreResult<Vec<Tag>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT t.id, t.owner_id, t.name, t.created_at
               FROM tags t
               JOIN contact_tags ct ON ct.tag_id = t.id
               WHERE ct.contact_id = ?
               ORDER BY t.name_key, t.name"#,
        )?;

        let tags = stmt
            .query_map([contact_id.to_string()], row_to_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tags)
    }

    fn replace_tags(&self, contact_id: Uuid, tags: &[Tag]) -> CoreResult<()> {
        self.conn.execute(
            "DELETE FROM contact_tags WHERE contact_id = ?",
            [contact_id.to_string()],
        )?;

        let mut stmt = self
            .conn
            .prepare("INSERT OR IGNORE INTO contact_tags (contact_id, tag_id) VALUES (?, ?)")?;
        for tag in tags {
            stmt.execute([contact_id.to_string(), tag.id.to_string()])?;
        }
        Ok(())
    }

    // ==================== LOOKUPS ====================

    fn find_contacts_by_email(&self, owner_id: Uuid, address: &str) -> CoreResult<Vec<Contact>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT c.* FROM contacts c
               WHERE c.owner_id = ?1 AND c.is_deleted = 0
                 AND EXISTS (SELECT 1 FROM contact_emails e
                             WHERE e.contact_id = c.id AND e.address_key = ?2)
               ORDER BY c.created_at ASC, c.id ASC"#,
        )?;

        let contacts = stmt
            .query_map(
                params![owner_id.to_string(), normalize_email(address)],
                row_to_contact,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(contacts)
    }

    fn find_contacts_by_name(
        &self,
        owner_id: Uuid,
        first_name: &str,
        last_name: &str,
    ) -> CoreResult<Vec<Contact>> {
        let mut stmt = self.conn.prepare(
            r#"SELECT c.* FROM contacts c
               WHERE c.owner_id = ?1 AND c.is_deleted = 0
                 AND ((LOWER(c.first_name) = LOWER(?2) AND LOWER(c.last_name) = LOWER(?3))
                   OR (LOWER(c.first_name) = LOWER(?3) AND LOWER(c.last_name) = LOWER(?2)))
               ORDER BY c.created_at ASC, c.id ASC"#,
        )?;

        let contacts = stmt
            .query_map(
                params![owner_id.to_string(), first_name.trim(), last_name.trim()],
                row_to_contact,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(contacts)
    }
}

impl TagResolver for Database {
    /// Resolve names to tags, creating missing ones. Output follows input
    /// order with case-insensitive duplicates and blanks removed.
    fn find_or_create_tags(&self, owner_id: Uuid, names: &[String]) -> CoreResult<Vec<Tag>> {
        let mut seen = HashSet::new();
        let mut tags = Vec::new();

        for name in names {
            let name = name.trim();
            let key = Tag::key(name);
            if name.is_empty() || !seen.insert(key.clone()) {
                continue;
            }

            let existing = self
                .conn
                .query_row(
                    "SELECT id, owner_id, name, created_at FROM tags WHERE owner_id = ? AND name_key = ?",
                    [owner_id.to_string(), key.clone()],
                    row_to_tag,
                )
                .optional()?;

            let tag = match existing {
                Some(tag) => tag,
                None => {
                    let tag = Tag::new(owner_id, name.to_string());
                    self.conn.execute(
                        "INSERT INTO tags (id, owner_id, name, name_key, created_at)
                         VALUES (?, ?, ?, ?, ?)",
                        params![
                            tag.id.to_string(),
                            tag.owner_id.to_string(),
                            tag.name,
                            key,
                            ts(&tag.created_at)
                        ],
                    )?;
                    tag
                }
            };
            tags.push(tag);
        }

        Ok(tags)
    }
}

// ==================== ROW MAPPERS ====================

fn row_to_contact(row: &Row) -> rusqlite::Result<Contact> {
    let id: String = row.get("id")?;
    let owner_id: String = row.get("owner_id")?;
    let birthday: Option<String> = row.get("birthday")?;
    let deleted_at: Option<String> = row.get("deleted_at")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Contact {
        id: parse_uuid(&id)?,
        owner_id: parse_uuid(&owner_id)?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        company: row.get("company")?,
        title: row.get("title")?,
        birthday: birthday.as_deref().map(parse_date).transpose()?,
        linkedin_url: row.get("linkedin_url")?,
        notes: row.get("notes")?,
        is_deleted: row.get::<_, i32>("is_deleted")? == 1,
        deleted_at: deleted_at.as_deref().map(parse_ts).transpose()?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn row_to_email(row: &Row) -> rusqlite::Result<Email> {
    let id: String = row.get("id")?;
    let contact_id: String = row.get("contact_id")?;
    let label: String = row.get("label")?;

    Ok(Email {
        id: parse_uuid(&id)?,
        contact_id: parse_uuid(&contact_id)?,
        address: row.get("address")?,
        label: EmailLabel::parse(&label),
        is_primary: row.get::<_, i32>("is_primary")? == 1,
    })
}

fn row_to_phone(row: &Row) -> rusqlite::Result<Phone> {
    let id: String = row.get("id")?;
    let contact_id: String = row.get("contact_id")?;
    let label: String = row.get("label")?;

    Ok(Phone {
        id: parse_uuid(&id)?,
        contact_id: parse_uuid(&contact_id)?,
        number: row.get("number")?,
        label: PhoneLabel::parse(&label),
        is_primary: row.get::<_, i32>("is_primary")? == 1,
    })
}

fn row_to_tag(row: &Row) -> rusqlite::Result<Tag> {
    let id: String = row.get("id")?;
    let owner_id: String = row.get("owner_id")?;
    let created_at: String = row.get("created_at")?;

    Ok(Tag {
        id: parse_uuid(&id)?,
        owner_id: parse_uuid(&owner_id)?,
        name: row.get("name")?,
        created_at: parse_ts(&created_at)?,
    })
}

/// `%term%` with LIKE metacharacters escaped, or NULL for "no filter"
fn search_pattern(search: Option<&str>) -> Value {
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => Value::Text(format!("%{}%", escape_like(&term.to_lowercase()))),
        None => Value::Null,
    }
}

/// Escape LIKE metacharacters (% _ \)
fn escape_like(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(db: &Database, owner: Uuid, first: &str, last: &str) -> Contact {
        let contact = Contact::new(owner, first.to_string(), last.to_string());
        db.insert_contact(&contact).unwrap();
        contact
    }

    #[test]
    fn test_insert_and_get_contact() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();

        let mut contact = Contact::new(owner, "John".to_string(), "Smith".to_string());
        contact.birthday = chrono::NaiveDate::from_ymd_opt(1990, 4, 1);
        db.insert_contact(&contact).unwrap();

        let retrieved = db.get_contact(owner, contact.id).unwrap().unwrap();
        assert_eq!(retrieved.first_name, "John");
        assert_eq!(retrieved.birthday, contact.birthday);
        assert_eq!(retrieved.created_at, contact.created_at);
    }

    #[test]
    fn test_get_contact_is_owner_scoped() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let contact = insert(&db, owner, "Jane", "Doe");

        assert!(db.get_contact(Uuid::new_v4(), contact.id).unwrap().is_none());
    }

    #[test]
    fn test_blank_name_violates_constraint() {
        let db = Database::open_memory().unwrap();
        let contact = Contact::new(Uuid::new_v4(), "  ".to_string(), "Doe".to_string());
        let err = db.insert_contact(&contact).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::Validation(_)));
    }

    #[test]
    fn test_list_search_and_count() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let a = insert(&db, owner, "Ada", "Lovelace");
        let mut b = Contact::new(owner, "Alan".to_string(), "Turing".to_string());
        b.company = Some("Bletchley_Park".to_string());
        db.insert_contact(&b).unwrap();
        insert(&db, Uuid::new_v4(), "Ada", "Other-owner");

        db.replace_emails(a.id, &[Email::new(a.id, "ADA@engine.org".to_string())])
            .unwrap();

        let all = db.list_contacts(owner, &ContactQuery::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].last_name, "Lovelace");

        let query = ContactQuery {
            search: Some("engine.org".to_string()),
            ..Default::default()
        };
        let found = db.list_contacts(owner, &query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, a.id);

        // Underscore is literal, not a wildcard
        assert_eq!(db.count_contacts(owner, Some("y_p")).unwrap(), 1);
        assert_eq!(db.count_contacts(owner, Some("ey_Pa")).unwrap(), 1);
        assert_eq!(db.count_contacts(owner, Some("eyXpa")).unwrap(), 0);
        assert_eq!(db.count_contacts(owner, None).unwrap(), 2);
    }

    #[test]
    fn test_list_excludes_deleted() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let contact = insert(&db, owner, "Gone", "Soon");

        assert!(db.mark_deleted(contact.id, Utc::now()).unwrap());
        assert!(!db.mark_deleted(contact.id, Utc::now()).unwrap());

        assert_eq!(db.count_contacts(owner, None).unwrap(), 0);
        let stored = db.get_contact(owner, contact.id).unwrap().unwrap();
        assert!(stored.is_deleted);
        assert!(stored.deleted_at.is_some());
    }

    #[test]
    fn test_replace_emails_keeps_order() {
        let db = Database::open_memory().unwrap();
        let contact = insert(&db, Uuid::new_v4(), "Test", "Person");

        let mut first = Email::new(contact.id, "b@example.com".to_string());
        first.is_primary = true;
        let second = Email::new(contact.id, "a@example.com".to_string());
        db.replace_emails(contact.id, &[first, second]).unwrap();

        let emails = db.emails_for_contact(contact.id).unwrap();
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[0].address, "b@example.com");
        assert!(emails[0].is_primary);
        assert!(!emails[1].is_primary);

        db.replace_emails(contact.id, &[]).unwrap();
        assert!(db.emails_for_contact(contact.id).unwrap().is_empty());
    }

    #[test]
    fn test_replace_phones() {
        let db = Database::open_memory().unwrap();
        let contact = insert(&db, Uuid::new_v4(), "Test", "Person");

        let mut phone = Phone::new(contact.id, "555-0001".to_string());
        phone.label = PhoneLabel::Work;
        db.replace_phones(contact.id, &[phone]).unwrap();

        let phones = db.phones_for_contact(contact.id).unwrap();
        assert_eq!(phones.len(), 1);
        assert_eq!(phones[0].label, PhoneLabel::Work);
    }

    #[test]
    fn test_find_or_create_tags_is_case_insensitive() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();

        let first = db
            .find_or_create_tags(owner, &["Friends".to_string(), " ".to_string()])
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = db
            .find_or_create_tags(owner, &["friends".to_string(), "Work".to_string(), "WORK".to_string()])
            .unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].id, first[0].id);
        assert_eq!(second[0].name, "Friends");

        // Another owner gets its own tag
        let other = db.find_or_create_tags(Uuid::new_v4(), &["Friends".to_string()]).unwrap();
        assert_ne!(other[0].id, first[0].id);
    }

    #[test]
    fn test_tag_names_fold_beyond_ascii() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();

        let first = db.find_or_create_tags(owner, &["Émigré".to_string()]).unwrap();
        let second = db.find_or_create_tags(owner, &["émigré".to_string()]).unwrap();
        assert_eq!(second[0].id, first[0].id);
        assert_eq!(second[0].name, "Émigré");

        let both = db
            .find_or_create_tags(owner, &["ÜBER".to_string(), "über".to_string()])
            .unwrap();
        assert_eq!(both.len(), 1);
    }

    #[test]
    fn test_replace_tags() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let contact = insert(&db, owner, "Tag", "Target");

        let tags = db
            .find_or_create_tags(owner, &["b".to_string(), "A".to_string()])
            .unwrap();
        db.replace_tags(contact.id, &tags).unwrap();

        let names: Vec<String> = db
            .tags_for_contact(contact.id)
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["A", "b"]);
    }

    #[test]
    fn test_find_by_email_and_name() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let a = insert(&db, owner, "Grace", "Hopper");
        let b = insert(&db, owner, "hopper", "GRACE");
        insert(&db, owner, "Grace", "Kelly");

        db.replace_emails(a.id, &[Email::new(a.id, "grace@navy.mil".to_string())])
            .unwrap();

        let by_email = db.find_contacts_by_email(owner, " Grace@Navy.MIL ").unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].id, a.id);

        let unal = insert(&db, owner, "Ünal", "Demir");
        db.replace_emails(unal.id, &[Email::new(unal.id, "Ünal@x.com".to_string())])
            .unwrap();
        let by_email = db.find_contacts_by_email(owner, "ünal@x.com").unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].id, unal.id);
        assert_eq!(db.count_contacts(owner, Some("ünal@")).unwrap(), 1);

        let by_name = db.find_contacts_by_name(owner, "grace", "hopper").unwrap();
        let ids: Vec<Uuid> = by_name.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }
}
