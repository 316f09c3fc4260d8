//! Contact use-cases.
//!
//! # Responsibility
//! - Create, update, soft-delete, read and list contacts.
//! - Route every scalar, collection and notes change through one update
//!   path so manual and automated edits are versioned the same way.
//!
//! # Invariants
//! - First and last names are non-empty after trimming.
//! - A contact with emails (or phones) has exactly one primary entry.
//! - Each mutation and its version row commit in the same transaction.

use chrono::{NaiveDate, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::duplicates::DuplicateDetector;
use super::versions::{append_version, snapshot_of, write_initial_version};
use crate::error::{CoreError, CoreResult};
use crate::models::{
    Contact, ContactDetail, ContactPage, ContactQuery, ContactVersion, Email, EmailInput, Phone,
    PhoneInput, Snapshot,
};
use crate::notes::{apply_updates, NotesUpdate};
use crate::store::{ContactRepository, Store, TagResolver};

/// Input for `create_contact` and bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub title: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub linkedin_url: Option<String>,
    pub notes: Option<String>,
    pub emails: Vec<EmailInput>,
    pub phones: Vec<PhoneInput>,
    pub tags: Vec<String>,
}

impl NewContact {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Default::default()
        }
    }
}

/// Partial update. `None` leaves a field alone; an empty string clears an
/// optional text field. Collections are replaced wholesale when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub title: Option<String>,
    /// `Some(None)` clears the birthday.
    pub birthday: Option<Option<NaiveDate>>,
    pub linkedin_url: Option<String>,
    /// Full replacement, applied before `notes_updates`.
    pub notes: Option<String>,
    /// Structured edits applied to the parsed notes document.
    pub notes_updates: Vec<NotesUpdate>,
    pub emails: Option<Vec<EmailInput>>,
    pub phones: Option<Vec<PhoneInput>>,
    pub tags: Option<Vec<String>>,
}

impl ContactUpdate {
    /// An update that sets every versionable field to the snapshot's value.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            first_name: Some(snapshot.first_name.clone()),
            last_name: Some(snapshot.last_name.clone()),
            company: Some(snapshot.company.clone().unwrap_or_default()),
            title: Some(snapshot.title.clone().unwrap_or_default()),
            birthday: Some(snapshot.birthday),
            linkedin_url: Some(snapshot.linkedin_url.clone().unwrap_or_default()),
            notes: Some(snapshot.notes.clone().unwrap_or_default()),
            notes_updates: Vec::new(),
            emails: Some(
                snapshot
                    .emails
                    .iter()
                    .map(|e| EmailInput {
                        address: e.address.clone(),
                        label: e.label,
                        is_primary: Some(e.is_primary),
                    })
                    .collect(),
            ),
            phones: Some(
                snapshot
                    .phones
                    .iter()
                    .map(|p| PhoneInput {
                        number: p.number.clone(),
                        label: p.label,
                        is_primary: Some(p.is_primary),
                    })
                    .collect(),
            ),
            tags: Some(snapshot.tags.clone()),
        }
    }

    /// An update that only edits structured notes.
    pub fn notes(updates: Vec<NotesUpdate>) -> Self {
        Self {
            notes_updates: updates,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOutcome {
    pub detail: ContactDetail,
    /// `None` when nothing changed.
    pub version: Option<ContactVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub created: u32,
    /// Rows matching an existing contact.
    pub skipped: u32,
    /// Existing contacts the skipped rows matched, in row order.
    pub skipped_ids: Vec<Uuid>,
    /// Rows rejected by validation (e.g. blank names).
    pub invalid: u32,
}

/// Contact service facade over a store implementation.
pub struct ContactService<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> ContactService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create a contact with its collections and version 1.
    pub fn create_contact(&self, owner_id: Uuid, new: NewContact) -> CoreResult<ContactDetail> {
        let first_name = required_name("first name", &new.first_name)?;
        let last_name = required_name("last name", &new.last_name)?;

        let mut contact = Contact::new(owner_id, first_name, last_name);
        contact.company = optional_text(new.company.as_deref());
        contact.title = optional_text(new.title.as_deref());
        contact.birthday = new.birthday;
        contact.linkedin_url = optional_text(new.linkedin_url.as_deref());
        contact.notes = optional_text(new.notes.as_deref());

        let emails = build_emails(contact.id, &new.emails);
        let phones = build_phones(contact.id, &new.phones);

        let detail = self.store.transaction(|store| {
            store.insert_contact(&contact)?;
            store.replace_emails(contact.id, &emails)?;
            store.replace_phones(contact.id, &phones)?;
            let tags = store.find_or_create_tags(owner_id, &new.tags)?;
            store.replace_tags(contact.id, &tags)?;

            let detail = ContactDetail {
                contact: contact.clone(),
                emails: emails.clone(),
                phones: phones.clone(),
                tags,
            };
            write_initial_version(store, contact.id, &snapshot_of(&detail), contact.created_at)?;
            Ok(detail)
        })?;

        info!(
            "event=contact_create module=service status=ok contact_id={}",
            detail.contact.id
        );
        Ok(detail)
    }

    /// Apply `update` and append a version when anything changed.
    pub fn update_contact(
        &self,
        owner_id: Uuid,
        contact_id: Uuid,
        update: ContactUpdate,
    ) -> CoreResult<UpdateOutcome> {
        let outcome = self.store.transaction(|store| {
            let current = load_active_detail(store, owner_id, contact_id)?;
            let previous = snapshot_of(&current);
            let next = apply_update(store, current.clone(), &update)?;
            let version = commit_detail(store, &previous, &next)?;
            Ok(UpdateOutcome {
                detail: if version.is_some() { next } else { current },
                version,
            })
        });

        match &outcome {
            Ok(outcome) => info!(
                "event=contact_update module=service status=ok contact_id={} version={}",
                contact_id,
                outcome
                    .version
                    .as_ref()
                    .map(|v| v.version.to_string())
                    .unwrap_or_else(|| "unchanged".to_string())
            ),
            Err(err) => warn!(
                "event=contact_update module=service status=error contact_id={} error_code={}",
                contact_id,
                err.code()
            ),
        }
        outcome
    }

    /// Soft delete. Rows and history stay in place.
    pub fn delete_contact(&self, owner_id: Uuid, contact_id: Uuid) -> CoreResult<()> {
        self.store.transaction(|store| {
            let contact = store
                .get_contact(owner_id, contact_id)?
                .ok_or_else(|| CoreError::not_found(format!("contact {contact_id}")))?;
            if contact.is_deleted {
                return Err(CoreError::invalid_state(format!(
                    "contact {contact_id} is already deleted"
                )));
            }
            store.mark_deleted(contact_id, Utc::now())?;
            Ok(())
        })?;

        info!(
            "event=contact_delete module=service status=ok contact_id={}",
            contact_id
        );
        Ok(())
    }

    /// Active contact with collections; deleted contacts are not found.
    pub fn get_contact(&self, owner_id: Uuid, contact_id: Uuid) -> CoreResult<ContactDetail> {
        let contact = self
            .store
            .get_contact(owner_id, contact_id)?
            .filter(|c| !c.is_deleted)
            .ok_or_else(|| CoreError::not_found(format!("contact {contact_id}")))?;
        load_detail(self.store, contact)
    }

    pub fn list_contacts(&self, owner_id: Uuid, query: &ContactQuery) -> CoreResult<ContactPage> {
        let contacts = self.store.list_contacts(owner_id, query)?;
        let total = self.store.count_contacts(owner_id, query.search.as_deref())?;
        let has_more = query.offset as u64 + (contacts.len() as u64) < total as u64;

        Ok(ContactPage {
            contacts,
            total,
            has_more,
        })
    }

    /// Resolve an email address to the oldest active contact owning it.
    pub fn find_by_email_address(
        &self,
        owner_id: Uuid,
        address: &str,
    ) -> CoreResult<Option<ContactDetail>> {
        let address = address.trim();
        if address.is_empty() {
            return Ok(None);
        }

        match self
            .store
            .find_contacts_by_email(owner_id, address)?
            .into_iter()
            .next()
        {
            Some(contact) => Ok(Some(load_detail(self.store, contact)?)),
            None => Ok(None),
        }
    }

    /// Create each row unless it matches an existing contact.
    pub fn import_contacts(
        &self,
        owner_id: Uuid,
        rows: Vec<NewContact>,
    ) -> CoreResult<ImportSummary> {
        let detector = DuplicateDetector::new(self.store);
        let mut summary = ImportSummary::default();

        for row in rows {
            if let Some(existing) = detector.find_duplicate(owner_id, &row)? {
                summary.skipped += 1;
                summary.skipped_ids.push(existing.id);
                continue;
            }

            match self.create_contact(owner_id, row) {
                Ok(_) => summary.created += 1,
                Err(CoreError::Validation(message)) => {
                    warn!(
                        "event=import_row_rejected module=service reason={:?}",
                        message
                    );
                    summary.invalid += 1;
                }
                Err(err) => return Err(err),
            }
        }

        info!(
            "event=contact_import module=service status=ok created={} skipped={} invalid={}",
            summary.created, summary.skipped, summary.invalid
        );
        Ok(summary)
    }
}

// ==================== SHARED WRITE PATH ====================

pub(crate) fn load_detail<S: ContactRepository>(
    store: &S,
    contact: Contact,
) -> CoreResult<ContactDetail> {
    Ok(ContactDetail {
        emails: store.emails_for_contact(contact.id)?,
        phones: store.phones_for_contact(contact.id)?,
        tags: store.tags_for_contact(contact.id)?,
        contact,
    })
}

/// Contact with collections; NotFound when absent, InvalidState when deleted.
pub(crate) fn load_active_detail<S: ContactRepository>(
    store: &S,
    owner_id: Uuid,
    contact_id: Uuid,
) -> CoreResult<ContactDetail> {
    let contact = store
        .get_contact(owner_id, contact_id)?
        .ok_or_else(|| CoreError::not_found(format!("contact {contact_id}")))?;
    if contact.is_deleted {
        return Err(CoreError::invalid_state(format!(
            "contact {contact_id} is deleted"
        )));
    }
    load_detail(store, contact)
}

/// Persist `next` and append a version, unless it equals `previous`.
pub(crate) fn commit_detail<S: Store>(
    store: &S,
    previous: &Snapshot,
    next: &ContactDetail,
) -> CoreResult<Option<ContactVersion>> {
    let current = snapshot_of(next);
    if &current == previous {
        return Ok(None);
    }

    let id = next.contact.id;
    store.replace_emails(id, &next.emails)?;
    store.replace_phones(id, &next.phones)?;
    store.replace_tags(id, &next.tags)?;
    store.update_contact(&next.contact)?;
    append_version(store, id, previous, &current, next.contact.updated_at)
}

fn apply_update<S: Store>(
    store: &S,
    current: ContactDetail,
    update: &ContactUpdate,
) -> CoreResult<ContactDetail> {
    let ContactDetail {
        mut contact,
        mut emails,
        mut phones,
        mut tags,
    } = current;

    if let Some(first) = &update.first_name {
        contact.first_name = required_name("first name", first)?;
    }
    if let Some(last) = &update.last_name {
        contact.last_name = required_name("last name", last)?;
    }
    if let Some(company) = &update.company {
        contact.company = optional_text(Some(company));
    }
    if let Some(title) = &update.title {
        contact.title = optional_text(Some(title));
    }
    if let Some(birthday) = update.birthday {
        contact.birthday = birthday;
    }
    if let Some(url) = &update.linkedin_url {
        contact.linkedin_url = optional_text(Some(url));
    }
    if let Some(notes) = &update.notes {
        contact.notes = optional_text(Some(notes));
    }
    if !update.notes_updates.is_empty() {
        let text = apply_updates(contact.notes.as_deref(), &update.notes_updates);
        contact.notes = optional_text(Some(&text));
    }

    if let Some(inputs) = &update.emails {
        emails = build_emails(contact.id, inputs);
    }
    if let Some(inputs) = &update.phones {
        phones = build_phones(contact.id, inputs);
    }
    if let Some(names) = &update.tags {
        tags = store.find_or_create_tags(contact.owner_id, names)?;
    }

    contact.updated_at = Utc::now();
    Ok(ContactDetail {
        contact,
        emails,
        phones,
        tags,
    })
}

/// Trimmed, non-empty name or a validation error.
fn required_name(what: &str, value: &str) -> CoreResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::validation(format!("{what} is required")));
    }
    Ok(value.to_string())
}

/// Trimmed value, or `None` when blank.
pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Index of the primary entry: the first flagged one, else the first.
pub(crate) fn primary_index(flags: impl IntoIterator<Item = Option<bool>>) -> usize {
    flags
        .into_iter()
        .position(|flag| flag == Some(true))
        .unwrap_or(0)
}

fn build_emails(contact_id: Uuid, inputs: &[EmailInput]) -> Vec<Email> {
    let inputs: Vec<&EmailInput> = inputs
        .iter()
        .filter(|input| !input.address.trim().is_empty())
        .collect();
    let primary = primary_index(inputs.iter().map(|input| input.is_primary));

    inputs
        .into_iter()
        .enumerate()
        .map(|(i, input)| {
            let mut email = Email::new(contact_id, input.address.trim().to_string());
            email.label = input.label;
            email.is_primary = i == primary;
            email
        })
        .collect()
}

fn build_phones(contact_id: Uuid, inputs: &[PhoneInput]) -> Vec<Phone> {
    let inputs: Vec<&PhoneInput> = inputs
        .iter()
        .filter(|input| !input.number.trim().is_empty())
        .collect();
    let primary = primary_index(inputs.iter().map(|input| input.is_primary));

    inputs
        .into_iter()
        .enumerate()
        .map(|(i, input)| {
            let mut phone = Phone::new(contact_id, input.number.trim().to_string());
            phone.label = input.label;
            phone.is_primary = i == primary;
            phone
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{ContactSort, EmailLabel, SnapshotField, SortOrder};
    use crate::notes::{NoteField, NoteSection, NotesDocument};
    use crate::store::VersionRepository;

    fn setup() -> (Database, Uuid) {
        (Database::open_memory().unwrap(), Uuid::new_v4())
    }

    #[test]
    fn test_create_contact_writes_version_one() {
        let (db, owner) = setup();
        let service = ContactService::new(&db);

        let mut new = NewContact::new("  Ada ", "Lovelace");
        new.emails = vec![EmailInput::new("ada@engine.org"), EmailInput::new("ada@home.org")];
        new.tags = vec!["math".to_string(), "Math".to_string(), " ".to_string()];
        let detail = service.create_contact(owner, new).unwrap();

        assert_eq!(detail.contact.first_name, "Ada");
        assert!(detail.emails[0].is_primary);
        assert!(!detail.emails[1].is_primary);
        assert_eq!(detail.tag_names(), vec!["math"]);

        let versions = db.list_versions(detail.contact.id).unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, 1);
        assert!(versions[0].changes.is_empty());
        assert_eq!(versions[0].snapshot.tags, vec!["math"]);
    }

    #[test]
    fn test_create_requires_names() {
        let (db, owner) = setup();
        let err = ContactService::new(&db)
            .create_contact(owner, NewContact::new("", "Lovelace"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(db.count_contacts(owner, None).unwrap(), 0);
    }

    #[test]
    fn test_explicit_primary_wins() {
        let (db, owner) = setup();
        let mut new = NewContact::new("Pat", "Doe");
        let mut second = EmailInput::new("second@x.com");
        second.is_primary = Some(true);
        second.label = EmailLabel::Work;
        new.emails = vec![EmailInput::new("first@x.com"), second];

        let detail = ContactService::new(&db).create_contact(owner, new).unwrap();
        let primaries: Vec<&str> = detail
            .emails
            .iter()
            .filter(|e| e.is_primary)
            .map(|e| e.address.as_str())
            .collect();
        assert_eq!(primaries, vec!["second@x.com"]);
    }

    #[test]
    fn test_update_company_diff_is_precise() {
        let (db, owner) = setup();
        let service = ContactService::new(&db);
        let mut new = NewContact::new("Ada", "Lovelace");
        new.company = Some("A".to_string());
        new.emails = vec![EmailInput::new("ada@x.com")];
        let id = service.create_contact(owner, new).unwrap().contact.id;

        let outcome = service
            .update_contact(
                owner,
                id,
                ContactUpdate {
                    company: Some("B".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let version = outcome.version.unwrap();
        assert_eq!(version.version, 2);
        assert_eq!(version.changes.fields(), vec![SnapshotField::Company]);
        assert_eq!(outcome.detail.emails.len(), 1);
    }

    #[test]
    fn test_empty_string_clears_optional_field() {
        let (db, owner) = setup();
        let service = ContactService::new(&db);
        let mut new = NewContact::new("Ada", "Lovelace");
        new.title = Some("Countess".to_string());
        let id = service.create_contact(owner, new).unwrap().contact.id;

        let outcome = service
            .update_contact(
                owner,
                id,
                ContactUpdate {
                    title: Some(String::new()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(outcome.detail.contact.title.is_none());
        assert!(service.get_contact(owner, id).unwrap().contact.title.is_none());
    }

    #[test]
    fn test_update_blank_name_rolls_back() {
        let (db, owner) = setup();
        let service = ContactService::new(&db);
        let id = service
            .create_contact(owner, NewContact::new("Ada", "Lovelace"))
            .unwrap()
            .contact
            .id;

        let err = service
            .update_contact(
                owner,
                id,
                ContactUpdate {
                    company: Some("Engine".to_string()),
                    last_name: Some("  ".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(service.get_contact(owner, id).unwrap().contact.company.is_none());
        assert_eq!(db.max_version(id).unwrap(), 1);
    }

    #[test]
    fn test_reordered_collections_append_nothing() {
        let (db, owner) = setup();
        let service = ContactService::new(&db);
        let mut new = NewContact::new("Ada", "Lovelace");
        new.tags = vec!["b".to_string(), "a".to_string()];
        let id = service.create_contact(owner, new).unwrap().contact.id;

        let outcome = service
            .update_contact(
                owner,
                id,
                ContactUpdate {
                    tags: Some(vec!["A".to_string(), "b".to_string()]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(outcome.version.is_none());
    }

    #[test]
    fn test_notes_updates_go_through_update_path() {
        let (db, owner) = setup();
        let service = ContactService::new(&db);
        let mut new = NewContact::new("Ada", "Lovelace");
        new.notes = Some("Met at the salon.".to_string());
        let id = service.create_contact(owner, new).unwrap().contact.id;

        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let outcome = service
            .update_contact(
                owner,
                id,
                ContactUpdate::notes(vec![
                    NotesUpdate::field(NoteSection::Interests, "Goals", "Analytical engine"),
                    NotesUpdate::history(date, "Discussed Bernoulli numbers"),
                ]),
            )
            .unwrap();

        let version = outcome.version.unwrap();
        assert_eq!(version.changes.fields(), vec![SnapshotField::Notes]);

        let notes = outcome.detail.contact.notes.unwrap();
        let doc = NotesDocument::parse(&notes);
        assert_eq!(doc.unstructured.as_deref(), Some("Met at the salon."));
        assert_eq!(doc.values(NoteField::Goals), ["Analytical engine".to_string()]);
        assert_eq!(doc.history.len(), 1);
    }

    #[test]
    fn test_update_deleted_contact_is_invalid_state() {
        let (db, owner) = setup();
        let service = ContactService::new(&db);
        let id = service
            .create_contact(owner, NewContact::new("Ada", "Lovelace"))
            .unwrap()
            .contact
            .id;
        service.delete_contact(owner, id).unwrap();

        let err = service
            .update_contact(owner, id, ContactUpdate::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
        assert!(matches!(
            service.delete_contact(owner, id),
            Err(CoreError::InvalidState(_))
        ));
        assert!(matches!(
            service.get_contact(owner, id),
            Err(CoreError::NotFound(_))
        ));
        // Soft delete keeps history untouched
        assert_eq!(db.max_version(id).unwrap(), 1);
    }

    #[test]
    fn test_foreign_owner_is_not_found() {
        let (db, owner) = setup();
        let service = ContactService::new(&db);
        let id = service
            .create_contact(owner, NewContact::new("Ada", "Lovelace"))
            .unwrap()
            .contact
            .id;

        let stranger = Uuid::new_v4();
        assert!(matches!(
            service.update_contact(stranger, id, ContactUpdate::default()),
            Err(CoreError::NotFound(_))
        ));
        assert!(matches!(
            service.delete_contact(stranger, id),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_contacts_paginates() {
        let (db, owner) = setup();
        let service = ContactService::new(&db);
        for (first, last) in [("Ada", "Lovelace"), ("Alan", "Turing"), ("Grace", "Hopper")] {
            service
                .create_contact(owner, NewContact::new(first, last))
                .unwrap();
        }

        let query = ContactQuery {
            sort: ContactSort::FirstName,
            order: SortOrder::Desc,
            limit: 2,
            ..Default::default()
        };
        let page = service.list_contacts(owner, &query).unwrap();
        assert_eq!(page.total, 3);
        assert!(page.has_more);
        assert_eq!(page.contacts[0].first_name, "Grace");

        let last = service
            .list_contacts(owner, &ContactQuery { offset: 2, ..query })
            .unwrap();
        assert_eq!(last.contacts.len(), 1);
        assert!(!last.has_more);
    }

    #[test]
    fn test_find_by_email_address() {
        let (db, owner) = setup();
        let service = ContactService::new(&db);
        let mut new = NewContact::new("Ada", "Lovelace");
        new.emails = vec![EmailInput::new("Ada@Engine.org")];
        let id = service.create_contact(owner, new).unwrap().contact.id;

        let found = service
            .find_by_email_address(owner, "ada@engine.ORG")
            .unwrap()
            .unwrap();
        assert_eq!(found.contact.id, id);
        assert!(service.find_by_email_address(owner, "").unwrap().is_none());

        service.delete_contact(owner, id).unwrap();
        assert!(service
            .find_by_email_address(owner, "ada@engine.org")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_import_skips_existing_contacts() {
        let (db, owner) = setup();
        let service = ContactService::new(&db);
        let mut existing = NewContact::new("Ada", "Lovelace");
        existing.emails = vec![EmailInput::new("ada@x.com")];
        let existing_id = service.create_contact(owner, existing).unwrap().contact.id;

        let mut dup = NewContact::new("Augusta", "King");
        dup.emails = vec![EmailInput::new("ADA@x.com")];
        let fresh = NewContact::new("Alan", "Turing");
        let blank = NewContact::new("", "Nobody");

        let summary = service
            .import_contacts(owner, vec![dup, fresh, blank])
            .unwrap();
        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.skipped_ids, vec![existing_id]);
        assert_eq!(summary.invalid, 1);
        assert_eq!(db.count_contacts(owner, None).unwrap(), 2);
    }

    #[test]
    fn test_optional_text_and_primary_index() {
        assert_eq!(optional_text(Some("  x ")), Some("x".to_string()));
        assert_eq!(optional_text(Some("   ")), None);
        assert_eq!(optional_text(None), None);
        assert_eq!(primary_index([None, Some(true), Some(true)]), 1);
        assert_eq!(primary_index([Some(false), None]), 0);
    }
}
