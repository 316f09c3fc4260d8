//! Contact history: snapshots, diffs and the append-only version log.
//!
//! # Invariants
//! - Version numbers per contact are `1..=N` without gaps.
//! - Version 1 carries an empty change set.
//! - A mutation whose diff is empty appends nothing.
//! - Collections are canonicalized before comparison, so reordering alone
//!   never registers as a change.

use chrono::{DateTime, Utc};
use log::{debug, info};
use uuid::Uuid;

use super::contacts::{ContactService, ContactUpdate, UpdateOutcome};
use crate::error::{CoreError, CoreResult};
use crate::models::{
    empty_value, Changes, Contact, ContactDetail, ContactVersion, EmailSnapshot, FieldChange,
    PhoneSnapshot, Snapshot, SnapshotField,
};
use crate::store::{ContactRepository, Store, VersionRepository};

/// Project a contact and its collections onto its versionable state.
pub fn snapshot_of(detail: &ContactDetail) -> Snapshot {
    let contact: &Contact = &detail.contact;

    let mut emails: Vec<EmailSnapshot> = detail
        .emails
        .iter()
        .map(|e| EmailSnapshot {
            address: e.address.clone(),
            label: e.label,
            is_primary: e.is_primary,
        })
        .collect();
    emails.sort();

    let mut phones: Vec<PhoneSnapshot> = detail
        .phones
        .iter()
        .map(|p| PhoneSnapshot {
            number: p.number.clone(),
            label: p.label,
            is_primary: p.is_primary,
        })
        .collect();
    phones.sort();

    Snapshot {
        first_name: contact.first_name.clone(),
        last_name: contact.last_name.clone(),
        company: contact.company.clone(),
        title: contact.title.clone(),
        birthday: contact.birthday,
        linkedin_url: contact.linkedin_url.clone(),
        notes: contact.notes.clone(),
        emails,
        phones,
        tags: canonical_tags(detail.tags.iter().map(|t| t.name.clone())),
    }
}

/// Tag names sorted case-insensitively, ties broken by exact spelling.
pub fn canonical_tags(names: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = names.into_iter().collect();
    names.sort_by(|a, b| {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    });
    names
}

/// Fields that differ between `previous` and `current`.
///
/// A missing previous snapshot reports every field as changed from its
/// empty value. Never fails.
pub fn diff(previous: Option<&Snapshot>, current: &Snapshot) -> Changes {
    let mut changes = Changes::new();

    for field in SnapshotField::ALL {
        let to = canonical_value(current, field);
        let from = match previous {
            Some(previous) => canonical_value(previous, field),
            None => empty_value(field),
        };

        if previous.is_none() || from != to {
            changes.insert(field, FieldChange { from, to });
        }
    }

    changes
}

// Stored snapshots written by older code may not be canonical; compare
// their collections in canonical order anyway.
fn canonical_value(snapshot: &Snapshot, field: SnapshotField) -> crate::models::FieldValue {
    use crate::models::FieldValue;

    match snapshot.value(field) {
        FieldValue::Emails(mut emails) => {
            emails.sort();
            FieldValue::Emails(emails)
        }
        FieldValue::Phones(mut phones) => {
            phones.sort();
            FieldValue::Phones(phones)
        }
        FieldValue::Tags(tags) => FieldValue::Tags(canonical_tags(tags)),
        other => other,
    }
}

/// Append `max + 1` for the contact when the diff is non-empty.
///
/// Must run inside the transaction that performed the mutation.
pub fn append_version<S: VersionRepository>(
    store: &S,
    contact_id: Uuid,
    previous: &Snapshot,
    current: &Snapshot,
    at: DateTime<Utc>,
) -> CoreResult<Option<ContactVersion>> {
    let changes = diff(Some(previous), current);
    if changes.is_empty() {
        debug!(
            "event=version_skip module=service contact_id={} reason=no_changes",
            contact_id
        );
        return Ok(None);
    }

    let version = ContactVersion {
        id: Uuid::new_v4(),
        contact_id,
        version: store.max_version(contact_id)? + 1,
        snapshot: current.clone(),
        changes,
        created_at: at,
    };
    store.insert_version(&version)?;

    debug!(
        "event=version_append module=service contact_id={} version={} fields={}",
        contact_id,
        version.version,
        version.changes.len()
    );
    Ok(Some(version))
}

/// Version 1, written together with the contact row.
pub fn write_initial_version<S: VersionRepository>(
    store: &S,
    contact_id: Uuid,
    snapshot: &Snapshot,
    at: DateTime<Utc>,
) -> CoreResult<ContactVersion> {
    let version = ContactVersion {
        id: Uuid::new_v4(),
        contact_id,
        version: 1,
        snapshot: snapshot.clone(),
        changes: Changes::new(),
        created_at: at,
    };
    store.insert_version(&version)?;
    Ok(version)
}

/// Parse a caller-supplied version number; versions start at 1.
pub fn parse_version_number(raw: &str) -> CoreResult<u32> {
    match raw.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(CoreError::validation(format!(
            "invalid version number: {raw:?}"
        ))),
        Ok(n) => Ok(n),
    }
}

/// Read and restore access to a contact's history.
pub struct VersionService<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> VersionService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// All versions, newest first. History of soft-deleted contacts stays readable.
    pub fn get_versions(&self, owner_id: Uuid, contact_id: Uuid) -> CoreResult<Vec<ContactVersion>> {
        self.require_contact(owner_id, contact_id)?;
        self.store.list_versions(contact_id)
    }

    pub fn get_version(
        &self,
        owner_id: Uuid,
        contact_id: Uuid,
        version: u32,
    ) -> CoreResult<ContactVersion> {
        if version == 0 {
            return Err(CoreError::validation("version numbers start at 1"));
        }
        self.require_contact(owner_id, contact_id)?;
        self.store
            .get_version(contact_id, version)?
            .ok_or_else(|| CoreError::not_found(format!("version {version} of contact {contact_id}")))
    }

    /// Re-apply version `version` through the regular update path.
    ///
    /// Restoring appends a new version; history is never rewound.
    pub fn restore_version(
        &self,
        owner_id: Uuid,
        contact_id: Uuid,
        version: u32,
    ) -> CoreResult<UpdateOutcome> {
        let target = self.get_version(owner_id, contact_id, version)?;
        let update = ContactUpdate::from_snapshot(&target.snapshot);

        let outcome = ContactService::new(self.store).update_contact(owner_id, contact_id, update)?;
        info!(
            "event=version_restore module=service status=ok contact_id={} restored={} new_version={}",
            contact_id,
            version,
            outcome
                .version
                .as_ref()
                .map(|v| v.version.to_string())
                .unwrap_or_else(|| "none".to_string())
        );
        Ok(outcome)
    }

    fn require_contact(&self, owner_id: Uuid, contact_id: Uuid) -> CoreResult<Contact> {
        self.store
            .get_contact(owner_id, contact_id)?
            .ok_or_else(|| CoreError::not_found(format!("contact {contact_id}")))
    }
}
