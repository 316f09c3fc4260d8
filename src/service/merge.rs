//! Merging a secondary contact into a primary one.
//!
//! # Invariants
//! - The whole merge is one transaction: the primary's rewrite and its new
//!   version, the secondary's soft delete and the audit record commit
//!   together or not at all.
//! - Collections only grow; entries already on the primary are kept as is.

use chrono::{NaiveDate, Utc};
use log::{info, warn};
use std::collections::HashSet;
use uuid::Uuid;

use super::contacts::{commit_detail, load_active_detail};
use super::duplicates::{normalize_email, normalize_phone};
use super::versions::snapshot_of;
use crate::error::{CoreError, CoreResult};
use crate::models::{
    CollectionFlags, ContactDetail, ContactMergeRecord, Email, FieldResolution, MergeField,
    MergeResult, MergeSide, NotesMergeMode, Phone, Tag,
};
use crate::store::{ContactRepository, MergeRepository, Store, TagResolver};

/// Separator placed between the two notes when both are kept.
pub const NOTES_SEPARATOR: &str = "\n\n---\n\n";

pub struct MergeEngine<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> MergeEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn merge(
        &self,
        owner_id: Uuid,
        primary_id: Uuid,
        secondary_id: Uuid,
        resolution: &FieldResolution,
        flags: CollectionFlags,
    ) -> CoreResult<MergeResult> {
        if primary_id == secondary_id {
            return Err(CoreError::invalid_state("cannot merge a contact with itself"));
        }

        let result = self.store.transaction(|store| {
            let primary = load_active_detail(store, owner_id, primary_id)?;
            let secondary = load_active_detail(store, owner_id, secondary_id)?;
            merge_in(store, owner_id, primary, &secondary, resolution, flags)
        });

        match &result {
            Ok(result) => info!(
                "event=contact_merge module=service status=ok primary_id={} secondary_id={} emails={} phones={} tags={}",
                primary_id, secondary_id, result.emails_merged, result.phones_merged, result.tags_merged
            ),
            Err(err) => warn!(
                "event=contact_merge module=service status=error primary_id={} secondary_id={} error_code={}",
                primary_id,
                secondary_id,
                err.code()
            ),
        }
        result
    }
}

fn merge_in<S: Store>(
    store: &S,
    owner_id: Uuid,
    primary: ContactDetail,
    secondary: &ContactDetail,
    resolution: &FieldResolution,
    flags: CollectionFlags,
) -> CoreResult<MergeResult> {
    let before = snapshot_of(&primary);
    let mut from_primary = Vec::new();
    let mut from_secondary = Vec::new();
    let mut record = |field: MergeField, side: MergeSide| match side {
        MergeSide::Primary => from_primary.push(field),
        MergeSide::Secondary => from_secondary.push(field),
    };

    let ContactDetail {
        mut contact,
        emails,
        phones,
        tags,
    } = primary;
    let other = &secondary.contact;

    // Scalars
    let (first_name, side) = pick_text(
        Some(&contact.first_name),
        Some(&other.first_name),
        resolution.first_name,
    );
    record(MergeField::FirstName, side);
    contact.first_name = first_name.unwrap_or_default();

    let (last_name, side) = pick_text(
        Some(&contact.last_name),
        Some(&other.last_name),
        resolution.last_name,
    );
    record(MergeField::LastName, side);
    contact.last_name = last_name.unwrap_or_default();

    let (company, side) = pick_text(
        contact.company.as_ref(),
        other.company.as_ref(),
        resolution.company,
    );
    record(MergeField::Company, side);
    contact.company = company;

    let (title, side) = pick_text(contact.title.as_ref(), other.title.as_ref(), resolution.title);
    record(MergeField::Title, side);
    contact.title = title;

    let (linkedin_url, side) = pick_text(
        contact.linkedin_url.as_ref(),
        other.linkedin_url.as_ref(),
        resolution.linkedin_url,
    );
    record(MergeField::LinkedinUrl, side);
    contact.linkedin_url = linkedin_url;

    let (birthday, side) = pick_date(contact.birthday, other.birthday, resolution.birthday);
    record(MergeField::Birthday, side);
    contact.birthday = birthday;

    let (notes, sides) = merge_notes(contact.notes.as_ref(), other.notes.as_ref(), resolution.notes);
    for side in sides {
        record(MergeField::Notes, side);
    }
    contact.notes = notes;

    // Collections
    let (emails, emails_merged) = if flags.merge_emails {
        merge_emails(contact.id, emails, &secondary.emails)
    } else {
        (emails, 0)
    };
    let (phones, phones_merged) = if flags.merge_phones {
        merge_phones(contact.id, phones, &secondary.phones)
    } else {
        (phones, 0)
    };

    let mut names: Vec<String> = tags.iter().map(|t| t.name.clone()).collect();
    let mut known: HashSet<String> = names.iter().map(|n| Tag::key(n)).collect();
    let mut tags_merged = 0u32;
    if flags.merge_tags {
        for tag in &secondary.tags {
            if known.insert(Tag::key(&tag.name)) {
                names.push(tag.name.clone());
                tags_merged += 1;
            }
        }
    }
    let tags = store.find_or_create_tags(owner_id, &names)?;

    let now = Utc::now();
    contact.updated_at = now;
    let merged = ContactDetail {
        contact,
        emails,
        phones,
        tags,
    };
    commit_detail(store, &before, &merged)?;

    store.mark_deleted(other.id, now)?;
    store.insert_merge_record(&ContactMergeRecord {
        id: Uuid::new_v4(),
        owner_id,
        primary_contact_id: merged.contact.id,
        primary_name: merged.contact.display_name(),
        secondary_contact_id: other.id,
        secondary_name: other.display_name(),
        emails_merged,
        phones_merged,
        tags_merged,
        created_at: now,
    })?;

    Ok(MergeResult {
        merged_contact_id: merged.contact.id,
        deleted_contact_id: other.id,
        fields_from_primary: from_primary,
        fields_from_secondary: from_secondary,
        emails_merged,
        phones_merged,
        tags_merged,
    })
}

fn has_text(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Preferred side's value when non-empty, else the other side's.
fn pick_text(
    primary: Option<&String>,
    secondary: Option<&String>,
    prefer: MergeSide,
) -> (Option<String>, MergeSide) {
    match prefer {
        MergeSide::Primary if has_text(primary) || !has_text(secondary) => {
            (primary.cloned(), MergeSide::Primary)
        }
        MergeSide::Primary => (secondary.cloned(), MergeSide::Secondary),
        MergeSide::Secondary if has_text(secondary) || !has_text(primary) => {
            (secondary.cloned(), MergeSide::Secondary)
        }
        MergeSide::Secondary => (primary.cloned(), MergeSide::Primary),
    }
}

fn pick_date(
    primary: Option<NaiveDate>,
    secondary: Option<NaiveDate>,
    prefer: MergeSide,
) -> (Option<NaiveDate>, MergeSide) {
    match prefer {
        MergeSide::Primary if primary.is_some() || secondary.is_none() => {
            (primary, MergeSide::Primary)
        }
        MergeSide::Primary => (secondary, MergeSide::Secondary),
        MergeSide::Secondary if secondary.is_some() || primary.is_none() => {
            (secondary, MergeSide::Secondary)
        }
        MergeSide::Secondary => (primary, MergeSide::Primary),
    }
}

/// Resolved notes and every side that contributed text.
fn merge_notes(
    primary: Option<&String>,
    secondary: Option<&String>,
    mode: NotesMergeMode,
) -> (Option<String>, Vec<MergeSide>) {
    match mode {
        NotesMergeMode::Primary => {
            let (notes, side) = pick_text(primary, secondary, MergeSide::Primary);
            (notes, vec![side])
        }
        NotesMergeMode::Secondary => {
            let (notes, side) = pick_text(primary, secondary, MergeSide::Secondary);
            (notes, vec![side])
        }
        NotesMergeMode::Merge => match (has_text(primary), has_text(secondary)) {
            (true, true) => {
                let joined = format!(
                    "{}{}{}",
                    primary.map(|s| s.trim()).unwrap_or_default(),
                    NOTES_SEPARATOR,
                    secondary.map(|s| s.trim()).unwrap_or_default()
                );
                (Some(joined), vec![MergeSide::Primary, MergeSide::Secondary])
            }
            (false, true) => (secondary.cloned(), vec![MergeSide::Secondary]),
            _ => (primary.cloned(), vec![MergeSide::Primary]),
        },
    }
}

/// Primary's emails followed by the secondary's unseen addresses.
fn merge_emails(contact_id: Uuid, mut emails: Vec<Email>, extra: &[Email]) -> (Vec<Email>, u32) {
    let mut known: HashSet<String> = emails.iter().map(|e| normalize_email(&e.address)).collect();
    let mut added = 0;

    for email in extra {
        if known.insert(normalize_email(&email.address)) {
            let mut copy = Email::new(contact_id, email.address.clone());
            copy.label = email.label;
            emails.push(copy);
            added += 1;
        }
    }
    if !emails.is_empty() && !emails.iter().any(|e| e.is_primary) {
        emails[0].is_primary = true;
    }
    (emails, added)
}

/// Primary's phones followed by the secondary's unseen numbers.
fn merge_phones(contact_id: Uuid, mut phones: Vec<Phone>, extra: &[Phone]) -> (Vec<Phone>, u32) {
    let mut known: HashSet<String> = phones.iter().map(|p| normalize_phone(&p.number)).collect();
    let mut added = 0;

    for phone in extra {
        if known.insert(normalize_phone(&phone.number)) {
            let mut copy = Phone::new(contact_id, phone.number.clone());
            copy.label = phone.label;
            phones.push(copy);
            added += 1;
        }
    }
    if !phones.is_empty() && !phones.iter().any(|p| p.is_primary) {
        phones[0].is_primary = true;
    }
    (phones, added)
}
