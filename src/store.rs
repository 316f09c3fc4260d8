//! Storage contracts the services are written against.
//!
//! # Responsibility
//! - Describe the data access each service needs, independent of SQLite.
//! - Let callers inject any implementation through the service constructors.
//!
//! # Invariants
//! - Every method is owner-scoped where the entity is owner-partitioned;
//!   rows of other owners behave as absent.
//! - `Store::transaction` runs the closure atomically: an `Err` from the
//!   closure leaves no trace of its writes.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::{
    ActivityItem, Contact, ContactEditedItem, ContactMergeRecord, ContactMergedItem, ContactQuery,
    ContactVersion, Email, Phone, Tag,
};

pub trait ContactRepository {
    fn insert_contact(&self, contact: &Contact) -> CoreResult<()>;
    /// Persist scalar fields and `updated_at`.
    fn update_contact(&self, contact: &Contact) -> CoreResult<()>;
    /// Fetch by id within an owner, soft-deleted rows included.
    fn get_contact(&self, owner_id: Uuid, id: Uuid) -> CoreResult<Option<Contact>>;
    fn mark_deleted(&self, id: Uuid, at: DateTime<Utc>) -> CoreResult<bool>;
    fn list_contacts(&self, owner_id: Uuid, query: &ContactQuery) -> CoreResult<Vec<Contact>>;
    fn count_contacts(&self, owner_id: Uuid, search: Option<&str>) -> CoreResult<u32>;

    fn emails_for_contact(&self, contact_id: Uuid) -> CoreResult<Vec<Email>>;
    /// Delete every email of the contact, then insert `emails` in order.
    fn replace_emails(&self, contact_id: Uuid, emails: &[Email]) -> CoreResult<()>;
    fn phones_for_contact(&self, contact_id: Uuid) -> CoreResult<Vec<Phone>>;
    fn replace_phones(&self, contact_id: Uuid, phones: &[Phone]) -> CoreResult<()>;
    fn tags_for_contact(&self, contact_id: Uuid) -> CoreResult<Vec<Tag>>;
    fn replace_tags(&self, contact_id: Uuid, tags: &[Tag]) -> CoreResult<()>;

    /// Active contacts owning `address`, compared case-insensitively.
    fn find_contacts_by_email(&self, owner_id: Uuid, address: &str) -> CoreResult<Vec<Contact>>;
    /// Active contacts whose (first, last) equals the given pair or its swap,
    /// compared case-insensitively.
    fn find_contacts_by_name(
        &self,
        owner_id: Uuid,
        first_name: &str,
        last_name: &str,
    ) -> CoreResult<Vec<Contact>>;
}

/// Find-or-create of owner-scoped tags by name.
pub trait TagResolver {
    fn find_or_create_tags(&self, owner_id: Uuid, names: &[String]) -> CoreResult<Vec<Tag>>;
}

pub trait VersionRepository {
    /// Highest version number for the contact, 0 when none exist.
    fn max_version(&self, contact_id: Uuid) -> CoreResult<u32>;
    fn insert_version(&self, version: &ContactVersion) -> CoreResult<()>;
    /// All versions, newest first.
    fn list_versions(&self, contact_id: Uuid) -> CoreResult<Vec<ContactVersion>>;
    fn get_version(&self, contact_id: Uuid, version: u32) -> CoreResult<Option<ContactVersion>>;
}

pub trait MergeRepository {
    fn insert_merge_record(&self, record: &ContactMergeRecord) -> CoreResult<()>;
}

/// Read side of the activity feed plus the hidden-contact toggle.
///
/// Event streams never include contacts the owner has hidden.
pub trait FeedRepository {
    /// Returns false when the contact was already hidden.
    fn hide_contact(&self, owner_id: Uuid, contact_id: Uuid) -> CoreResult<bool>;
    /// Returns false when the contact was not hidden.
    fn unhide_contact(&self, owner_id: Uuid, contact_id: Uuid) -> CoreResult<bool>;

    /// Versions after the first, newest first.
    fn contact_edit_events(&self, owner_id: Uuid, limit: u32) -> CoreResult<Vec<ContactEditedItem>>;
    /// Merges where neither side is hidden, newest first.
    fn merge_events(&self, owner_id: Uuid, limit: u32) -> CoreResult<Vec<ContactMergedItem>>;
    /// `TaskCreated` and `TaskCompleted` items, newest first. Unlinked tasks
    /// are always included.
    fn task_events(&self, owner_id: Uuid, limit: u32) -> CoreResult<Vec<ActivityItem>>;
}

/// Everything the services need, plus a transaction scope.
pub trait Store:
    ContactRepository + TagResolver + VersionRepository + MergeRepository + FeedRepository
{
    fn transaction<T, F>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&Self) -> CoreResult<T>;
}
