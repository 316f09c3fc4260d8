use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::{EmailLabel, PhoneLabel};

/// Structural form of an email inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EmailSnapshot {
    pub address: String,
    pub label: EmailLabel,
    pub is_primary: bool,
}

/// Structural form of a phone inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhoneSnapshot {
    pub number: String,
    pub label: PhoneLabel,
    pub is_primary: bool,
}

/// Full versionable state of a contact.
///
/// Collections are stored in canonical order (see `service::versions::snapshot_of`
/// and `canonical_tags`), so two snapshots of the same state compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Snapshot {
    pub first_name: String,
    pub last_name: String,
    pub company: Option<String>,
    pub title: Option<String>,
    pub birthday: Option<NaiveDate>,
    pub linkedin_url: Option<String>,
    pub notes: Option<String>,
    pub emails: Vec<EmailSnapshot>,
    pub phones: Vec<PhoneSnapshot>,
    pub tags: Vec<String>,
}

/// Every field a snapshot carries, in diff/report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotField {
    FirstName,
    LastName,
    Company,
    Title,
    Birthday,
    LinkedinUrl,
    Notes,
    Emails,
    Phones,
    Tags,
}

impl SnapshotField {
    pub const ALL: [SnapshotField; 10] = [
        Self::FirstName,
        Self::LastName,
        Self::Company,
        Self::Title,
        Self::Birthday,
        Self::LinkedinUrl,
        Self::Notes,
        Self::Emails,
        Self::Phones,
        Self::Tags,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Company => "company",
            Self::Title => "title",
            Self::Birthday => "birthday",
            Self::LinkedinUrl => "linkedin_url",
            Self::Notes => "notes",
            Self::Emails => "emails",
            Self::Phones => "phones",
            Self::Tags => "tags",
        }
    }
}

impl fmt::Display for SnapshotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed value of one snapshot field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(Option<String>),
    Date(Option<NaiveDate>),
    Emails(Vec<EmailSnapshot>),
    Phones(Vec<PhoneSnapshot>),
    Tags(Vec<String>),
}

impl Snapshot {
    pub fn value(&self, field: SnapshotField) -> FieldValue {
        match field {
            SnapshotField::FirstName => FieldValue::Text(Some(self.first_name.clone())),
            SnapshotField::LastName => FieldValue::Text(Some(self.last_name.clone())),
            SnapshotField::Company => FieldValue::Text(self.company.clone()),
            SnapshotField::Title => FieldValue::Text(self.title.clone()),
            SnapshotField::Birthday => FieldValue::Date(self.birthday),
            SnapshotField::LinkedinUrl => FieldValue::Text(self.linkedin_url.clone()),
            SnapshotField::Notes => FieldValue::Text(self.notes.clone()),
            SnapshotField::Emails => FieldValue::Emails(self.emails.clone()),
            SnapshotField::Phones => FieldValue::Phones(self.phones.clone()),
            SnapshotField::Tags => FieldValue::Tags(self.tags.clone()),
        }
    }
}

/// Value of `field` in a state that has no usable snapshot.
pub fn empty_value(field: SnapshotField) -> FieldValue {
    match field {
        SnapshotField::Birthday => FieldValue::Date(None),
        SnapshotField::Emails => FieldValue::Emails(Vec::new()),
        SnapshotField::Phones => FieldValue::Phones(Vec::new()),
        SnapshotField::Tags => FieldValue::Tags(Vec::new()),
        _ => FieldValue::Text(None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub from: FieldValue,
    pub to: FieldValue,
}

/// Fields that differ between two consecutive snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Changes(BTreeMap<SnapshotField, FieldChange>);

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: SnapshotField, change: FieldChange) {
        self.0.insert(field, change);
    }

    pub fn get(&self, field: SnapshotField) -> Option<&FieldChange> {
        self.0.get(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> Vec<SnapshotField> {
        self.0.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SnapshotField, &FieldChange)> {
        self.0.iter()
    }
}

/// Immutable, append-only history row for a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactVersion {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub version: u32,
    pub snapshot: Snapshot,
    pub changes: Changes,
    pub created_at: DateTime<Utc>,
}
