use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which contact's value to keep for a scalar field during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergeSide {
    #[default]
    Primary,
    Secondary,
}

/// Notes additionally support concatenating both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotesMergeMode {
    #[default]
    Primary,
    Secondary,
    Merge,
}

impl NotesMergeMode {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "secondary" => Self::Secondary,
            "merge" => Self::Merge,
            _ => Self::Primary,
        }
    }
}

/// Scalar fields the merge engine resolves one by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeField {
    FirstName,
    LastName,
    Company,
    Title,
    LinkedinUrl,
    Birthday,
    Notes,
}

impl MergeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Company => "company",
            Self::Title => "title",
            Self::LinkedinUrl => "linkedin_url",
            Self::Birthday => "birthday",
            Self::Notes => "notes",
        }
    }
}

/// Per-field override of the default "keep primary unless empty" policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldResolution {
    pub first_name: MergeSide,
    pub last_name: MergeSide,
    pub company: MergeSide,
    pub title: MergeSide,
    pub linkedin_url: MergeSide,
    pub birthday: MergeSide,
    pub notes: NotesMergeMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionFlags {
    pub merge_emails: bool,
    pub merge_phones: bool,
    pub merge_tags: bool,
}

impl Default for CollectionFlags {
    fn default() -> Self {
        Self {
            merge_emails: true,
            merge_phones: true,
            merge_tags: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub merged_contact_id: Uuid,
    pub deleted_contact_id: Uuid,
    pub fields_from_primary: Vec<MergeField>,
    pub fields_from_secondary: Vec<MergeField>,
    pub emails_merged: u32,
    pub phones_merged: u32,
    pub tags_merged: u32,
}

/// Audit entry written once per merge. Never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMergeRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub primary_contact_id: Uuid,
    pub primary_name: String,
    pub secondary_contact_id: Uuid,
    pub secondary_name: String,
    pub emails_merged: u32,
    pub phones_merged: u32,
    pub tags_merged: u32,
    pub created_at: DateTime<Utc>,
}
