use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SnapshotField;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEditedItem {
    pub contact_id: Uuid,
    pub contact_name: String,
    pub version: u32,
    pub changed_fields: Vec<SnapshotField>,
    pub timestamp: DateTime<Utc>,
}

/// A run of edits to one contact collapsed into a single feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEditedGroup {
    pub contact_id: Uuid,
    pub contact_name: String,
    pub edit_count: u32,
    pub members: Vec<ContactEditedItem>,
    pub latest_timestamp: DateTime<Utc>,
    pub earliest_timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMergedItem {
    pub merge_id: Uuid,
    pub primary_contact_id: Uuid,
    pub secondary_contact_id: Uuid,
    pub primary_name: String,
    pub secondary_name: String,
    pub emails_merged: u32,
    pub phones_merged: u32,
    pub tags_merged: u32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskActivityItem {
    pub task_id: Uuid,
    pub title: String,
    pub contact_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityItem {
    ContactEdited(ContactEditedItem),
    ContactEditedGroup(ContactEditedGroup),
    ContactMerged(ContactMergedItem),
    TaskCreated(TaskActivityItem),
    TaskCompleted(TaskActivityItem),
}

impl ActivityItem {
    /// Timestamp used for global ordering. Groups order by their latest member.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ContactEdited(item) => item.timestamp,
            Self::ContactEditedGroup(group) => group.latest_timestamp,
            Self::ContactMerged(item) => item.timestamp,
            Self::TaskCreated(item) | Self::TaskCompleted(item) => item.timestamp,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ContactEdited(_) => "contact_edited",
            Self::ContactEditedGroup(_) => "contact_edited_group",
            Self::ContactMerged(_) => "contact_merged",
            Self::TaskCreated(_) => "task_created",
            Self::TaskCompleted(_) => "task_completed",
        }
    }

    /// Whether this entry refers to `contact_id` in any role.
    pub fn mentions(&self, contact_id: Uuid) -> bool {
        match self {
            Self::ContactEdited(item) => item.contact_id == contact_id,
            Self::ContactEditedGroup(group) => group.contact_id == contact_id,
            Self::ContactMerged(item) => {
                item.primary_contact_id == contact_id || item.secondary_contact_id == contact_id
            }
            Self::TaskCreated(item) | Self::TaskCompleted(item) => {
                item.contact_id == Some(contact_id)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedPage {
    pub limit: u32,
    pub offset: u32,
}

impl Default for FeedPage {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityFeed {
    pub activities: Vec<ActivityItem>,
    pub has_more: bool,
}
