use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Owner-scoped tag. Names are unique per owner, case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(owner_id: Uuid, name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            created_at: Utc::now(),
        }
    }

    /// Case-folded form that decides whether two names are the same tag.
    pub fn key(name: &str) -> String {
        name.trim().to_lowercase()
    }
}
