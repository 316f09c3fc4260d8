use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmailLabel {
    #[default]
    Personal,
    Work,
    School,
    Other,
}

impl EmailLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Work => "work",
            Self::School => "school",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "work" => Self::Work,
            "school" => Self::School,
            "other" => Self::Other,
            _ => Self::Personal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub address: String,
    pub label: EmailLabel,
    pub is_primary: bool,
}

impl Email {
    pub fn new(contact_id: Uuid, address: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact_id,
            address,
            label: EmailLabel::default(),
            is_primary: false,
        }
    }
}

/// Identity of an email address: trimmed, lowercased (full Unicode folding).
pub fn normalize_email(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Caller-supplied email. `is_primary: None` lets the store pick the first entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailInput {
    pub address: String,
    pub label: EmailLabel,
    pub is_primary: Option<bool>,
}

impl EmailInput {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            label: EmailLabel::default(),
            is_primary: None,
        }
    }
}
