use serde::{Deserialize, Serialize};

use super::{Contact, Email, Phone, Tag};

/// Full contact detail - a contact with its child collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetail {
    pub contact: Contact,
    pub emails: Vec<Email>,
    pub phones: Vec<Phone>,
    pub tags: Vec<Tag>,
}

impl ContactDetail {
    /// Get the primary email address, if any
    pub fn primary_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|e| e.is_primary)
            .or_else(|| self.emails.first())
            .map(|e| e.address.as_str())
    }

    /// Get the primary phone number, if any
    pub fn primary_phone(&self) -> Option<&str> {
        self.phones
            .iter()
            .find(|p| p.is_primary)
            .or_else(|| self.phones.first())
            .map(|p| p.number.as_str())
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.tags.iter().map(|t| t.name.clone()).collect()
    }
}
