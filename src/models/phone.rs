use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PhoneLabel {
    #[default]
    Mobile,
    Home,
    Work,
    Fax,
    Other,
}

impl PhoneLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Home => "home",
            Self::Work => "work",
            Self::Fax => "fax",
            Self::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "home" => Self::Home,
            "work" => Self::Work,
            "fax" => Self::Fax,
            "other" => Self::Other,
            "cell" | "cellular" => Self::Mobile,
            _ => Self::Mobile,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub number: String,
    pub label: PhoneLabel,
    pub is_primary: bool,
}

impl Phone {
    pub fn new(contact_id: Uuid, number: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact_id,
            number,
            label: PhoneLabel::default(),
            is_primary: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneInput {
    pub number: String,
    pub label: PhoneLabel,
    pub is_primary: Option<bool>,
}

impl PhoneInput {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            label: PhoneLabel::default(),
            is_primary: None,
        }
    }
}
