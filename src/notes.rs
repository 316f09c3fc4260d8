//! Structured notes document stored in `Contact.notes`.
//!
//! The text form is the one wire format both the human UI and the automated
//! notes writer read and write:
//!
//! ```text
//! Free text written before any section header is kept as-is.
//!
//! ## Relationship Summary
//! - **Relationship:** Former colleague
//!
//! ## Interests & Goals
//! - **Goals:** Raise a seed round
//! - **Goals:** Hire a CTO
//!
//! ## History
//! - 2024-05-02: Coffee at Blue Bottle
//!
//! ## Current Status
//! - **Stage:** Warm intro pending
//!
//! ## Preferences
//! - **Channel:** Email
//! ```
//!
//! # Invariants
//! - Parsing never fails; unrecognized lines land in a section's `raw`
//!   list or in `unstructured`. History is the exception: lines without a
//!   leading `YYYY-MM-DD` are dropped.
//! - `serialize` is a normal form: for documents built through
//!   `apply_update`, `serialize(parse(serialize(d))) == serialize(d)`.

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static FIELD_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-*]\s+\*\*([^*]+?)(?::\*\*|\*\*:)\s*(.*)$").expect("valid field line regex")
});
static HISTORY_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*]\s+)?(\d{4}-\d{2}-\d{2})\b\s*(?:[:\-–—]\s*)?(.*)$")
        .expect("valid history line regex")
});
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteSection {
    RelationshipSummary,
    Interests,
    History,
    CurrentStatus,
    Preferences,
}

impl NoteSection {
    pub const ALL: [NoteSection; 5] = [
        Self::RelationshipSummary,
        Self::Interests,
        Self::History,
        Self::CurrentStatus,
        Self::Preferences,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::RelationshipSummary => "Relationship Summary",
            Self::Interests => "Interests & Goals",
            Self::History => "History",
            Self::CurrentStatus => "Current Status",
            Self::Preferences => "Preferences",
        }
    }

    /// Match a section name, case-insensitively, including common aliases.
    pub fn parse(name: &str) -> Option<Self> {
        let key = normalize_key(name);
        match key.as_str() {
            "relationship summary" | "relationship" | "summary" => Some(Self::RelationshipSummary),
            "interests & goals" | "interests and goals" | "interests" | "goals" => {
                Some(Self::Interests)
            }
            "history" | "chronological history" | "timeline" => Some(Self::History),
            "current status" | "status" => Some(Self::CurrentStatus),
            "preferences" => Some(Self::Preferences),
            _ => None,
        }
    }

    fn from_header_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if !trimmed.starts_with('#') {
            return None;
        }
        Self::parse(trimmed.trim_start_matches('#'))
    }
}

/// Labelled fields recognized inside the non-history sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteField {
    Relationship,
    HowWeMet,
    Strength,
    Goals,
    Pains,
    HotButtons,
    Personal,
    Stage,
    NextStep,
    Risks,
    Landmines,
    Channel,
    Cadence,
    Tone,
}

impl NoteField {
    pub fn section(&self) -> NoteSection {
        match self {
            Self::Relationship | Self::HowWeMet | Self::Strength => NoteSection::RelationshipSummary,
            Self::Goals | Self::Pains | Self::HotButtons | Self::Personal => NoteSection::Interests,
            Self::Stage | Self::NextStep | Self::Risks | Self::Landmines => {
                NoteSection::CurrentStatus
            }
            Self::Channel | Self::Cadence | Self::Tone => NoteSection::Preferences,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Relationship => "Relationship",
            Self::HowWeMet => "How We Met",
            Self::Strength => "Strength",
            Self::Goals => "Goals",
            Self::Pains => "Pains",
            Self::HotButtons => "Hot Buttons",
            Self::Personal => "Personal",
            Self::Stage => "Stage",
            Self::NextStep => "Next Step",
            Self::Risks => "Risks",
            Self::Landmines => "Landmines",
            Self::Channel => "Channel",
            Self::Cadence => "Cadence",
            Self::Tone => "Tone",
        }
    }

    /// List fields accumulate distinct values; the rest hold a single value.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            Self::Goals
                | Self::Pains
                | Self::HotButtons
                | Self::Personal
                | Self::Risks
                | Self::Landmines
        )
    }

    /// Resolve a label within `section`. Labels of other sections do not match.
    pub fn parse(section: NoteSection, label: &str) -> Option<Self> {
        let field = match normalize_key(label).as_str() {
            "relationship" => Self::Relationship,
            "how we met" | "met" => Self::HowWeMet,
            "strength" => Self::Strength,
            "goals" | "goal" => Self::Goals,
            "pains" | "pain" | "pain points" => Self::Pains,
            "hot buttons" | "hotbuttons" | "hot button" => Self::HotButtons,
            "personal" => Self::Personal,
            "stage" => Self::Stage,
            "next step" | "next steps" => Self::NextStep,
            "risks" | "risk" => Self::Risks,
            "landmines" | "landmine" => Self::Landmines,
            "channel" | "preferred channel" => Self::Channel,
            "cadence" => Self::Cadence,
            "tone" => Self::Tone,
            _ => return None,
        };
        (field.section() == section).then_some(field)
    }
}

/// Labelled values plus the overflow lines of one non-history section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSection {
    pub fields: BTreeMap<NoteField, Vec<String>>,
    pub raw: Vec<String>,
}

impl FieldSection {
    pub fn is_empty(&self) -> bool {
        self.fields.values().all(Vec::is_empty) && self.raw.is_empty()
    }

    pub fn values(&self, field: NoteField) -> &[String] {
        self.fields.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    fn absorb_line(&mut self, section: NoteSection, line: &str) {
        if let Some((field, value)) = match_field_line(section, line) {
            if !value.is_empty() {
                let values = self.fields.entry(field).or_default();
                if field.is_list() || values.is_empty() {
                    values.push(value);
                    return;
                }
            }
        }
        self.raw.push(line.to_string());
    }

    fn lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (field, values) in &self.fields {
            for value in values {
                lines.push(format!("- **{}:** {}", field.label(), value));
            }
        }
        lines.extend(self.raw.iter().cloned());
        lines
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: NaiveDate,
    pub text: String,
}

/// One change requested by a caller (human or automated writer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesUpdate {
    pub section: NoteSection,
    /// Field label; `None` appends a free bullet to the section.
    pub field: Option<String>,
    pub value: String,
    /// History date; defaults to today.
    pub date: Option<NaiveDate>,
}

impl NotesUpdate {
    pub fn field(section: NoteSection, field: &str, value: impl Into<String>) -> Self {
        Self {
            section,
            field: Some(field.to_string()),
            value: value.into(),
            date: None,
        }
    }

    pub fn history(date: NaiveDate, value: impl Into<String>) -> Self {
        Self {
            section: NoteSection::History,
            field: None,
            value: value.into(),
            date: Some(date),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesDocument {
    pub unstructured: Option<String>,
    pub summary: FieldSection,
    pub interests: FieldSection,
    pub history: Vec<HistoryEntry>,
    pub status: FieldSection,
    pub preferences: FieldSection,
}

impl NotesDocument {
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::default();
        let mut current: Option<NoteSection> = None;
        let mut preamble: Vec<&str> = Vec::new();

        for line in text.lines() {
            if let Some(section) = NoteSection::from_header_line(line) {
                current = Some(section);
                continue;
            }

            match current {
                None => preamble.push(line),
                Some(NoteSection::History) => {
                    if let Some(entry) = parse_history_line(line) {
                        doc.history.push(entry);
                    }
                }
                Some(section) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    if let Some(target) = doc.section_mut(section) {
                        target.absorb_line(section, trimmed);
                    }
                }
            }
        }

        let preamble = preamble.join("\n");
        let preamble = preamble.trim();
        if !preamble.is_empty() {
            doc.unstructured = Some(preamble.to_string());
        }

        doc
    }

    pub fn serialize(&self) -> String {
        let mut blocks: Vec<String> = Vec::new();

        if let Some(text) = self.unstructured.as_deref().map(str::trim) {
            if !text.is_empty() {
                blocks.push(text.to_string());
            }
        }

        for section in NoteSection::ALL {
            let lines = match section {
                NoteSection::History => self.sorted_history_lines(),
                _ => self.section(section).map(FieldSection::lines).unwrap_or_default(),
            };
            if lines.is_empty() {
                continue;
            }
            blocks.push(format!("## {}\n{}", section.title(), lines.join("\n")));
        }

        blocks.join("\n\n")
    }

    pub fn apply_update(&mut self, update: &NotesUpdate) {
        let value = collapse_whitespace(&update.value);

        if update.section == NoteSection::History {
            if value.is_empty() {
                return;
            }
            let date = update.date.unwrap_or_else(|| Utc::now().date_naive());
            self.history.push(HistoryEntry { date, text: value });
            return;
        }

        let section = update.section;
        let Some(target) = self.section_mut(section) else {
            return;
        };

        let Some(label) = update.field.as_deref().map(sanitize_label) else {
            if value.is_empty() {
                return;
            }
            let line = format!("- {value}");
            if !target.raw.contains(&line) {
                target.absorb_line(section, &line);
            }
            return;
        };

        match NoteField::parse(section, &label) {
            Some(field) if field.is_list() => {
                if value.is_empty() {
                    return;
                }
                let values = target.fields.entry(field).or_default();
                if !values.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
                    values.push(value);
                }
            }
            Some(field) => {
                if value.is_empty() {
                    target.fields.remove(&field);
                    target
                        .raw
                        .retain(|line| match_field_line(section, line).map(|(f, _)| f) != Some(field));
                } else {
                    target.fields.insert(field, vec![value]);
                }
            }
            None => {
                if value.is_empty() || label.is_empty() {
                    return;
                }
                let line = format!("- **{label}:** {value}");
                if !target.raw.contains(&line) {
                    target.absorb_line(section, &line);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.unstructured.is_none()
            && self.summary.is_empty()
            && self.interests.is_empty()
            && self.history.is_empty()
            && self.status.is_empty()
            && self.preferences.is_empty()
    }

    /// Field section for `section`; `None` for history.
    pub fn section(&self, section: NoteSection) -> Option<&FieldSection> {
        match section {
            NoteSection::RelationshipSummary => Some(&self.summary),
            NoteSection::Interests => Some(&self.interests),
            NoteSection::History => None,
            NoteSection::CurrentStatus => Some(&self.status),
            NoteSection::Preferences => Some(&self.preferences),
        }
    }

    fn section_mut(&mut self, section: NoteSection) -> Option<&mut FieldSection> {
        match section {
            NoteSection::RelationshipSummary => Some(&mut self.summary),
            NoteSection::Interests => Some(&mut self.interests),
            NoteSection::History => None,
            NoteSection::CurrentStatus => Some(&mut self.status),
            NoteSection::Preferences => Some(&mut self.preferences),
        }
    }

    pub fn values(&self, field: NoteField) -> &[String] {
        self.section(field.section())
            .map(|s| s.values(field))
            .unwrap_or(&[])
    }

    fn sorted_history_lines(&self) -> Vec<String> {
        let mut entries: Vec<&HistoryEntry> = self.history.iter().collect();
        // Stable: same-day entries keep insertion order.
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries
            .into_iter()
            .map(|entry| {
                if entry.text.is_empty() {
                    format!("- {}", entry.date.format("%Y-%m-%d"))
                } else {
                    format!("- {}: {}", entry.date.format("%Y-%m-%d"), entry.text)
                }
            })
            .collect()
    }
}

/// Parse, apply every update in order, and serialize.
pub fn apply_updates(notes: Option<&str>, updates: &[NotesUpdate]) -> String {
    let mut doc = NotesDocument::parse(notes.unwrap_or_default());
    for update in updates {
        doc.apply_update(update);
    }
    doc.serialize()
}

fn match_field_line(section: NoteSection, line: &str) -> Option<(NoteField, String)> {
    let caps = FIELD_LINE_RE.captures(line.trim())?;
    let field = NoteField::parse(section, &caps[1])?;
    Some((field, caps[2].trim().to_string()))
}

fn parse_history_line(line: &str) -> Option<HistoryEntry> {
    let caps = HISTORY_LINE_RE.captures(line.trim())?;
    let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
    Some(HistoryEntry {
        date,
        text: caps[2].trim().to_string(),
    })
}

fn normalize_key(s: &str) -> String {
    let lowered = s.trim().trim_end_matches(':').to_lowercase().replace(['-', '_'], " ");
    collapse_whitespace(&lowered)
}

fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RE.replace_all(s.trim(), " ").into_owned()
}

fn sanitize_label(label: &str) -> String {
    let stripped = label.replace('*', "");
    collapse_whitespace(stripped.trim().trim_end_matches(':'))
}
