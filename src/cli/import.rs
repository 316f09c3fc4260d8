use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::Database;
use crate::models::{EmailInput, PhoneInput};
use crate::service::{ContactService, DuplicateDetector, ImportSummary, NewContact};

/// A row from a CSV import file.
///
/// Headers must match field names exactly. Empty strings become `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportRow {
    pub first_name: String,
    pub last_name: String,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub phone: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub company: Option<String>,

    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub title: Option<String>,
}

impl ImportRow {
    /// Validate that required fields are present and non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.first_name.trim().is_empty() {
            bail!("first_name is required and cannot be empty");
        }
        if self.last_name.trim().is_empty() {
            bail!("last_name is required and cannot be empty");
        }
        Ok(())
    }

    pub fn into_new_contact(self) -> NewContact {
        let mut new = NewContact::new(self.first_name, self.last_name);
        new.company = self.company;
        new.title = self.title;
        new.emails = self.email.into_iter().map(EmailInput::new).collect();
        new.phones = self.phone.into_iter().map(PhoneInput::new).collect();
        new
    }
}

/// Deserialize empty strings as None.
fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.trim().is_empty()))
}

/// Execute the import command.
pub fn run_import(db: &Database, owner_id: Uuid, file: &Path, dry_run: bool) -> Result<ImportSummary> {
    if !file.exists() {
        bail!("File not found: {}", file.display());
    }

    let (rows, rejected) = read_rows(file)?;

    if dry_run {
        eprintln!("Dry run: {}", file.display());
    } else {
        eprintln!("Importing: {}", file.display());
    }

    let mut summary = if dry_run {
        preview(db, owner_id, rows)?
    } else {
        ContactService::new(db).import_contacts(owner_id, rows)?
    };
    summary.invalid += rejected;

    print_summary(&summary, dry_run);
    Ok(summary)
}

/// Parse and validate every row. Returns the usable rows and a count of the rest.
fn read_rows(file: &Path) -> Result<(Vec<NewContact>, u32)> {
    let reader = File::open(file).context("Failed to open CSV file")?;
    let mut csv_reader = csv::Reader::from_reader(reader);

    let mut rows = Vec::new();
    let mut rejected = 0;
    for (idx, result) in csv_reader.deserialize::<ImportRow>().enumerate() {
        let line = idx + 2; // 1-indexed, after the header

        let row = match result {
            Ok(row) => row,
            Err(e) => {
                eprintln!("Line {}: parse error: {}", line, e);
                rejected += 1;
                continue;
            }
        };
        if let Err(e) = row.validate() {
            eprintln!("Line {}: validation error: {}", line, e);
            rejected += 1;
            continue;
        }
        rows.push(row.into_new_contact());
    }
    Ok((rows, rejected))
}

/// Count what an import would do without writing anything.
fn preview(db: &Database, owner_id: Uuid, rows: Vec<NewContact>) -> Result<ImportSummary> {
    let detector = DuplicateDetector::new(db);
    let mut summary = ImportSummary::default();
    for row in &rows {
        match detector.find_duplicate(owner_id, row)? {
            Some(existing) => {
                summary.skipped += 1;
                summary.skipped_ids.push(existing.id);
            }
            None => summary.created += 1,
        }
    }
    Ok(summary)
}

fn print_summary(summary: &ImportSummary, dry_run: bool) {
    let verb = if dry_run { "Would create" } else { "Created" };
    println!("\n{} {} contacts", verb, summary.created);

    if summary.skipped > 0 {
        println!("Skipped {} duplicates", summary.skipped);
    }
    if summary.invalid > 0 {
        println!("Invalid rows: {}", summary.invalid);
    }
}
