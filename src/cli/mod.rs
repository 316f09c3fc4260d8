use anyhow::{anyhow, bail, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use uuid::Uuid;

use crate::db::Database;
use crate::models::ContactQuery;
use crate::store::ContactRepository;

pub mod activity;
pub mod contacts;
pub mod display;
pub mod history;
pub mod import;
pub mod merge;

pub use activity::{run_activity, run_hide, run_task_add, run_task_done, run_unhide};
pub use contacts::{run_add, run_delete, run_find_email, run_list, run_note, run_show, run_update};
pub use history::{run_history, run_restore, run_version};
pub use import::run_import;
pub use merge::{run_duplicates, run_merge};

#[derive(Parser)]
#[command(name = "contactcore")]
#[command(about = "Versioned contacts with merging and an activity feed")]
#[command(version)]
pub struct Cli {
    /// Database file (overrides CONTACTCORE_DB)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,
    /// Log level: off, error, warn, info, debug, trace
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
    /// Write rotating log files here instead of stderr
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new contact
    Add(AddArgs),
    /// Update fields of a contact
    Update(UpdateArgs),
    /// Soft-delete a contact
    Delete(IdentifierArgs),
    /// List contacts with search and pagination
    List(ListArgs),
    /// Show full details for a contact
    Show(ShowArgs),
    /// Find the contact owning an email address
    FindEmail(FindEmailArgs),
    /// Show the version history of a contact
    History(HistoryArgs),
    /// Show one version of a contact
    Version(VersionArgs),
    /// Restore a contact to an earlier version
    Restore(VersionArgs),
    /// List potential duplicates of a contact
    Duplicates(IdentifierArgs),
    /// Merge a secondary contact into a primary one
    Merge(MergeArgs),
    /// Show recent activity
    Activity(ActivityArgs),
    /// Hide a contact's events from the activity feed
    Hide(IdentifierArgs),
    /// Show a hidden contact's events again
    Unhide(IdentifierArgs),
    /// Import contacts from a CSV file
    Import(ImportArgs),
    /// Record tasks for the activity feed
    #[command(subcommand)]
    Task(TaskCommands),
    /// Edit a contact's structured notes
    Note(NoteArgs),
}

#[derive(Args)]
pub struct IdentifierArgs {
    /// Contact name or UUID
    pub identifier: String,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(short, long)]
    pub first: String,
    #[arg(short, long)]
    pub last: String,
    /// Email address (repeatable; the first is primary)
    #[arg(short, long)]
    pub email: Vec<String>,
    /// Phone number (repeatable; the first is primary)
    #[arg(short, long)]
    pub phone: Vec<String>,
    #[arg(short, long)]
    pub company: Option<String>,
    #[arg(short, long)]
    pub title: Option<String>,
    /// Birthday (YYYY-MM-DD)
    #[arg(long)]
    pub birthday: Option<String>,
    #[arg(long)]
    pub linkedin: Option<String>,
    #[arg(short, long)]
    pub notes: Option<String>,
    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args)]
pub struct UpdateArgs {
    /// Contact name or UUID
    pub identifier: String,
    #[arg(short, long)]
    pub first: Option<String>,
    #[arg(short, long)]
    pub last: Option<String>,
    /// Pass an empty string to clear
    #[arg(short, long)]
    pub company: Option<String>,
    /// Pass an empty string to clear
    #[arg(short, long)]
    pub title: Option<String>,
    /// Birthday (YYYY-MM-DD); an empty string clears it
    #[arg(long)]
    pub birthday: Option<String>,
    #[arg(long)]
    pub linkedin: Option<String>,
    /// Replace notes entirely
    #[arg(short, long)]
    pub notes: Option<String>,
    /// Replace all emails (repeatable)
    #[arg(short, long)]
    pub email: Vec<String>,
    /// Remove every email
    #[arg(long, conflicts_with = "email")]
    pub clear_emails: bool,
    /// Replace all phones (repeatable)
    #[arg(short, long)]
    pub phone: Vec<String>,
    /// Remove every phone
    #[arg(long, conflicts_with = "phone")]
    pub clear_phones: bool,
    /// Replace all tags (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Remove every tag
    #[arg(long, conflicts_with = "tags")]
    pub clear_tags: bool,
}

#[derive(Args)]
pub struct ListArgs {
    #[arg(short, long)]
    pub search: Option<String>,
    #[arg(short, long, default_value = "1")]
    pub page: u32,
    #[arg(short, long, default_value = "20")]
    pub limit: u32,
    /// first, last, company, created, updated
    #[arg(long, default_value = "last")]
    pub sort: String,
    #[arg(short, long, default_value = "asc")]
    pub order: String,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Contact name or UUID
    pub identifier: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct FindEmailArgs {
    pub address: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Contact name or UUID
    pub identifier: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct VersionArgs {
    /// Contact name or UUID
    pub identifier: String,
    /// Version number (starting at 1)
    pub version: String,
}

#[derive(Args)]
pub struct MergeArgs {
    /// Contact to keep
    pub primary: String,
    /// Contact to fold in and delete
    pub secondary: String,
    /// Scalar fields to take from the secondary (first_name, last_name,
    /// company, title, linkedin_url, birthday), comma separated
    #[arg(long, value_delimiter = ',')]
    pub prefer_secondary: Vec<String>,
    /// primary, secondary or merge
    #[arg(long, default_value = "primary")]
    pub notes: String,
    #[arg(long)]
    pub skip_emails: bool,
    #[arg(long)]
    pub skip_phones: bool,
    #[arg(long)]
    pub skip_tags: bool,
}

#[derive(Args)]
pub struct ActivityArgs {
    #[arg(short, long, default_value = "20")]
    pub limit: u32,
    #[arg(short, long, default_value = "0")]
    pub offset: u32,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ImportArgs {
    /// CSV with headers first_name,last_name,email,phone,company,title
    pub file: PathBuf,
    #[arg(short, long)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create a task, optionally linked to a contact
    Add(TaskAddArgs),
    /// Mark a task completed
    Done(TaskDoneArgs),
}

#[derive(Args)]
pub struct TaskAddArgs {
    pub title: String,
    /// Contact name or UUID
    #[arg(short, long)]
    pub contact: Option<String>,
}

#[derive(Args)]
pub struct TaskDoneArgs {
    pub id: Uuid,
}

#[derive(Args)]
pub struct NoteArgs {
    /// Contact name or UUID
    pub identifier: String,
    /// summary, interests, history, status or preferences
    #[arg(short, long)]
    pub section: String,
    /// Field label, e.g. "Goals" or "Next Step"; omit for a free bullet
    #[arg(short, long)]
    pub field: Option<String>,
    #[arg(short, long)]
    pub value: String,
    /// History entry date (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    pub date: Option<String>,
}

/// Resolve a UUID or a unique name search to a contact id.
pub fn resolve_contact(db: &Database, owner_id: Uuid, identifier: &str) -> Result<Uuid> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        bail!("Identifier cannot be empty.");
    }

    if let Ok(id) = Uuid::parse_str(identifier) {
        return Ok(id);
    }

    let query = ContactQuery {
        search: Some(identifier.to_string()),
        limit: 10,
        ..Default::default()
    };
    let matches = db.list_contacts(owner_id, &query)?;

    match matches.as_slice() {
        [] => Err(anyhow!("No contact found matching \"{}\".", identifier)),
        [only] => Ok(only.id),
        many => {
            let mut message = format!("\"{}\" matches {} contacts:", identifier, many.len());
            for contact in many {
                message.push_str(&format!("\n  {}  {}", contact.id, contact.display_name()));
            }
            message.push_str("\nUse the UUID instead.");
            Err(anyhow!(message))
        }
    }
}

/// Parse `YYYY-MM-DD`.
pub fn parse_date_arg(value: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| anyhow!("Invalid date \"{}\"; expected YYYY-MM-DD.", value))
}
