use anyhow::Result;
use uuid::Uuid;

use super::display::{print_version, print_version_line};
use super::resolve_contact;
use crate::db::Database;
use crate::service::versions::parse_version_number;
use crate::service::VersionService;

pub fn run_history(db: &Database, owner_id: Uuid, identifier: &str, json: bool) -> Result<()> {
    let contact_id = resolve_contact(db, owner_id, identifier)?;
    let versions = VersionService::new(db).get_versions(owner_id, contact_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&versions)?);
        return Ok(());
    }

    if versions.is_empty() {
        println!("No history recorded.");
        return Ok(());
    }
    for version in &versions {
        print_version_line(version);
    }
    Ok(())
}

pub fn run_version(db: &Database, owner_id: Uuid, identifier: &str, version: &str) -> Result<()> {
    let contact_id = resolve_contact(db, owner_id, identifier)?;
    let number = parse_version_number(version)?;
    let version = VersionService::new(db).get_version(owner_id, contact_id, number)?;
    print_version(&version);
    Ok(())
}

pub fn run_restore(db: &Database, owner_id: Uuid, identifier: &str, version: &str) -> Result<()> {
    let contact_id = resolve_contact(db, owner_id, identifier)?;
    let number = parse_version_number(version)?;
    let outcome = VersionService::new(db).restore_version(owner_id, contact_id, number)?;

    match outcome.version {
        Some(new_version) => println!(
            "Restored {} to version {} (now version {}).",
            outcome.detail.contact.display_name(),
            number,
            new_version.version
        ),
        None => println!("Already matches version {}.", number),
    }
    Ok(())
}
