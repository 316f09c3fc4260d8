use anyhow::{bail, Result};
use uuid::Uuid;

use super::display::print_merge_result;
use super::{resolve_contact, MergeArgs};
use crate::db::Database;
use crate::models::{CollectionFlags, FieldResolution, MergeSide, NotesMergeMode};
use crate::service::{DuplicateDetector, MergeEngine};

pub fn run_duplicates(db: &Database, owner_id: Uuid, identifier: &str) -> Result<()> {
    let contact_id = resolve_contact(db, owner_id, identifier)?;
    let candidates = DuplicateDetector::new(db).find_potential_duplicates(owner_id, contact_id)?;

    if candidates.is_empty() {
        println!("No potential duplicates.");
        return Ok(());
    }

    println!("{} potential duplicate(s):\n", candidates.len());
    for contact in &candidates {
        let company = contact.company.as_deref().unwrap_or("");
        println!("  {}  {:<30} {}", contact.id, contact.display_name(), company);
    }
    println!("\nMerge with: contactcore merge {} <id>", contact_id);
    Ok(())
}

pub fn run_merge(db: &Database, owner_id: Uuid, args: MergeArgs) -> Result<()> {
    let primary_id = resolve_contact(db, owner_id, &args.primary)?;
    let secondary_id = resolve_contact(db, owner_id, &args.secondary)?;
    let resolution = resolution_from_args(&args.prefer_secondary, &args.notes)?;
    let flags = CollectionFlags {
        merge_emails: !args.skip_emails,
        merge_phones: !args.skip_phones,
        merge_tags: !args.skip_tags,
    };

    let result = MergeEngine::new(db).merge(owner_id, primary_id, secondary_id, &resolution, flags)?;
    print_merge_result(&result);
    Ok(())
}

fn resolution_from_args(prefer_secondary: &[String], notes: &str) -> Result<FieldResolution> {
    let notes = match notes.trim().to_lowercase().as_str() {
        "primary" | "secondary" | "merge" => NotesMergeMode::parse(notes.trim()),
        other => bail!("Unknown notes mode \"{}\". Use primary, secondary or merge.", other),
    };

    let mut resolution = FieldResolution {
        notes,
        ..Default::default()
    };
    for field in prefer_secondary {
        let slot = match field.trim().to_lowercase().as_str() {
            "first_name" | "first" => &mut resolution.first_name,
            "last_name" | "last" => &mut resolution.last_name,
            "company" => &mut resolution.company,
            "title" => &mut resolution.title,
            "linkedin_url" | "linkedin" => &mut resolution.linkedin_url,
            "birthday" => &mut resolution.birthday,
            "" => continue,
            other => bail!("Unknown field \"{}\".", other),
        };
        *slot = MergeSide::Secondary;
    }
    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailInput;
    use crate::service::{ContactService, NewContact};

    #[test]
    fn test_resolution_from_args() {
        let resolution =
            resolution_from_args(&["company".into(), " Title ".into()], "merge").unwrap();
        assert_eq!(resolution.company, MergeSide::Secondary);
        assert_eq!(resolution.title, MergeSide::Secondary);
        assert_eq!(resolution.first_name, MergeSide::Primary);
        assert_eq!(resolution.notes, NotesMergeMode::Merge);

        assert!(resolution_from_args(&["shoe_size".into()], "primary").is_err());
        assert!(resolution_from_args(&[], "both").is_err());
    }

    #[test]
    fn test_run_merge_deletes_secondary() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let service = ContactService::new(&db);

        let primary = service
            .create_contact(owner, NewContact::new("Ada", "Lovelace"))
            .unwrap()
            .contact
            .id;
        let mut dup = NewContact::new("Augusta", "King");
        dup.emails = vec![EmailInput::new("ada@example.com")];
        let secondary = service.create_contact(owner, dup).unwrap().contact.id;

        run_merge(
            &db,
            owner,
            MergeArgs {
                primary: primary.to_string(),
                secondary: secondary.to_string(),
                prefer_secondary: vec![],
                notes: "primary".into(),
                skip_emails: false,
                skip_phones: false,
                skip_tags: false,
            },
        )
        .unwrap();

        let merged = service.get_contact(owner, primary).unwrap();
        assert_eq!(merged.primary_email(), Some("ada@example.com"));
        assert!(service.get_contact(owner, secondary).is_err());
    }
}
