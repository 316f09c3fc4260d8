use anyhow::{bail, Result};
use chrono::NaiveDate;
use uuid::Uuid;

use super::display::{print_full_contact, truncate};
use super::{parse_date_arg, resolve_contact, AddArgs, ListArgs, NoteArgs, UpdateArgs};
use crate::db::Database;
use crate::models::{ContactQuery, ContactSort, EmailInput, PhoneInput, SortOrder};
use crate::notes::{NoteSection, NotesUpdate};
use crate::service::{ContactService, ContactUpdate, DuplicateDetector, NewContact};

pub fn run_add(db: &Database, owner_id: Uuid, args: AddArgs) -> Result<()> {
    let mut new = NewContact::new(args.first, args.last);
    new.company = args.company;
    new.title = args.title;
    new.linkedin_url = args.linkedin;
    new.notes = args.notes;
    new.birthday = args.birthday.as_deref().map(parse_date_arg).transpose()?;
    new.emails = args.email.into_iter().map(EmailInput::new).collect();
    new.phones = args.phone.into_iter().map(PhoneInput::new).collect();
    new.tags = args.tags;

    if let Some(existing) = DuplicateDetector::new(db).find_duplicate(owner_id, &new)? {
        println!(
            "Note: {} ({}) looks like the same person.",
            existing.display_name(),
            existing.id
        );
    }

    let detail = ContactService::new(db).create_contact(owner_id, new)?;
    println!("Added {} ({})", detail.contact.display_name(), detail.contact.id);
    Ok(())
}

pub fn run_update(db: &Database, owner_id: Uuid, args: UpdateArgs) -> Result<()> {
    let contact_id = resolve_contact(db, owner_id, &args.identifier)?;

    let birthday = match args.birthday.as_deref() {
        None => None,
        Some(raw) if raw.trim().is_empty() => Some(None),
        Some(raw) => Some(Some(parse_date_arg(raw)?)),
    };

    let update = ContactUpdate {
        first_name: args.first,
        last_name: args.last,
        company: args.company,
        title: args.title,
        birthday,
        linkedin_url: args.linkedin,
        notes: args.notes,
        notes_updates: Vec::new(),
        emails: replacement(args.email, args.clear_emails, EmailInput::new),
        phones: replacement(args.phone, args.clear_phones, PhoneInput::new),
        tags: replacement(args.tags, args.clear_tags, |t| t),
    };

    let outcome = ContactService::new(db).update_contact(owner_id, contact_id, update)?;
    match outcome.version {
        Some(version) => println!(
            "Updated {} (version {}).",
            outcome.detail.contact.display_name(),
            version.version
        ),
        None => println!("No changes."),
    }
    Ok(())
}

/// `Some(list)` replaces the collection; `None` leaves it alone.
fn replacement<T>(values: Vec<String>, clear: bool, make: impl Fn(String) -> T) -> Option<Vec<T>> {
    if clear {
        Some(Vec::new())
    } else if values.is_empty() {
        None
    } else {
        Some(values.into_iter().map(make).collect())
    }
}

pub fn run_delete(db: &Database, owner_id: Uuid, identifier: &str) -> Result<()> {
    let contact_id = resolve_contact(db, owner_id, identifier)?;
    let service = ContactService::new(db);
    let name = service.get_contact(owner_id, contact_id)?.contact.display_name();

    service.delete_contact(owner_id, contact_id)?;
    println!("Deleted {}.", name);
    Ok(())
}

pub fn run_list(db: &Database, owner_id: Uuid, args: ListArgs) -> Result<()> {
    if args.page == 0 {
        bail!("Pages start at 1.");
    }
    if args.limit == 0 {
        bail!("Limit must be at least 1.");
    }

    let query = ContactQuery {
        search: args.search.filter(|s| !s.trim().is_empty()),
        sort: ContactSort::parse(&args.sort),
        order: SortOrder::parse(&args.order),
        limit: args.limit,
        offset: (args.page - 1).saturating_mul(args.limit),
    };
    let page = ContactService::new(db).list_contacts(owner_id, &query)?;

    if page.contacts.is_empty() {
        println!("No contacts found.");
        return Ok(());
    }

    for contact in &page.contacts {
        let company = contact.company.as_deref().unwrap_or("");
        println!("{}  {:<30} {}", contact.id, truncate(&contact.display_name(), 30), company);
    }

    let pages = page.total.div_ceil(args.limit).max(1);
    println!("\nPage {} of {} ({} contacts)", args.page, pages, page.total);
    Ok(())
}

pub fn run_show(db: &Database, owner_id: Uuid, identifier: &str, json: bool) -> Result<()> {
    let contact_id = resolve_contact(db, owner_id, identifier)?;
    let detail = ContactService::new(db).get_contact(owner_id, contact_id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print_full_contact(&detail);
    }
    Ok(())
}

pub fn run_find_email(db: &Database, owner_id: Uuid, address: &str) -> Result<()> {
    match ContactService::new(db).find_by_email_address(owner_id, address)? {
        Some(detail) => print_full_contact(&detail),
        None => println!("No contact uses {}.", address.trim()),
    }
    Ok(())
}

pub fn run_note(db: &Database, owner_id: Uuid, args: NoteArgs) -> Result<()> {
    let contact_id = resolve_contact(db, owner_id, &args.identifier)?;
    let update = note_update(&args.section, args.field.as_deref(), args.value, args.date.as_deref())?;

    let outcome = ContactService::new(db).update_contact(
        owner_id,
        contact_id,
        ContactUpdate::notes(vec![update]),
    )?;
    match outcome.version {
        Some(version) => println!("Notes updated (version {}).", version.version),
        None => println!("Notes already up to date."),
    }
    Ok(())
}

fn note_update(
    section: &str,
    field: Option<&str>,
    value: String,
    date: Option<&str>,
) -> Result<NotesUpdate> {
    let Some(section) = NoteSection::parse(section) else {
        bail!(
            "Unknown section \"{}\". Use summary, interests, history, status or preferences.",
            section
        );
    };
    if value.trim().is_empty() {
        bail!("Value cannot be empty.");
    }

    let date: Option<NaiveDate> = date.map(parse_date_arg).transpose()?;
    Ok(NotesUpdate {
        section,
        field: field.map(str::to_string),
        value,
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replacement() {
        assert_eq!(replacement(vec![], false, |s| s), None);
        assert_eq!(replacement(vec!["a".into()], true, |s| s), Some(vec![]));
        assert_eq!(
            replacement(vec!["a".into()], false, |s| s),
            Some(vec!["a".to_string()])
        );
    }

    #[test]
    fn test_note_update_parsing() {
        let update = note_update("status", Some("Next Step"), "Call".into(), None).unwrap();
        assert_eq!(update.section, NoteSection::CurrentStatus);
        assert_eq!(update.field.as_deref(), Some("Next Step"));

        let update = note_update("history", None, "Met".into(), Some("2024-05-01")).unwrap();
        assert_eq!(update.date, NaiveDate::from_ymd_opt(2024, 5, 1));

        assert!(note_update("nope", None, "x".into(), None).is_err());
        assert!(note_update("summary", None, "  ".into(), None).is_err());
    }

    #[test]
    fn test_run_note_writes_structured_notes() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let service = ContactService::new(&db);
        let id = service
            .create_contact(owner, NewContact::new("Ada", "Lovelace"))
            .unwrap()
            .contact
            .id;

        run_note(
            &db,
            owner,
            NoteArgs {
                identifier: id.to_string(),
                section: "interests".into(),
                field: Some("Goals".into()),
                value: "Ship the engine".into(),
                date: None,
            },
        )
        .unwrap();

        let notes = service.get_contact(owner, id).unwrap().contact.notes.unwrap();
        assert!(notes.contains("Ship the engine"));
    }
}
