use chrono::{DateTime, Local, Utc};

use crate::models::{
    ActivityItem, ContactDetail, ContactVersion, FieldChange, FieldValue, MergeResult,
};

/// Print a full contact detail, skipping empty fields.
pub fn print_full_contact(detail: &ContactDetail) {
    let contact = &detail.contact;
    println!("{}\n", contact.display_name());

    match (&contact.title, &contact.company) {
        (Some(title), Some(company)) => println!("  {} at {}", title, company),
        (Some(title), None) => println!("  {}", title),
        (None, Some(company)) => println!("  {}", company),
        (None, None) => {}
    }

    for email in &detail.emails {
        let marker = if email.is_primary { " *" } else { "" };
        println!("  {} ({}){}", email.address, email.label.as_str(), marker);
    }

    for phone in &detail.phones {
        let marker = if phone.is_primary { " *" } else { "" };
        println!("  {} ({}){}", phone.number, phone.label.as_str(), marker);
    }

    if let Some(birthday) = contact.birthday {
        println!("  Birthday: {}", birthday.format("%Y-%m-%d"));
    }
    if let Some(ref url) = contact.linkedin_url {
        println!("  {}", url);
    }
    if !detail.tags.is_empty() {
        println!("  Tags: {}", detail.tag_names().join(", "));
    }

    if let Some(ref notes) = contact.notes {
        if !notes.is_empty() {
            println!("  {}", truncate(notes.lines().next().unwrap_or(""), 60));
        }
    }

    println!("\n  id {}", contact.id);
}

/// One-line summary used by history listings.
pub fn print_version_line(version: &ContactVersion) {
    let fields: Vec<&str> = version.changes.fields().iter().map(|f| f.as_str()).collect();
    println!(
        "  v{:<4} {}  {}",
        version.version,
        format_timestamp(&version.created_at),
        fields.join(", ")
    );
}

/// Snapshot plus every field change of a single version.
pub fn print_version(version: &ContactVersion) {
    let snapshot = &version.snapshot;
    println!(
        "Version {} of {} {} ({})\n",
        version.version,
        snapshot.first_name,
        snapshot.last_name,
        format_timestamp(&version.created_at)
    );

    for (field, change) in version.changes.iter() {
        println!("  {}: {}", field, describe_change(change));
    }
}

pub fn print_merge_result(result: &MergeResult) {
    println!("Merged into {}.", result.merged_contact_id);
    println!("  Deleted {}", result.deleted_contact_id);
    if !result.fields_from_secondary.is_empty() {
        let fields: Vec<&str> = result.fields_from_secondary.iter().map(|f| f.as_str()).collect();
        println!("  From secondary: {}", fields.join(", "));
    }
    println!(
        "  Added {} email(s), {} phone(s), {} tag(s)",
        result.emails_merged, result.phones_merged, result.tags_merged
    );
}

pub fn print_activity_item(item: &ActivityItem) {
    let when = format_timestamp(&item.timestamp());
    match item {
        ActivityItem::ContactEdited(edit) => {
            let fields: Vec<&str> = edit.changed_fields.iter().map(|f| f.as_str()).collect();
            println!("{}  Edited {} ({})", when, edit.contact_name, fields.join(", "));
        }
        ActivityItem::ContactEditedGroup(group) => {
            println!(
                "{}  Edited {} {} times since {}",
                when,
                group.contact_name,
                group.edit_count,
                format_timestamp(&group.earliest_timestamp)
            );
        }
        ActivityItem::ContactMerged(merge) => {
            println!(
                "{}  Merged {} into {}",
                when, merge.secondary_name, merge.primary_name
            );
        }
        ActivityItem::TaskCreated(task) => println!("{}  Task added: {}", when, task.title),
        ActivityItem::TaskCompleted(task) => println!("{}  Task done: {}", when, task.title),
    }
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn describe_change(change: &FieldChange) -> String {
    format!("{} -> {}", describe_value(&change.from), describe_value(&change.to))
}

fn describe_value(value: &FieldValue) -> String {
    let text = match value {
        FieldValue::Text(text) => text.clone().unwrap_or_default(),
        FieldValue::Date(date) => date.map(|d| d.to_string()).unwrap_or_default(),
        FieldValue::Emails(emails) => emails
            .iter()
            .map(|e| e.address.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        FieldValue::Phones(phones) => phones
            .iter()
            .map(|p| p.number.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        FieldValue::Tags(tags) => tags.join(", "),
    };
    if text.is_empty() {
        "(empty)".to_string()
    } else {
        truncate(&text, 40)
    }
}

/// Cut `text` to `max` characters, ending with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", head.trim_end())
    } else {
        text.to_string()
    }
}
