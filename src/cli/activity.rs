use anyhow::{bail, Result};
use chrono::Utc;
use log::info;
use uuid::Uuid;

use super::display::print_activity_item;
use super::{resolve_contact, ActivityArgs, TaskAddArgs};
use crate::db::Database;
use crate::models::{FeedPage, Task};
use crate::service::{ActivityService, ContactService};

pub fn run_activity(db: &Database, owner_id: Uuid, args: ActivityArgs) -> Result<()> {
    if args.limit == 0 {
        bail!("Limit must be at least 1.");
    }

    let page = FeedPage {
        limit: args.limit,
        offset: args.offset,
    };
    let feed = ActivityService::new(db).get_recent_activity(owner_id, page)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&feed)?);
        return Ok(());
    }

    if feed.activities.is_empty() {
        println!("No recent activity.");
        return Ok(());
    }
    for item in &feed.activities {
        print_activity_item(item);
    }
    if feed.has_more {
        println!(
            "\nMore: contactcore activity --offset {}",
            args.offset.saturating_add(args.limit)
        );
    }
    Ok(())
}

pub fn run_hide(db: &Database, owner_id: Uuid, identifier: &str) -> Result<()> {
    let contact_id = resolve_contact(db, owner_id, identifier)?;
    ActivityService::new(db).hide_contact_from_feed(owner_id, contact_id)?;
    println!("Hidden from the activity feed.");
    Ok(())
}

pub fn run_unhide(db: &Database, owner_id: Uuid, identifier: &str) -> Result<()> {
    let contact_id = resolve_contact(db, owner_id, identifier)?;
    ActivityService::new(db).unhide_contact_from_feed(owner_id, contact_id)?;
    println!("Visible in the activity feed again.");
    Ok(())
}

pub fn run_task_add(db: &Database, owner_id: Uuid, args: TaskAddArgs) -> Result<()> {
    let title = args.title.trim();
    if title.is_empty() {
        bail!("Task title cannot be empty.");
    }

    let mut task = Task::new(owner_id, title.to_string());
    if let Some(identifier) = args.contact.as_deref() {
        let contact_id = resolve_contact(db, owner_id, identifier)?;
        ContactService::new(db).get_contact(owner_id, contact_id)?;
        task.contact_id = Some(contact_id);
    }

    db.insert_task(&task)?;
    info!(
        "event=task_create module=cli status=ok task_id={} linked={}",
        task.id,
        task.contact_id.is_some()
    );
    println!("Task {} added.", task.id);
    Ok(())
}

pub fn run_task_done(db: &Database, owner_id: Uuid, id: Uuid) -> Result<()> {
    let task = db.complete_task(owner_id, id, Utc::now())?;
    info!("event=task_complete module=cli status=ok task_id={}", task.id);
    println!("Completed: {}", task.title);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActivityItem;
    use crate::service::NewContact;

    #[test]
    fn test_task_events_reach_feed() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        ContactService::new(&db)
            .create_contact(owner, NewContact::new("Ada", "Lovelace"))
            .unwrap();

        run_task_add(
            &db,
            owner,
            TaskAddArgs {
                title: "Send notes".into(),
                contact: Some("Ada".into()),
            },
        )
        .unwrap();

        let feed = ActivityService::new(&db)
            .get_recent_activity(owner, FeedPage::default())
            .unwrap();
        assert_eq!(feed.activities.len(), 1);
        let ActivityItem::TaskCreated(item) = &feed.activities[0] else {
            panic!("expected task_created");
        };
        assert!(item.contact_id.is_some());

        run_task_done(&db, owner, item.task_id).unwrap();
        assert!(run_task_done(&db, owner, item.task_id).is_err());
    }

    #[test]
    fn test_task_rejects_blank_title() {
        let db = Database::open_memory().unwrap();
        let args = TaskAddArgs {
            title: "   ".into(),
            contact: None,
        };
        assert!(run_task_add(&db, Uuid::new_v4(), args).is_err());
    }
}
