//! Recent-activity feed.
//!
//! # Responsibility
//! - Merge contact edits, merges and task events into one timeline.
//! - Collapse bursts of edits to the same contact into groups.
//! - Toggle per-contact feed suppression.
//!
//! # Invariants
//! - Hidden contacts are dropped from the source streams, before grouping.
//! - A group's window is measured from its first (newest) member.

use chrono::Duration;
use log::{debug, info};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::models::{ActivityFeed, ActivityItem, ContactEditedGroup, ContactEditedItem, FeedPage};
use crate::store::{ContactRepository, FeedRepository};

/// Maximum distance between a group's newest member and any other member.
pub const GROUP_WINDOW_HOURS: i64 = 24;

pub struct ActivityService<'a, S: ContactRepository + FeedRepository> {
    store: &'a S,
}

impl<'a, S: ContactRepository + FeedRepository> ActivityService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn get_recent_activity(&self, owner_id: Uuid, page: FeedPage) -> CoreResult<ActivityFeed> {
        let fetch = fetch_size(page);

        let mut items: Vec<ActivityItem> = self
            .store
            .contact_edit_events(owner_id, fetch)?
            .into_iter()
            .map(ActivityItem::ContactEdited)
            .collect();
        items.extend(
            self.store
                .merge_events(owner_id, fetch)?
                .into_iter()
                .map(ActivityItem::ContactMerged),
        );
        items.extend(self.store.task_events(owner_id, fetch)?);

        // Stable: equal timestamps keep stream order
        items.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));

        let grouped = group_edits(items);
        let offset = page.offset as usize;
        let limit = page.limit as usize;
        let has_more = grouped.len() > offset + limit;
        let activities: Vec<ActivityItem> = grouped.into_iter().skip(offset).take(limit).collect();

        debug!(
            "event=activity_feed module=service owner_id={} fetched_per_stream={} returned={} has_more={}",
            owner_id,
            fetch,
            activities.len(),
            has_more
        );
        Ok(ActivityFeed {
            activities,
            has_more,
        })
    }

    /// Suppress the contact's events. Hiding twice is a no-op.
    pub fn hide_contact_from_feed(&self, owner_id: Uuid, contact_id: Uuid) -> CoreResult<()> {
        self.require_contact(owner_id, contact_id)?;
        let changed = self.store.hide_contact(owner_id, contact_id)?;
        info!(
            "event=feed_hide module=service status=ok contact_id={} changed={}",
            contact_id, changed
        );
        Ok(())
    }

    /// Make the contact's existing events visible again.
    pub fn unhide_contact_from_feed(&self, owner_id: Uuid, contact_id: Uuid) -> CoreResult<()> {
        self.require_contact(owner_id, contact_id)?;
        let changed = self.store.unhide_contact(owner_id, contact_id)?;
        info!(
            "event=feed_unhide module=service status=ok contact_id={} changed={}",
            contact_id, changed
        );
        Ok(())
    }

    fn require_contact(&self, owner_id: Uuid, contact_id: Uuid) -> CoreResult<()> {
        self.store
            .get_contact(owner_id, contact_id)?
            .map(|_| ())
            .ok_or_else(|| CoreError::not_found(format!("contact {contact_id}")))
    }
}

/// Items fetched per stream: enough to fill the requested page after
/// grouping shrinks the list.
pub fn fetch_size(page: FeedPage) -> u32 {
    page.offset
        .saturating_add(page.limit)
        .saturating_add(10)
        .saturating_mul(2)
}

/// Collapse runs of edits to one contact, newest first, into groups.
///
/// An edit joins the open run when it names the same contact and lies
/// within the window of the run's first item. Anything else closes the run.
pub fn group_edits(items: Vec<ActivityItem>) -> Vec<ActivityItem> {
    let window = Duration::hours(GROUP_WINDOW_HOURS);
    let mut out = Vec::with_capacity(items.len());
    let mut run: Vec<ContactEditedItem> = Vec::new();

    for item in items {
        match item {
            ActivityItem::ContactEdited(edit) => {
                let joins = run.first().is_some_and(|anchor| {
                    anchor.contact_id == edit.contact_id && anchor.timestamp - edit.timestamp <= window
                });
                if !joins {
                    flush_run(&mut run, &mut out);
                }
                run.push(edit);
            }
            other => {
                flush_run(&mut run, &mut out);
                out.push(other);
            }
        }
    }
    flush_run(&mut run, &mut out);

    out
}

fn flush_run(run: &mut Vec<ContactEditedItem>, out: &mut Vec<ActivityItem>) {
    let members = std::mem::take(run);
    match members.len() {
        0 => {}
        1 => out.extend(members.into_iter().map(ActivityItem::ContactEdited)),
        count => {
            let first = &members[0];
            let last = &members[count - 1];
            out.push(ActivityItem::ContactEditedGroup(ContactEditedGroup {
                contact_id: first.contact_id,
                contact_name: first.contact_name.clone(),
                edit_count: count as u32,
                latest_timestamp: first.timestamp,
                earliest_timestamp: last.timestamp,
                members,
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{
        CollectionFlags, Contact, FieldResolution, SnapshotField, Task, TaskActivityItem,
    };
    use crate::service::contacts::{ContactService, ContactUpdate, NewContact};
    use crate::service::merge::MergeEngine;
    use crate::store::Store;
    use chrono::{DateTime, Utc};

    fn edit(contact_id: Uuid, at: DateTime<Utc>) -> ActivityItem {
        ActivityItem::ContactEdited(ContactEditedItem {
            contact_id,
            contact_name: "Test Person".to_string(),
            version: 2,
            changed_fields: vec![SnapshotField::Company],
            timestamp: at,
        })
    }

    #[test]
    fn test_grouping_window_is_anchored_at_newest() {
        let id = Uuid::new_v4();
        let t0 = Utc::now();
        let items = vec![
            edit(id, t0),
            edit(id, t0 - Duration::hours(2)),
            edit(id, t0 - Duration::hours(10)),
            edit(id, t0 - Duration::hours(26)),
        ];

        let grouped = group_edits(items);
        assert_eq!(grouped.len(), 2);
        match &grouped[0] {
            ActivityItem::ContactEditedGroup(group) => {
                assert_eq!(group.edit_count, 3);
                assert_eq!(group.latest_timestamp, t0);
                assert_eq!(group.earliest_timestamp, t0 - Duration::hours(10));
                assert_eq!(group.members.len(), 3);
            }
            other => panic!("expected group, got {}", other.kind()),
        }
        assert_eq!(grouped[1].kind(), "contact_edited");
        assert_eq!(grouped[1].timestamp(), t0 - Duration::hours(26));
    }

    #[test]
    fn test_window_is_not_pairwise() {
        // Each step is 20h apart, but the third is 40h from the anchor
        let id = Uuid::new_v4();
        let t0 = Utc::now();
        let grouped = group_edits(vec![
            edit(id, t0),
            edit(id, t0 - Duration::hours(20)),
            edit(id, t0 - Duration::hours(40)),
        ]);
        let kinds: Vec<&str> = grouped.iter().map(|i| i.kind()).collect();
        assert_eq!(kinds, vec!["contact_edited_group", "contact_edited"]);
    }

    #[test]
    fn test_other_items_break_runs() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let t0 = Utc::now();
        let task = ActivityItem::TaskCreated(TaskActivityItem {
            task_id: Uuid::new_v4(),
            title: "Call".to_string(),
            contact_id: None,
            timestamp: t0 - Duration::hours(2),
        });

        let grouped = group_edits(vec![
            edit(a, t0),
            edit(b, t0 - Duration::hours(1)),
            task,
            edit(b, t0 - Duration::hours(3)),
            edit(b, t0 - Duration::hours(4)),
        ]);
        let kinds: Vec<&str> = grouped.iter().map(|i| i.kind()).collect();
        assert_eq!(
            kinds,
            vec!["contact_edited", "contact_edited", "task_created", "contact_edited_group"]
        );
    }

    #[test]
    fn test_fetch_size() {
        assert_eq!(fetch_size(FeedPage::default()), 60);
        assert_eq!(fetch_size(FeedPage { limit: 5, offset: 40 }), 110);
    }

    fn seed(db: &Database, owner: Uuid) -> (Uuid, Uuid) {
        let contacts = ContactService::new(db);
        let a = contacts
            .create_contact(owner, NewContact::new("Ada", "Lovelace"))
            .unwrap()
            .contact
            .id;
        let b = contacts
            .create_contact(owner, NewContact::new("Alan", "Turing"))
            .unwrap()
            .contact
            .id;
        for id in [a, b] {
            for title in ["One", "Two"] {
                contacts
                    .update_contact(
                        owner,
                        id,
                        ContactUpdate {
                            title: Some(title.to_string()),
                            ..Default::default()
                        },
                    )
                    .unwrap();
            }
        }
        (a, b)
    }

    #[test]
    fn test_feed_groups_edits_and_skips_creation() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let (a, b) = seed(&db, owner);

        let feed = ActivityService::new(&db)
            .get_recent_activity(owner, FeedPage::default())
            .unwrap();
        assert!(!feed.has_more);
        assert_eq!(feed.activities.len(), 2);
        assert!(feed.activities[0].mentions(b));
        assert!(feed.activities[1].mentions(a));
        assert!(feed
            .activities
            .iter()
            .all(|item| item.kind() == "contact_edited_group"));
    }

    #[test]
    fn test_hidden_contact_disappears_and_returns() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let (a, b) = seed(&db, owner);

        let mut task = Task::new(owner, "Send paper".to_string());
        task.contact_id = Some(a);
        db.insert_task(&task).unwrap();

        let feed = ActivityService::new(&db);
        feed.hide_contact_from_feed(owner, a).unwrap();
        feed.hide_contact_from_feed(owner, a).unwrap();

        let visible = feed.get_recent_activity(owner, FeedPage::default()).unwrap();
        assert!(!visible.activities.is_empty());
        assert!(visible.activities.iter().all(|item| !item.mentions(a)));
        assert!(visible.activities.iter().any(|item| item.mentions(b)));

        feed.unhide_contact_from_feed(owner, a).unwrap();
        let restored = feed.get_recent_activity(owner, FeedPage::default()).unwrap();
        assert!(restored.activities.iter().any(|item| item.mentions(a)));
        assert_eq!(restored.activities.len(), 3);

        assert!(matches!(
            feed.hide_contact_from_feed(owner, Uuid::new_v4()),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_hidden_contact_does_not_split_neighbouring_group() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let contacts = ContactService::new(&db);
        let a = contacts
            .create_contact(owner, NewContact::new("Ada", "Lovelace"))
            .unwrap()
            .contact
            .id;
        let b = contacts
            .create_contact(owner, NewContact::new("Alan", "Turing"))
            .unwrap()
            .contact
            .id;

        // Edits land as A, B, A in time
        for (id, title) in [(a, "One"), (b, "One"), (a, "Two")] {
            std::thread::sleep(std::time::Duration::from_millis(2));
            contacts
                .update_contact(
                    owner,
                    id,
                    ContactUpdate {
                        title: Some(title.to_string()),
                        ..Default::default()
                    },
                )
                .unwrap();
        }

        let feed = ActivityService::new(&db);
        let interleaved = feed.get_recent_activity(owner, FeedPage::default()).unwrap();
        let kinds: Vec<&str> = interleaved.activities.iter().map(|i| i.kind()).collect();
        assert_eq!(kinds, vec!["contact_edited", "contact_edited", "contact_edited"]);

        feed.hide_contact_from_feed(owner, b).unwrap();
        let hidden = feed.get_recent_activity(owner, FeedPage::default()).unwrap();
        assert_eq!(hidden.activities.len(), 1);
        match &hidden.activities[0] {
            ActivityItem::ContactEditedGroup(group) => {
                assert_eq!(group.contact_id, a);
                assert_eq!(group.edit_count, 2);
            }
            other => panic!("expected group, got {}", other.kind()),
        }
    }

    #[test]
    fn test_many_hidden_contacts() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let (a, _) = seed(&db, owner);

        db.transaction(|db| {
            for i in 0..17_000 {
                let contact = Contact::new(owner, format!("Hidden{i}"), "Contact".to_string());
                db.insert_contact(&contact)?;
                db.hide_contact(owner, contact.id)?;
            }
            Ok(())
        })
        .unwrap();

        let feed = ActivityService::new(&db)
            .get_recent_activity(owner, FeedPage::default())
            .unwrap();
        assert_eq!(feed.activities.len(), 2);
        assert!(feed.activities[1].mentions(a));
    }

    #[test]
    fn test_merge_event_hidden_with_either_side() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let contacts = ContactService::new(&db);
        let a = contacts
            .create_contact(owner, NewContact::new("Ada", "Lovelace"))
            .unwrap()
            .contact
            .id;
        let b = contacts
            .create_contact(owner, NewContact::new("Augusta", "King"))
            .unwrap()
            .contact
            .id;
        MergeEngine::new(&db)
            .merge(owner, a, b, &FieldResolution::default(), CollectionFlags::default())
            .unwrap();

        let feed = ActivityService::new(&db);
        let all = feed.get_recent_activity(owner, FeedPage::default()).unwrap();
        assert_eq!(all.activities[0].kind(), "contact_merged");

        feed.hide_contact_from_feed(owner, b).unwrap();
        let after = feed.get_recent_activity(owner, FeedPage::default()).unwrap();
        assert!(after.activities.iter().all(|item| !item.mentions(b)));
    }

    #[test]
    fn test_pagination_reports_has_more() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        for i in 0..5 {
            db.insert_task(&Task::new(owner, format!("Task {i}"))).unwrap();
        }

        let feed = ActivityService::new(&db);
        let first = feed
            .get_recent_activity(owner, FeedPage { limit: 3, offset: 0 })
            .unwrap();
        assert_eq!(first.activities.len(), 3);
        assert!(first.has_more);

        let second = feed
            .get_recent_activity(owner, FeedPage { limit: 3, offset: 3 })
            .unwrap();
        assert_eq!(second.activities.len(), 2);
        assert!(!second.has_more);
    }
}
