use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A task row as seen by the activity feed.
///
/// Only creation and completion times matter here; the scheduling
/// semantics of tasks live outside this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    /// Optional link to a contact
    pub contact_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(owner_id: Uuid, title: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title,
            contact_id: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.completed_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_new() {
        let task = Task::new(Uuid::new_v4(), "Test task".to_string());
        assert_eq!(task.title, "Test task");
        assert!(task.contact_id.is_none());
        assert!(!task.is_completed());
    }

    #[test]
    fn test_task_complete() {
        let mut task = Task::new(Uuid::new_v4(), "Test".to_string());
        assert!(!task.is_completed());

        let at = Utc::now();
        task.complete(at);
        assert!(task.is_completed());
        assert_eq!(task.completed_at, Some(at));
    }
}
