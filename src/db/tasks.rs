use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use super::{parse_ts, parse_uuid, ts, Database};
use crate::error::{CoreError, CoreResult};
use crate::models::Task;

impl Database {
    // ==================== TASKS ====================

    pub fn insert_task(&self, task: &Task) -> CoreResult<()> {
        self.conn.execute(
            r#"INSERT INTO tasks (id, owner_id, title, contact_id, created_at, completed_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
            params![
                task.id.to_string(),
                task.owner_id.to_string(),
                task.title,
                task.contact_id.map(|id| id.to_string()),
                ts(&task.created_at),
                task.completed_at.as_ref().map(ts),
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, owner_id: Uuid, id: Uuid) -> CoreResult<Option<Task>> {
        let task = self
            .conn
            .query_row(
                "SELECT * FROM tasks WHERE id = ? AND owner_id = ?",
                [id.to_string(), owner_id.to_string()],
                row_to_task,
            )
            .optional()?;
        Ok(task)
    }

    /// Stamp `completed_at`. Completing twice is an invalid state.
    pub fn complete_task(&self, owner_id: Uuid, id: Uuid, at: DateTime<Utc>) -> CoreResult<Task> {
        let mut task = self
            .get_task(owner_id, id)?
            .ok_or_else(|| CoreError::not_found(format!("task {id}")))?;
        if task.is_completed() {
            return Err(CoreError::invalid_state(format!("task {id} is already completed")));
        }

        self.conn.execute(
            "UPDATE tasks SET completed_at = ? WHERE id = ?",
            params![ts(&at), id.to_string()],
        )?;
        task.complete(at);
        Ok(task)
    }
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    let id: String = row.get("id")?;
    let owner_id: String = row.get("owner_id")?;
    let contact_id: Option<String> = row.get("contact_id")?;
    let created_at: String = row.get("created_at")?;
    let completed_at: Option<String> = row.get("completed_at")?;

    Ok(Task {
        id: parse_uuid(&id)?,
        owner_id: parse_uuid(&owner_id)?,
        title: row.get("title")?,
        contact_id: contact_id.as_deref().map(parse_uuid).transpose()?,
        created_at: parse_ts(&created_at)?,
        completed_at: completed_at.as_deref().map(parse_ts).transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_complete_task() {
        let db = Database::open_memory().unwrap();
        let owner = Uuid::new_v4();
        let task = Task::new(owner, "Follow up".to_string());
        db.insert_task(&task).unwrap();

        let stored = db.get_task(owner, task.id).unwrap().unwrap();
        assert_eq!(stored.title, "Follow up");
        assert!(!stored.is_completed());

        let done = db.complete_task(owner, task.id, Utc::now()).unwrap();
        assert!(done.is_completed());
        assert!(db.get_task(owner, task.id).unwrap().unwrap().is_completed());

        let err = db.complete_task(owner, task.id, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[test]
    fn test_complete_foreign_task_is_not_found() {
        let db = Database::open_memory().unwrap();
        let task = Task::new(Uuid::new_v4(), "Private".to_string());
        db.insert_task(&task).unwrap();

        let err = db.complete_task(Uuid::new_v4(), task.id, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }
}
