//! Task repository
//!
//! Defines the interface for task storage operations and its SQLite
//! implementation. Repositories run on a connection handed to them by the
//! unit of work and never commit on their own.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::model::{NewTask, Task, TaskChanges};
use super::query::{TaskQuery, TASK_COLUMNS};
use crate::{Error, Result};

/// Repository interface for task CRUD operations
pub trait TaskRepository {
    /// List tasks matching the query
    fn list(&self, query: &TaskQuery) -> Result<Vec<Task>>;

    /// Get a task by ID
    fn get_by_id(&self, id: Uuid) -> Result<Option<Task>>;

    /// Insert a new task and return it as stored
    fn create(&self, new_task: NewTask) -> Result<Task>;

    /// Merge `changes` into `task` and save it
    fn update(&self, task: Task, changes: TaskChanges) -> Result<Task>;

    /// Remove a task
    fn delete(&self, task: &Task) -> Result<()>;

    /// Set the done flag
    fn mark_done(&self, task: Task, done: bool) -> Result<Task>;

    /// Set the priority. Any value is accepted.
    fn update_priority(&self, task: Task, priority: i32) -> Result<Task>;
}

/// SQLite-backed task repository bound to one connection
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn save(&self, task: &Task) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET title = ?1, description = ?2, done = ?3, priority = ?4,
                 category = ?5, due_date = ?6
             WHERE id = ?7",
            params![
                task.title,
                task.description,
                task.done,
                task.priority,
                task.category,
                encode_timestamp(&task.due_date),
                task.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::StaleTask(task.id));
        }
        Ok(())
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn list(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        let statement = query.to_sql();
        debug!("Listing tasks: {}", statement.sql);

        let mut stmt = self.conn.prepare(&statement.sql)?;
        let tasks = stmt
            .query_map(params_from_iter(statement.params.iter()), task_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn get_by_id(&self, id: Uuid) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS),
                params![id.to_string()],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    fn create(&self, new_task: NewTask) -> Result<Task> {
        let id = Uuid::new_v4();
        let due_date = new_task.due_date.unwrap_or_else(Utc::now);

        let task = self.conn.query_row(
            &format!(
                "INSERT INTO tasks (id, title, description, done, priority, category, due_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 RETURNING {}",
                TASK_COLUMNS
            ),
            params![
                id.to_string(),
                new_task.title,
                new_task.description,
                new_task.done,
                new_task.priority,
                new_task.category,
                encode_timestamp(&due_date),
            ],
            task_from_row,
        )?;
        Ok(task)
    }

    fn update(&self, mut task: Task, changes: TaskChanges) -> Result<Task> {
        if changes.is_empty() {
            return Ok(task);
        }
        changes.apply(&mut task);
        self.save(&task)?;
        Ok(task)
    }

    fn delete(&self, task: &Task) -> Result<()> {
        self.conn.execute(
            "DELETE FROM tasks WHERE id = ?1",
            params![task.id.to_string()],
        )?;
        Ok(())
    }

    fn mark_done(&self, mut task: Task, done: bool) -> Result<Task> {
        task.done = done;
        self.save(&task)?;
        Ok(task)
    }

    fn update_priority(&self, mut task: Task, priority: i32) -> Result<Task> {
        task.priority = priority;
        self.save(&task)?;
        Ok(task)
    }
}

/// Fixed-width RFC 3339 in UTC, so text order is chronological order
pub(crate) fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let id: String = row.get(0)?;
    let due_date: String = row.get(6)?;

    Ok(Task {
        id: Uuid::parse_str(&id)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e)))?,
        title: row.get(1)?,
        description: row.get(2)?,
        done: row.get(3)?,
        priority: row.get(4)?,
        category: row.get(5)?,
        due_date: DateTime::parse_from_rfc3339(&due_date)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?,
    })
}
