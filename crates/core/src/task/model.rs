//! Task model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Priority given to tasks created without one
pub const DEFAULT_PRIORITY: i32 = 5;

pub const TITLE_MAX_LEN: usize = 255;
pub const DESCRIPTION_MAX_LEN: usize = 1024;
pub const CATEGORY_MAX_LEN: usize = 255;

/// A persisted task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub done: bool,
    pub priority: i32,
    pub category: Option<String>,
    pub due_date: DateTime<Utc>,
}

/// Fields for a task that has not been stored yet
///
/// The identifier is assigned by the repository on insert; a missing due
/// date becomes the creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub done: bool,
    pub priority: i32,
    pub category: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    /// Create a new task payload with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            done: false,
            priority: DEFAULT_PRIORITY,
            category: None,
            due_date: None,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the done flag
    pub fn with_done(mut self, done: bool) -> Self {
        self.done = done;
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the due date
    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Check the column constraints before anything touches the store
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_optional("description", self.description.as_deref(), DESCRIPTION_MAX_LEN)?;
        validate_optional("category", self.category.as_deref(), CATEGORY_MAX_LEN)
    }
}

/// A sparse set of changes to merge into an existing task
///
/// `None` means "leave the field alone". For the nullable columns the inner
/// `Option` carries the new value, so `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub done: Option<bool>,
    pub priority: Option<i32>,
    pub category: Option<Option<String>>,
    pub due_date: Option<DateTime<Utc>>,
}

impl TaskChanges {
    /// True when the payload would not touch any field
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.done.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.due_date.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(description) = &self.description {
            validate_optional("description", description.as_deref(), DESCRIPTION_MAX_LEN)?;
        }
        if let Some(category) = &self.category {
            validate_optional("category", category.as_deref(), CATEGORY_MAX_LEN)?;
        }
        Ok(())
    }

    /// Merge the present fields into `task`
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(done) = self.done {
            task.done = done;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput("Title cannot be empty".to_string()));
    }
    check_length("title", title, TITLE_MAX_LEN)
}

fn validate_optional(field: &str, value: Option<&str>, max_len: usize) -> Result<()> {
    match value {
        Some(value) => check_length(field, value, max_len),
        None => Ok(()),
    }
}

fn check_length(field: &str, value: &str, max_len: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max_len {
        return Err(Error::InvalidInput(format!(
            "{} must be at most {} characters (got {})",
            field, max_len, len
        )));
    }
    Ok(())
}
