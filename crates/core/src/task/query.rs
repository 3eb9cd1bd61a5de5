//! Task listing filters and the SQL they compile to
//!
//! Every filter is optional and independent. Present filters are combined
//! with `AND`; the text search itself matches title `OR` description, as a
//! Unicode case-insensitive substring.
//! Unrecognized status or sort values are ignored rather than rejected.

use std::fmt::Write;

use rusqlite::types::Value;

use crate::db::functions::UNICODE_LOWER;

pub(crate) const TASK_COLUMNS: &str =
    "id, title, description, done, priority, category, due_date";

/// Restrict a listing by completion state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Done,
    Undone,
}

impl StatusFilter {
    /// Parse `"done"` / `"undone"`; anything else is no filter
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "done" => Some(Self::Done),
            "undone" => Some(Self::Undone),
            _ => None,
        }
    }

    fn done(self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Ordering applied to a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSort {
    PriorityAsc,
    PriorityDesc,
    DueDateAsc,
    DueDateDesc,
}

impl TaskSort {
    /// Parse one of the four sort keys; anything else leaves the order to the store
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "priority_asc" => Some(Self::PriorityAsc),
            "priority_desc" => Some(Self::PriorityDesc),
            "due_date_asc" => Some(Self::DueDateAsc),
            "due_date_desc" => Some(Self::DueDateDesc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriorityAsc => "priority_asc",
            Self::PriorityDesc => "priority_desc",
            Self::DueDateAsc => "due_date_asc",
            Self::DueDateDesc => "due_date_desc",
        }
    }

    fn order_by(self) -> &'static str {
        match self {
            Self::PriorityAsc => "priority ASC",
            Self::PriorityDesc => "priority DESC",
            Self::DueDateAsc => "due_date ASC",
            Self::DueDateDesc => "due_date DESC",
        }
    }
}

/// Filters for listing tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
    pub status: Option<StatusFilter>,
    pub sort: Option<TaskSort>,
    /// Exact category match
    pub category: Option<String>,
}

impl TaskQuery {
    /// Build a query from raw request parameters.
    ///
    /// Empty `search` and `category` count as absent.
    pub fn from_raw(
        search: Option<&str>,
        status: Option<&str>,
        sort: Option<&str>,
        category: Option<&str>,
    ) -> Self {
        Self {
            search: non_empty(search),
            status: status.and_then(StatusFilter::parse),
            sort: sort.and_then(TaskSort::parse),
            category: non_empty(category),
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into()).filter(|s: &String| !s.is_empty());
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_sort(mut self, sort: TaskSort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into()).filter(|c: &String| !c.is_empty());
        self
    }

    /// Compile the filters into a single `SELECT` with positional parameters
    pub(crate) fn to_sql(&self) -> SelectStatement {
        let mut sql = format!("SELECT {} FROM tasks", TASK_COLUMNS);
        let mut params: Vec<Value> = Vec::new();
        let mut conditions: Vec<String> = Vec::new();

        if let Some(search) = &self.search {
            params.push(Value::Text(search.to_lowercase()));
            let n = params.len();
            conditions.push(format!(
                "(instr({UNICODE_LOWER}(title), ?{n}) > 0 \
                 OR instr({UNICODE_LOWER}(description), ?{n}) > 0)"
            ));
        }

        if let Some(status) = self.status {
            params.push(Value::Integer(i64::from(status.done())));
            conditions.push(format!("done = ?{}", params.len()));
        }

        if let Some(category) = &self.category {
            params.push(Value::Text(category.clone()));
            conditions.push(format!("category = ?{}", params.len()));
        }

        if !conditions.is_empty() {
            let _ = write!(sql, " WHERE {}", conditions.join(" AND "));
        }

        if let Some(sort) = self.sort {
            let _ = write!(sql, " ORDER BY {}", sort.order_by());
        }

        SelectStatement { sql, params }
    }
}

/// A compiled listing query
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SelectStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(String::from)
}
