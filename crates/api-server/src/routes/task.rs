//! Task API endpoints
//!
//! RESTful API for task CRUD operations.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use todo_core::task::{NewTask, Task, TaskChanges, TaskQuery, DEFAULT_PRIORITY};

use super::{route_error, JsonBody, RouteError};
use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl From<ListTasksQuery> for TaskQuery {
    fn from(query: ListTasksQuery) -> Self {
        TaskQuery::from_raw(
            query.search.as_deref(),
            query.status.as_deref(),
            query.sort.as_deref(),
            query.category.as_deref(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub done: Option<bool>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<String>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(req: CreateTaskRequest) -> Self {
        NewTask {
            title: req.title,
            description: req.description,
            done: req.done.unwrap_or(false),
            priority: req.priority.unwrap_or(DEFAULT_PRIORITY),
            category: req.category,
            due_date: req.due_date,
        }
    }
}

/// Partial update. Absent fields are left alone; an explicit `null` clears
/// `description` or `category`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub priority: Option<i32>,
    #[serde(default)]
    pub done: Option<bool>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "present")]
    pub category: Option<Option<String>>,
}

impl From<UpdateTaskRequest> for TaskChanges {
    fn from(req: UpdateTaskRequest) -> Self {
        TaskChanges {
            title: req.title,
            description: req.description,
            done: req.done,
            priority: req.priority,
            category: req.category,
            due_date: req.due_date,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MarkDoneRequest {
    #[serde(default = "default_done")]
    pub done: bool,
}

fn default_done() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct PriorityUpdateRequest {
    pub priority: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub priority: i32,
    pub done: bool,
    pub due_date: String,
    pub category: Option<String>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            done: task.done,
            due_date: task.due_date.to_rfc3339(),
            category: task.category,
        }
    }
}

/// A field that was present in the payload, even if `null`
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /tasks - List tasks, optionally filtered and sorted
async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<TaskResponse>>, RouteError> {
    let filters = format!(
        "search={:?}, status={:?}, sort={:?}, category={:?}",
        query.search, query.status, query.sort, query.category
    );
    let tasks = state
        .task_service()
        .list_tasks(query.into())
        .await
        .map_err(|e| {
            error!("Failed to fetch tasks: {}", e);
            service_error(e)
        })?;

    info!("Fetched {} tasks ({})", tasks.len(), filters);
    Ok(Json(tasks.into_iter().map(TaskResponse::from).collect()))
}

/// POST /tasks - Create a new task
async fn create_task(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), RouteError> {
    let created = state
        .task_service()
        .create_task(req.into())
        .await
        .map_err(|e| {
            if !e.is_client_error() {
                error!("Failed to create task: {}", e);
            }
            service_error(e)
        })?;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(created))))
}

/// GET /tasks/:id - Get a single task
async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TaskResponse>, RouteError> {
    let task = state
        .task_service()
        .get_task(id)
        .await
        .map_err(service_error)?;

    match task {
        Some(t) => {
            info!("Fetched task {}", id);
            Ok(Json(TaskResponse::from(t)))
        }
        None => {
            warn!("Task {} not found", id);
            Err(task_not_found())
        }
    }
}

/// PUT /tasks/:id - Update the fields present in the body
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, RouteError> {
    let updated = state
        .task_service()
        .update_task(id, req.into())
        .await
        .map_err(service_error)?;

    match updated {
        Some(t) => Ok(Json(TaskResponse::from(t))),
        None => {
            warn!("Task {} not found for update", id);
            Err(task_not_found())
        }
    }
}

/// DELETE /tasks/:id - Delete a task
async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, RouteError> {
    let deleted = state
        .task_service()
        .delete_task(id)
        .await
        .map_err(service_error)?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        warn!("Task {} not found for deletion", id);
        Err(task_not_found())
    }
}

/// PATCH /tasks/:id/done - Mark a task done (or undone)
async fn mark_task_done(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<MarkDoneRequest>,
) -> Result<Json<TaskResponse>, RouteError> {
    let updated = state
        .task_service()
        .mark_done(id, req.done)
        .await
        .map_err(service_error)?;

    match updated {
        Some(t) => Ok(Json(TaskResponse::from(t))),
        None => {
            warn!("Task {} not found for marking done", id);
            Err(task_not_found())
        }
    }
}

/// PATCH /tasks/:id/priority - Change a task's priority
async fn change_task_priority(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    JsonBody(req): JsonBody<PriorityUpdateRequest>,
) -> Result<Json<TaskResponse>, RouteError> {
    let updated = state
        .task_service()
        .update_priority(id, req.priority)
        .await
        .map_err(service_error)?;

    match updated {
        Some(t) => Ok(Json(TaskResponse::from(t))),
        None => {
            warn!("Task {} not found for priority update", id);
            Err(task_not_found())
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/", get(list_tasks).post(create_task))
        .route(
            "/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/done", patch(mark_task_done))
        .route("/tasks/{id}/priority", patch(change_task_priority))
}

// ============================================================================
// Helpers
// ============================================================================

fn task_not_found() -> RouteError {
    route_error(StatusCode::NOT_FOUND, "Task not found")
}

fn service_error(error: todo_core::Error) -> RouteError {
    match error {
        todo_core::Error::InvalidInput(msg) => {
            route_error(StatusCode::UNPROCESSABLE_ENTITY, msg)
        }
        stale @ todo_core::Error::StaleTask(_) => {
            route_error(StatusCode::CONFLICT, stale.to_string())
        }
        other => route_error(StatusCode::INTERNAL_SERVER_ERROR, other.to_string()),
    }
}
