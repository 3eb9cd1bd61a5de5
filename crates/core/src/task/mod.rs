//! Task module
//!
//! This module contains task-related types and logic.

mod model;
mod query;
mod repository;
mod service;

pub use model::*;
pub use query::{StatusFilter, TaskQuery, TaskSort};
pub use repository::{SqliteTaskRepository, TaskRepository};
pub use service::TaskService;
