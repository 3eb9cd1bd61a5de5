//! Core library for the todo backend
//!
//! This crate contains the core business logic, including:
//! - Task model, filtering and sorting
//! - SQLite persistence behind a unit of work
//! - The task service used by the HTTP layer
//! - Settings loaded from the environment

pub mod config;
pub mod db;
pub mod error;
pub mod task;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
