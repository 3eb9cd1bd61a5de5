//! Application state

use std::sync::Arc;

use todo_core::config::Settings;
use todo_core::db::Database;
use todo_core::task::TaskService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    task_service: TaskService,
    settings: Settings,
}

impl AppState {
    /// Open the database described by `settings` and build the state around it
    pub fn new(settings: Settings) -> todo_core::Result<Self> {
        let db = Database::open(&settings.database)?;
        Ok(Self::with_database(db, settings))
    }

    pub fn with_database(db: Database, settings: Settings) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                task_service: TaskService::new(db),
                settings,
            }),
        }
    }

    pub fn task_service(&self) -> &TaskService {
        &self.inner.task_service
    }

    pub fn database(&self) -> &Database {
        self.inner.task_service.database()
    }

    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }
}
