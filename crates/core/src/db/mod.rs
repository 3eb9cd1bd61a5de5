//! Database access
//!
//! A pooled SQLite store. Each logical operation borrows one connection from
//! the pool, runs inside a [`UnitOfWork`] on the blocking thread pool and
//! hands the connection back when it finishes.

pub mod functions;
pub mod migrations;
mod unit_of_work;

pub use unit_of_work::{Outcome, Repositories, UnitOfWork};

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{info, warn};

use crate::config::DatabaseSettings;
use crate::{Error, Result};

/// SQLite connection pool type
pub type ConnectionPool = Pool<SqliteConnectionManager>;

const CONNECTION_PRAGMAS: &str = "PRAGMA journal_mode = WAL;
     PRAGMA foreign_keys = ON;
     PRAGMA busy_timeout = 5000;";

/// Shared handle to the task database
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl Database {
    /// Open (creating if needed) the database file and apply migrations
    pub fn open(settings: &DatabaseSettings) -> Result<Self> {
        if let Some(parent) = settings.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Internal(format!("Failed to create {:?}: {}", parent, e)))?;
            }
        }

        let manager = SqliteConnectionManager::file(&settings.path)
            .with_init(|conn| {
                conn.execute_batch(CONNECTION_PRAGMAS)?;
                functions::register(conn)
            });
        let pool = Pool::builder()
            .max_size(settings.max_connections)
            .build(manager)?;

        info!(
            "Opened database {:?} (max {} connections)",
            settings.path, settings.max_connections
        );
        Self::from_pool(pool)
    }

    /// Wrap an existing pool and apply migrations
    pub fn from_pool(pool: ConnectionPool) -> Result<Self> {
        let mut conn = pool.get()?;
        migrations::run_migrations(&mut conn)?;
        drop(conn);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Run `work` in a unit of work on a pooled connection.
    ///
    /// The work runs on the blocking thread pool; the connection returns to
    /// the pool whether the unit of work committed, rolled back or panicked.
    pub async fn unit_of_work<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Repositories<'_>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            UnitOfWork::run(&mut conn, work)
        })
        .await
        .map_err(|e| Error::Internal(format!("Database worker failed: {}", e)))?
    }

    /// Check that the database answers a trivial query
    pub async fn ping(&self) -> bool {
        let pool = self.pool.clone();
        let result = tokio::task::spawn_blocking(move || -> Result<i64> {
            let conn = pool.get()?;
            Ok(conn.query_row("SELECT 1", [], |row| row.get(0))?)
        })
        .await;

        match result {
            Ok(Ok(1)) => true,
            Ok(Ok(other)) => {
                warn!("Database ping returned unexpected value {}", other);
                false
            }
            Ok(Err(e)) => {
                warn!("Database ping failed: {}", e);
                false
            }
            Err(e) => {
                warn!("Database ping worker failed: {}", e);
                false
            }
        }
    }
}
