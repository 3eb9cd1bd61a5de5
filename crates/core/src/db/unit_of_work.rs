//! Unit of work
//!
//! Binds one transaction and every repository to a single connection for the
//! duration of a logical operation. The scope commits when the work returns
//! `Ok` and rolls back when it returns `Err` or panics; the error is passed
//! through untouched.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, warn};

use crate::task::SqliteTaskRepository;
use crate::Result;

/// The repositories available inside a unit of work
pub struct Repositories<'conn> {
    pub tasks: SqliteTaskRepository<'conn>,
}

impl<'conn> Repositories<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        Self {
            tasks: SqliteTaskRepository::new(conn),
        }
    }
}

/// How a unit of work ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Committed,
    RolledBack,
}

/// An open transaction. Dropping it without committing rolls back.
pub struct UnitOfWork<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> UnitOfWork<'conn> {
    /// Start a transaction on `conn`.
    ///
    /// The write lock is taken up front so a read followed by a write in the
    /// same scope cannot be invalidated by another writer.
    pub fn begin(conn: &'conn mut Connection) -> Result<Self> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(Self { tx })
    }

    /// Construct every repository on this transaction
    pub fn repositories(&self) -> Repositories<'_> {
        Repositories::new(&self.tx)
    }

    pub fn commit(self) -> Result<Outcome> {
        self.tx.commit()?;
        Ok(Outcome::Committed)
    }

    pub fn rollback(self) -> Result<Outcome> {
        self.tx.rollback()?;
        Ok(Outcome::RolledBack)
    }

    /// Run `work` inside a fresh unit of work on `conn`.
    ///
    /// Exactly one of commit or rollback happens. A failed rollback is logged
    /// and the original error is still returned.
    pub fn run<T, F>(conn: &mut Connection, work: F) -> Result<T>
    where
        F: FnOnce(&Repositories<'_>) -> Result<T>,
    {
        let uow = UnitOfWork::begin(conn)?;
        let result = {
            let repos = uow.repositories();
            work(&repos)
        };

        match result {
            Ok(value) => {
                let outcome = uow.commit()?;
                debug!("Unit of work finished: {:?}", outcome);
                Ok(value)
            }
            Err(err) => {
                match uow.rollback() {
                    Ok(outcome) => debug!("Unit of work finished: {:?} ({})", outcome, err),
                    Err(rollback_err) => {
                        warn!("Rollback failed after {}: {}", err, rollback_err)
                    }
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::functions;
    use crate::db::migrations::run_migrations;
    use crate::task::{NewTask, TaskRepository};
    use crate::Error;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use uuid::Uuid;

    fn setup() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        functions::register(&conn).unwrap();
        conn
    }

    fn seed(conn: &mut Connection) -> Uuid {
        UnitOfWork::run(conn, |repos| {
            Ok(repos.tasks.create(NewTask::new("Buy milk"))?.id)
        })
        .unwrap()
    }

    fn count_tasks(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_commit_on_success() {
        let mut conn = setup();
        let id = seed(&mut conn);

        let found = UnitOfWork::run(&mut conn, |repos| repos.tasks.get_by_id(id)).unwrap();
        assert_eq!(found.map(|t| t.title), Some("Buy milk".to_string()));
        assert!(conn.is_autocommit());
    }

    #[test]
    fn test_rollback_on_error_returns_same_error() {
        let mut conn = setup();

        let result: Result<()> = UnitOfWork::run(&mut conn, |repos| {
            repos.tasks.create(NewTask::new("Never stored"))?;
            Err(Error::InvalidInput("boom".to_string()))
        });

        match result {
            Err(Error::InvalidInput(msg)) => assert_eq!(msg, "boom"),
            other => panic!("Expected InvalidInput error, got: {:?}", other),
        }
        assert_eq!(count_tasks(&conn), 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn test_failed_update_leaves_task_unchanged() {
        let mut conn = setup();
        let id = seed(&mut conn);

        let result: Result<()> = UnitOfWork::run(&mut conn, |repos| {
            let task = repos.tasks.get_by_id(id)?.unwrap();
            let task = repos.tasks.mark_done(task, true)?;
            repos.tasks.update_priority(task, 99)?;
            Err(Error::Internal("failure mid-scope".to_string()))
        });
        assert!(result.is_err());

        let task = UnitOfWork::run(&mut conn, |repos| repos.tasks.get_by_id(id))
            .unwrap()
            .unwrap();
        assert!(!task.done);
        assert_eq!(task.priority, 5);
    }

    #[test]
    fn test_storage_failure_rolls_back_staged_changes() {
        let mut conn = setup();
        let id = seed(&mut conn);

        let result: Result<()> = UnitOfWork::run(&mut conn, |repos| {
            let task = repos.tasks.get_by_id(id)?.unwrap();
            repos.tasks.mark_done(task, true)?;
            repos.tasks.create(NewTask::new("x".repeat(256)))?;
            Ok(())
        });
        assert!(matches!(result, Err(Error::Database(_))));

        let task = UnitOfWork::run(&mut conn, |repos| repos.tasks.get_by_id(id))
            .unwrap()
            .unwrap();
        assert!(!task.done);
        assert_eq!(count_tasks(&conn), 1);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn test_rollback_on_panic() {
        let mut conn = setup();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            UnitOfWork::run(&mut conn, |repos| -> Result<()> {
                repos.tasks.create(NewTask::new("Never stored"))?;
                panic!("worker blew up");
            })
        }));
        assert!(outcome.is_err());

        assert_eq!(count_tasks(&conn), 0);
        assert!(conn.is_autocommit());
    }

    #[test]
    fn test_explicit_commit_and_rollback() {
        let mut conn = setup();

        let uow = UnitOfWork::begin(&mut conn).unwrap();
        uow.repositories()
            .tasks
            .create(NewTask::new("Rolled back"))
            .unwrap();
        assert_eq!(uow.rollback().unwrap(), Outcome::RolledBack);
        assert_eq!(count_tasks(&conn), 0);

        let uow = UnitOfWork::begin(&mut conn).unwrap();
        uow.repositories()
            .tasks
            .create(NewTask::new("Committed"))
            .unwrap();
        assert_eq!(uow.commit().unwrap(), Outcome::Committed);
        assert_eq!(count_tasks(&conn), 1);
    }
}
