//! Schema migrations
//!
//! Migrations are applied in order, each in its own transaction. The applied
//! version is tracked in `PRAGMA user_version`.

use rusqlite::Connection;
use tracing::info;

use crate::{Error, Result};

const MIGRATIONS: &[(&str, &str)] = &[(
    "create tasks table",
    "CREATE TABLE tasks (
        id          TEXT    PRIMARY KEY NOT NULL,
        title       TEXT    NOT NULL CHECK (length(title) <= 255),
        description TEXT    CHECK (length(description) <= 1024),
        done        INTEGER NOT NULL DEFAULT 0,
        priority    INTEGER NOT NULL DEFAULT 5,
        category    TEXT    CHECK (length(category) <= 255),
        due_date    TEXT    NOT NULL
    );
    CREATE INDEX ix_tasks_id ON tasks (id);",
)];

/// Latest schema version known to this build
pub fn latest_version() -> i64 {
    MIGRATIONS.len() as i64
}

/// Current schema version of the database
pub fn current_version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

/// Bring the schema up to date. Already applied migrations are skipped.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let current = current_version(conn)?;
    let latest = latest_version();

    if current > latest {
        return Err(Error::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, latest
        )));
    }

    for (index, (name, sql)) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let version = index as i64 + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .map_err(|e| Error::Migration(format!("{} ({}): {}", name, version, e)))?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        info!("Applied migration {}: {}", version, name);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_create_tasks_table() {
        let mut conn = Connection::open_in_memory().unwrap();
        assert_eq!(current_version(&conn).unwrap(), 0);

        run_migrations(&mut conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), latest_version());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        run_migrations(&mut conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), latest_version());
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", latest_version() + 1)
            .unwrap();

        match run_migrations(&mut conn) {
            Err(Error::Migration(msg)) => assert!(msg.contains("newer")),
            other => panic!("Expected Migration error, got: {:?}", other),
        }
    }

    #[test]
    fn test_schema_defaults_and_constraints() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        conn.execute(
            "INSERT INTO tasks (id, title, due_date) VALUES ('a', 'Defaults', '2025-01-01T00:00:00.000000Z')",
            [],
        )
        .unwrap();
        let (done, priority): (bool, i32) = conn
            .query_row("SELECT done, priority FROM tasks WHERE id = 'a'", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert!(!done);
        assert_eq!(priority, 5);

        let too_long = "x".repeat(256);
        let result = conn.execute(
            "INSERT INTO tasks (id, title, due_date) VALUES ('b', ?1, '2025-01-01T00:00:00.000000Z')",
            [too_long],
        );
        assert!(result.is_err());

        let missing_title = conn.execute(
            "INSERT INTO tasks (id, due_date) VALUES ('c', '2025-01-01T00:00:00.000000Z')",
            [],
        );
        assert!(missing_title.is_err());
    }
}
