//! Database schema migrations for xingxing.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| row.get::<_, i32>(0)) {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: tasks, undo snapshots, point ledger, medication records.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS tasks (
            id                       TEXT PRIMARY KEY,
            child_id                 TEXT NOT NULL,
            name                     TEXT NOT NULL,
            category                 TEXT NOT NULL DEFAULT 'life',
            frequency                TEXT NOT NULL DEFAULT 'daily',
            icon                     TEXT NOT NULL DEFAULT '',
            description              TEXT NOT NULL DEFAULT '',
            is_active                INTEGER NOT NULL DEFAULT 1,
            points                   INTEGER NOT NULL,
            consecutive_days         INTEGER NOT NULL DEFAULT 0,
            last_completed_date      TEXT,
            completed_today          INTEGER NOT NULL DEFAULT 0,
            stage                    TEXT NOT NULL DEFAULT 'start',
            total_completions        INTEGER NOT NULL DEFAULT 0,
            requires_parent_confirm  INTEGER NOT NULL DEFAULT 0,
            parent_confirmed         INTEGER NOT NULL DEFAULT 0,
            created_at               TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS task_snapshots (
            task_id     TEXT PRIMARY KEY REFERENCES tasks(id) ON DELETE CASCADE,
            state_json  TEXT NOT NULL,
            taken_on    TEXT NOT NULL,
            point_log_id TEXT
        );

        CREATE TABLE IF NOT EXISTS point_logs (
            id          TEXT PRIMARY KEY,
            child_id    TEXT NOT NULL,
            task_id     TEXT REFERENCES tasks(id) ON DELETE CASCADE,
            kind        TEXT NOT NULL,
            points      INTEGER NOT NULL,
            reason      TEXT NOT NULL,
            operator    TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS medication_records (
            id               TEXT PRIMARY KEY,
            child_id         TEXT NOT NULL,
            drug             TEXT NOT NULL,
            dose_mg          REAL NOT NULL,
            administered_at  TEXT NOT NULL,
            note             TEXT
        );",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: lookup indexes for per-child queries.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_tasks_child ON tasks(child_id);
         CREATE INDEX IF NOT EXISTS idx_point_logs_child ON point_logs(child_id, created_at);
         CREATE INDEX IF NOT EXISTS idx_medication_child_drug
             ON medication_records(child_id, drug, administered_at);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_database_reaches_current_version() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }
}
