//! Database schema migrations for habitual.
//!
//! Migrations are versioned and applied automatically when opening the
//! database. The `schema_version` table tracks the current version.

use rusqlite::{Connection, Result as SqliteResult};

/// Schema version produced by [`migrate`].
pub const CURRENT_VERSION: i32 = 3;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }
    if current_version < 3 {
        migrate_v3(conn)?;
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

/// Current schema version, 0 for a fresh database.
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            tracing::warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// v1: habits and their completion history.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS habits (
            id             TEXT PRIMARY KEY,
            name           TEXT NOT NULL,
            description    TEXT,
            frequency      TEXT NOT NULL DEFAULT 'daily',
            days_of_week   TEXT,
            preferred_time TEXT,
            time_window    TEXT,
            steps          TEXT NOT NULL DEFAULT '[]',
            created_at     TEXT NOT NULL,
            updated_at     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS completions (
            habit_id TEXT NOT NULL REFERENCES habits(id) ON DELETE CASCADE,
            date     TEXT NOT NULL,
            PRIMARY KEY (habit_id, date)
        );

        CREATE INDEX IF NOT EXISTS idx_completions_date ON completions(date);",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// v2: local calendar events.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS events (
            id          TEXT PRIMARY KEY,
            title       TEXT NOT NULL,
            start_at    TEXT NOT NULL,
            end_at      TEXT NOT NULL,
            description TEXT,
            calendar_id TEXT NOT NULL DEFAULT 'default',
            habit_id    TEXT,
            completed   INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_events_range ON events(start_at, end_at);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}

/// v3: timestamps move from whole seconds (`...:SSZ`) to nanoseconds
/// (`...:SS.000000000Z`) so range comparisons stay lexicographic.
fn migrate_v3(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "UPDATE events SET start_at = substr(start_at, 1, 19) || '.000000000Z'
             WHERE length(start_at) = 20;
        UPDATE events SET end_at = substr(end_at, 1, 19) || '.000000000Z'
             WHERE length(end_at) = 20;
        UPDATE habits SET created_at = substr(created_at, 1, 19) || '.000000000Z'
             WHERE length(created_at) = 20;
        UPDATE habits SET updated_at = substr(updated_at, 1, 19) || '.000000000Z'
             WHERE length(updated_at) = 20;",
    )?;
    set_schema_version(&tx, 3)?;
    tx.commit()
}
