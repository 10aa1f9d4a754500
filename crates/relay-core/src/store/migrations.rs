//! Schema migrations, applied in order and tracked in the `migrations` table.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::Result;

/// Current schema version.
pub const CURRENT_VERSION: i32 = 2;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM migrations",
        [],
        |row| row.get(0),
    )?;

    if current_version >= CURRENT_VERSION {
        return Ok(());
    }
    info!(current_version, target_version = CURRENT_VERSION, "Running migrations");

    if current_version < 1 {
        migrate_v1_devices(conn)?;
    }
    if current_version < 2 {
        migrate_v2_payload(conn)?;
    }

    info!("Migrations complete");
    Ok(())
}

fn record_migration(conn: &Connection, version: i32, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
        rusqlite::params![version, name],
    )?;
    debug!(version, name, "Migration applied");
    Ok(())
}

/// V1: registered devices, keyed by Telegram user id.
fn migrate_v1_devices(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS devices (
            user_id INTEGER PRIMARY KEY,
            username TEXT,
            first_name TEXT,
            last_name TEXT,
            registered TEXT
        );",
    )?;
    record_migration(conn, 1, "devices")
}

/// V2: the payload slot lives next to the registry, as a single row.
fn migrate_v2_payload(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS payload (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            last_input TEXT,
            last_update TEXT,
            cleared_at TEXT,
            started TEXT NOT NULL
        );",
    )?;
    record_migration(conn, 2, "payload")
}
