//! SQLite-backed persistence for the recipient registry and the payload slot.
//!
//! Connections are opened per operation on tokio's blocking pool; concurrent
//! handlers serialize through SQLite's own locking (WAL + busy timeout), not
//! through application locks.

mod migrations;
pub mod payload;
pub mod registry;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use rusqlite::Connection;
use tracing::info;

use crate::Result;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the bot database file. Cheap to clone; holds no open connection.
#[derive(Clone, Debug)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    /// Create the database (and parent directory) if needed and run migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Self {
            path: path.to_path_buf(),
        };
        let conn = db.connect()?;
        let journal: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        migrations::run_migrations(&conn)?;

        info!(path = %path.display(), journal = %journal, "Database initialized");
        Ok(db)
    }

    /// Open a fresh connection for a single operation.
    pub(crate) fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(conn)
    }

    /// Run `f` against a fresh connection off the async worker threads.
    ///
    /// A busy database parks a blocking-pool thread, never the runtime.
    pub(crate) async fn call<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.connect()?;
            f(&conn)
        })
        .await?
    }
}
