use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

use crate::{store::Database, utils::iso_timestamp_utc, Result};

/// The singleton payload slot.
///
/// Field names double as the JSON file format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadRecord {
    #[serde(default)]
    pub last_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleared_at: Option<String>,
    #[serde(default = "iso_timestamp_utc")]
    pub started: String,
}

impl PayloadRecord {
    /// Fresh record: no data, started now.
    pub fn fresh() -> Self {
        Self {
            last_input: None,
            last_update: None,
            cleared_at: None,
            started: iso_timestamp_utc(),
        }
    }

    /// The stored numbers, if any. An empty string counts as no data.
    pub fn data(&self) -> Option<&str> {
        self.last_input.as_deref().filter(|s| !s.is_empty())
    }

    pub fn set_input(&mut self, numbers: String) {
        self.last_input = Some(numbers);
        self.last_update = Some(iso_timestamp_utc());
    }

    pub fn clear(&mut self) {
        self.last_input = None;
        self.cleared_at = Some(iso_timestamp_utc());
    }
}

/// Storage for the payload slot.
///
/// `load` never fails on missing or unreadable data; it falls back to
/// [`PayloadRecord::fresh`]. `save` overwrites the whole record.
#[async_trait]
pub trait PayloadStore: Send + Sync {
    async fn load(&self) -> Result<PayloadRecord>;
    async fn save(&self, record: &PayloadRecord) -> Result<()>;
}

/// Payload kept as the single row of the `payload` table.
#[derive(Clone, Debug)]
pub struct SqlitePayloadStore {
    db: Database,
}

impl SqlitePayloadStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn has_record(&self) -> Result<bool> {
        self.db
            .call(|conn| {
                let found = conn
                    .query_row("SELECT 1 FROM payload WHERE id = 1", [], |_| Ok(()))
                    .optional()?;
                Ok(found.is_some())
            })
            .await
    }

    /// Seed the table from a legacy JSON payload file.
    ///
    /// Only runs when the table is still empty and the file parses; returns
    /// whether anything was imported.
    pub async fn import_legacy_file(&self, path: &Path) -> Result<bool> {
        if self.has_record().await? {
            return Ok(false);
        }
        let Some(record) = read_payload_file(path).await else {
            return Ok(false);
        };

        self.save(&record).await?;
        info!(path = %path.display(), "Imported legacy payload file");
        Ok(true)
    }
}

fn select_row(conn: &Connection) -> Result<PayloadRecord> {
    let row = conn
        .query_row(
            "SELECT last_input, last_update, cleared_at, started FROM payload WHERE id = 1",
            [],
            |row| {
                Ok(PayloadRecord {
                    last_input: row.get(0)?,
                    last_update: row.get(1)?,
                    cleared_at: row.get(2)?,
                    started: row.get(3)?,
                })
            },
        )
        .optional();

    match row {
        Ok(Some(record)) => Ok(record),
        Ok(None) => Ok(PayloadRecord::fresh()),
        Err(
            e @ (rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::FromSqlConversionFailure(..)),
        ) => {
            warn!(error = %e, "Payload row unreadable, starting fresh");
            Ok(PayloadRecord::fresh())
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl PayloadStore for SqlitePayloadStore {
    async fn load(&self) -> Result<PayloadRecord> {
        self.db.call(select_row).await
    }

    async fn save(&self, record: &PayloadRecord) -> Result<()> {
        let record = record.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO payload (id, last_input, last_update, cleared_at, started)
                     VALUES (1, ?1, ?2, ?3, ?4)",
                    params![
                        record.last_input,
                        record.last_update,
                        record.cleared_at,
                        record.started,
                    ],
                )?;
                Ok(())
            })
            .await
    }
}

/// Payload kept as a pretty-printed JSON file, rewritten on every save.
#[derive(Clone, Debug)]
pub struct JsonFilePayloadStore {
    path: PathBuf,
}

impl JsonFilePayloadStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PayloadStore for JsonFilePayloadStore {
    async fn load(&self) -> Result<PayloadRecord> {
        Ok(read_payload_file(&self.path)
            .await
            .unwrap_or_else(PayloadRecord::fresh))
    }

    async fn save(&self, record: &PayloadRecord) -> Result<()> {
        let txt = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, txt).await?;
        Ok(())
    }
}

/// Read a payload file; missing or corrupt files yield `None`.
async fn read_payload_file(path: &Path) -> Option<PayloadRecord> {
    let txt = match fs::read_to_string(path).await {
        Ok(txt) => txt,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Payload file unreadable, ignoring");
            return None;
        }
    };

    match serde_json::from_str::<PayloadRecord>(&txt) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Payload file corrupt, ignoring");
            None
        }
    }
}
