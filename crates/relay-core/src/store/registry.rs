use rusqlite::params;

use crate::{
    domain::UserId, messaging::types::Sender, store::Database, utils::iso_timestamp_utc, Result,
};

/// Durable registry of recipients. At most one row per identity.
#[derive(Clone, Debug)]
pub struct Registry {
    db: Database,
}

impl Registry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or refresh a recipient. Metadata and registration time are
    /// overwritten on every call.
    pub async fn upsert(&self, sender: &Sender) -> Result<()> {
        let sender = sender.clone();
        self.db
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO devices (user_id, username, first_name, last_name, registered)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(user_id) DO UPDATE SET
                        username = excluded.username,
                        first_name = excluded.first_name,
                        last_name = excluded.last_name,
                        registered = excluded.registered",
                    params![
                        sender.user_id.0,
                        sender.username,
                        sender.first_name,
                        sender.last_name,
                        iso_timestamp_utc(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// All known identities. `user_id` is the rowid, so this is ascending id
    /// order; callers must not read meaning into it.
    pub async fn list_identities(&self) -> Result<Vec<UserId>> {
        self.db
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT user_id FROM devices ORDER BY rowid")?;
                let ids = stmt
                    .query_map([], |row| row.get::<_, i64>(0).map(UserId))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(ids)
            })
            .await
    }

    pub async fn count(&self) -> Result<usize> {
        self.db
            .call(|conn| {
                let n: i64 =
                    conn.query_row("SELECT COUNT(*) FROM devices", [], |row| row.get(0))?;
                Ok(usize::try_from(n).unwrap_or(0))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::OptionalExtension;

    type Row = (Option<String>, Option<String>, Option<String>, String);

    fn sender(id: i64, username: &str) -> Sender {
        Sender {
            user_id: UserId(id),
            username: Some(username.to_string()),
            first_name: Some("Ada".to_string()),
            last_name: None,
        }
    }

    fn registry(dir: &tempfile::TempDir) -> Registry {
        Registry::new(Database::open(&dir.path().join("devices.db")).unwrap())
    }

    fn row(reg: &Registry, id: i64) -> Option<Row> {
        let conn = reg.db.connect().unwrap();
        conn.query_row(
            "SELECT username, first_name, last_name, registered FROM devices WHERE user_id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()
        .unwrap()
    }

    #[tokio::test]
    async fn empty_registry_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        assert!(reg.list_identities().await.unwrap().is_empty());
        assert_eq!(reg.count().await.unwrap(), 0);
        assert_eq!(row(&reg, 1), None);
    }

    #[tokio::test]
    async fn upsert_overwrites_metadata_without_duplicating() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);

        reg.upsert(&sender(42, "old_name")).await.unwrap();
        reg.upsert(&sender(7, "other")).await.unwrap();
        reg.upsert(&sender(42, "new_name")).await.unwrap();

        assert_eq!(reg.count().await.unwrap(), 2);
        let (username, first_name, _, registered) = row(&reg, 42).unwrap();
        assert_eq!(username.as_deref(), Some("new_name"));
        assert_eq!(first_name.as_deref(), Some("Ada"));
        assert!(!registered.is_empty());
    }

    #[tokio::test]
    async fn repeated_registrations_list_each_identity_once() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);

        for id in [3, 1, 2, 3, 1] {
            reg.upsert(&sender(id, "u")).await.unwrap();
        }

        assert_eq!(
            reg.list_identities().await.unwrap(),
            vec![UserId(1), UserId(2), UserId(3)]
        );
    }

    #[tokio::test]
    async fn upsert_accepts_missing_optional_names() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&dir);
        reg.upsert(&Sender {
            user_id: UserId(-100),
            username: None,
            first_name: None,
            last_name: None,
        })
        .await
        .unwrap();

        let (username, _, last_name, _) = row(&reg, -100).unwrap();
        assert_eq!(username, None);
        assert_eq!(last_name, None);
    }
}
