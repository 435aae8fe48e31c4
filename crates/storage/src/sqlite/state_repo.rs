use async_trait::async_trait;
use chrono::Utc;
use memorizer_core::session::SessionSnapshot;
use sqlx::Row;

use crate::repository::{PersistedSession, SessionStateRepository, StorageError};

use super::SqliteRepository;

#[async_trait]
impl SessionStateRepository for SqliteRepository {
    async fn load_state(&self, key: &str) -> Result<Option<SessionSnapshot>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row
            .try_get("value")
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        PersistedSession::from_json(&raw).map(|envelope| Some(envelope.state))
    }

    async fn save_state(&self, key: &str, snapshot: &SessionSnapshot) -> Result<(), StorageError> {
        let raw = PersistedSession::new(snapshot.clone()).to_json()?;
        sqlx::query(
            r"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(raw)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }

    async fn clear_state(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_store WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;
        Ok(())
    }
}
