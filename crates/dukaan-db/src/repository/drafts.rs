//! # Draft Session Store
//!
//! A key-value table holding one serialized draft per open invoice session,
//! so in-progress invoices survive a restart.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};

/// A stored draft session.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DraftRecord {
    pub session_key: String,
    pub label: String,
    pub payload: String,
    pub updated_at: DateTime<Utc>,
}

impl DraftRecord {
    /// Deserializes the payload.
    pub fn decode<T: DeserializeOwned>(&self) -> DbResult<T> {
        Ok(serde_json::from_str(&self.payload)?)
    }
}

/// Repository over the `draft_sessions` table.
#[derive(Debug, Clone)]
pub struct DraftStore {
    pool: SqlitePool,
}

impl DraftStore {
    pub fn new(pool: SqlitePool) -> Self {
        DraftStore { pool }
    }

    /// Inserts or replaces the draft stored under `key`.
    pub async fn save<T: Serialize + Sync>(
        &self,
        key: &str,
        label: &str,
        draft: &T,
    ) -> DbResult<()> {
        let payload = serde_json::to_string(draft)?;

        debug!(key = %key, bytes = payload.len(), "Saving draft session");

        sqlx::query(
            r#"
            INSERT INTO draft_sessions (session_key, label, payload, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (session_key) DO UPDATE SET
                label = excluded.label,
                payload = excluded.payload,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(label)
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<DraftRecord>> {
        let record = sqlx::query_as::<_, DraftRecord>(
            r#"
            SELECT session_key, label, payload, updated_at
            FROM draft_sessions
            WHERE session_key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// All stored sessions, oldest key first.
    pub async fn list(&self) -> DbResult<Vec<DraftRecord>> {
        let records = sqlx::query_as::<_, DraftRecord>(
            r#"
            SELECT session_key, label, payload, updated_at
            FROM draft_sessions
            ORDER BY session_key
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn delete(&self, key: &str) -> DbResult<()> {
        debug!(key = %key, "Deleting draft session");

        let result = sqlx::query("DELETE FROM draft_sessions WHERE session_key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("DraftSession", key));
        }

        Ok(())
    }
}
