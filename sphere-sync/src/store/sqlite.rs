//! SQLite payload store
//!
//! Payloads are stored as JSON in `sphere_payloads`, keyed by session.

use std::path::Path;

use async_trait::async_trait;
use sphere_common::{Error, Result};
use sqlx::{Row, SqlitePool};

use super::PayloadStore;
use crate::models::SpherePayload;

/// Open (creating if needed) the database at `db_path` and its tables
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;
    Ok(pool)
}

async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sphere_payloads (
            session_id TEXT PRIMARY KEY,
            generated_at TEXT NOT NULL,
            track_count INTEGER NOT NULL,
            payload TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (sphere_payloads)");
    Ok(())
}

pub struct SqlitePayloadStore {
    pool: SqlitePool,
}

impl SqlitePayloadStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the database at `db_path` and wrap it
    pub async fn open(db_path: &Path) -> Result<Self> {
        Ok(Self::new(init_database_pool(db_path).await?))
    }
}

#[async_trait]
impl PayloadStore for SqlitePayloadStore {
    async fn save(&self, session_id: &str, payload: &SpherePayload) -> Result<()> {
        let json = serde_json::to_string(payload)
            .map_err(|e| Error::Internal(format!("Failed to serialize payload: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO sphere_payloads (session_id, generated_at, track_count, payload)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(session_id) DO UPDATE SET
                generated_at = excluded.generated_at,
                track_count = excluded.track_count,
                payload = excluded.payload
            "#,
        )
        .bind(session_id)
        .bind(payload.generated_at.to_rfc3339())
        .bind(payload.track_count as i64)
        .bind(json)
        .execute(&self.pool)
        .await?;

        tracing::debug!(
            session_id = %session_id,
            tracks = payload.track_count,
            "Sphere payload saved"
        );
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SpherePayload>> {
        let row = sqlx::query("SELECT payload FROM sphere_payloads WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let json: String = row.get("payload");
                let payload = serde_json::from_str(&json).map_err(|e| {
                    Error::Internal(format!("Stored payload for {} is corrupt: {}", session_id, e))
                })?;
                Ok(Some(payload))
            }
            None => Ok(None),
        }
    }
}
