// SPDX-License-Identifier: GPL-3.0-only
use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::cache::traits::SnapshotCache;
use crate::catalog::{ProductDocument, decode_document};

/// Slot holding the serialized product document
const SLOT_DOCUMENT: &str = "products-cache";
/// Slot holding the uncommitted-edits flag ("true"/"false")
const SLOT_DIRTY: &str = "products-dirty";

pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    pub async fn new(db_path: &Path) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        let cache = Self { pool };
        cache.init_schema().await?;

        Ok(cache)
    }

    async fn init_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                slot TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Initialized snapshot cache schema");
        Ok(())
    }

    async fn get_slot(&self, slot: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM snapshots WHERE slot = ?1")
            .bind(slot)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn put_slot(&self, slot: &str, value: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO snapshots (slot, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(slot) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(slot)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl SnapshotCache for SqliteCache {
    async fn read_document(&self) -> Option<ProductDocument> {
        let raw = match self.get_slot(SLOT_DOCUMENT).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Failed to read cached document, treating as absent");
                return None;
            }
        };

        match decode_document(raw.as_bytes()) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(error = %e, "Cached document is unparseable, treating as absent");
                None
            }
        }
    }

    async fn write_document(&self, doc: &ProductDocument) -> anyhow::Result<()> {
        let raw = serde_json::to_string(doc)?;
        self.put_slot(SLOT_DOCUMENT, &raw).await?;

        debug!(products = doc.products.len(), "Cached document written");
        Ok(())
    }

    async fn is_dirty(&self) -> bool {
        match self.get_slot(SLOT_DIRTY).await {
            Ok(Some(flag)) => flag == "true",
            Ok(None) => false,
            Err(e) => {
                warn!(error = %e, "Failed to read dirty flag, treating as clean");
                false
            }
        }
    }

    async fn mark_dirty(&self, dirty: bool) -> anyhow::Result<()> {
        self.put_slot(SLOT_DIRTY, if dirty { "true" } else { "false" })
            .await?;

        debug!(dirty, "Dirty flag updated");
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM snapshots")
            .execute(&self.pool)
            .await?;

        info!("Snapshot cache cleared");
        Ok(())
    }
}
