//! SQLite-backed store. Schema bootstrap is idempotent so the binary can
//! run against a fresh file with no migration step.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

use crate::models::{ProductSyncRecord, RecordStatus, SyncStatus, SyncStatusRecord};

use super::ProductStore;

#[derive(Clone)]
pub struct SqliteStore {
    pub pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        info!("connected to product store");
        Self::ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS product_sync (
                supplier_id TEXT NOT NULL,
                style_id    TEXT NOT NULL,
                name        TEXT NOT NULL DEFAULT '',
                brand       TEXT NOT NULL DEFAULT '',
                category    TEXT NOT NULL DEFAULT '',
                images      TEXT NOT NULL DEFAULT '[]',
                price_min   REAL NOT NULL DEFAULT 0,
                price_max   REAL NOT NULL DEFAULT 0,
                colors      TEXT NOT NULL DEFAULT '[]',
                sizes       TEXT NOT NULL DEFAULT '[]',
                sync_status TEXT NOT NULL DEFAULT 'active',
                source_data TEXT NOT NULL DEFAULT 'null',
                last_synced TEXT NOT NULL,
                PRIMARY KEY (supplier_id, style_id)
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS supplier_sync_status (
                supplier_id TEXT PRIMARY KEY,
                status      TEXT NOT NULL,
                last_sync   TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

fn record_status_str(status: RecordStatus) -> &'static str {
    match status {
        RecordStatus::Active => "active",
        RecordStatus::Error => "error",
    }
}

fn parse_record_status(raw: &str) -> RecordStatus {
    match raw {
        "error" => RecordStatus::Error,
        _ => RecordStatus::Active,
    }
}

fn sync_status_str(status: SyncStatus) -> &'static str {
    match status {
        SyncStatus::Pending => "pending",
        SyncStatus::Syncing => "syncing",
        SyncStatus::Complete => "complete",
        SyncStatus::Error => "error",
    }
}

fn parse_sync_status(raw: &str) -> SyncStatus {
    match raw {
        "syncing" => SyncStatus::Syncing,
        "complete" => SyncStatus::Complete,
        "error" => SyncStatus::Error,
        _ => SyncStatus::Pending,
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| anyhow!("bad timestamp {raw:?}: {e}"))
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<ProductSyncRecord> {
    let images: String = row.get("images");
    let colors: String = row.get("colors");
    let sizes: String = row.get("sizes");
    let source_data: String = row.get("source_data");
    let status: String = row.get("sync_status");
    let last_synced: String = row.get("last_synced");
    Ok(ProductSyncRecord {
        supplier_id: row.get("supplier_id"),
        style_id: row.get("style_id"),
        name: row.get("name"),
        brand: row.get("brand"),
        category: row.get("category"),
        images: serde_json::from_str(&images).unwrap_or_default(),
        price_min: row.get("price_min"),
        price_max: row.get("price_max"),
        colors: serde_json::from_str(&colors).unwrap_or_default(),
        sizes: serde_json::from_str(&sizes).unwrap_or_default(),
        sync_status: parse_record_status(&status),
        source_data: serde_json::from_str(&source_data).unwrap_or(serde_json::Value::Null),
        last_synced: parse_timestamp(&last_synced)?,
    })
}

#[async_trait]
impl ProductStore for SqliteStore {
    async fn upsert_product(&self, record: &ProductSyncRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO product_sync (
                supplier_id, style_id, name, brand, category, images,
                price_min, price_max, colors, sizes, sync_status,
                source_data, last_synced
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (supplier_id, style_id) DO UPDATE SET
                name = excluded.name,
                brand = excluded.brand,
                category = excluded.category,
                images = excluded.images,
                price_min = excluded.price_min,
                price_max = excluded.price_max,
                colors = excluded.colors,
                sizes = excluded.sizes,
                sync_status = excluded.sync_status,
                source_data = excluded.source_data,
                last_synced = excluded.last_synced
            "#,
        )
        .bind(&record.supplier_id)
        .bind(&record.style_id)
        .bind(&record.name)
        .bind(&record.brand)
        .bind(&record.category)
        .bind(serde_json::to_string(&record.images)?)
        .bind(record.price_min)
        .bind(record.price_max)
        .bind(serde_json::to_string(&record.colors)?)
        .bind(serde_json::to_string(&record.sizes)?)
        .bind(record_status_str(record.sync_status))
        .bind(serde_json::to_string(&record.source_data)?)
        .bind(record.last_synced.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_product(
        &self,
        supplier_id: &str,
        style_id: &str,
    ) -> Result<Option<ProductSyncRecord>> {
        let row = sqlx::query(
            "SELECT * FROM product_sync WHERE supplier_id = ? AND style_id = ?",
        )
        .bind(supplier_id)
        .bind(style_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn count_products(&self, supplier_id: &str) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM product_sync WHERE supplier_id = ?")
                .bind(supplier_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as u64)
    }

    async fn set_supplier_status(&self, record: &SyncStatusRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO supplier_sync_status (supplier_id, status, last_sync)
            VALUES (?, ?, ?)
            ON CONFLICT (supplier_id) DO UPDATE SET
                status = excluded.status,
                last_sync = excluded.last_sync
            "#,
        )
        .bind(&record.supplier_id)
        .bind(sync_status_str(record.status))
        .bind(record.last_sync.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_supplier_status(&self, supplier_id: &str) -> Result<Option<SyncStatusRecord>> {
        let row = sqlx::query("SELECT * FROM supplier_sync_status WHERE supplier_id = ?")
            .bind(supplier_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|row| {
            let status: String = row.get("status");
            let last_sync: Option<String> = row.get("last_sync");
            Ok(SyncStatusRecord {
                supplier_id: row.get("supplier_id"),
                status: parse_sync_status(&status),
                last_sync: last_sync.as_deref().map(parse_timestamp).transpose()?,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn store() -> SqliteStore {
        // One connection so the in-memory database is shared.
        SqliteStore::connect("sqlite::memory:", 1).await.unwrap()
    }

    #[tokio::test]
    async fn round_trips_a_full_record() {
        let store = store().await;
        let record = ProductSyncRecord {
            supplier_id: "ss".into(),
            style_id: "18500".into(),
            name: "Heavy Blend Hooded Sweatshirt".into(),
            brand: "Gildan".into(),
            category: "Fleece".into(),
            images: vec!["https://cdn.example.com/Images/Style/18500_f.jpg".into()],
            price_min: 10.34,
            price_max: 13.02,
            colors: vec!["Dark Heather".into()],
            sizes: vec!["M".into(), "3XL".into()],
            sync_status: RecordStatus::Active,
            source_data: json!({"styleID": 18500}),
            last_synced: Utc::now(),
        };
        store.upsert_product(&record).await.unwrap();
        let read = store.get_product("ss", "18500").await.unwrap().unwrap();
        assert_eq!(read.name, record.name);
        assert_eq!(read.sizes, record.sizes);
        assert_eq!(read.source_data, record.source_data);
        assert_eq!(read.sync_status, RecordStatus::Active);
        assert_eq!(store.count_products("ss").await.unwrap(), 1);
        assert_eq!(store.count_products("other").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn conflicting_upserts_converge_to_last_writer() {
        let store = store().await;
        let mut record = ProductSyncRecord {
            supplier_id: "ss".into(),
            style_id: "2000".into(),
            name: "writer one".into(),
            ..Default::default()
        };
        store.upsert_product(&record).await.unwrap();
        record.name = "writer two".into();
        record.sync_status = RecordStatus::Error;
        record.source_data = json!("detail fetch failed");
        store.upsert_product(&record).await.unwrap();

        let read = store.get_product("ss", "2000").await.unwrap().unwrap();
        assert_eq!(read.name, "writer two");
        assert_eq!(read.sync_status, RecordStatus::Error);
        assert_eq!(store.count_products("ss").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn supplier_status_upsert_and_parse() {
        let store = store().await;
        store
            .set_supplier_status(&SyncStatusRecord {
                supplier_id: "ss".into(),
                status: SyncStatus::Complete,
                last_sync: Some(Utc::now()),
            })
            .await
            .unwrap();
        let status = store.get_supplier_status("ss").await.unwrap().unwrap();
        assert_eq!(status.status, SyncStatus::Complete);
        assert!(status.last_sync.is_some());
    }
}
