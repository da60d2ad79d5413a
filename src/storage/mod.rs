//! Durable storage seam. The pipeline and ops layer depend only on
//! `ProductStore`; swapping the SQLite implementation for another backing
//! store requires no behavior change at call sites.

pub mod db;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ProductSyncRecord, SyncStatusRecord};

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Idempotent upsert keyed by (supplier_id, style_id), last write wins.
    async fn upsert_product(&self, record: &ProductSyncRecord) -> Result<()>;

    async fn get_product(
        &self,
        supplier_id: &str,
        style_id: &str,
    ) -> Result<Option<ProductSyncRecord>>;

    async fn count_products(&self, supplier_id: &str) -> Result<u64>;

    async fn set_supplier_status(&self, record: &SyncStatusRecord) -> Result<()>;

    async fn get_supplier_status(&self, supplier_id: &str) -> Result<Option<SyncStatusRecord>>;
}
