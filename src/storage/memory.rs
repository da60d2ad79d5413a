//! In-process store used by tests and by deployments that have not wired a
//! database yet.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::{ProductSyncRecord, SyncStatusRecord};

use super::ProductStore;

#[derive(Default)]
pub struct MemoryStore {
    products: Mutex<HashMap<(String, String), ProductSyncRecord>>,
    statuses: Mutex<HashMap<String, SyncStatusRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn upsert_product(&self, record: &ProductSyncRecord) -> Result<()> {
        let mut map = self
            .products
            .lock()
            .map_err(|_| anyhow!("product store poisoned"))?;
        map.insert(
            (record.supplier_id.clone(), record.style_id.clone()),
            record.clone(),
        );
        Ok(())
    }

    async fn get_product(
        &self,
        supplier_id: &str,
        style_id: &str,
    ) -> Result<Option<ProductSyncRecord>> {
        let map = self
            .products
            .lock()
            .map_err(|_| anyhow!("product store poisoned"))?;
        Ok(map
            .get(&(supplier_id.to_string(), style_id.to_string()))
            .cloned())
    }

    async fn count_products(&self, supplier_id: &str) -> Result<u64> {
        let map = self
            .products
            .lock()
            .map_err(|_| anyhow!("product store poisoned"))?;
        Ok(map.keys().filter(|(s, _)| s == supplier_id).count() as u64)
    }

    async fn set_supplier_status(&self, record: &SyncStatusRecord) -> Result<()> {
        let mut map = self
            .statuses
            .lock()
            .map_err(|_| anyhow!("status store poisoned"))?;
        map.insert(record.supplier_id.clone(), record.clone());
        Ok(())
    }

    async fn get_supplier_status(&self, supplier_id: &str) -> Result<Option<SyncStatusRecord>> {
        let map = self
            .statuses
            .lock()
            .map_err(|_| anyhow!("status store poisoned"))?;
        Ok(map.get(supplier_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RecordStatus, SyncStatus};
    use chrono::Utc;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_then_read_returns_written_values() {
        let store = MemoryStore::new();
        let record = ProductSyncRecord {
            supplier_id: "ss".into(),
            style_id: "2000".into(),
            name: "Ultra Cotton Tee".into(),
            brand: "Gildan".into(),
            price_min: 3.1,
            price_max: 4.6,
            sync_status: RecordStatus::Active,
            source_data: json!({"styleID": 2000}),
            last_synced: Utc::now(),
            ..Default::default()
        };
        store.upsert_product(&record).await.unwrap();
        let read = store.get_product("ss", "2000").await.unwrap().unwrap();
        assert_eq!(read.name, "Ultra Cotton Tee");
        assert_eq!(read.price_max, 4.6);
        assert_eq!(read.source_data, json!({"styleID": 2000}));
    }

    #[tokio::test]
    async fn upsert_is_last_write_wins() {
        let store = MemoryStore::new();
        let mut record = ProductSyncRecord {
            supplier_id: "ss".into(),
            style_id: "2000".into(),
            name: "first".into(),
            ..Default::default()
        };
        store.upsert_product(&record).await.unwrap();
        record.name = "second".into();
        store.upsert_product(&record).await.unwrap();
        assert_eq!(store.count_products("ss").await.unwrap(), 1);
        let read = store.get_product("ss", "2000").await.unwrap().unwrap();
        assert_eq!(read.name, "second");
    }

    #[tokio::test]
    async fn status_round_trip() {
        let store = MemoryStore::new();
        assert!(store.get_supplier_status("ss").await.unwrap().is_none());
        store
            .set_supplier_status(&SyncStatusRecord {
                supplier_id: "ss".into(),
                status: SyncStatus::Syncing,
                last_sync: None,
            })
            .await
            .unwrap();
        let status = store.get_supplier_status("ss").await.unwrap().unwrap();
        assert_eq!(status.status, SyncStatus::Syncing);
    }
}
