//! Inbound operation dispatch: every UI/operator call arrives as one
//! operation-tagged request and returns one JSON document. The web layer
//! that fronts this is out of scope; the CLI and tests call `handle`
//! directly.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use crate::cache::{cache_key, Cache, TtlConfig};
use crate::models::{InventoryMatrix, InventoryQuery};
use crate::search::SearchOrchestrator;
use crate::suppliers::registry::AdapterRegistry;
use crate::suppliers::SupplierAdapter;
use crate::sync::SyncPipeline;

const SEARCH_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    #[serde(rename_all = "camelCase")]
    SearchProducts {
        query: String,
        #[serde(default)]
        page: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    GetInventory {
        style_id: String,
        #[serde(default)]
        force: bool,
    },
    Status,
    #[serde(rename_all = "camelCase")]
    PageSync { page: u32, page_size: u32 },
    #[serde(rename_all = "camelCase")]
    FullSync { limit: u32 },
    #[serde(rename_all = "camelCase")]
    SyncSingle {
        style_id: String,
        #[serde(default)]
        force: bool,
        #[serde(default)]
        ttl_hours: Option<i64>,
    },
}

/// Process-lifetime wiring: registry, orchestrator, pipeline for the
/// primary live supplier, and the shared cache. Built once at startup.
pub struct AppContext {
    pub registry: Arc<AdapterRegistry>,
    pub orchestrator: SearchOrchestrator,
    pub pipeline: SyncPipeline,
    pub cache: Arc<dyn Cache>,
    pub ttl: TtlConfig,
}

impl AppContext {
    /// First registered adapter that can answer inventory lookups.
    fn inventory_adapter(&self) -> Option<Arc<dyn SupplierAdapter>> {
        self.registry
            .all()
            .iter()
            .find(|a| a.capabilities().inventory || a.capabilities().bulk_inventory)
            .cloned()
    }

    /// Inventory matrix for one style, read through the short-TTL cache.
    /// `force` bypasses the cache; a cache hit returns the snapshot with
    /// its original `as_of` so the UI can badge freshness.
    pub async fn get_inventory(&self, style_id: &str, force: bool) -> Result<InventoryMatrix> {
        let key = cache_key("inventory", &[("style", style_id)]);
        if !force {
            if let Some(hit) = self.cache.get(&key) {
                if let Ok(matrix) = serde_json::from_value::<InventoryMatrix>(hit) {
                    return Ok(matrix);
                }
            }
        }

        let Some(adapter) = self.inventory_adapter() else {
            // No live source configured: empty matrix, unknown freshness.
            return Ok(InventoryMatrix {
                style_id: style_id.to_string(),
                ..Default::default()
            });
        };

        let summaries = if adapter.capabilities().bulk_inventory {
            adapter
                .inventory_bulk(&InventoryQuery {
                    style_ids: vec![style_id.to_string()],
                    skus: Vec::new(),
                })
                .await?
        } else {
            adapter
                .inventory_by_sku(style_id)
                .await?
                .into_iter()
                .collect()
        };

        let matrix = InventoryMatrix::from_summaries(style_id, &summaries);
        // Only successful lookups are cached; misses stay uncached so the
        // next call retries live.
        if !matrix.qty.is_empty() {
            match serde_json::to_value(&matrix) {
                Ok(value) => self.cache.set(&key, value, self.ttl.inventory_ttl),
                Err(e) => warn!(style_id, error = %e, "matrix not cacheable"),
            }
        }
        Ok(matrix)
    }
}

/// Dispatch one operation. Search never hard-fails; sync operations report
/// partial success through their counts.
pub async fn handle(ctx: &AppContext, op: Operation) -> Result<Value> {
    match op {
        Operation::SearchProducts { query, page } => {
            let page = page.unwrap_or(1).max(1) as usize;
            let results = ctx.orchestrator.search(&query, page * SEARCH_PAGE_SIZE).await;
            let page_results: Vec<_> = results
                .into_iter()
                .skip((page - 1) * SEARCH_PAGE_SIZE)
                .take(SEARCH_PAGE_SIZE)
                .collect();
            Ok(serde_json::to_value(page_results)?)
        }
        Operation::GetInventory { style_id, force } => {
            let matrix = ctx.get_inventory(&style_id, force).await?;
            Ok(serde_json::to_value(matrix)?)
        }
        Operation::Status => Ok(serde_json::to_value(ctx.pipeline.status().await?)?),
        Operation::PageSync { page, page_size } => {
            Ok(serde_json::to_value(ctx.pipeline.page_sync(page, page_size).await?)?)
        }
        Operation::FullSync { limit } => {
            Ok(serde_json::to_value(ctx.pipeline.full_sync(limit).await?)?)
        }
        Operation::SyncSingle {
            style_id,
            force,
            ttl_hours,
        } => Ok(serde_json::to_value(
            ctx.pipeline.sync_single(&style_id, force, ttl_hours).await?,
        )?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::models::{Capabilities, InventorySummary, WarehouseStock};
    use crate::storage::memory::MemoryStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use indexmap::IndexMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingInventorySupplier {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl SupplierAdapter for CountingInventorySupplier {
        fn id(&self) -> &str {
            "counting"
        }
        fn display_name(&self) -> &str {
            "Counting"
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities {
                bulk_inventory: true,
                inventory: true,
                ..Default::default()
            }
        }

        async fn inventory_bulk(&self, query: &InventoryQuery) -> Result<Vec<InventorySummary>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut by_size = IndexMap::new();
            by_size.insert("M".to_string(), 17u64);
            Ok(query
                .style_ids
                .iter()
                .map(|id| InventorySummary {
                    sku: id.clone(),
                    style_id: Some(id.clone()),
                    total_available: 17,
                    warehouses: vec![WarehouseStock {
                        warehouse_id: "IL".into(),
                        name: "Lockport".into(),
                        quantity: 17,
                        by_size: by_size.clone(),
                    }],
                    as_of: Some(Utc::now()),
                })
                .collect())
        }
    }

    fn context() -> (Arc<CountingInventorySupplier>, AppContext) {
        let adapter = Arc::new(CountingInventorySupplier {
            fetches: AtomicUsize::new(0),
        });
        let mut registry = AdapterRegistry::new();
        registry.register(adapter.clone());
        let registry = Arc::new(registry);
        let store = Arc::new(MemoryStore::new());
        let ctx = AppContext {
            registry: registry.clone(),
            orchestrator: SearchOrchestrator::new(registry.clone()),
            pipeline: SyncPipeline::new(
                registry.get("counting").unwrap(),
                store,
                vec![],
            ),
            cache: Arc::new(MemoryCache::new()),
            ttl: TtlConfig::default(),
        };
        (adapter, ctx)
    }

    #[tokio::test]
    async fn inventory_is_cached_within_ttl() {
        let (adapter, ctx) = context();

        let first = ctx.get_inventory("2000", false).await.unwrap();
        assert_eq!(adapter.fetches.load(Ordering::SeqCst), 1);
        assert!(first.as_of.is_some());
        assert_eq!(first.qty.get("Lockport|M"), Some(&17));

        let second = ctx.get_inventory("2000", false).await.unwrap();
        assert_eq!(adapter.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(second.as_of, first.as_of);
    }

    #[tokio::test]
    async fn force_bypasses_the_cache() {
        let (adapter, ctx) = context();
        ctx.get_inventory("2000", false).await.unwrap();
        ctx.get_inventory("2000", true).await.unwrap();
        assert_eq!(adapter.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn operations_deserialize_from_tagged_json() {
        let op: Operation = serde_json::from_str(
            r#"{"op":"syncSingle","styleId":"2000","force":true,"ttlHours":6}"#,
        )
        .unwrap();
        match op {
            Operation::SyncSingle {
                style_id,
                force,
                ttl_hours,
            } => {
                assert_eq!(style_id, "2000");
                assert!(force);
                assert_eq!(ttl_hours, Some(6));
            }
            _ => panic!("wrong variant"),
        }

        let op: Operation =
            serde_json::from_str(r#"{"op":"pageSync","page":2,"pageSize":10}"#).unwrap();
        assert!(matches!(op, Operation::PageSync { page: 2, page_size: 10 }));

        let op: Operation = serde_json::from_str(r#"{"op":"status"}"#).unwrap();
        assert!(matches!(op, Operation::Status));
    }

    #[tokio::test]
    async fn dispatch_returns_json_documents() {
        let (_, ctx) = context();
        let out = handle(&ctx, Operation::Status).await.unwrap();
        assert_eq!(out["supplier"], "counting");
        assert_eq!(out["status"], "pending");
        assert_eq!(out["product_count"], 0);
    }
}
