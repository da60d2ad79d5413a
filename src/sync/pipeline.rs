//! Page-at-a-time catalog synchronization into local storage.
//!
//! Supplier-level lifecycle: pending -> syncing -> {complete, error}, with
//! error -> syncing allowed for retries. Per-product outcomes are recorded
//! individually; one product's failure never aborts its page, and the
//! supplier-level status only goes to error when batch setup itself fails
//! before any per-product work starts.

use anyhow::{anyhow, Result};
use chrono::{Duration as ChronoDuration, Utc};
use futures::{stream, StreamExt};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{
    InventoryQuery, InventorySummary, Product, ProductSyncRecord, RecordStatus, SyncStatus,
    SyncStatusRecord,
};
use crate::normalization::size::size_sort_key;
use crate::storage::ProductStore;
use crate::suppliers::SupplierAdapter;

/// Per-product fetches run a few at a time to stay polite to the upstream
/// rate limiter. Exceeding this ceiling risks cascading 429s, so it is a
/// constant rather than a tunable.
pub const SYNC_CONCURRENCY: usize = 3;

/// Pages are kept small so one call stays inside a synchronous handler's
/// wall-clock budget; callers drive successive pages to cover the catalog.
const MAX_PAGE_SIZE: u32 = 25;

const DEFAULT_SINGLE_TTL_HOURS: i64 = 24;

pub struct SyncPipeline {
    adapter: Arc<dyn SupplierAdapter>,
    store: Arc<dyn ProductStore>,
    /// Known-good style ids used when live identifier resolution yields
    /// nothing for a page.
    fallback_styles: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub supplier: String,
    pub status: SyncStatus,
    pub product_count: u64,
    pub last_sync: Option<chrono::DateTime<Utc>>,
    pub timestamp: chrono::DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageSyncReport {
    pub success: bool,
    pub page: u32,
    pub page_size: u32,
    pub synced_count: u32,
    pub error_count: u32,
    pub has_more: bool,
    pub total_pages: u32,
}

enum ItemOutcome {
    Active,
    Errored,
}

impl SyncPipeline {
    pub fn new(
        adapter: Arc<dyn SupplierAdapter>,
        store: Arc<dyn ProductStore>,
        fallback_styles: Vec<String>,
    ) -> Self {
        Self {
            adapter,
            store,
            fallback_styles,
        }
    }

    /// Read-only report of current supplier state and persisted count.
    pub async fn status(&self) -> Result<StatusReport> {
        let supplier = self.adapter.id().to_string();
        let record = self.store.get_supplier_status(&supplier).await?;
        let product_count = self.store.count_products(&supplier).await?;
        let (status, last_sync) = match record {
            Some(r) => (r.status, r.last_sync),
            None => (SyncStatus::Pending, None),
        };
        Ok(StatusReport {
            supplier,
            status,
            product_count,
            last_sync,
            timestamp: Utc::now(),
        })
    }

    /// Sync one page of sellable identifiers. Idempotent: re-running the
    /// same page converges to the same persisted rows.
    pub async fn page_sync(&self, page: u32, page_size: u32) -> Result<PageSyncReport> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let supplier = self.adapter.id().to_string();

        self.mark_status(SyncStatus::Syncing, None).await?;

        let (style_ids, has_more, total_pages) = match self.resolve_page(page, page_size).await {
            Ok(resolved) => resolved,
            Err(e) => {
                // Setup-level failure: no per-product work started.
                warn!(supplier = supplier.as_str(), error = %e, "page setup failed");
                self.mark_status(SyncStatus::Error, None).await?;
                return Ok(PageSyncReport {
                    success: false,
                    page,
                    page_size,
                    synced_count: 0,
                    error_count: 0,
                    has_more: false,
                    total_pages: 0,
                });
            }
        };

        let outcomes: Vec<ItemOutcome> = stream::iter(style_ids.iter())
            .map(|style_id| self.sync_one(style_id))
            .buffer_unordered(SYNC_CONCURRENCY)
            .collect()
            .await;

        let synced_count = outcomes
            .iter()
            .filter(|o| matches!(o, ItemOutcome::Active))
            .count() as u32;
        let error_count = outcomes.len() as u32 - synced_count;

        if has_more {
            self.mark_status(SyncStatus::Syncing, Some(Utc::now())).await?;
        } else {
            self.mark_status(SyncStatus::Complete, Some(Utc::now())).await?;
        }

        info!(
            supplier = supplier.as_str(),
            page, synced_count, error_count, has_more, "page sync finished"
        );
        Ok(PageSyncReport {
            success: true,
            page,
            page_size,
            synced_count,
            error_count,
            has_more,
            total_pages,
        })
    }

    /// One-shot bounded sync. Timeout-prone for large catalogs; superseded
    /// by repeated `page_sync` calls, kept for small limits.
    pub async fn full_sync(&self, limit: u32) -> Result<PageSyncReport> {
        self.page_sync(1, limit).await
    }

    /// On-demand single-item refresh with a freshness check against the
    /// persisted row. Returns the cached row unless `force` is set or the
    /// row is older than `ttl_hours`.
    pub async fn sync_single(
        &self,
        style_id: &str,
        force: bool,
        ttl_hours: Option<i64>,
    ) -> Result<ProductSyncRecord> {
        let supplier = self.adapter.id().to_string();
        let ttl_hours = ttl_hours.unwrap_or(DEFAULT_SINGLE_TTL_HOURS);

        if !force {
            if let Some(existing) = self.store.get_product(&supplier, style_id).await? {
                let age = Utc::now() - existing.last_synced;
                if age < ChronoDuration::hours(ttl_hours) {
                    return Ok(existing);
                }
            }
        }

        self.sync_one(style_id).await;
        self.store
            .get_product(&supplier, style_id)
            .await?
            .ok_or_else(|| anyhow!("style {style_id} was not persisted"))
    }

    /// Resolve the page's sellable identifiers: live browse first, the
    /// curated fallback list when live resolution yields nothing. Errors
    /// only when both sources come up empty-handed.
    async fn resolve_page(&self, page: u32, page_size: u32) -> Result<(Vec<String>, bool, u32)> {
        if self.adapter.capabilities().browse {
            match self.adapter.browse_products(page, page_size, None).await {
                Ok(listing) => {
                    let ids: Vec<String> = listing
                        .products
                        .iter()
                        .filter(|p| !p.style_id.is_empty())
                        .map(|p| p.style_id.clone())
                        .collect();
                    if !ids.is_empty() {
                        return Ok((ids, listing.has_next_page, listing.total_pages));
                    }
                    // An empty tail page past the end of the catalog is a
                    // normal stop, not a resolution miss.
                    if page > 1 {
                        return Ok((Vec::new(), false, listing.total_pages));
                    }
                }
                Err(e) => {
                    warn!(supplier = self.adapter.id(), error = %e, "live identifier resolution failed");
                }
            }
        }

        if self.fallback_styles.is_empty() {
            return Err(anyhow!(
                "no sellable identifiers: live resolution empty and no fallback list configured"
            ));
        }
        let total = self.fallback_styles.len() as u64;
        let total_pages = ((total + page_size as u64 - 1) / page_size as u64) as u32;
        let start = ((page - 1) * page_size) as usize;
        let ids: Vec<String> = self
            .fallback_styles
            .iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();
        info!(
            supplier = self.adapter.id(),
            page,
            ids = ids.len(),
            "using curated fallback identifiers"
        );
        Ok((ids, page < total_pages, total_pages))
    }

    /// Fetch detail + inventory + pricing for one identifier and upsert one
    /// row. Always records an outcome: failures become an `error` row with
    /// the causal message preserved, never a dropped item.
    async fn sync_one(&self, style_id: &str) -> ItemOutcome {
        let supplier = self.adapter.id().to_string();

        let fetched = self.fetch_item(style_id).await;
        let record = match fetched {
            Ok((product, inventory)) => {
                let mut sizes: BTreeSet<String> = BTreeSet::new();
                for v in &product.variants {
                    sizes.insert(v.size.clone());
                }
                let mut sizes: Vec<String> = sizes.into_iter().collect();
                sizes.sort_by_key(|s| size_sort_key(s));
                ProductSyncRecord {
                    supplier_id: supplier.clone(),
                    style_id: product.style_id.clone(),
                    name: product.name.clone(),
                    brand: product.brand.clone(),
                    category: product.category.clone(),
                    images: product.images.clone(),
                    price_min: product.price_min,
                    price_max: product.price_max,
                    colors: product.colors.iter().map(|c| c.name.clone()).collect(),
                    sizes,
                    sync_status: RecordStatus::Active,
                    source_data: json!({
                        "product": product,
                        "inventory": inventory,
                    }),
                    last_synced: Utc::now(),
                }
            }
            Err(e) => {
                warn!(
                    supplier = supplier.as_str(),
                    style_id,
                    error = %e,
                    "product sync failed; recording error row"
                );
                ProductSyncRecord {
                    supplier_id: supplier.clone(),
                    style_id: style_id.to_string(),
                    sync_status: RecordStatus::Error,
                    source_data: json!({ "error": e.to_string() }),
                    last_synced: Utc::now(),
                    ..Default::default()
                }
            }
        };

        let errored = record.sync_status == RecordStatus::Error;
        if let Err(e) = self.store.upsert_product(&record).await {
            warn!(supplier = supplier.as_str(), style_id, error = %e, "persist failed");
            return ItemOutcome::Errored;
        }
        if errored {
            ItemOutcome::Errored
        } else {
            ItemOutcome::Active
        }
    }

    async fn fetch_item(&self, style_id: &str) -> Result<(Product, Option<InventorySummary>)> {
        let product = self
            .adapter
            .product_by_style(style_id)
            .await?
            .ok_or_else(|| anyhow!("style {style_id} not found upstream"))?;

        let caps = self.adapter.capabilities();
        let inventory = if caps.bulk_inventory && !product.style_id.is_empty() {
            let query = InventoryQuery {
                style_ids: vec![product.style_id.clone()],
                skus: Vec::new(),
            };
            self.adapter.inventory_bulk(&query).await?.into_iter().next()
        } else if caps.inventory {
            let sku = product
                .variants
                .first()
                .map(|v| v.sku.clone())
                .unwrap_or_else(|| product.sku.clone());
            self.adapter.inventory_by_sku(&sku).await?
        } else {
            None
        };
        Ok((product, inventory))
    }

    /// Supplier status writes. Forward-only, except error -> syncing
    /// (retry) and complete -> syncing (a fresh cycle).
    async fn mark_status(&self, next: SyncStatus, last_sync: Option<chrono::DateTime<Utc>>) -> Result<()> {
        let supplier = self.adapter.id().to_string();
        let current = self.store.get_supplier_status(&supplier).await?;
        let current_status = current.as_ref().map(|r| r.status).unwrap_or(SyncStatus::Pending);
        let allowed = matches!(
            (current_status, next),
            (SyncStatus::Pending, SyncStatus::Syncing)
                | (SyncStatus::Syncing, _)
                | (SyncStatus::Error, SyncStatus::Syncing)
                | (SyncStatus::Complete, SyncStatus::Syncing)
        ) || current_status == next;
        if !allowed {
            warn!(
                supplier = supplier.as_str(),
                ?current_status,
                ?next,
                "ignoring backward status transition"
            );
            return Ok(());
        }
        let last_sync = last_sync.or(current.and_then(|r| r.last_sync));
        self.store
            .set_supplier_status(&SyncStatusRecord {
                supplier_id: supplier,
                status: next,
                last_sync,
            })
            .await
    }
}
