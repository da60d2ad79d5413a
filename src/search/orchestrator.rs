//! Cross-supplier catalog search: fan the query out to every registered
//! adapter in parallel, attach best-effort inventory, and merge into the
//! unified model. A single adapter's failure contributes zero results and
//! never fails the aggregate call.

use futures::future::join_all;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use strsim::jaro_winkler;
use tracing::warn;

use crate::models::{InventoryQuery, InventorySummary, Product, SupplierOffer, UnifiedProduct};
use crate::suppliers::registry::AdapterRegistry;
use crate::suppliers::SupplierAdapter;

pub struct SearchOrchestrator {
    registry: Arc<AdapterRegistry>,
    /// Process-local id source for UI list-key stability.
    next_id: AtomicU64,
}

impl SearchOrchestrator {
    pub fn new(registry: Arc<AdapterRegistry>) -> Self {
        Self {
            registry,
            next_id: AtomicU64::new(1),
        }
    }

    /// Never errors: per-adapter failures degrade to empty contributions.
    /// Result order follows adapter registration order, not completion
    /// order, so output is deterministic for a fixed configuration.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<UnifiedProduct> {
        let adapters = self.registry.all();
        let fetches = adapters.iter().map(|adapter| {
            let adapter = adapter.clone();
            let query = query.to_string();
            async move {
                if !adapter.capabilities().search {
                    return Vec::new();
                }
                match adapter.search_products(&query, limit).await {
                    Ok(products) => products,
                    Err(e) => {
                        warn!(supplier = adapter.id(), error = %e, "adapter search failed; contributing zero results");
                        Vec::new()
                    }
                }
            }
        });
        let per_adapter: Vec<Vec<Product>> = join_all(fetches).await;

        let mut out = Vec::new();
        for (adapter, mut products) in adapters.iter().zip(per_adapter) {
            rank_by_similarity(&mut products, query);
            let inventory = attach_inventory(adapter.as_ref(), &products).await;
            for product in products {
                let summary = inventory.get(&product.style_id);
                out.push(self.unify(adapter.as_ref(), product, summary));
            }
        }
        out
    }

    fn unify(
        &self,
        adapter: &dyn SupplierAdapter,
        product: Product,
        inventory: Option<&InventorySummary>,
    ) -> UnifiedProduct {
        let inventory_grid = inventory.map(|summary| {
            let mut grid: IndexMap<String, IndexMap<String, u64>> = IndexMap::new();
            for w in &summary.warehouses {
                grid.insert(w.name.clone(), w.by_size.clone());
            }
            grid
        });

        let offer = SupplierOffer {
            supplier: adapter.display_name().to_string(),
            style_id: product.style_id.clone(),
            price: product.price_min,
            inventory_total: inventory.map(|s| s.total_available),
            inventory: inventory_grid,
            source: adapter.source_tag().to_string(),
        };

        UnifiedProduct {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            sku: product.sku,
            name: product.name,
            brand: product.brand,
            category: product.category,
            lowest_price: offer.price,
            image: product.images.first().cloned(),
            colors: product.colors.iter().map(|c| c.name.clone()).collect(),
            offers: vec![offer],
        }
    }
}

/// Stable-sort an adapter's contribution by name similarity to the query,
/// best first. Cross-adapter order is untouched.
fn rank_by_similarity(products: &mut [Product], query: &str) {
    let needle = query.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return;
    }
    products.sort_by(|a, b| {
        let sa = jaro_winkler(&a.name.to_ascii_lowercase(), &needle);
        let sb = jaro_winkler(&b.name.to_ascii_lowercase(), &needle);
        sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Eager inventory attach: the batch capability is preferred when products
/// carry style ids, with per-sku lookups as the fallback. Any failure means
/// inventory is simply omitted for that product, never an error.
async fn attach_inventory(
    adapter: &dyn SupplierAdapter,
    products: &[Product],
) -> HashMap<String, InventorySummary> {
    let mut by_style: HashMap<String, InventorySummary> = HashMap::new();
    if products.is_empty() {
        return by_style;
    }
    let caps = adapter.capabilities();

    if caps.bulk_inventory {
        let style_ids: Vec<String> = products
            .iter()
            .filter(|p| !p.style_id.is_empty())
            .map(|p| p.style_id.clone())
            .collect();
        if !style_ids.is_empty() {
            let query = InventoryQuery {
                style_ids,
                skus: Vec::new(),
            };
            match adapter.inventory_bulk(&query).await {
                Ok(summaries) => {
                    for s in summaries {
                        if let Some(style_id) = s.style_id.clone() {
                            by_style.insert(style_id, s);
                        }
                    }
                }
                Err(e) => {
                    warn!(supplier = adapter.id(), error = %e, "bulk inventory attach failed");
                }
            }
        }
    }

    if caps.inventory {
        for product in products {
            if by_style.contains_key(&product.style_id) {
                continue;
            }
            let sku = product
                .variants
                .first()
                .map(|v| v.sku.clone())
                .unwrap_or_else(|| product.sku.clone());
            if sku.is_empty() {
                continue;
            }
            match adapter.inventory_by_sku(&sku).await {
                Ok(Some(summary)) => {
                    by_style.insert(product.style_id.clone(), summary);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(supplier = adapter.id(), sku = sku.as_str(), error = %e, "per-sku inventory attach failed");
                }
            }
        }
    }

    by_style
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Capabilities, WarehouseStock};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Scriptable adapter: a fixed product list, optional failure, optional
    /// artificial latency, call counters.
    struct StubAdapter {
        id: &'static str,
        products: Vec<Product>,
        fail_search: bool,
        fail_inventory: bool,
        delay: Duration,
        caps: Capabilities,
        search_calls: AtomicUsize,
        inventory_calls: AtomicUsize,
    }

    impl StubAdapter {
        fn new(id: &'static str, products: Vec<Product>) -> Self {
            Self {
                id,
                products,
                fail_search: false,
                fail_inventory: false,
                delay: Duration::ZERO,
                caps: Capabilities {
                    search: true,
                    style_lookup: true,
                    inventory: true,
                    bulk_inventory: true,
                    browse: false,
                },
                search_calls: AtomicUsize::new(0),
                inventory_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SupplierAdapter for StubAdapter {
        fn id(&self) -> &str {
            self.id
        }
        fn display_name(&self) -> &str {
            self.id
        }
        fn capabilities(&self) -> Capabilities {
            self.caps
        }

        async fn search_products(&self, term: &str, limit: usize) -> Result<Vec<Product>> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail_search {
                return Err(anyhow!("upstream http failure"));
            }
            let needle = term.to_ascii_lowercase();
            Ok(self
                .products
                .iter()
                .filter(|p| {
                    p.name.to_ascii_lowercase().contains(&needle)
                        || p.brand.to_ascii_lowercase().contains(&needle)
                })
                .take(limit)
                .cloned()
                .collect())
        }

        async fn inventory_bulk(&self, query: &InventoryQuery) -> Result<Vec<InventorySummary>> {
            self.inventory_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_inventory {
                return Err(anyhow!("inventory backend down"));
            }
            Ok(query
                .style_ids
                .iter()
                .map(|style_id| InventorySummary {
                    sku: style_id.clone(),
                    style_id: Some(style_id.clone()),
                    total_available: 42,
                    warehouses: vec![WarehouseStock {
                        warehouse_id: "IL".into(),
                        name: "Lockport".into(),
                        quantity: 42,
                        by_size: Default::default(),
                    }],
                    as_of: Some(Utc::now()),
                })
                .collect())
        }
    }

    fn gildan_tee(style_id: &str, name: &str) -> Product {
        Product {
            supplier_id: "stub".into(),
            style_id: style_id.into(),
            sku: format!("G{style_id}"),
            name: name.into(),
            brand: "Gildan".into(),
            category: "T-Shirts".into(),
            price_min: 3.0,
            price_max: 4.0,
            ..Default::default()
        }
    }

    /// No-op placeholder for a supplier that is configured but not yet
    /// implemented: advertises nothing and rejects every call.
    struct PlaceholderAdapter;

    #[async_trait]
    impl SupplierAdapter for PlaceholderAdapter {
        fn id(&self) -> &str {
            "placeholder"
        }
        fn display_name(&self) -> &str {
            "Placeholder"
        }
        fn capabilities(&self) -> Capabilities {
            Capabilities::default()
        }
    }

    #[tokio::test]
    async fn merges_only_real_adapter_results() {
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(StubAdapter::new(
            "real",
            vec![gildan_tee("2000", "Ultra Cotton Tee")],
        )));
        registry.register(Arc::new(PlaceholderAdapter));
        let orchestrator = SearchOrchestrator::new(Arc::new(registry));

        let results = orchestrator.search("gildan", 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].offers[0].supplier, "real");
        assert_eq!(results[0].offers[0].inventory_total, Some(42));
    }

    #[tokio::test]
    async fn failing_adapter_yields_empty_not_error() {
        let mut failing = StubAdapter::new("real", vec![gildan_tee("2000", "Ultra Cotton Tee")]);
        failing.fail_search = true;
        let failing = Arc::new(failing);
        let mut registry = AdapterRegistry::new();
        registry.register(failing.clone());
        registry.register(Arc::new(PlaceholderAdapter));
        let orchestrator = SearchOrchestrator::new(Arc::new(registry));

        let results = orchestrator.search("gildan", 10).await;
        assert!(results.is_empty());
        assert_eq!(failing.search_calls.load(Ordering::SeqCst), 1);
        // Search never reached inventory attach for the failed adapter.
        assert_eq!(failing.inventory_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn result_order_follows_registration_not_completion() {
        let mut slow = StubAdapter::new("slow", vec![gildan_tee("1", "Gildan Slow Tee")]);
        slow.delay = Duration::from_millis(50);
        let fast = StubAdapter::new("fast", vec![gildan_tee("2", "Gildan Fast Tee")]);
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(slow));
        registry.register(Arc::new(fast));
        let orchestrator = SearchOrchestrator::new(Arc::new(registry));

        let results = orchestrator.search("gildan", 10).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].offers[0].supplier, "slow");
        assert_eq!(results[1].offers[0].supplier, "fast");
    }

    #[tokio::test]
    async fn inventory_failure_omits_inventory_but_keeps_product() {
        let mut stub = StubAdapter::new("real", vec![gildan_tee("2000", "Ultra Cotton Tee")]);
        stub.fail_inventory = true;
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(stub));
        let orchestrator = SearchOrchestrator::new(Arc::new(registry));

        let results = orchestrator.search("gildan", 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].offers[0].inventory_total, None);
        assert!(results[0].offers[0].inventory.is_none());
    }

    #[tokio::test]
    async fn ids_are_sequential_and_session_stable() {
        let stub = StubAdapter::new(
            "real",
            vec![
                gildan_tee("1", "Gildan Tee A"),
                gildan_tee("2", "Gildan Tee B"),
            ],
        );
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(stub));
        let orchestrator = SearchOrchestrator::new(Arc::new(registry));

        let first = orchestrator.search("gildan", 10).await;
        let second = orchestrator.search("gildan", 10).await;
        assert_eq!(first[0].id + 2, second[0].id);
        assert!(first[0].id < first[1].id);
    }

    #[tokio::test]
    async fn ranks_within_adapter_by_name_similarity() {
        let stub = StubAdapter::new(
            "real",
            vec![
                gildan_tee("1", "Gildan Heavy Blend Hooded Sweatshirt"),
                gildan_tee("2", "Softstyle"),
            ],
        );
        let mut registry = AdapterRegistry::new();
        registry.register(Arc::new(stub));
        let orchestrator = SearchOrchestrator::new(Arc::new(registry));

        let results = orchestrator.search("softstyle", 10).await;
        assert_eq!(results[0].name, "Softstyle");
    }
}
