use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A style as returned by one supplier, before cross-supplier unification.
///
/// `style_id` is unique per supplier; `variants` may be empty when the
/// upstream only exposes style-level data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Product {
    pub supplier_id: String,
    pub style_id: String,
    pub sku: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub colors: Vec<ColorInfo>,
    #[serde(default)]
    pub variants: Vec<Variant>,
    pub price_min: f64,
    pub price_max: f64,
}

/// One sellable size/color combination of a style.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Variant {
    pub sku: String,
    /// Normalized size code (XS..4XL, or the uppercased original).
    pub size: String,
    pub color: ColorInfo,
    pub msrp: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorInfo {
    pub name: String,
    pub code: String,
    pub hex: Option<String>,
}

/// Point-in-time stock snapshot for one sku or style.
///
/// `total_available` always equals the sum of the warehouse totals.
/// `as_of` is set whenever the data came from a live fetch; `None` means
/// the quantities are of unknown age (cached-unknown).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventorySummary {
    pub sku: String,
    pub style_id: Option<String>,
    pub total_available: u64,
    #[serde(default)]
    pub warehouses: Vec<WarehouseStock>,
    pub as_of: Option<DateTime<Utc>>,
}

impl InventorySummary {
    /// Recompute the top-level total from the per-warehouse rows.
    pub fn recompute_total(&mut self) {
        self.total_available = self.warehouses.iter().map(|w| w.quantity).sum();
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarehouseStock {
    pub warehouse_id: String,
    pub name: String,
    pub quantity: u64,
    /// Size code -> quantity within this warehouse.
    #[serde(default)]
    pub by_size: IndexMap<String, u64>,
}

/// Warehouse x size grid of available quantity for one style, as served to
/// the UI. Keys in `qty` are `"{warehouse}|{size}"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryMatrix {
    pub style_id: String,
    pub warehouses: Vec<String>,
    pub sizes: Vec<String>,
    pub qty: IndexMap<String, u64>,
    pub as_of: Option<DateTime<Utc>>,
}

impl InventoryMatrix {
    pub fn from_summaries(style_id: &str, summaries: &[InventorySummary]) -> Self {
        let mut warehouses: Vec<String> = Vec::new();
        let mut sizes: Vec<String> = Vec::new();
        let mut qty: IndexMap<String, u64> = IndexMap::new();
        let mut as_of = None;
        for s in summaries {
            if as_of.is_none() {
                as_of = s.as_of;
            }
            for w in &s.warehouses {
                if !warehouses.contains(&w.name) {
                    warehouses.push(w.name.clone());
                }
                for (size, n) in &w.by_size {
                    if !sizes.contains(size) {
                        sizes.push(size.clone());
                    }
                    *qty.entry(format!("{}|{}", w.name, size)).or_insert(0) += n;
                }
            }
        }
        Self {
            style_id: style_id.to_string(),
            warehouses,
            sizes,
            qty,
            as_of,
        }
    }
}

/// Cross-supplier normalized product for display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnifiedProduct {
    /// Process-local sequential id, stable for UI list keys within a session.
    pub id: u64,
    pub sku: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub lowest_price: f64,
    pub image: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub offers: Vec<SupplierOffer>,
}

/// One supplier's price/stock contribution to a unified product.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplierOffer {
    pub supplier: String,
    pub style_id: String,
    pub price: f64,
    pub inventory_total: Option<u64>,
    /// warehouse -> size -> quantity; absent when inventory attach failed.
    pub inventory: Option<IndexMap<String, IndexMap<String, u64>>>,
    /// "live" or "fallback" so the UI can badge degraded data.
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Syncing,
    Complete,
    Error,
}

impl Default for SyncStatus {
    fn default() -> Self {
        SyncStatus::Pending
    }
}

/// Per-supplier sync lifecycle state. Transitions only move forward except
/// error -> syncing (retry).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncStatusRecord {
    pub supplier_id: String,
    pub status: SyncStatus,
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Active,
    Error,
}

impl Default for RecordStatus {
    fn default() -> Self {
        RecordStatus::Active
    }
}

/// Persisted row for one synced product, keyed by (supplier_id, style_id)
/// with last-write-wins upsert semantics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSyncRecord {
    pub supplier_id: String,
    pub style_id: String,
    pub name: String,
    pub brand: String,
    pub category: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub price_min: f64,
    pub price_max: f64,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    pub sync_status: RecordStatus,
    /// Raw upstream payload on success; the causal error message on failure.
    pub source_data: Value,
    pub last_synced: DateTime<Utc>,
}

impl Default for ProductSyncRecord {
    fn default() -> Self {
        Self {
            supplier_id: String::new(),
            style_id: String::new(),
            name: String::new(),
            brand: String::new(),
            category: String::new(),
            images: Vec::new(),
            price_min: 0.0,
            price_max: 0.0,
            colors: Vec::new(),
            sizes: Vec::new(),
            sync_status: RecordStatus::Active,
            source_data: Value::Null,
            last_synced: Utc::now(),
        }
    }
}

/// One page of a supplier's browsable catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub page_size: u32,
    pub total_products: u64,
    pub total_pages: u32,
    pub has_next_page: bool,
}

/// Batch inventory lookup input: style ids and/or skus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryQuery {
    #[serde(default)]
    pub style_ids: Vec<String>,
    #[serde(default)]
    pub skus: Vec<String>,
}

/// Capability set advertised by an adapter. Not every supplier implements
/// every capability; callers probe before dispatching.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub search: bool,
    pub style_lookup: bool,
    pub inventory: bool,
    pub bulk_inventory: bool,
    pub browse: bool,
}
