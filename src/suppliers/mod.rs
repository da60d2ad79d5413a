pub mod registry;
pub mod sample;
pub mod ssactivewear;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::models::{Capabilities, InventoryQuery, InventorySummary, Product, ProductPage};

/// The capability contract every upstream supplier is adapted onto.
///
/// Not all suppliers implement every capability; callers check
/// `capabilities()` before dispatching. Default bodies reject so adapters
/// only implement the subset their upstream actually offers.
#[async_trait]
pub trait SupplierAdapter: Send + Sync {
    /// Globally unique id within the registry.
    fn id(&self) -> &str;

    fn display_name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Tag applied to offers built from this adapter, so the UI can badge
    /// degraded/sample data ("live" vs "fallback").
    fn source_tag(&self) -> &'static str {
        "live"
    }

    /// Resolve candidate identifiers for `term`, then fetch full records,
    /// bounded by `limit`.
    async fn search_products(&self, term: &str, limit: usize) -> Result<Vec<Product>> {
        let _ = (term, limit);
        Err(anyhow!("{}: search not supported", self.id()))
    }

    async fn product_by_style(&self, style_id: &str) -> Result<Option<Product>> {
        let _ = style_id;
        Err(anyhow!("{}: style lookup not supported", self.id()))
    }

    async fn inventory_by_sku(&self, sku: &str) -> Result<Option<InventorySummary>> {
        let _ = sku;
        Err(anyhow!("{}: inventory not supported", self.id()))
    }

    /// Batch form; returns one entry per resolved style.
    async fn inventory_bulk(&self, query: &InventoryQuery) -> Result<Vec<InventorySummary>> {
        let _ = query;
        Err(anyhow!("{}: bulk inventory not supported", self.id()))
    }

    async fn browse_products(
        &self,
        page: u32,
        page_size: u32,
        category: Option<&str>,
    ) -> Result<ProductPage> {
        let _ = (page, page_size, category);
        Err(anyhow!("{}: browse not supported", self.id()))
    }
}

/// True when the input is already a well-formed numeric style id and can be
/// queried directly, skipping free-text resolution.
pub fn is_numeric_style_id(input: &str) -> bool {
    !input.trim().is_empty() && input.trim().chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_style_id_detection() {
        assert!(is_numeric_style_id("2000"));
        assert!(is_numeric_style_id(" 18500 "));
        assert!(!is_numeric_style_id("G200"));
        assert!(!is_numeric_style_id(""));
        assert!(!is_numeric_style_id("20 00"));
    }
}
