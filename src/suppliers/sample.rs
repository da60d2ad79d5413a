//! Curated static catalog used as the degraded-mode source when live
//! supplier calls fail across the board, and as a placeholder adapter in
//! tests. Never performs I/O, never fails; everything it produces is
//! tagged `source: "fallback"` so the UI can badge it.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{
    Capabilities, ColorInfo, Product, ProductPage, Variant,
};

use super::SupplierAdapter;

pub struct SampleSupplier {
    catalog: Vec<Product>,
}

impl Default for SampleSupplier {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleSupplier {
    pub fn new() -> Self {
        Self {
            catalog: curated_catalog(),
        }
    }
}

#[async_trait]
impl SupplierAdapter for SampleSupplier {
    fn id(&self) -> &str {
        "sample"
    }

    fn display_name(&self) -> &str {
        "Sample Catalog"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            search: true,
            style_lookup: true,
            inventory: false,
            bulk_inventory: false,
            browse: true,
        }
    }

    fn source_tag(&self) -> &'static str {
        "fallback"
    }

    async fn search_products(&self, term: &str, limit: usize) -> Result<Vec<Product>> {
        let needle = term.trim().to_ascii_lowercase();
        let hits = self
            .catalog
            .iter()
            .filter(|p| {
                needle.is_empty()
                    || p.name.to_ascii_lowercase().contains(&needle)
                    || p.brand.to_ascii_lowercase().contains(&needle)
                    || p.style_id == needle
            })
            .take(limit)
            .cloned()
            .collect();
        Ok(hits)
    }

    async fn product_by_style(&self, style_id: &str) -> Result<Option<Product>> {
        Ok(self
            .catalog
            .iter()
            .find(|p| p.style_id == style_id.trim())
            .cloned())
    }

    async fn browse_products(
        &self,
        page: u32,
        page_size: u32,
        category: Option<&str>,
    ) -> Result<ProductPage> {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let filtered: Vec<&Product> = self
            .catalog
            .iter()
            .filter(|p| category.map_or(true, |c| p.category.eq_ignore_ascii_case(c)))
            .collect();
        let total_products = filtered.len() as u64;
        let total_pages = ((total_products + page_size as u64 - 1) / page_size as u64) as u32;
        let start = ((page - 1) * page_size) as usize;
        let products: Vec<Product> = filtered
            .into_iter()
            .skip(start)
            .take(page_size as usize)
            .cloned()
            .collect();
        Ok(ProductPage {
            products,
            page,
            page_size,
            total_products,
            total_pages,
            has_next_page: page < total_pages,
        })
    }
}

fn variant(sku: &str, size: &str, color: &str, hex: &str, msrp: f64) -> Variant {
    Variant {
        sku: sku.to_string(),
        size: size.to_string(),
        color: ColorInfo {
            name: color.to_string(),
            code: String::new(),
            hex: Some(hex.to_string()),
        },
        msrp,
    }
}

/// A handful of well-known blank apparel styles, enough for the UI to stay
/// usable when every live supplier is down.
fn curated_catalog() -> Vec<Product> {
    vec![
        Product {
            supplier_id: "sample".into(),
            style_id: "2000".into(),
            sku: "G2000".into(),
            name: "Ultra Cotton T-Shirt".into(),
            brand: "Gildan".into(),
            category: "T-Shirts".into(),
            images: vec![],
            colors: vec![
                ColorInfo { name: "White".into(), code: "WHT".into(), hex: Some("#FFFFFF".into()) },
                ColorInfo { name: "Black".into(), code: "BLK".into(), hex: Some("#1D1D1B".into()) },
                ColorInfo { name: "Sport Grey".into(), code: "SPG".into(), hex: Some("#97999B".into()) },
            ],
            variants: vec![
                variant("G2000-WHT-M", "M", "White", "#FFFFFF", 3.12),
                variant("G2000-WHT-L", "L", "White", "#FFFFFF", 3.12),
                variant("G2000-BLK-2XL", "2XL", "Black", "#1D1D1B", 4.55),
            ],
            price_min: 3.12,
            price_max: 4.55,
        },
        Product {
            supplier_id: "sample".into(),
            style_id: "5000".into(),
            sku: "G5000".into(),
            name: "Heavy Cotton T-Shirt".into(),
            brand: "Gildan".into(),
            category: "T-Shirts".into(),
            images: vec![],
            colors: vec![
                ColorInfo { name: "Navy".into(), code: "NVY".into(), hex: Some("#263147".into()) },
            ],
            variants: vec![
                variant("G5000-NVY-S", "S", "Navy", "#263147", 2.87),
                variant("G5000-NVY-XL", "XL", "Navy", "#263147", 2.87),
            ],
            price_min: 2.87,
            price_max: 2.87,
        },
        Product {
            supplier_id: "sample".into(),
            style_id: "18500".into(),
            sku: "G18500".into(),
            name: "Heavy Blend Hooded Sweatshirt".into(),
            brand: "Gildan".into(),
            category: "Fleece".into(),
            images: vec![],
            colors: vec![
                ColorInfo { name: "Dark Heather".into(), code: "DKH".into(), hex: Some("#45484B".into()) },
            ],
            variants: vec![
                variant("G18500-DKH-M", "M", "Dark Heather", "#45484B", 10.34),
                variant("G18500-DKH-3XL", "3XL", "Dark Heather", "#45484B", 13.02),
            ],
            price_min: 10.34,
            price_max: 13.02,
        },
        Product {
            supplier_id: "sample".into(),
            style_id: "3001".into(),
            sku: "BC3001".into(),
            name: "Unisex Jersey Short Sleeve Tee".into(),
            brand: "Bella + Canvas".into(),
            category: "T-Shirts".into(),
            images: vec![],
            colors: vec![
                ColorInfo { name: "Heather Mauve".into(), code: "HMV".into(), hex: Some("#C4929B".into()) },
            ],
            variants: vec![
                variant("BC3001-HMV-S", "S", "Heather Mauve", "#C4929B", 4.96),
                variant("BC3001-HMV-L", "L", "Heather Mauve", "#C4929B", 4.96),
            ],
            price_min: 4.96,
            price_max: 4.96,
        },
        Product {
            supplier_id: "sample".into(),
            style_id: "PC61".into(),
            sku: "PC61".into(),
            name: "Essential Tee".into(),
            brand: "Port & Company".into(),
            category: "T-Shirts".into(),
            images: vec![],
            colors: vec![
                ColorInfo { name: "Jet Black".into(), code: "JBK".into(), hex: Some("#101820".into()) },
            ],
            variants: vec![
                variant("PC61-JBK-M", "M", "Jet Black", "#101820", 3.49),
            ],
            price_min: 3.49,
            price_max: 3.49,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn search_filters_by_brand_and_name() {
        let supplier = SampleSupplier::new();
        let hits = supplier.search_products("gildan", 10).await.unwrap();
        assert_eq!(hits.len(), 3);
        let hits = supplier.search_products("hooded", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].style_id, "18500");
    }

    #[tokio::test]
    async fn browse_pages_deterministically() {
        let supplier = SampleSupplier::new();
        let page1 = supplier.browse_products(1, 2, None).await.unwrap();
        assert_eq!(page1.products.len(), 2);
        assert_eq!(page1.total_products, 5);
        assert_eq!(page1.total_pages, 3);
        assert!(page1.has_next_page);
        let page3 = supplier.browse_products(3, 2, None).await.unwrap();
        assert_eq!(page3.products.len(), 1);
        assert!(!page3.has_next_page);
    }

    #[tokio::test]
    async fn inventory_capability_is_absent() {
        let supplier = SampleSupplier::new();
        assert!(!supplier.capabilities().inventory);
        assert!(supplier.inventory_by_sku("G2000-WHT-M").await.is_err());
    }
}
