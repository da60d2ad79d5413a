//! Mapping from raw supplier JSON shapes into the unified product/inventory
//! model. Pure functions, no I/O; every field resolves through the alias
//! lists in this module so new upstream spellings are a data change.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use crate::models::{ColorInfo, InventorySummary, Product, Variant, WarehouseStock};

use super::fields::{pick_array, pick_f64, pick_str};
use super::fields::pick_u64;
use super::image::resolve_image_url;
use super::price::price_range;
use super::size::normalize_size;

pub const STYLE_ID_KEYS: &[&str] = &["styleID", "styleId", "StyleID", "styleCode", "id"];
pub const SKU_KEYS: &[&str] = &["sku", "SKU", "skuID", "partNumber", "partNo"];
pub const NAME_KEYS: &[&str] = &["styleName", "style_name", "name", "title", "productName"];
pub const BRAND_KEYS: &[&str] = &["brandName", "brand", "mill", "millName", "manufacturer"];
pub const CATEGORY_KEYS: &[&str] = &["baseCategory", "category", "categoryName", "productType"];
pub const SIZE_KEYS: &[&str] = &["sizeName", "size", "Size", "sizeCode"];
pub const COLOR_NAME_KEYS: &[&str] = &["colorName", "color", "Color", "colorGroupName"];
pub const COLOR_CODE_KEYS: &[&str] = &["colorCode", "color_code", "colorID"];
pub const COLOR_HEX_KEYS: &[&str] = &["color1", "colorHex", "hex", "colorSwatchTextColor"];
pub const IMAGE_KEYS: &[&str] = &[
    "styleImage",
    "image",
    "imageUrl",
    "colorFrontImage",
    "frontImage",
];
pub const VARIANT_LIST_KEYS: &[&str] = &["products", "skus", "variants", "items"];
pub const WAREHOUSE_LIST_KEYS: &[&str] = &["warehouses", "Warehouses", "inventory"];
pub const WAREHOUSE_ID_KEYS: &[&str] = &["warehouseAbbr", "warehouse", "whse", "warehouseID"];
pub const WAREHOUSE_NAME_KEYS: &[&str] = &["warehouseName", "name", "warehouseAbbr", "warehouse"];
pub const QTY_KEYS: &[&str] = &["qty", "quantity", "Qty", "availableQuantity", "onHand"];
pub const MSRP_KEYS: &[&str] = &["msrp", "mapPrice", "retailPrice", "suggestedPrice", "price"];

pub fn map_color(raw: &Value) -> ColorInfo {
    ColorInfo {
        name: pick_str(raw, COLOR_NAME_KEYS).unwrap_or_default(),
        code: pick_str(raw, COLOR_CODE_KEYS).unwrap_or_default(),
        hex: pick_str(raw, COLOR_HEX_KEYS),
    }
}

pub fn map_variant(raw: &Value) -> Variant {
    Variant {
        sku: pick_str(raw, SKU_KEYS).unwrap_or_default(),
        size: normalize_size(&pick_str(raw, SIZE_KEYS).unwrap_or_default()),
        color: map_color(raw),
        msrp: pick_f64(raw, MSRP_KEYS),
    }
}

/// Build a supplier-native `Product` from a style payload plus the raw
/// variant rows fetched for it. `image_cdn` is the supplier's CDN base for
/// relative image paths.
pub fn map_product(
    supplier_id: &str,
    style: &Value,
    variants_raw: &[&Value],
    image_cdn: &str,
) -> Product {
    let style_id = pick_str(style, STYLE_ID_KEYS).unwrap_or_default();
    let (price_min, price_max) = price_range(style, variants_raw);

    let mut images: Vec<String> = Vec::new();
    if let Some(raw) = pick_str(style, IMAGE_KEYS) {
        if let Some(url) = resolve_image_url(image_cdn, &raw) {
            images.push(url);
        }
    }
    for v in variants_raw {
        if let Some(raw) = pick_str(v, IMAGE_KEYS) {
            if let Some(url) = resolve_image_url(image_cdn, &raw) {
                if !images.contains(&url) {
                    images.push(url);
                }
            }
        }
    }

    let mut colors: Vec<ColorInfo> = Vec::new();
    let mut variants: Vec<Variant> = Vec::new();
    for raw in variants_raw {
        let variant = map_variant(raw);
        if !colors.iter().any(|c| c.name == variant.color.name) && !variant.color.name.is_empty() {
            colors.push(variant.color.clone());
        }
        if !variant.sku.is_empty() {
            variants.push(variant);
        }
    }

    Product {
        supplier_id: supplier_id.to_string(),
        style_id: style_id.clone(),
        sku: pick_str(style, SKU_KEYS).unwrap_or(style_id),
        name: pick_str(style, NAME_KEYS).unwrap_or_default(),
        brand: pick_str(style, BRAND_KEYS).unwrap_or_default(),
        category: pick_str(style, CATEGORY_KEYS).unwrap_or_default(),
        images,
        colors,
        variants,
        price_min,
        price_max,
    }
}

/// Aggregate raw per-sku inventory rows into one summary. Rows either nest
/// a warehouse list or are themselves flat warehouse rows; both shapes
/// occur upstream.
pub fn map_inventory(
    sku: &str,
    style_id: Option<&str>,
    rows: &[&Value],
    as_of: DateTime<Utc>,
) -> InventorySummary {
    let mut merged: IndexMap<String, WarehouseStock> = IndexMap::new();

    for row in rows {
        let size = normalize_size(&pick_str(row, SIZE_KEYS).unwrap_or_default());
        let nested = pick_array(row, WAREHOUSE_LIST_KEYS);
        let warehouse_rows: Vec<&Value> = if nested.is_empty() { vec![row] } else { nested };

        for wh in warehouse_rows {
            let Some(id) = pick_str(wh, WAREHOUSE_ID_KEYS) else {
                continue;
            };
            let qty = pick_u64(wh, QTY_KEYS);
            let entry = merged.entry(id.clone()).or_insert_with(|| WarehouseStock {
                warehouse_id: id.clone(),
                name: pick_str(wh, WAREHOUSE_NAME_KEYS).unwrap_or_else(|| id.clone()),
                quantity: 0,
                by_size: IndexMap::new(),
            });
            entry.quantity += qty;
            if !size.is_empty() {
                *entry.by_size.entry(size.clone()).or_insert(0) += qty;
            }
        }
    }

    let mut summary = InventorySummary {
        sku: sku.to_string(),
        style_id: style_id.map(|s| s.to_string()),
        total_available: 0,
        warehouses: merged.into_values().collect(),
        as_of: Some(as_of),
    };
    summary.recompute_total();
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_style_with_variants() {
        let style = json!({
            "styleID": 2000,
            "styleName": "Ultra Cotton Tee",
            "brandName": "Gildan",
            "baseCategory": "T-Shirts",
            "styleImage": "Style/2000_f.jpg"
        });
        let v1 = json!({"sku": "B15453", "sizeName": "xxl", "colorName": "Sport Grey", "piecePrice": 3.2});
        let v2 = json!({"sku": "B15454", "sizeName": "L", "colorName": "Black", "piecePrice": 2.9});
        let refs = [&v1, &v2];
        let p = map_product("ss", &style, &refs, "https://cdn.example.com");

        assert_eq!(p.style_id, "2000");
        assert_eq!(p.name, "Ultra Cotton Tee");
        assert_eq!(p.brand, "Gildan");
        assert_eq!(p.variants.len(), 2);
        assert_eq!(p.variants[0].size, "2XL");
        assert_eq!(p.colors.len(), 2);
        assert_eq!(p.price_min, 2.9);
        assert_eq!(p.price_max, 3.2);
        assert_eq!(p.images, vec!["https://cdn.example.com/Images/Style/2000_f.jpg"]);
    }

    #[test]
    fn inventory_total_equals_warehouse_sum() {
        let r1 = json!({
            "sku": "B15453",
            "sizeName": "M",
            "warehouses": [
                {"warehouseAbbr": "IL", "qty": 12},
                {"warehouseAbbr": "NV", "qty": 4}
            ]
        });
        let r2 = json!({
            "sku": "B15453",
            "sizeName": "L",
            "warehouses": [
                {"warehouseAbbr": "IL", "qty": 9}
            ]
        });
        let refs = [&r1, &r2];
        let inv = map_inventory("B15453", Some("2000"), &refs, Utc::now());
        assert_eq!(inv.total_available, 25);
        assert_eq!(
            inv.total_available,
            inv.warehouses.iter().map(|w| w.quantity).sum::<u64>()
        );
        let il = inv.warehouses.iter().find(|w| w.warehouse_id == "IL").unwrap();
        assert_eq!(il.by_size.get("M"), Some(&12));
        assert_eq!(il.by_size.get("L"), Some(&9));
    }

    #[test]
    fn flat_warehouse_rows_are_accepted() {
        let r = json!({"sizeName": "S", "warehouseAbbr": "TX", "qty": 7});
        let refs = [&r];
        let inv = map_inventory("X1", None, &refs, Utc::now());
        assert_eq!(inv.total_available, 7);
        assert_eq!(inv.warehouses[0].warehouse_id, "TX");
    }
}
