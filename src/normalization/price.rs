//! Pricing reduction across a style's variants.

use serde_json::Value;

use super::fields::pick_f64_opt;

/// Aliases under which suppliers have been observed to report a price.
pub const PRICE_KEYS: &[&str] = &[
    "price",
    "PRICE",
    "wholesale",
    "wholesalePrice",
    "salePrice",
    "piecePrice",
    "customerPrice",
    "cost",
];

/// Style-level aliases for the low price bound, tried only when no variant
/// carries a positive price.
pub const STYLE_MIN_PRICE_KEYS: &[&str] = &["minPrice", "price", "msrp", "suggestedPrice"];

/// Style-level aliases for the high price bound.
pub const STYLE_MAX_PRICE_KEYS: &[&str] = &["maxPrice", "price", "msrp", "suggestedPrice"];

/// Reduce variant pricing to `(min, max)`; `(0.0, 0.0)` when nothing
/// resolves anywhere.
pub fn price_range(style: &Value, variants: &[&Value]) -> (f64, f64) {
    let positive: Vec<f64> = variants
        .iter()
        .filter_map(|v| pick_f64_opt(v, PRICE_KEYS))
        .filter(|p| *p > 0.0)
        .collect();

    if !positive.is_empty() {
        let min = positive.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = positive.iter().cloned().fold(0.0_f64, f64::max);
        return (min, max);
    }

    // Secondary source: style-level price fields.
    let style_min = pick_f64_opt(style, STYLE_MIN_PRICE_KEYS).filter(|p| *p > 0.0);
    let style_max = pick_f64_opt(style, STYLE_MAX_PRICE_KEYS).filter(|p| *p > 0.0);
    match (style_min, style_max) {
        (Some(lo), Some(hi)) => (lo.min(hi), lo.max(hi)),
        (Some(p), None) | (None, Some(p)) => (p, p),
        (None, None) => (0.0, 0.0),
    }
}
