//! Multi-supplier product-catalog and inventory-aggregation core for a
//! print-shop order-management system.
//!
//! Adapters query external promotional-apparel supplier APIs, normalize
//! their heterogeneous payloads into one unified model, cache results under
//! per-operation freshness windows, and feed a resumable page-at-a-time
//! catalog sync into local storage. One supplier's failure never breaks
//! another's results.

pub mod cache;
pub mod http;
pub mod logging;
pub mod models;
pub mod normalization;
pub mod ops;
pub mod search;
pub mod storage;
pub mod suppliers;
pub mod sync;

pub mod util {
    pub mod env;
}
