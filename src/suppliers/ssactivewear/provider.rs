use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, Cache, TtlConfig};
use crate::http::{
    soap, CredentialStrategy, HttpClient, RequestOptions, RetryPolicy,
};
use crate::models::{
    Capabilities, InventoryQuery, InventorySummary, Product, ProductPage, WarehouseStock,
};
use crate::normalization::fields::{pick_array, pick_str, pick_u64};
use crate::normalization::product::{
    map_inventory, map_product, BRAND_KEYS, NAME_KEYS, STYLE_ID_KEYS, VARIANT_LIST_KEYS,
};
use crate::suppliers::{is_numeric_style_id, SupplierAdapter};
use crate::util::env::{env_list, env_opt, env_parse};

/// S&S Activewear adapter.
/// REST base: https://api.ssactivewear.com/
///
/// Key endpoints:
/// - GET /v2/styles/?{param}=term - style search (parameter name varies by
///   API revision; candidates are configuration data, tried in order)
/// - GET /v2/styles/{styleId} - style detail
/// - GET /v2/products/?styleid=... - variant (sku) rows for a style
/// - GET /v2/inventory/?styleid=... or /v2/inventory/{sku} - stock rows
/// - POST /promostandards/InventoryService - legacy SOAP 1.2 inventory,
///   used only when the REST rows come back empty
///
/// The upstream is slow, rate limited, and loose about field casing; all
/// parsing goes through the alias lists in `normalization`.
pub struct SsActivewearProvider {
    base_url: String,
    image_cdn: String,
    http: HttpClient,
    cache: Arc<dyn Cache>,
    ttl: TtlConfig,
    /// Ordered candidate parameter names for identifier search.
    search_params: Vec<String>,
    /// Known-good style ids used when live resolution yields nothing.
    fallback_styles: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SsOptions {
    pub base_url: String,
    pub image_cdn: String,
    pub timeout: Duration,
    pub account: Option<String>,
    pub api_key: Option<String>,
    pub policy: RetryPolicy,
    pub search_params: Vec<String>,
    pub fallback_styles: Vec<String>,
}

impl Default for SsOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.ssactivewear.com".to_string(),
            image_cdn: "https://cdn.ssactivewear.com".to_string(),
            timeout: Duration::from_secs(30),
            account: None,
            api_key: None,
            policy: RetryPolicy::default(),
            search_params: default_search_params(),
            fallback_styles: default_fallback_styles(),
        }
    }
}

impl SsOptions {
    pub fn from_env() -> Self {
        let d = Self::default();
        let search_params = {
            let v = env_list("SS_SEARCH_PARAMS");
            if v.is_empty() {
                d.search_params
            } else {
                v
            }
        };
        let fallback_styles = {
            let v = env_list("SS_FALLBACK_STYLES");
            if v.is_empty() {
                d.fallback_styles
            } else {
                v
            }
        };
        Self {
            base_url: env_opt("SS_BASE_URL").unwrap_or(d.base_url),
            image_cdn: env_opt("SS_IMAGE_CDN").unwrap_or(d.image_cdn),
            timeout: Duration::from_secs(env_parse("SS_TIMEOUT_SECS", 30u64)),
            account: env_opt("SS_ACCOUNT"),
            api_key: env_opt("SS_API_KEY"),
            policy: RetryPolicy::from_env("SS"),
            search_params,
            fallback_styles,
        }
    }
}

fn default_search_params() -> Vec<String> {
    vec!["style".into(), "partnumber".into(), "search".into()]
}

fn default_fallback_styles() -> Vec<String> {
    vec![
        "2000".into(),
        "5000".into(),
        "18500".into(),
        "8000".into(),
        "64000".into(),
    ]
}

impl SsActivewearProvider {
    pub fn new(options: SsOptions, cache: Arc<dyn Cache>, ttl: TtlConfig) -> Result<Self> {
        // The documented scheme is Basic (account/key), but deployments in
        // the wild answer to custom headers or a bearer token instead; try
        // all three in order.
        let mut strategies = Vec::new();
        if let (Some(account), Some(key)) = (options.account.clone(), options.api_key.clone()) {
            strategies.push(CredentialStrategy::Basic {
                username: account.clone(),
                password: key.clone(),
            });
            strategies.push(CredentialStrategy::ApiKeyHeaders {
                account_header: "X-Account-Number".to_string(),
                account,
                key_header: "X-Api-Key".to_string(),
                key: key.clone(),
            });
            strategies.push(CredentialStrategy::Bearer { token: key });
        }
        let http = HttpClient::new(options.timeout, strategies, options.policy.clone())?;
        Ok(Self {
            base_url: options.base_url.trim_end_matches('/').to_string(),
            image_cdn: options.image_cdn,
            http,
            cache,
            ttl,
            search_params: options.search_params,
            fallback_styles: options.fallback_styles,
        })
    }

    pub fn fallback_styles(&self) -> &[String] {
        &self.fallback_styles
    }

    /// Flatten the several list shapes the styles endpoint has been seen to
    /// return: a bare array, or an object wrapping one.
    fn style_rows(body: &Value) -> Vec<Value> {
        if let Some(arr) = body.as_array() {
            return arr.clone();
        }
        pick_array(body, &["styles", "data", "results", "value"])
            .into_iter()
            .cloned()
            .collect()
    }

    async fn search_rows(&self, term: &str) -> Vec<Value> {
        let url = format!("{}/v2/styles/", self.base_url);
        for param in &self.search_params {
            match self.http.get_json(&url, &[(param.as_str(), term)]).await {
                Ok(body) => {
                    let rows = Self::style_rows(&body);
                    if !rows.is_empty() {
                        debug!(term, param = param.as_str(), hits = rows.len(), "style search hit");
                        return rows;
                    }
                }
                Err(e) => {
                    warn!(term, param = param.as_str(), error = %e, "style search attempt failed");
                }
            }
        }
        Vec::new()
    }

    /// Two-step best-effort identifier resolution. Numeric inputs are used
    /// directly; otherwise the top free-text hit's style id wins, with a
    /// "brand + style name" requery when the hit carries no id. Failures
    /// are non-fatal: callers fall back to the raw input.
    pub async fn resolve_style_id(&self, input: &str) -> Option<String> {
        let input = input.trim();
        if is_numeric_style_id(input) {
            return Some(input.to_string());
        }

        let rows = self.search_rows(input).await;
        let first = rows.first()?;
        if let Some(id) = pick_str(first, STYLE_ID_KEYS) {
            return Some(id);
        }

        // Direct-id lookup is unreliable for some catalogs; requery with a
        // derived "brand + style name" string.
        let brand = pick_str(first, BRAND_KEYS).unwrap_or_default();
        let name = pick_str(first, NAME_KEYS).unwrap_or_default();
        let requery = format!("{} {}", brand, name);
        if requery.trim().is_empty() {
            return None;
        }
        let rows = self.search_rows(requery.trim()).await;
        rows.first().and_then(|row| pick_str(row, STYLE_ID_KEYS))
    }

    async fn fetch_style_detail(&self, style_id: &str) -> Result<Option<Value>> {
        let url = format!("{}/v2/styles/{}", self.base_url, urlencoding::encode(style_id));
        let body = self.http.get_json(&url, &[]).await?;
        let rows = Self::style_rows(&body);
        if let Some(first) = rows.into_iter().next() {
            return Ok(Some(first));
        }
        if body.is_object() {
            return Ok(Some(body));
        }
        Ok(None)
    }

    async fn fetch_variant_rows(&self, style_id: &str) -> Result<Vec<Value>> {
        let url = format!("{}/v2/products/", self.base_url);
        let body = self.http.get_json(&url, &[("styleid", style_id)]).await?;
        Ok(Self::style_rows(&body))
    }

    async fn fetch_inventory_rows(&self, query: &[(&str, &str)], path: &str) -> Result<Vec<Value>> {
        let url = format!("{}/v2/inventory/{}", self.base_url, path);
        let body = self.http.get_json(&url, query).await?;
        Ok(Self::style_rows(&body))
    }

    /// Legacy SOAP inventory, tried only when the REST rows are empty. One
    /// envelope in, flat warehouse/quantity elements out; a `Fault` element
    /// means "no data", not an error worth surfacing.
    async fn legacy_inventory(&self, style_id: &str) -> Result<Option<InventorySummary>> {
        let url = format!("{}/promostandards/InventoryService", self.base_url);
        let request_body = format!(
            "<GetInventoryLevels><productId>{}</productId></GetInventoryLevels>",
            style_id
        );
        let envelope = soap::build_envelope(&request_body);
        let fetched = self
            .http
            .post_raw(&url, "application/soap+xml; charset=utf-8", envelope)
            .await?;
        if soap::is_soap_fault(&fetched.text) {
            warn!(style_id, "legacy inventory returned a SOAP fault");
            return Ok(None);
        }
        let warehouses = soap::extract_tag_values(&fetched.text, "warehouseId");
        let quantities = soap::extract_tag_values(&fetched.text, "quantityAvailable");
        if warehouses.is_empty() || quantities.is_empty() {
            return Ok(None);
        }
        let mut summary = InventorySummary {
            sku: style_id.to_string(),
            style_id: Some(style_id.to_string()),
            total_available: 0,
            warehouses: warehouses
                .into_iter()
                .zip(quantities)
                .map(|(id, qty)| WarehouseStock {
                    warehouse_id: id.clone(),
                    name: id,
                    quantity: qty.parse().unwrap_or(0),
                    by_size: Default::default(),
                })
                .collect(),
            as_of: Some(Utc::now()),
        };
        summary.recompute_total();
        Ok(Some(summary))
    }

    async fn inventory_for_style(&self, style_id: &str) -> Result<Option<InventorySummary>> {
        let rows = self
            .fetch_inventory_rows(&[("styleid", style_id)], "")
            .await?;
        if rows.is_empty() {
            return self.legacy_inventory(style_id).await;
        }
        let refs: Vec<&Value> = rows.iter().collect();
        Ok(Some(map_inventory(
            style_id,
            Some(style_id),
            &refs,
            Utc::now(),
        )))
    }
}

#[async_trait]
impl SupplierAdapter for SsActivewearProvider {
    fn id(&self) -> &str {
        "ss"
    }

    fn display_name(&self) -> &str {
        "S&S Activewear"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            search: true,
            style_lookup: true,
            inventory: true,
            bulk_inventory: true,
            browse: true,
        }
    }

    async fn search_products(&self, term: &str, limit: usize) -> Result<Vec<Product>> {
        let rows = self.search_rows(term).await;
        let mut ids: Vec<String> = Vec::new();
        for row in &rows {
            if let Some(id) = pick_str(row, STYLE_ID_KEYS) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            if ids.len() >= limit {
                break;
            }
        }

        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            match self.product_by_style(&id).await {
                Ok(Some(product)) => products.push(product),
                Ok(None) => {}
                Err(e) => warn!(style_id = id.as_str(), error = %e, "detail fetch failed during search"),
            }
        }
        Ok(products)
    }

    async fn product_by_style(&self, style_id: &str) -> Result<Option<Product>> {
        let key = cache_key("ss:style", &[("style", style_id)]);
        if let Some(hit) = self.cache.get(&key) {
            if let Ok(product) = serde_json::from_value::<Product>(hit) {
                return Ok(Some(product));
            }
        }

        let resolved = match self.resolve_style_id(style_id).await {
            Some(id) => id,
            // Resolution failures are non-fatal; treat the raw input as the id.
            None => style_id.trim().to_string(),
        };

        let Some(style) = self.fetch_style_detail(&resolved).await? else {
            return Ok(None);
        };
        let mut variants = self.fetch_variant_rows(&resolved).await.unwrap_or_else(|e| {
            warn!(style_id = resolved.as_str(), error = %e, "variant fetch failed; style-level only");
            Vec::new()
        });
        if variants.is_empty() {
            // Some catalog revisions embed the sku rows in the style payload.
            variants = pick_array(&style, VARIANT_LIST_KEYS)
                .into_iter()
                .cloned()
                .collect();
        }
        let refs: Vec<&Value> = variants.iter().collect();
        let product = map_product(self.id(), &style, &refs, &self.image_cdn);

        if let Ok(value) = serde_json::to_value(&product) {
            self.cache.set(&key, value, self.ttl.catalog_ttl);
        }
        Ok(Some(product))
    }

    async fn inventory_by_sku(&self, sku: &str) -> Result<Option<InventorySummary>> {
        // Inventory here is keyed by style, not sku: resolve the numeric
        // style id first, then slice the style rows down to the sku.
        if is_numeric_style_id(sku) {
            return self.inventory_for_style(sku.trim()).await;
        }
        let rows = self
            .fetch_inventory_rows(&[], &urlencoding::encode(sku))
            .await?;
        if rows.is_empty() {
            if let Some(style_id) = self.resolve_style_id(sku).await {
                return self.inventory_for_style(&style_id).await;
            }
            return Ok(None);
        }
        let refs: Vec<&Value> = rows.iter().collect();
        Ok(Some(map_inventory(sku, None, &refs, Utc::now())))
    }

    async fn inventory_bulk(&self, query: &InventoryQuery) -> Result<Vec<InventorySummary>> {
        let mut out = Vec::new();
        for style_id in &query.style_ids {
            let resolved = match self.resolve_style_id(style_id).await {
                Some(id) => id,
                None => style_id.trim().to_string(),
            };
            match self.inventory_for_style(&resolved).await {
                Ok(Some(summary)) => out.push(summary),
                Ok(None) => debug!(style_id = resolved.as_str(), "no inventory rows for style"),
                Err(e) => warn!(style_id = resolved.as_str(), error = %e, "bulk inventory item failed"),
            }
        }
        for sku in &query.skus {
            match self.inventory_by_sku(sku).await {
                Ok(Some(summary)) => out.push(summary),
                Ok(None) => {}
                Err(e) => warn!(sku = sku.as_str(), error = %e, "bulk inventory sku failed"),
            }
        }
        Ok(out)
    }

    async fn browse_products(
        &self,
        page: u32,
        page_size: u32,
        category: Option<&str>,
    ) -> Result<ProductPage> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 100);
        let url = format!("{}/v2/styles/", self.base_url);
        let page_s = page.to_string();
        let page_size_s = page_size.to_string();
        let mut query: Vec<(String, String)> = vec![
            ("page".into(), page_s),
            ("pagesize".into(), page_size_s),
        ];
        if let Some(c) = category {
            query.push(("category".into(), c.to_string()));
        }
        let opts = RequestOptions {
            query,
            ..Default::default()
        };
        let body = self.http.request(Method::GET, &url, opts).await?.json()?;
        let rows = Self::style_rows(&body);
        let products: Vec<Product> = rows
            .iter()
            .map(|row| map_product(self.id(), row, &[], &self.image_cdn))
            .collect();

        // Wrapper objects sometimes carry totals; a bare array forces a
        // lower-bound estimate from the page shape.
        let reported_total = pick_u64(&body, &["totalProducts", "totalCount", "total", "count"]);
        let fetched = products.len() as u64;
        let (total_products, total_pages, has_next_page) = if reported_total > 0 {
            let pages = ((reported_total + page_size as u64 - 1) / page_size as u64) as u32;
            (reported_total, pages, page < pages)
        } else {
            let has_next = fetched == page_size as u64;
            let seen = (page as u64 - 1) * page_size as u64 + fetched;
            (seen, page + u32::from(has_next), has_next)
        };

        if products.is_empty() {
            info!(page, page_size, "browse returned an empty page");
        }
        Ok(ProductPage {
            products,
            page,
            page_size,
            total_products,
            total_pages,
            has_next_page,
        })
    }
}
