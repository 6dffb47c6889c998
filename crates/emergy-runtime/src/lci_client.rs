//! HTTP client for the external LCI catalog service.
//!
//! The catalog exposes two endpoints:
//! - `GET {api_url}/products` – list of [`LciProduct`]
//! - `GET {api_url}/products/{id}` – list of [`LciFlow`] for one product
//!
//! Any transport or HTTP failure is reported as
//! [`EmergyError::UpstreamService`].

use async_trait::async_trait;
use emergy_core::error::{EmergyError, Result};
use emergy_core::models::FlowRecord;
use emergy_core::settings::LciConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

const USER_AGENT: &str = concat!("emergy-calc/", env!("CARGO_PKG_VERSION"));

/// Detail used when the catalog answers with an error but no body.
const UNKNOWN_UPSTREAM_ERROR: &str = "Unknown error from the external LCI API.";

// ── Wire types ────────────────────────────────────────────────────────────────

/// A product listed by the LCI catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LciProduct {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One inventory flow of a catalog product, keyed by canonical column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LciFlow {
    #[serde(rename = "Flow Name")]
    pub flow_name: String,
    #[serde(rename = "Amount")]
    pub amount: f64,
    #[serde(rename = "Unit", default)]
    pub unit: String,
    #[serde(rename = "Flow Direction")]
    pub flow_direction: String,
    /// Outputs frequently carry no UEV.
    #[serde(rename = "UEV", default)]
    pub uev: Option<f64>,
    #[serde(rename = "Category", default)]
    pub category: String,
}

impl From<LciFlow> for FlowRecord {
    fn from(flow: LciFlow) -> Self {
        FlowRecord {
            flow_name: flow.flow_name,
            amount: Some(flow.amount),
            unit: flow.unit,
            flow_direction: flow.flow_direction,
            uev: flow.uev,
            category: flow.category,
        }
    }
}

// ── FlowCatalog ───────────────────────────────────────────────────────────────

/// Source of catalog products and their flows.
#[async_trait]
pub trait FlowCatalog: Send + Sync {
    async fn list_products(&self) -> Result<Vec<LciProduct>>;

    async fn flows_for_product(&self, product_id: i64) -> Result<Vec<LciFlow>>;
}

// ── LciClient ─────────────────────────────────────────────────────────────────

/// reqwest-backed [`FlowCatalog`].
pub struct LciClient {
    http_client: reqwest::Client,
    api_url: String,
}

impl LciClient {
    pub fn new(config: &LciConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| EmergyError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: config.api_url.clone(),
        })
    }

    /// Use a preconfigured reqwest client, e.g. one with custom proxy rules.
    pub fn with_http_client(http_client: reqwest::Client, config: &LciConfig) -> Self {
        Self {
            http_client,
            api_url: config.api_url.clone(),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// GET `{api_url}{path}` and decode the JSON body.
    ///
    /// `what` names the resource in caller-facing error details.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = format!("{}{}", self.api_url, path);
        debug!(url = %url, "Querying LCI catalog");

        let response = self.http_client.get(&url).send().await.map_err(|e| {
            error!(url = %url, error = %e, "LCI catalog request failed");
            EmergyError::upstream(
                None,
                format!("Failed to fetch {} from the external LCI service.", what),
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                url = %url,
                status = status.as_u16(),
                "LCI catalog answered with an error"
            );
            let detail = if body.trim().is_empty() {
                UNKNOWN_UPSTREAM_ERROR.to_string()
            } else {
                body
            };
            return Err(EmergyError::upstream(Some(status.as_u16()), detail));
        }

        response.json::<T>().await.map_err(|e| {
            error!(url = %url, error = %e, "LCI catalog returned an unreadable payload");
            EmergyError::upstream(
                None,
                format!("Invalid {} payload from the external LCI service.", what),
            )
        })
    }
}

#[async_trait]
impl FlowCatalog for LciClient {
    async fn list_products(&self) -> Result<Vec<LciProduct>> {
        let products: Vec<LciProduct> = self.get_json("/products", "LCI products").await?;
        debug!("LCI catalog listed {} products", products.len());
        Ok(products)
    }

    async fn flows_for_product(&self, product_id: i64) -> Result<Vec<LciFlow>> {
        let flows: Vec<LciFlow> = self
            .get_json(&format!("/products/{}", product_id), "LCI product flows")
            .await?;
        debug!(product_id, "LCI catalog returned {} flows", flows.len());
        Ok(flows)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
