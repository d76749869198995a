//! Read-only access to the content API.

use crate::config::SiteConfig;
use crate::descriptor::WireOverride;
use crate::error::ClientError;
use crate::ordering::SectionId;
use crate::slug::PageSlug;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Section markup served for dynamic insertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRecord {
    pub section_id: SectionId,
    pub html: String,
}

#[derive(Debug, Default, Deserialize)]
struct SectionOrderResponse {
    #[serde(default)]
    order: Option<Vec<SectionId>>,
}

/// Page-scoped content lookups
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Override records for the page; records that fail to decode are dropped
    async fn fetch_overrides(&self, page: &PageSlug) -> Result<Vec<WireOverride>, ClientError>;

    /// Persisted section order; empty when none is configured
    async fn fetch_section_order(&self, page: &PageSlug) -> Result<Vec<SectionId>, ClientError>;

    /// Sections the dynamic loader inserts
    async fn fetch_sections(&self, page: &PageSlug) -> Result<Vec<SectionRecord>, ClientError>;
}

/// HTTP implementation against `{base}/content-overrides`, `{base}/section-order`
/// and `{base}/sections`, each taking `?page={slug}`
#[derive(Debug, Clone)]
pub struct HttpContentClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpContentClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &SiteConfig) -> Result<Self, ClientError> {
        Self::new(config.api_base_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        page: &PageSlug,
    ) -> Result<T, ClientError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(%url, %page, "Fetching");

        let response = self
            .http
            .get(&url)
            .query(&[("page", page.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| ClientError::Decode { url, source })
    }
}

#[async_trait]
impl ContentSource for HttpContentClient {
    async fn fetch_overrides(&self, page: &PageSlug) -> Result<Vec<WireOverride>, ClientError> {
        let records: Vec<serde_json::Value> = self.get_json("content-overrides", page).await?;

        Ok(records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(wire) => Some(wire),
                Err(e) => {
                    warn!(%page, index, error = %e, "Dropping undecodable override record");
                    None
                }
            })
            .collect())
    }

    async fn fetch_section_order(&self, page: &PageSlug) -> Result<Vec<SectionId>, ClientError> {
        let response: SectionOrderResponse = self.get_json("section-order", page).await?;
        Ok(response.order.unwrap_or_default())
    }

    async fn fetch_sections(&self, page: &PageSlug) -> Result<Vec<SectionRecord>, ClientError> {
        self.get_json("sections", page).await
    }
}

/// In-memory content keyed by page slug.
///
/// Backs offline rendering from a fixture file and the test suites.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticContentSource {
    #[serde(default)]
    pub overrides: HashMap<String, Vec<WireOverride>>,
    #[serde(default)]
    pub section_orders: HashMap<String, Vec<SectionId>>,
    #[serde(default)]
    pub sections: HashMap<String, Vec<SectionRecord>>,
    #[serde(skip)]
    fetches: Arc<AtomicUsize>,
}

impl StaticContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }

    pub fn with_overrides(mut self, page: &str, overrides: Vec<WireOverride>) -> Self {
        self.overrides.insert(page.to_string(), overrides);
        self
    }

    pub fn with_section_order(mut self, page: &str, order: &[&str]) -> Self {
        self.section_orders
            .insert(page.to_string(), order.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_sections(mut self, page: &str, sections: Vec<SectionRecord>) -> Self {
        self.sections.insert(page.to_string(), sections);
        self
    }

    /// Total fetches served, across all endpoints
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn lookup<T: Clone>(&self, table: &HashMap<String, Vec<T>>, page: &PageSlug) -> Vec<T> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        table.get(page.as_str()).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ContentSource for StaticContentSource {
    async fn fetch_overrides(&self, page: &PageSlug) -> Result<Vec<WireOverride>, ClientError> {
        Ok(self.lookup(&self.overrides, page))
    }

    async fn fetch_section_order(&self, page: &PageSlug) -> Result<Vec<SectionId>, ClientError> {
        Ok(self.lookup(&self.section_orders, page))
    }

    async fn fetch_sections(&self, page: &PageSlug) -> Result<Vec<SectionRecord>, ClientError> {
        Ok(self.lookup(&self.sections, page))
    }
}
