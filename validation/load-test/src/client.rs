//! Client for the aggregation API.

use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use readings_common::{ReadingUpdate, RegionAverage};
use serde::Deserialize;

/// The calls the load runner issues.
#[async_trait]
pub trait AggregationClient: Send + Sync + 'static {
    /// POST /update/:region/:city
    async fn update(&self, region: &str, city: &str, update: &ReadingUpdate) -> Result<()>;

    /// GET /average/:region
    async fn average(&self, region: &str) -> Result<Vec<RegionAverage>>;

    /// GET /memory, in bytes.
    async fn memory(&self) -> Result<u64>;
}

#[derive(Deserialize)]
struct MemoryBody {
    bytes: u64,
}

/// reqwest-backed [`AggregationClient`].
#[derive(Clone)]
pub struct HttpAggregationClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAggregationClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl AggregationClient for HttpAggregationClient {
    async fn update(&self, region: &str, city: &str, update: &ReadingUpdate) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/update/{}/{}", region, city)))
            .json(update)
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("update {}/{} returned HTTP {}", region, city, response.status());
        }
        Ok(())
    }

    async fn average(&self, region: &str) -> Result<Vec<RegionAverage>> {
        let response = self
            .client
            .get(self.url(&format!("/average/{}", region)))
            .send()
            .await?;

        if !response.status().is_success() {
            bail!("average {} returned HTTP {}", region, response.status());
        }
        Ok(response.json().await?)
    }

    async fn memory(&self) -> Result<u64> {
        let response = self.client.get(self.url("/memory")).send().await?;

        if !response.status().is_success() {
            bail!("memory returned HTTP {}", response.status());
        }
        let body: MemoryBody = response.json().await?;
        Ok(body.bytes)
    }
}
