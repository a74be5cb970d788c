use super::SeriesSource;
use crate::catalog::SensorInfo;
use crate::error::{ChartError, ChartResult};
use crate::query::QueryDescriptor;
use crate::series::{SeriesResponse, SeriesRow};
use async_trait::async_trait;
use tokio::time::Duration;
use tracing::{debug, error};

/// Reads series from a remote query service over `GET /series`.
pub struct HttpSource {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query-string parameters for `query`. Bounds are sent only as a pair.
    pub fn series_params(query: &QueryDescriptor) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("target", query.table.clone()),
            ("fields", query.fields.join(",")),
            ("resolution", query.resolution.as_param()),
        ];
        if let Some((start, end)) = query.bounds {
            params.push(("startTime", start.to_string()));
            params.push(("endTime", end.to_string()));
        }
        params
    }

    pub async fn sensors(&self) -> ChartResult<Vec<SensorInfo>> {
        let url = format!("{}/sensors", self.base_url);
        let response = self.client.get(&url).timeout(self.timeout).send().await?;
        if !response.status().is_success() {
            return Err(ChartError::transport(format!("HTTP error: {}", response.status())));
        }
        Ok(response.json::<Vec<SensorInfo>>().await?)
    }
}

#[async_trait]
impl SeriesSource for HttpSource {
    async fn fetch(&self, query: &QueryDescriptor) -> ChartResult<Vec<SeriesRow>> {
        let url = format!("{}/series", self.base_url);
        debug!("Fetching {} from {}", query.table, url);

        let response = self
            .client
            .get(&url)
            .query(&Self::series_params(query))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                error!("Series request to {} failed: {}", url, e);
                ChartError::transport(format!("Network error: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ChartError::transport(format!("HTTP error: {}", response.status())));
        }

        let body = response
            .json::<SeriesResponse>()
            .await
            .map_err(|e| ChartError::transport(format!("Failed to parse response: {}", e)))?;
        Ok(body.rows)
    }
}
