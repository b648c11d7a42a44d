use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, info};

use crate::app::ports::DataSource;
use crate::domain::RawTable;
use crate::error::{CleanerError, Result};
use crate::pipeline::ingestion::read_csv_bytes;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw CSV fetched over HTTP(S), e.g. a raw file URL on a code host
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("grant_cleaner/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            url: url.into(),
            client,
        }
    }

    async fn get(&self) -> Result<Vec<u8>> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CleanerError::source_unavailable(
                &self.url,
                format!("HTTP status {}", status),
            ));
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = resp.bytes().await?.to_vec();
        debug!(url = %self.url, content_type = %content_type, bytes = bytes.len(), "Fetched source");
        Ok(bytes)
    }
}

#[async_trait]
impl DataSource for HttpSource {
    async fn fetch(&self) -> Result<RawTable> {
        info!(url = %self.url, "Downloading raw applications");
        let bytes = self.get().await.map_err(|e| match e {
            CleanerError::SourceUnavailable { .. } => e,
            other => CleanerError::source_unavailable(&self.url, other),
        })?;
        read_csv_bytes(&bytes).map_err(|e| CleanerError::source_unavailable(&self.url, e))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
