//! Metadata store backed by a content-lake HTTP query endpoint.

use crate::config::MetadataConfig;
use crate::metadata::MetadataStore;
use crate::Error;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use swap_types::AssetMetadata;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Deserialize)]
struct QueryResponse {
    result: Option<AssetMetadata>,
}

pub struct HttpMetadataStore {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpMetadataStore {
    pub fn new(config: &MetadataConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            http,
            endpoint: config.query_url(),
        })
    }
}

/// Single-document query for an asset key.
pub fn asset_query(key: &str) -> String {
    format!("*[_type == 'nfts' && _id == \"{key}\"][0]")
}

#[async_trait]
impl MetadataStore for HttpMetadataStore {
    async fn lookup(&self, key: &str) -> Result<Option<AssetMetadata>, Error> {
        let query = asset_query(key);
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[("query", query.as_str())])
            .send()
            .await
            .map_err(|e| Error::Metadata(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(key, status = status.as_u16(), "Metadata query rejected");
            return Err(Error::Metadata(format!("query returned {status}")));
        }

        let body: QueryResponse = resp
            .json()
            .await
            .map_err(|e| Error::Metadata(format!("bad response body: {e}")))?;
        debug!(key, found = body.result.is_some(), "Metadata query");
        Ok(body.result)
    }
}
