use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use tendero_core::catalog::{CatalogFetchError, CatalogSource, RawProductRecord};
use tendero_core::config::{CatalogConfig, CatalogSourceKind};

/// Feeds answer with a bare array; some deployments wrap it in `data`.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeedBody {
    Rows(Vec<RawProductRecord>),
    Wrapped { data: Vec<RawProductRecord> },
}

impl FeedBody {
    fn into_rows(self) -> Vec<RawProductRecord> {
        match self {
            Self::Rows(rows) | Self::Wrapped { data: rows } => rows,
        }
    }
}

fn decode(bytes: &[u8]) -> Result<Vec<RawProductRecord>, CatalogFetchError> {
    serde_json::from_slice::<FeedBody>(bytes)
        .map(FeedBody::into_rows)
        .map_err(|error| CatalogFetchError::Decode(error.to_string()))
}

pub fn from_config(config: &CatalogConfig) -> Result<Box<dyn CatalogSource>, CatalogFetchError> {
    match config.source {
        CatalogSourceKind::Http => Ok(Box::new(HttpCatalogSource::new(
            &config.base_url,
            Duration::from_secs(config.timeout_secs.max(1)),
        )?)),
        CatalogSourceKind::File => {
            let path = config
                .path
                .clone()
                .ok_or_else(|| CatalogFetchError::Io("catalog.path is not set".to_owned()))?;
            Ok(Box::new(FileCatalogSource::new(path)))
        }
    }
}

/// `GET {base_url}/{source_key}` against the inventory API.
pub struct HttpCatalogSource {
    client: Client,
    base_url: String,
}

impl HttpCatalogSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogFetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| CatalogFetchError::Network(error.to_string()))?;
        Ok(Self { client, base_url: base_url.trim_end_matches('/').to_owned() })
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch(&self, source_key: &str) -> Result<Vec<RawProductRecord>, CatalogFetchError> {
        let url = format!("{}/{}", self.base_url, source_key.trim());
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| CatalogFetchError::Network(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogFetchError::Status { status: status.as_u16() });
        }
        let bytes =
            response.bytes().await.map_err(|error| CatalogFetchError::Network(error.to_string()))?;
        decode(&bytes)
    }
}

/// Local JSON snapshot in the feed format. The source key is ignored.
pub struct FileCatalogSource {
    path: PathBuf,
}

impl FileCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileCatalogSource {
    async fn fetch(&self, _source_key: &str) -> Result<Vec<RawProductRecord>, CatalogFetchError> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|error| {
            CatalogFetchError::Io(format!("{}: {error}", self.path.display()))
        })?;
        decode(&bytes)
    }
}
