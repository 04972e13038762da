//! Reference APR feed.
//!
//! [`LidoClient`] reads the stETH APR published by the Lido API, both the
//! latest value and the simple moving average.

use std::time::Duration;

use fastnum::UD128;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::num;

/// Public Lido API endpoint.
pub const LIDO_API_URL: &str = "https://eth-api.lido.fi";

const CURRENT_APR_PATH: &str = "v1/protocol/steth/apr/last";
const SMA_APR_PATH: &str = "v1/protocol/steth/apr/sma";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response status: {0}")]
    Status(StatusCode),

    #[error("invalid feed URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid APR value: {0}")]
    InvalidValue(f64),
}

/// Source of the reference APR, in percent.
pub trait ApyFeed {
    fn current_apr(&self) -> impl Future<Output = Result<UD128, FeedError>> + Send;

    fn sma_apr(&self) -> impl Future<Output = Result<UD128, FeedError>> + Send;
}

#[derive(Debug, Deserialize)]
struct AprResponse<D> {
    data: D,
}

#[derive(Debug, Deserialize)]
struct LastApr {
    apr: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SmaApr {
    sma_apr: f64,
}

/// Lido API client.
#[derive(Clone, Debug)]
pub struct LidoClient {
    http: reqwest::Client,
    base_url: Url,
}

impl LidoClient {
    pub fn new(base_url: Url) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        Ok(Self { http, base_url })
    }

    /// Client of the public Lido API.
    pub fn mainnet() -> Result<Self, FeedError> {
        Self::new(Url::parse(LIDO_API_URL)?)
    }

    async fn fetch<D: serde::de::DeserializeOwned>(&self, path: &str) -> Result<D, FeedError> {
        let url = self.base_url.join(path)?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status));
        }

        let body = response.text().await?;
        debug!(path, %body, "APR response");

        Ok(serde_json::from_str::<AprResponse<D>>(&body)?.data)
    }
}

impl ApyFeed for LidoClient {
    async fn current_apr(&self) -> Result<UD128, FeedError> {
        let data: LastApr = self.fetch(CURRENT_APR_PATH).await?;
        num::decimal_from_f64(data.apr).ok_or(FeedError::InvalidValue(data.apr))
    }

    async fn sma_apr(&self) -> Result<UD128, FeedError> {
        let data: SmaApr = self.fetch(SMA_APR_PATH).await?;
        num::decimal_from_f64(data.sma_apr).ok_or(FeedError::InvalidValue(data.sma_apr))
    }
}
