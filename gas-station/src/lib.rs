use std::{future::Future, time::Duration};

use alloy::primitives::U256;
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::{GasStationError, SerializableReqwestError};

const GWEI: f64 = 1e9;

/// EIP-1559 fee pair in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasFeeQuote {
    pub priority_fee: U256,
    pub max_fee: U256,
}

/// Source of fee suggestions for outgoing transactions.
pub trait GasFeeOracle: Send + Sync {
    fn quote(&self) -> impl Future<Output = Result<GasFeeQuote, GasStationError>> + Send;
}

/// One tier of gas station suggestions, in gwei
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasStationTier {
    pub max_priority_fee: f64,
    pub max_fee: f64,
}

/// Body of a Polygon style gas station reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasStationResponse {
    pub safe_low: GasStationTier,
    #[serde(default)]
    pub standard: GasStationTier,
    #[serde(default)]
    pub fast: GasStationTier,
    #[serde(default)]
    pub estimated_base_fee: f64,
    #[serde(default)]
    pub block_time: u64,
    #[serde(default)]
    pub block_number: u64,
}

impl GasStationResponse {
    /// The safe-low tier converted to wei.
    pub fn safe_low_quote(&self) -> Result<GasFeeQuote, GasStationError> {
        Ok(GasFeeQuote {
            priority_fee: gwei_to_wei("safeLow.maxPriorityFee", self.safe_low.max_priority_fee)?,
            max_fee: gwei_to_wei("safeLow.maxFee", self.safe_low.max_fee)?,
        })
    }
}

/// Scales a gwei float to wei, rounding to the nearest integer.
///
/// The scaled value is rendered in plain decimal and parsed back, so NaN,
/// infinities and negative values are rejected instead of saturating.
pub fn gwei_to_wei(field: &str, gwei: f64) -> Result<U256, GasStationError> {
    let scaled = (gwei * GWEI).round();
    let rendered = format!("{scaled}");
    U256::from_str_radix(&rendered, 10).map_err(|_| GasStationError::invalid_fee(field, gwei))
}

pub struct GasStationClient {
    url: Url,
    timeout: Duration,
    client: reqwest::Client,
}

pub struct GasStationClientBuilder {
    url: Url,
    timeout: Duration,
    client: Option<reqwest::Client>,
}

impl GasStationClientBuilder {
    pub fn new(url: &str) -> Result<Self, GasStationError> {
        Ok(Self {
            url: Url::parse(url).map_err(|e| GasStationError::url(url.to_owned(), e))?,
            timeout: Duration::from_secs(10),
            client: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reuse an existing connection pool instead of creating a new client
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<GasStationClient, GasStationError> {
        let client = match self.client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .build()
                .map_err(GasStationError::http_client_backend)?,
        };

        Ok(GasStationClient {
            url: self.url,
            timeout: self.timeout,
            client,
        })
    }
}

impl GasStationClient {
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub async fn fetch(&self) -> Result<GasStationResponse, GasStationError> {
        let response = self
            .client
            .get(self.url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| {
                tracing::error!(url = %self.url, error = %e, "Gas station request failed");
                SerializableReqwestError::from(e)
            })?;

        let body = response.json::<GasStationResponse>().await.map_err(|e| {
            tracing::error!(url = %self.url, error = %e, "Gas station returned an unreadable body");
            SerializableReqwestError::from(e)
        })?;

        tracing::info!(
            response = %serde_json::to_string(&body).unwrap_or_default(),
            "got from gas station"
        );
        Ok(body)
    }
}

impl GasFeeOracle for GasStationClient {
    async fn quote(&self) -> Result<GasFeeQuote, GasStationError> {
        self.fetch().await?.safe_low_quote()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_gwei_to_wei() {
        assert_eq!(
            gwei_to_wei("f", 30.0).unwrap(),
            U256::from(30_000_000_000u64)
        );
        assert_eq!(
            gwei_to_wei("f", 1.5).unwrap(),
            U256::from(1_500_000_000u64)
        );
        assert_eq!(gwei_to_wei("f", 0.0).unwrap(), U256::ZERO);
    }

    #[test]
    fn rounds_to_nearest_wei() {
        assert_eq!(
            gwei_to_wei("f", 31.3830000006).unwrap(),
            U256::from(31_383_000_001u64)
        );
        assert_eq!(
            gwei_to_wei("f", 0.0000000004).unwrap(),
            U256::ZERO
        );
    }

    #[test]
    fn rejects_non_integer_renderings() {
        assert!(matches!(
            gwei_to_wei("safeLow.maxFee", f64::NAN),
            Err(GasStationError::InvalidFee { ref field, .. }) if field == "safeLow.maxFee"
        ));
        assert!(gwei_to_wei("f", f64::INFINITY).is_err());
        assert!(gwei_to_wei("f", -2.0).is_err());
    }

    #[test]
    fn large_values_stay_exact() {
        assert_eq!(
            gwei_to_wei("f", 1e12).unwrap(),
            U256::from(1_000_000_000_000_000_000_000u128)
        );
    }

    #[test]
    fn builder_rejects_bad_url() {
        assert!(matches!(
            GasStationClientBuilder::new("not a url"),
            Err(GasStationError::UrlParseError { .. })
        ));
    }
}
