//! Spot price feed client.
//!
//! Fetches the live USD price of one troy ounce of gold from a configurable
//! upstream provider. Two access paths with different freshness guarantees:
//!
//! - [`SpotClient::latest`] serves the display path (product listings, the
//!   ticker) from a short-TTL `moka` cache.
//! - [`SpotClient::fresh`] serves the checkout path and always hits the
//!   upstream: a payable total is never computed from a cached price.
//!
//! A non-positive or non-finite price, an upstream error payload, or any
//! transport failure all mean "treat as unavailable". No retry: a failed
//! fetch surfaces as an immediate checkout failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::{SpotFeedConfig, SpotProvider};

/// Display-path cache TTL. Matches the ticker refresh cadence.
const CACHE_TTL: Duration = Duration::from_secs(15);

/// Errors that can occur when fetching the spot price.
#[derive(Debug, Error)]
pub enum SpotError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-success status.
    #[error("Upstream {0}")]
    Upstream(u16),

    /// Response body did not match the provider's shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The feed answered but the price is not usable.
    #[error("Unusable price: {0}")]
    Unusable(String),
}

/// A usable spot price from the feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotPrice {
    /// USD per troy ounce; always finite and positive.
    pub usd_per_oz: f64,
    /// When the upstream says the price was observed.
    pub updated_at: DateTime<Utc>,
    /// Which provider supplied it.
    pub provider: SpotProvider,
}

/// Client for the spot price feed.
#[derive(Clone)]
pub struct SpotClient {
    inner: Arc<SpotClientInner>,
}

struct SpotClientInner {
    client: reqwest::Client,
    config: SpotFeedConfig,
    cache: Cache<(), SpotPrice>,
}

/// goldapi.io response body.
#[derive(Debug, Deserialize)]
struct GoldApiResponse {
    price: Option<f64>,
    timestamp: Option<i64>,
}

/// metals-api.com response body.
#[derive(Debug, Deserialize)]
struct MetalsApiResponse {
    rates: Option<MetalsApiRates>,
    timestamp: Option<i64>,
    error: Option<MetalsApiError>,
}

#[derive(Debug, Deserialize)]
struct MetalsApiRates {
    #[serde(rename = "USD")]
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MetalsApiError {
    info: Option<String>,
}

impl SpotClient {
    /// Create a new spot feed client.
    #[must_use]
    pub fn new(config: &SpotFeedConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(CACHE_TTL)
            .build();

        Self {
            inner: Arc::new(SpotClientInner {
                client: reqwest::Client::new(),
                config: config.clone(),
                cache,
            }),
        }
    }

    /// Get a spot price for display, cached for a short TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache is cold and the upstream fetch fails.
    #[instrument(skip(self))]
    pub async fn latest(&self) -> Result<SpotPrice, SpotError> {
        if let Some(price) = self.inner.cache.get(&()).await {
            debug!("Cache hit for spot price");
            return Ok(price);
        }

        let price = self.fresh().await?;
        self.inner.cache.insert((), price).await;
        Ok(price)
    }

    /// Fetch a fresh spot price, bypassing the cache.
    ///
    /// The checkout path always uses this: the charge amount must be derived
    /// from a live price, never a cached one.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, an upstream error status, an
    /// unparseable body, or a non-positive price.
    #[instrument(skip(self), fields(provider = %self.inner.config.provider))]
    pub async fn fresh(&self) -> Result<SpotPrice, SpotError> {
        let (usd_per_oz, timestamp) = match self.inner.config.provider {
            SpotProvider::GoldApi => self.fetch_goldapi().await?,
            SpotProvider::MetalsApi => self.fetch_metalsapi().await?,
        };

        if !usd_per_oz.is_finite() || usd_per_oz <= 0.0 {
            return Err(SpotError::Unusable(format!(
                "provider returned {usd_per_oz}"
            )));
        }

        let updated_at = timestamp
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or_else(Utc::now);

        Ok(SpotPrice {
            usd_per_oz,
            updated_at,
            provider: self.inner.config.provider,
        })
    }

    async fn fetch_goldapi(&self) -> Result<(f64, Option<i64>), SpotError> {
        let response = self
            .inner
            .client
            .get(&self.inner.config.url)
            .header("x-access-token", self.inner.config.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpotError::Upstream(status.as_u16()));
        }

        let body: GoldApiResponse = response
            .json()
            .await
            .map_err(|e| SpotError::Parse(e.to_string()))?;

        let price = body
            .price
            .ok_or_else(|| SpotError::Parse("missing price field".to_string()))?;
        Ok((price, body.timestamp))
    }

    async fn fetch_metalsapi(&self) -> Result<(f64, Option<i64>), SpotError> {
        let response = self
            .inner
            .client
            .get(&self.inner.config.url)
            .query(&[
                ("base", "XAU"),
                ("symbols", "USD"),
                ("access_key", self.inner.config.api_key.expose_secret()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpotError::Upstream(status.as_u16()));
        }

        let body: MetalsApiResponse = response
            .json()
            .await
            .map_err(|e| SpotError::Parse(e.to_string()))?;

        if let Some(error) = body.error {
            return Err(SpotError::Unusable(
                error.info.unwrap_or_else(|| "provider error".to_string()),
            ));
        }

        let price = body
            .rates
            .and_then(|r| r.usd)
            .ok_or_else(|| SpotError::Parse("missing rates.USD field".to_string()))?;
        Ok((price, body.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spot_error_display() {
        assert_eq!(SpotError::Upstream(503).to_string(), "Upstream 503");
        assert_eq!(
            SpotError::Unusable("provider returned 0".to_string()).to_string(),
            "Unusable price: provider returned 0"
        );
    }

    #[test]
    fn test_goldapi_body_parses() {
        let body: GoldApiResponse =
            serde_json::from_str(r#"{"price": 2012.35, "timestamp": 1766000000}"#)
                .expect("parse");
        assert!((body.price.expect("price") - 2012.35).abs() < f64::EPSILON);
        assert_eq!(body.timestamp, Some(1_766_000_000));
    }

    #[test]
    fn test_metalsapi_body_parses() {
        let body: MetalsApiResponse = serde_json::from_str(
            r#"{"rates": {"USD": 2012.35}, "timestamp": 1766000000}"#,
        )
        .expect("parse");
        let usd = body.rates.and_then(|r| r.usd).expect("rate");
        assert!((usd - 2012.35).abs() < f64::EPSILON);
    }

    #[test]
    fn test_metalsapi_error_body_parses() {
        let body: MetalsApiResponse =
            serde_json::from_str(r#"{"error": {"info": "invalid access key"}}"#).expect("parse");
        assert_eq!(
            body.error.and_then(|e| e.info).as_deref(),
            Some("invalid access key")
        );
    }
}
