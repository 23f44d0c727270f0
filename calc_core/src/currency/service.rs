//! Exchange-rate service client.
//!
//! `GET <rate-service>/<BASE>` answers `{ "rates": { "EUR": 0.92, ... } }`.
//! Failures carry an `error_type` field in the body when the service can
//! say what went wrong.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{ExchangeRates, RateSnapshot, RateSource};
use crate::config::AppConfig;
use crate::errors::{CalcError, CalcResult};

/// Service name used in error values.
pub const RATE_SERVICE: &str = "Exchange rate service";

/// Current crate version, sent as part of the user agent.
const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Deserialize)]
struct RatesResponse {
    rates: ExchangeRates,
    #[serde(default)]
    time_last_updated: Option<i64>,
}

#[derive(Deserialize)]
struct RatesErrorBody {
    #[serde(default)]
    error_type: Option<String>,
}

/// [`RateSource`] backed by the HTTP exchange-rate service.
#[derive(Debug, Clone)]
pub struct HttpRateSource {
    client: Client,
    base_url: String,
}

impl HttpRateSource {
    /// Client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> CalcResult<Self> {
        let client = Client::builder()
            .user_agent(format!("FluxCalc/{}", CURRENT_VERSION))
            .build()
            .map_err(|e| CalcError::network("HTTP client setup", e.to_string()))?;

        Ok(HttpRateSource {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &AppConfig) -> CalcResult<Self> {
        Self::new(config.rate_service_url.clone())
    }

    /// URL of the rate table for `base`.
    pub fn rates_url(&self, base: &str) -> String {
        format!("{}/{}", self.base_url, base)
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn fetch_rates(&self, base: &str) -> CalcResult<RateSnapshot> {
        let url = self.rates_url(base);
        debug!(url = %url, "fetching exchange rates");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CalcError::network("exchange rate fetch", e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CalcError::network("exchange rate fetch", e.to_string()))?;

        debug!(status = status.as_u16(), bytes = body.len(), "exchange rate response");
        parse_rates_response(base, status.as_u16(), &body)
    }
}

/// Interpret a rate-service response.
///
/// Non-2xx statuses become an `ApiError` whose message is the body's
/// `error_type` when present.
pub fn parse_rates_response(base: &str, status: u16, body: &str) -> CalcResult<RateSnapshot> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<RatesErrorBody>(body)
            .ok()
            .and_then(|b| b.error_type)
            .unwrap_or_else(|| format!("Failed to fetch exchange rates: {}", status));
        warn!(status, message = %message, "exchange rate service returned an error");
        return Err(CalcError::api(RATE_SERVICE, Some(status), message));
    }

    let parsed: RatesResponse = serde_json::from_str(body)?;
    let mut snapshot = RateSnapshot::new(base, parsed.rates);
    snapshot.updated_at = parsed
        .time_last_updated
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
    Ok(snapshot)
}
