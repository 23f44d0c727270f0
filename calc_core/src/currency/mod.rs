//! # Currency Conversion
//!
//! Rates come from an external service, always quoted against the currently
//! selected "from" currency, so a conversion is a single multiply:
//! `amount * rates[to]`.
//!
//! [`CurrencyConverter`] is the converter's state. Its transitions are pure
//! except [`CurrencyConverter::load_rates`], which performs one fetch through
//! a [`RateSource`] and hands the outcome to the pure
//! [`CurrencyConverter::rates_loaded`].
//!
//! ## Failure Handling
//!
//! A failed fetch never propagates: the converter installs a one-entry table
//! (`{base: 1}`), keeps the message in `fetch_error`, and keeps working for
//! same-currency conversions. Until a fetch succeeds, `error` reports the
//! fetch failure rather than any conversion problem it causes.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::currency::{convert_amount, ExchangeRates};
//!
//! let mut rates = ExchangeRates::new();
//! rates.insert("USD".to_string(), 1.0);
//! rates.insert("EUR".to_string(), 0.5);
//!
//! assert_eq!(convert_amount(&rates, "USD", "EUR", 10.0).unwrap(), 5.0);
//! assert!(convert_amount(&rates, "USD", "JPY", 10.0).is_err());
//! ```

pub mod service;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{CalcError, CalcResult};
use crate::numeric::format_grouped;

pub use service::HttpRateSource;

/// Currency code → rate relative to the fetched base.
pub type ExchangeRates = BTreeMap<String, f64>;

/// Intermediate currency for the fallback lookup.
pub const USD: &str = "USD";

/// Converted amounts always show exactly this many fractional digits.
pub const AMOUNT_FRACTION_DIGITS: usize = 2;

pub const DEFAULT_FROM_CURRENCY: &str = "USD";
pub const DEFAULT_TO_CURRENCY: &str = "EUR";

/// A currency code with a display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    pub code: String,
    pub name: String,
}

impl Currency {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Currency {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Currencies offered before any rates have been fetched.
pub static INITIAL_CURRENCIES: Lazy<Vec<Currency>> = Lazy::new(|| {
    [
        ("USD", "US Dollar"),
        ("EUR", "Euro"),
        ("JPY", "Japanese Yen"),
        ("GBP", "British Pound"),
        ("AUD", "Australian Dollar"),
        ("CAD", "Canadian Dollar"),
        ("CHF", "Swiss Franc"),
        ("CNY", "Chinese Yuan"),
        ("INR", "Indian Rupee"),
        ("BRL", "Brazilian Real"),
    ]
    .iter()
    .map(|(code, name)| Currency::new(*code, *name))
    .collect()
});

/// Display name from the catalog, if the code is known.
pub fn currency_name(code: &str) -> Option<&'static str> {
    INITIAL_CURRENCIES
        .iter()
        .find(|c| c.code == code)
        .map(|c| c.name.as_str())
}

/// Currencies present in a rate table, named from the catalog where
/// possible, sorted by code.
pub fn currency_list(rates: &ExchangeRates) -> Vec<Currency> {
    // BTreeMap keys are already sorted
    rates
        .keys()
        .map(|code| {
            let name = currency_name(code).map(str::to_string).unwrap_or_else(|| code.clone());
            Currency::new(code.clone(), name)
        })
        .collect()
}

/// Result of one successful rate fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// Currency the rates are quoted against
    pub base: String,
    pub rates: ExchangeRates,
    pub currencies: Vec<Currency>,
    /// When the provider last refreshed its rates, if it says
    pub updated_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

impl RateSnapshot {
    /// Build a snapshot, deriving the currency list from the table.
    pub fn new(base: impl Into<String>, rates: ExchangeRates) -> Self {
        let currencies = currency_list(&rates);
        RateSnapshot {
            base: base.into(),
            rates,
            currencies,
            updated_at: None,
            fetched_at: Utc::now(),
        }
    }
}

/// Something that can produce a rate table for a base currency.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rates(&self, base: &str) -> CalcResult<RateSnapshot>;
}

/// Convert `amount` of `from` into `to` using a table quoted against `from`.
pub fn convert_amount(rates: &ExchangeRates, from: &str, to: &str, amount: f64) -> CalcResult<f64> {
    let rate = rates
        .get(to)
        .copied()
        .or_else(|| usd_bridge_rate(rates, from, to))
        .ok_or_else(|| CalcError::rate_unavailable(to, from))?;
    Ok(amount * rate)
}

/// USD-intermediate lookup for a target the table does not list directly.
///
/// The table is quoted against the fetched base rather than USD, so a USD
/// entry cannot bridge to a currency the table lacks: the lookup only ever
/// succeeds when the target is present after all.
fn usd_bridge_rate(rates: &ExchangeRates, from: &str, to: &str) -> Option<f64> {
    if from == USD {
        return None;
    }
    rates.get(USD)?;
    rates.get(to).copied()
}

/// State of the currency converter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyConverter {
    pub from_currency: String,
    pub to_currency: String,
    pub input_value: String,
    pub output_value: String,
    /// `None` until the first fetch completes
    pub rates: Option<ExchangeRates>,
    pub available_currencies: Vec<Currency>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// Message from the last failed fetch; cleared by a successful one
    #[serde(default)]
    pub fetch_error: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CurrencyConverter {
    /// USD → EUR, amount "1", waiting for the first fetch.
    pub fn new() -> Self {
        CurrencyConverter {
            from_currency: DEFAULT_FROM_CURRENCY.to_string(),
            to_currency: DEFAULT_TO_CURRENCY.to_string(),
            input_value: "1".to_string(),
            output_value: String::new(),
            rates: None,
            available_currencies: INITIAL_CURRENCIES.clone(),
            is_loading: true,
            error: None,
            fetch_error: None,
            fetched_at: None,
        }
    }

    /// Fetch rates for the current base and apply the outcome.
    pub async fn load_rates(&self, source: &dyn RateSource) -> Self {
        let loading = CurrencyConverter {
            is_loading: true,
            error: None,
            ..self.clone()
        };
        let base = loading.from_currency.clone();
        debug!(base = %base, "loading exchange rates");
        let result = source.fetch_rates(&base).await;
        loading.rates_loaded(&base, result)
    }

    /// Apply the outcome of a fetch for `base`.
    ///
    /// On success the table and currency list are replaced wholesale, and a
    /// target currency missing from the new list is swapped for the first
    /// one that differs from the base. On failure the table degrades to
    /// `{base: 1}` and the message is kept in `error`.
    pub fn rates_loaded(&self, base: &str, result: CalcResult<RateSnapshot>) -> Self {
        let mut next = CurrencyConverter {
            is_loading: false,
            ..self.clone()
        };

        match result {
            Ok(snapshot) => {
                let has_target = snapshot.currencies.iter().any(|c| c.code == next.to_currency);
                if !has_target && snapshot.currencies.len() > 1 {
                    if let Some(substitute) = snapshot
                        .currencies
                        .iter()
                        .find(|c| c.code != base)
                        .or_else(|| snapshot.currencies.first())
                    {
                        next.to_currency = substitute.code.clone();
                    }
                }
                next.rates = Some(snapshot.rates);
                next.available_currencies = snapshot.currencies;
                next.fetched_at = Some(snapshot.fetched_at);
                next.fetch_error = None;
                next.error = None;
            }
            Err(err) => {
                warn!(base = %base, error = %err, "exchange rate fetch failed, using unit rate table");
                let mut fallback = ExchangeRates::new();
                fallback.insert(base.to_string(), 1.0);
                next.rates = Some(fallback);
                next.fetch_error = Some(err.user_message());
            }
        }

        next.converted()
    }

    /// Change the base currency. Rates must be reloaded afterwards.
    pub fn set_from_currency(&self, code: &str) -> Self {
        CurrencyConverter {
            from_currency: code.trim().to_uppercase(),
            is_loading: true,
            ..self.clone()
        }
    }

    pub fn set_to_currency(&self, code: &str) -> Self {
        CurrencyConverter {
            to_currency: code.trim().to_uppercase(),
            ..self.clone()
        }
        .converted()
    }

    pub fn set_input(&self, text: &str) -> Self {
        CurrencyConverter {
            input_value: text.to_string(),
            ..self.clone()
        }
        .converted()
    }

    /// Exchange the two selections.
    ///
    /// The base changed, so rates must be reloaded; the output is
    /// recomputed once they arrive.
    pub fn swap(&self) -> Self {
        CurrencyConverter {
            from_currency: self.to_currency.clone(),
            to_currency: self.from_currency.clone(),
            is_loading: true,
            ..self.clone()
        }
    }

    /// Recompute `output_value` from the current rates and input.
    pub fn converted(mut self) -> Self {
        let rates = match &self.rates {
            Some(rates) => rates,
            None => {
                self.output_value.clear();
                return self;
            }
        };

        let amount = match self.input_value.trim().parse::<f64>() {
            Ok(amount) if amount.is_finite() => amount,
            _ => {
                self.output_value.clear();
                return self;
            }
        };

        match convert_amount(rates, &self.from_currency, &self.to_currency, amount) {
            Ok(value) => {
                self.output_value = format_grouped(value, AMOUNT_FRACTION_DIGITS, AMOUNT_FRACTION_DIGITS);
                self.error = self.fetch_error.clone();
            }
            Err(err) => {
                self.output_value.clear();
                self.error = Some(
                    self.fetch_error
                        .clone()
                        .unwrap_or_else(|| format!("{}. Try another pair or use AI.", err)),
                );
            }
        }
        self
    }
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        CurrencyConverter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usd_rates() -> ExchangeRates {
        [("USD", 1.0), ("EUR", 0.9), ("JPY", 150.0), ("GBP", 0.8)]
            .iter()
            .map(|(c, r)| (c.to_string(), *r))
            .collect()
    }

    struct FixedSource(CalcResult<ExchangeRates>);

    #[async_trait]
    impl RateSource for FixedSource {
        async fn fetch_rates(&self, base: &str) -> CalcResult<RateSnapshot> {
            self.0.clone().map(|rates| RateSnapshot::new(base, rates))
        }
    }

    #[test]
    fn test_currency_list_uses_catalog_names() {
        let mut rates = usd_rates();
        rates.insert("XAU".to_string(), 0.0004);
        let list = currency_list(&rates);
        let codes: Vec<_> = list.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["EUR", "GBP", "JPY", "USD", "XAU"]);
        assert_eq!(list[0].name, "Euro");
        assert_eq!(list[4].name, "XAU");
    }

    #[test]
    fn test_convert_amount() {
        assert_eq!(convert_amount(&usd_rates(), "USD", "JPY", 2.0).unwrap(), 300.0);
        let err = convert_amount(&usd_rates(), "USD", "CHF", 2.0).unwrap_err();
        assert_eq!(err.error_code(), "RATE_UNAVAILABLE");
    }

    #[test]
    fn test_usd_bridge_needs_target_rate() {
        let mut eur_rates = ExchangeRates::new();
        eur_rates.insert("EUR".to_string(), 1.0);
        eur_rates.insert("USD".to_string(), 1.1);
        assert!(usd_bridge_rate(&eur_rates, "EUR", "CHF").is_none());
        assert!(usd_bridge_rate(&eur_rates, "USD", "EUR").is_none());
        assert_eq!(usd_bridge_rate(&eur_rates, "EUR", "USD"), Some(1.1));
    }

    #[test]
    fn test_initial_state() {
        let conv = CurrencyConverter::new();
        assert_eq!(conv.from_currency, "USD");
        assert_eq!(conv.to_currency, "EUR");
        assert!(conv.is_loading);
        assert!(conv.rates.is_none());
        assert_eq!(conv.available_currencies.len(), 10);
        assert_eq!(conv.converted().output_value, "");
    }

    #[test]
    fn test_successful_load_converts() {
        let conv = CurrencyConverter::new()
            .rates_loaded("USD", Ok(RateSnapshot::new("USD", usd_rates())))
            .set_input("100");
        assert!(!conv.is_loading);
        assert!(conv.error.is_none());
        assert_eq!(conv.output_value, "90.00");
        assert_eq!(conv.available_currencies.len(), 4);
        assert!(conv.fetched_at.is_some());
    }

    #[test]
    fn test_two_fraction_digits_with_grouping() {
        let conv = CurrencyConverter::new()
            .rates_loaded("USD", Ok(RateSnapshot::new("USD", usd_rates())))
            .set_to_currency("jpy")
            .set_input("12.5");
        assert_eq!(conv.to_currency, "JPY");
        assert_eq!(conv.output_value, "1,875.00");
    }

    #[test]
    fn test_missing_target_is_substituted() {
        let conv = CurrencyConverter::new().set_to_currency("CHF");
        let conv = conv.rates_loaded("USD", Ok(RateSnapshot::new("USD", usd_rates())));
        // first currency in code order other than the base
        assert_eq!(conv.to_currency, "EUR");
        assert_eq!(conv.output_value, "0.90");
    }

    #[test]
    fn test_fetch_failure_degrades() {
        let failure = Err(CalcError::network("exchange rate fetch", "connection refused"));
        let conv = CurrencyConverter::new().rates_loaded("USD", failure);

        let mut expected = ExchangeRates::new();
        expected.insert("USD".to_string(), 1.0);
        assert_eq!(conv.rates, Some(expected));
        assert_eq!(
            conv.error.as_deref(),
            Some("Network error during exchange rate fetch: connection refused")
        );
        assert_eq!(conv.output_value, "");
        assert!(!conv.is_loading);

        let same = conv.set_to_currency("USD").set_input("3");
        assert_eq!(same.output_value, "3.00");
        assert_eq!(same.error, conv.error);
    }

    #[test]
    fn test_fetch_failure_same_currency_keeps_error() {
        let failure = Err(CalcError::network("exchange rate fetch", "timed out"));
        let conv = CurrencyConverter::new().set_to_currency("USD").rates_loaded("USD", failure);
        assert_eq!(conv.output_value, "1.00");
        assert_eq!(conv.fetch_error.as_deref(), Some("Network error during exchange rate fetch: timed out"));
        assert_eq!(conv.error, conv.fetch_error);
    }

    #[test]
    fn test_successful_reload_clears_fetch_error() {
        let failure = Err(CalcError::api("Exchange rate service", Some(503), "Failed to fetch exchange rates: 503"));
        let conv = CurrencyConverter::new()
            .rates_loaded("USD", failure)
            .rates_loaded("USD", Ok(RateSnapshot::new("USD", usd_rates())));
        assert!(conv.fetch_error.is_none());
        assert!(conv.error.is_none());
        assert_eq!(conv.output_value, "0.90");
    }

    #[test]
    fn test_unavailable_rate_message() {
        let mut rates = ExchangeRates::new();
        rates.insert("GBP".to_string(), 1.0);
        rates.insert("USD".to_string(), 1.27);
        let conv = CurrencyConverter::new()
            .set_from_currency("GBP")
            .rates_loaded("GBP", Ok(RateSnapshot::new("GBP", rates)))
            .set_to_currency("INR");
        assert_eq!(conv.output_value, "");
        assert_eq!(
            conv.error.as_deref(),
            Some("Rate for INR not available with base GBP. Try another pair or use AI.")
        );
    }

    #[test]
    fn test_invalid_amount_blanks_output() {
        let conv = CurrencyConverter::new()
            .rates_loaded("USD", Ok(RateSnapshot::new("USD", usd_rates())))
            .set_input("abc");
        assert_eq!(conv.output_value, "");
        assert_eq!(conv.set_input("").output_value, "");
    }

    #[test]
    fn test_swap_requires_reload() {
        let conv = CurrencyConverter::new()
            .rates_loaded("USD", Ok(RateSnapshot::new("USD", usd_rates())))
            .swap();
        assert_eq!(conv.from_currency, "EUR");
        assert_eq!(conv.to_currency, "USD");
        assert!(conv.is_loading);
    }

    #[tokio::test]
    async fn test_load_rates_success() {
        let source = FixedSource(Ok(usd_rates()));
        let conv = CurrencyConverter::new().load_rates(&source).await;
        assert!(!conv.is_loading);
        assert_eq!(conv.output_value, "0.90");
    }

    #[tokio::test]
    async fn test_load_rates_failure() {
        let source = FixedSource(Err(CalcError::api("Exchange rate service", Some(404), "unsupported-code")));
        let conv = CurrencyConverter::new().set_from_currency("XYZ").load_rates(&source).await;
        assert_eq!(conv.error.as_deref(), Some("unsupported-code"));
        assert_eq!(conv.fetch_error.as_deref(), Some("unsupported-code"));
        assert_eq!(conv.output_value, "");
        assert_eq!(conv.rates.as_ref().and_then(|r| r.get("XYZ")), Some(&1.0));
    }
}
