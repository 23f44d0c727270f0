//! # Error Types
//!
//! Structured error types for calc_core. Arithmetic failures inside the
//! calculator never surface here; they live in the calculator state as an
//! [`EngineError`](crate::engine::EngineError). `CalcError` covers the
//! conversion tables and the external collaborators.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::errors::{CalcError, CalcResult};
//!
//! fn parse_amount(input: &str) -> CalcResult<f64> {
//!     input.trim().parse::<f64>().map_err(|_| {
//!         CalcError::invalid_input("amount", input, "Amount must be a number")
//!     })
//! }
//!
//! assert!(parse_amount("12.5").is_ok());
//! assert_eq!(parse_amount("abc").unwrap_err().error_code(), "INVALID_INPUT");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for calc_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for conversion and collaborator operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// An input value is invalid (not a number, out of range, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// Unit category not present in the catalog
    #[error("Unit category not found: {category}")]
    CategoryNotFound { category: String },

    /// Unit not present in the given category
    #[error("Unit '{unit}' not found in category '{category}'")]
    UnitNotFound { category: String, unit: String },

    /// The rate table has no entry for the requested currency
    #[error("Rate for {currency} not available with base {base}")]
    RateUnavailable { currency: String, base: String },

    /// Transport-level failure talking to a collaborator
    #[error("Network error during {operation}: {reason}")]
    NetworkError { operation: String, reason: String },

    /// The collaborator answered, but with a failure
    #[error("{service} error: {message}")]
    ApiError {
        service: String,
        status: Option<u16>,
        message: String,
    },

    /// A collaborator is disabled because it has no credential
    #[error("{service} is not configured")]
    NotConfigured { service: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a CategoryNotFound error
    pub fn category_not_found(category: impl Into<String>) -> Self {
        CalcError::CategoryNotFound {
            category: category.into(),
        }
    }

    /// Create a UnitNotFound error
    pub fn unit_not_found(category: impl Into<String>, unit: impl Into<String>) -> Self {
        CalcError::UnitNotFound {
            category: category.into(),
            unit: unit.into(),
        }
    }

    /// Create a RateUnavailable error
    pub fn rate_unavailable(currency: impl Into<String>, base: impl Into<String>) -> Self {
        CalcError::RateUnavailable {
            currency: currency.into(),
            base: base.into(),
        }
    }

    /// Create a NetworkError
    pub fn network(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::NetworkError {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an ApiError
    pub fn api(service: impl Into<String>, status: Option<u16>, message: impl Into<String>) -> Self {
        CalcError::ApiError {
            service: service.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a NotConfigured error
    pub fn not_configured(service: impl Into<String>) -> Self {
        CalcError::NotConfigured {
            service: service.into(),
        }
    }

    /// Message suitable for showing next to a converter.
    ///
    /// API failures carry the collaborator's own wording, so it is shown
    /// as-is instead of the prefixed `Display` form.
    pub fn user_message(&self) -> String {
        match self {
            CalcError::ApiError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Check if this is a recoverable error (a new attempt may succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::NetworkError { .. } | CalcError::ApiError { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::CategoryNotFound { .. } => "CATEGORY_NOT_FOUND",
            CalcError::UnitNotFound { .. } => "UNIT_NOT_FOUND",
            CalcError::RateUnavailable { .. } => "RATE_UNAVAILABLE",
            CalcError::NetworkError { .. } => "NETWORK_ERROR",
            CalcError::ApiError { .. } => "API_ERROR",
            CalcError::NotConfigured { .. } => "NOT_CONFIGURED",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(err: serde_json::Error) -> Self {
        CalcError::SerializationError {
            reason: err.to_string(),
        }
    }
}
