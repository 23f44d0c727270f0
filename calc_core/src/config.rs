//! # Application Configuration
//!
//! Settings for the two external collaborators. Everything has a default
//! except the AI credential; without one the AI adapter answers with a fixed
//! "not configured" message instead of calling out.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `GEMINI_API_KEY` (or `API_KEY`) | Gemini credential | unset |
//! | `FLUXCALC_GEMINI_MODEL` | Gemini model id | [`DEFAULT_GEMINI_MODEL`] |
//! | `FLUXCALC_RATE_URL` | Exchange-rate service base URL | [`DEFAULT_RATE_SERVICE_URL`] |
//!
//! The binary loads a `.env` file (via `dotenvy`) before calling
//! [`AppConfig::from_env`].
//!
//! ## Example
//!
//! ```rust
//! use calc_core::config::AppConfig;
//!
//! let config = AppConfig::default();
//! assert!(config.gemini_api_key.is_none());
//! assert!(!config.ai_enabled());
//! ```

use serde::{Deserialize, Serialize};

/// Exchange-rate service; the base currency code is appended to this URL.
pub const DEFAULT_RATE_SERVICE_URL: &str = "https://api.exchangerate-api.com/v4/latest";

/// Gemini REST endpoint prefix.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Low temperature keeps the AI's conversion answers factual.
pub const DEFAULT_AI_TEMPERATURE: f32 = 0.2;

pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_GEMINI_MODEL: &str = "FLUXCALC_GEMINI_MODEL";
pub const ENV_RATE_URL: &str = "FLUXCALC_RATE_URL";

/// Collaborator settings, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gemini credential; `None` disables the AI adapter
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,

    /// Gemini model id
    pub gemini_model: String,

    /// Gemini REST endpoint prefix
    pub gemini_base_url: String,

    /// Sampling temperature for AI answers
    pub ai_temperature: f32,

    /// Exchange-rate service base URL
    pub rate_service_url: String,
}

impl AppConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Blank values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = AppConfig::default();

        AppConfig {
            gemini_api_key: get(ENV_GEMINI_API_KEY).or_else(|| get(ENV_API_KEY)),
            gemini_model: get(ENV_GEMINI_MODEL).unwrap_or(defaults.gemini_model),
            rate_service_url: get(ENV_RATE_URL)
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.rate_service_url),
            ..defaults
        }
    }

    /// Whether the AI adapter has a credential.
    pub fn ai_enabled(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            ai_temperature: DEFAULT_AI_TEMPERATURE,
            rate_service_url: DEFAULT_RATE_SERVICE_URL.to_string(),
        }
    }
}
