//! # AI Currency Assistant
//!
//! Forwards free-text currency questions ("50 euros in yen?") to Gemini and
//! returns the cleaned answer. This adapter never fails: every problem is
//! turned into a readable message, since the answer is only ever shown to a
//! person.
//!
//! No retries, no caching, and the numeric answer is not validated.
//!
//! ## Example
//!
//! ```rust
//! use calc_core::ai::{build_prompt, strip_code_fence};
//!
//! assert!(build_prompt("10 USD to EUR").contains("Query: \"10 USD to EUR\""));
//! assert_eq!(strip_code_fence("```\n9.21 EUR\n```"), "9.21 EUR");
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::errors::{CalcError, CalcResult};

/// Service name used in error values.
pub const AI_SERVICE: &str = "Gemini API";

pub const NOT_CONFIGURED_MESSAGE: &str =
    "Gemini API not configured. Please set GEMINI_API_KEY (or API_KEY) in the environment.";

pub const EMPTY_RESPONSE_MESSAGE: &str = "Could not get a response from AI.";

pub const INVALID_KEY_MESSAGE: &str =
    "Gemini API Error: The API key is not valid. Please check your configuration.";

/// A whole response wrapped in a fenced code block, optionally tagged.
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(\w*)?\s*\n?(.*?)\n?\s*```$").expect("valid regex"));

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// Gemini text-generation client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: f32,
}

impl GeminiClient {
    /// Client using the collaborator settings from `config`.
    ///
    /// A missing credential is not an error here; the client simply
    /// answers with [`NOT_CONFIGURED_MESSAGE`].
    pub fn new(config: &AppConfig) -> CalcResult<Self> {
        if !config.ai_enabled() {
            warn!("Gemini API key not found; AI features are disabled");
        }

        let client = Client::builder()
            .build()
            .map_err(|e| CalcError::network("HTTP client setup", e.to_string()))?;

        Ok(GeminiClient {
            client,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            temperature: config.ai_temperature,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }

    /// Ask a currency-conversion question and return the answer text.
    ///
    /// Blank queries return an empty string without calling out.
    pub async fn ask_currency_question(&self, query: &str) -> String {
        if query.trim().is_empty() {
            return String::new();
        }
        let api_key = match &self.api_key {
            Some(key) => key,
            None => return NOT_CONFIGURED_MESSAGE.to_string(),
        };

        match self.generate(&build_prompt(query), api_key).await {
            Ok(raw) => finalize_answer(&raw),
            Err(err) => {
                warn!(error = %err, "Gemini request failed");
                describe_failure(&err)
            }
        }
    }

    async fn generate(&self, prompt: &str, api_key: &str) -> CalcResult<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let url = self.endpoint();
        debug!(url = %url, model = %self.model, "sending Gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CalcError::network("Gemini request", e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| CalcError::network("Gemini request", e.to_string()))?;

        debug!(status = status.as_u16(), "Gemini response");
        parse_generate_response(status.as_u16(), &body)
    }
}

/// Fixed instruction wrapped around the user's query.
pub fn build_prompt(query: &str) -> String {
    format!(
        "You are a helpful currency converter. Answer the following currency conversion query as concisely \
         as possible, providing only the numerical result or a short sentence with the result if a direct \
         number isn't suitable. Query: \"{}\"",
        query
    )
}

/// Extract the answer text from a `generateContent` response.
pub fn parse_generate_response(status: u16, body: &str) -> CalcResult<String> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|e| e.error.message)
            .ok()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {}", status));
        return Err(CalcError::api(AI_SERVICE, Some(status), message));
    }

    let parsed: GenerateResponse = serde_json::from_str(body)?;
    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    Ok(text)
}

/// Remove a fenced code block wrapping the whole text.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    match CODE_FENCE.captures(trimmed).and_then(|c| c.get(2)) {
        Some(inner) if !inner.as_str().trim().is_empty() => inner.as_str().trim().to_string(),
        _ => trimmed.to_string(),
    }
}

/// Cleaned answer, or [`EMPTY_RESPONSE_MESSAGE`] when nothing is left.
pub fn finalize_answer(raw: &str) -> String {
    let text = strip_code_fence(raw);
    if text.is_empty() {
        EMPTY_RESPONSE_MESSAGE.to_string()
    } else {
        text
    }
}

/// Readable message for a failed request.
pub fn describe_failure(err: &CalcError) -> String {
    let message = err.user_message();
    if message.contains("API key not valid") {
        INVALID_KEY_MESSAGE.to_string()
    } else {
        format!("Gemini API Error: {}", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_wraps_query() {
        let prompt = build_prompt("100 GBP in USD");
        assert!(prompt.starts_with("You are a helpful currency converter."));
        assert!(prompt.ends_with("Query: \"100 GBP in USD\""));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```text\n92.10 EUR\n```"), "92.10 EUR");
        assert_eq!(strip_code_fence("```\n92.10 EUR```"), "92.10 EUR");
        assert_eq!(strip_code_fence("  92.10 EUR  "), "92.10 EUR");
        assert_eq!(strip_code_fence("use ``` carefully"), "use ``` carefully");
    }

    #[test]
    fn test_finalize_empty() {
        assert_eq!(finalize_answer("   "), EMPTY_RESPONSE_MESSAGE);
        assert_eq!(finalize_answer("≈ 15,720 JPY"), "≈ 15,720 JPY");
    }

    #[test]
    fn test_parse_generate_response() {
        let body = r#"{
            "candidates": [
                { "content": { "role": "model", "parts": [ { "text": "```\n" }, { "text": "9.2 EUR\n```" } ] } }
            ]
        }"#;
        let raw = parse_generate_response(200, body).unwrap();
        assert_eq!(finalize_answer(&raw), "9.2 EUR");

        assert_eq!(parse_generate_response(200, r#"{ "candidates": [] }"#).unwrap(), "");
    }

    #[test]
    fn test_invalid_key_message() {
        let body = r#"{ "error": { "code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT" } }"#;
        let err = parse_generate_response(400, body).unwrap_err();
        assert_eq!(describe_failure(&err), INVALID_KEY_MESSAGE);
    }

    #[test]
    fn test_generic_failure_message() {
        let err = parse_generate_response(500, "oops").unwrap_err();
        assert_eq!(describe_failure(&err), "Gemini API Error: HTTP 500");

        let net = CalcError::network("Gemini request", "dns error");
        assert_eq!(describe_failure(&net), "Gemini API Error: Network error during Gemini request: dns error");
    }

    #[tokio::test]
    async fn test_unconfigured_client_does_not_call_out() {
        let client = GeminiClient::new(&AppConfig::default()).unwrap();
        assert!(!client.is_configured());
        assert_eq!(client.ask_currency_question("1 USD to EUR").await, NOT_CONFIGURED_MESSAGE);
        assert_eq!(client.ask_currency_question("   ").await, "");
    }

    #[test]
    fn test_endpoint() {
        let config = AppConfig {
            gemini_api_key: Some("k".to_string()),
            ..AppConfig::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        assert!(client.endpoint().ends_with("/gemini-2.5-flash:generateContent"));
    }
}
