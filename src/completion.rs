//! Completion client for the external text-generation service.
//!
//! Defines the [`CompletionBackend`] seam and the concrete [`GeminiBackend`]
//! that calls Google's `generateContent` REST endpoint. The backend is only
//! constructed when the API key is present in the environment; without it the
//! front door reports the chat feature as not configured and performs no
//! network I/O.
//!
//! # Failure Modes
//!
//! Each external-call failure is classified into a [`CompletionError`]
//! variant — timeout, transport, provider-side HTTP error, unusable response
//! body. The front door maps every variant to the same generic user-facing
//! message; the variant detail exists for operator logs only.
//!
//! There is no retry, no streaming, and no timeout beyond the transport's
//! own default: a hung provider call holds exactly one request open.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::CompletionConfig;

/// Public Gemini API root.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Why a completion call failed. Operator-facing; never sent to clients.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion request timed out")]
    Timeout,

    #[error("completion transport failure: {0}")]
    Transport(String),

    #[error("completion provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("completion response was unusable: {0}")]
    InvalidResponse(String),
}

/// A text-in, text-out completion service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Provider model identifier (for health output and logs).
    fn model(&self) -> &str;

    /// Send one prompt and return the complete text answer.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

// ============ Gemini Backend ============

/// Backend for the Gemini `generateContent` endpoint.
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiBackend {
    /// Create a backend against an explicit API root. Tests point this at a
    /// local stand-in server.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Construct the backend from configuration, reading the API key from
    /// the configured environment variable. Returns `None` when the key is
    /// absent or empty — the caller degrades chat instead of failing.
    pub fn from_env(config: &CompletionConfig) -> Option<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())?;
        Some(Self::new(GEMINI_BASE_URL, config.model.clone(), api_key))
    }

    fn generate_url(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

/// Gemini `generateContent` request body.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

/// Gemini `generateContent` response body (the fields we consume).
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Concatenate every text part of every candidate, in order.
fn collect_text(response: GenerateResponse) -> String {
    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .filter_map(|p| p.text)
        .collect()
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.generate_url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout
                } else {
                    CompletionError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let text = collect_text(parsed);
        if text.is_empty() {
            return Err(CompletionError::InvalidResponse(
                "no text in any candidate".to_string(),
            ));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_requires_key() {
        let config = CompletionConfig {
            model: "gemini-2.0-flash-exp".to_string(),
            api_key_env: "SAHAYAKA_TEST_KEY_ABSENT".to_string(),
        };
        std::env::remove_var("SAHAYAKA_TEST_KEY_ABSENT");
        assert!(GeminiBackend::from_env(&config).is_none());

        let config = CompletionConfig {
            api_key_env: "SAHAYAKA_TEST_KEY_PRESENT".to_string(),
            ..config
        };
        std::env::set_var("SAHAYAKA_TEST_KEY_PRESENT", "k-123");
        let backend = GeminiBackend::from_env(&config).unwrap();
        assert_eq!(backend.model(), "gemini-2.0-flash-exp");
        std::env::remove_var("SAHAYAKA_TEST_KEY_PRESENT");
    }

    #[test]
    fn empty_env_key_counts_as_absent() {
        let config = CompletionConfig {
            model: "gemini-2.0-flash-exp".to_string(),
            api_key_env: "SAHAYAKA_TEST_KEY_EMPTY".to_string(),
        };
        std::env::set_var("SAHAYAKA_TEST_KEY_EMPTY", "");
        assert!(GeminiBackend::from_env(&config).is_none());
        std::env::remove_var("SAHAYAKA_TEST_KEY_EMPTY");
    }

    #[test]
    fn collect_text_joins_parts_in_order() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "Hello "}, {"text": "farmer"}]}}
            ]
        }"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(collect_text(response), "Hello farmer");
    }

    #[test]
    fn collect_text_tolerates_missing_fields() {
        let json = r#"{"candidates": [{"content": null}, {"content": {"parts": [{}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(collect_text(response), "");
    }

    #[test]
    fn empty_candidates_yield_empty_text() {
        let response: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(collect_text(response), "");
    }

    #[test]
    fn request_body_shape_matches_api() {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: "hi" }],
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"contents": [{"parts": [{"text": "hi"}]}]})
        );
    }
}
