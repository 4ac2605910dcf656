//! Provider-facing contract
//!
//! The resilience layer wraps any backend implementing [`ChatCompletion`].
//! Errors implement [`ErrorClass`] so the retry and fallback machinery can
//! classify them without knowing the provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::error::{ErrorClass, ErrorKind};

/// A chat completion request as seen by the resilience layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// User prompt
    pub prompt: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Token cap for the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Optional system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// A completed chat response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Generated text
    pub content: String,
    /// Model that produced the response
    pub model: String,
    /// Total tokens consumed, when the provider reports usage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<u64>,
}

/// Errors a provider backend can surface
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("rate limited by provider{}", retry_after.map(|s| format!(", retry after {s:.1}s")).unwrap_or_default())]
    RateLimited { retry_after: Option<f64> },
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("request timed out after {0:.1}s")]
    Timeout(f64),
    #[error("provider returned error {status}: {message}")]
    Api { status: u16, message: String },
}

impl ErrorClass for LlmError {
    fn error_kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimit,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Api { .. } => ErrorKind::Api,
        }
    }
}

/// A backend capable of serving chat completions
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_map_to_taxonomy() {
        assert_eq!(
            LlmError::RateLimited { retry_after: None }.error_kind(),
            ErrorKind::RateLimit
        );
        assert_eq!(
            LlmError::Connection("refused".into()).error_kind(),
            ErrorKind::Connection
        );
        assert_eq!(LlmError::Timeout(30.0).error_kind(), ErrorKind::Timeout);
        assert_eq!(
            LlmError::Api {
                status: 500,
                message: "oops".into()
            }
            .error_kind(),
            ErrorKind::Api
        );
    }

    #[test]
    fn test_error_display_includes_context() {
        let err = LlmError::RateLimited {
            retry_after: Some(2.5),
        };
        assert!(err.to_string().contains("retry after 2.5s"));
        let err = LlmError::Api {
            status: 503,
            message: "overloaded".into(),
        };
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_request_serialization_skips_unset_fields() {
        let request = ChatCompletionRequest {
            prompt: "hi".into(),
            model: "gpt-4o".into(),
            temperature: None,
            max_tokens: None,
            system_prompt: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("temperature"));
        assert!(!json.contains("system_prompt"));
    }
}
