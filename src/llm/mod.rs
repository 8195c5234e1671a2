pub mod anthropic;
pub mod client;
pub mod pricing;

use thiserror::Error;

pub use client::{LlmClient, RetryPolicy};

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    /// Upper bound on server-side web searches; `None` disables the tool.
    pub web_search_max_uses: Option<u32>,
    pub stage: String,
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub web_search_requests: u32,
    pub cost_usd: f64,
    pub finish_reason: String,
    pub provider: String,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("undecodable provider response: {0}")]
    Decode(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("model returned no text content")]
    EmptyOutput,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::Decode(err.to_string())
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}

impl LlmError {
    /// Stable classification used for span attributes and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            LlmError::Transport(_) => "network_error",
            LlmError::Timeout(_) => "timeout",
            LlmError::Decode(_) => "invalid_response",
            LlmError::EmptyOutput => "empty_output",
            LlmError::Status { status, .. } => match status {
                429 => "rate_limit",
                401 | 403 => "auth_error",
                400 | 404 | 413 | 422 => "invalid_request",
                500..=599 => "server_error",
                _ => "unknown_error",
            },
        }
    }

    /// Only transport-class failures are worth another attempt. A bad request or an
    /// empty answer will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            "network_error" | "timeout" | "rate_limit" | "server_error"
        )
    }
}

#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, req: &GenerateRequest) -> Result<GenerateResponse, LlmError>;
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> LlmError {
        LlmError::Status {
            status: code,
            message: "x".to_string(),
        }
    }

    #[test]
    fn test_kind_categories() {
        let cases = vec![
            (status(429), "rate_limit"),
            (status(401), "auth_error"),
            (status(403), "auth_error"),
            (status(400), "invalid_request"),
            (status(422), "invalid_request"),
            (status(500), "server_error"),
            (status(529), "server_error"),
            (status(302), "unknown_error"),
            (LlmError::Transport("connection reset".into()), "network_error"),
            (LlmError::Timeout(90), "timeout"),
            (LlmError::Decode("eof".into()), "invalid_response"),
            (LlmError::EmptyOutput, "empty_output"),
        ];

        for (err, expected) in cases {
            assert_eq!(err.kind(), expected, "kind of {err:?}");
        }
    }

    #[test]
    fn test_retryable_only_for_transport_class() {
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(LlmError::Transport("dns".into()).is_retryable());
        assert!(LlmError::Timeout(1).is_retryable());

        assert!(!status(400).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!LlmError::EmptyOutput.is_retryable());
        assert!(!LlmError::Decode("bad".into()).is_retryable());
    }
}
