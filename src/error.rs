use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use opentelemetry::trace::TraceContextExt;
use serde_json::json;
use thiserror::Error;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use crate::llm::LlmError;

/// Message returned to callers for every server-side failure. Details stay in the logs.
pub const GENERATION_FAILED: &str = "Failed to generate diagnostic report";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] LlmError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Report generation exceeded {0}s")]
    Timeout(u64),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) | AppError::Parse(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// The message a caller is allowed to see.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            _ => GENERATION_FAILED.to_string(),
        }
    }
}

fn get_trace_id() -> Option<String> {
    let span = Span::current();
    let context = span.context();
    let span_ref = context.span();
    let span_context = span_ref.span_context();

    if span_context.is_valid() {
        Some(span_context.trace_id().to_string())
    } else {
        None
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Validation(msg) => {
                tracing::warn!(error = %msg, "Rejected request");
            }
            AppError::Upstream(e) => {
                tracing::error!(error = %e, error.type = e.kind(), "Upstream error");
            }
            AppError::Parse(msg) => {
                tracing::error!(error = %msg, "Parse error");
            }
            AppError::Timeout(secs) => {
                tracing::error!(timeout_secs = secs, "Report generation timed out");
            }
        }

        let status = self.status();
        let error_message = self.client_message();

        let body = if let Some(trace_id) = get_trace_id() {
            json!({
                "success": false,
                "error": error_message,
                "trace_id": trace_id,
            })
        } else {
            json!({
                "success": false,
                "error": error_message,
            })
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
