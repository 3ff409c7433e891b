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

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),
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
        let (status, error_message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Upstream(msg) => {
                tracing::error!(error = %msg, "Upstream error");
                (
                    StatusCode::BAD_GATEWAY,
                    "Upstream service unavailable".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!(error = %msg, "LLM error");
                (
                    StatusCode::BAD_GATEWAY,
                    "Upstream service unavailable".to_string(),
                )
            }
            AppError::Unauthorized(msg) => {
                tracing::error!(error = %msg, "Provider credentials missing");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server configuration error".to_string(),
                )
            }
            AppError::Pipeline(msg) => {
                tracing::error!(error = %msg, "Pipeline error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = if let Some(trace_id) = get_trace_id() {
            json!({
                "error": error_message,
                "status": status.as_u16(),
                "trace_id": trace_id,
            })
        } else {
            json!({
                "error": error_message,
                "status": status.as_u16(),
            })
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
