//! JSON error envelope.
//!
//! Every failure is rendered as
//! `{"success": false, "message": ..., "code": ..., "error": ...}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use prism_core::PipelineError;
use serde::Serialize;
use serde_json::Value;

/// One request-body problem, reported in 422 responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// Where the problem is, starting with `"body"`
    pub loc: Vec<Value>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ValidationIssue {
    pub fn new(loc: Vec<Value>, msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }
}

/// Errors a handler can return.
#[derive(Debug)]
pub enum ApiError {
    /// Pipeline failure; client errors become 400, the rest 500
    Pipeline(PipelineError),
    /// The body could not be read as the expected schema
    Validation(Vec<ValidationIssue>),
    /// No route matched
    NotFound(String),
    /// The route exists but not for this method
    MethodNotAllowed { method: String, path: String },
    /// A handler panicked
    Panic(String),
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError::Pipeline(err)
    }
}

#[derive(Serialize)]
struct Envelope {
    success: bool,
    message: String,
    code: u16,
    error: Value,
}

const UNEXPECTED: &str = "An unexpected error occurred.";

impl ApiError {
    fn parts(self) -> (StatusCode, String, Value) {
        match self {
            ApiError::Pipeline(err) if err.is_client_error() => (
                StatusCode::BAD_REQUEST,
                err.to_string(),
                Value::String(format!("{err:?}")),
            ),
            ApiError::Pipeline(err) => {
                tracing::error!("Request failed: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    UNEXPECTED.to_string(),
                    Value::String(format!("{err:?}")),
                )
            }
            ApiError::Validation(issues) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation error occurred.".to_string(),
                serde_json::to_value(issues).unwrap_or(Value::Null),
            ),
            ApiError::NotFound(path) => (
                StatusCode::NOT_FOUND,
                "Not Found".to_string(),
                Value::String(format!("No route for {path}")),
            ),
            ApiError::MethodNotAllowed { method, path } => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method Not Allowed".to_string(),
                Value::String(format!("{method} is not supported on {path}")),
            ),
            ApiError::Panic(detail) => {
                tracing::error!("Handler panicked: {detail}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    UNEXPECTED.to_string(),
                    Value::String(detail),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error) = self.parts();
        let body = Envelope {
            success: false,
            message,
            code: status.as_u16(),
            error,
        };
        (status, Json(body)).into_response()
    }
}
