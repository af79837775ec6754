//! Axum-specific error types and mappings.
//!
//! Every error leaves the server as an RFC 7807 problem document with a
//! stable `code` for client-side handling. `HttpError` renders the parts it
//! knows; the tracing middleware fills in `instance`, `request_id` and
//! `trace_id` before the response is sent.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use linea_core::{CoreError, FieldError, RepositoryError};

/// Media type of every error body.
pub const PROBLEM_JSON: &str = "application/problem+json";

/// Placeholder used when no trace context is available.
pub const UNKNOWN_ID: &str = "unknown";

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Bad request (invalid input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// One or more request fields failed validation.
    #[error("Invalid fields: {}", .0.iter().map(|f| f.field.as_str()).collect::<Vec<_>>().join(", "))]
    InvalidFields(Vec<FieldError>),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict (resource already exists).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Well-formed input outside the accepted range.
    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    /// Service unavailable (e.g., exchange rate provider down).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error. The message is logged, never sent.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HttpError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidFields(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render this error as a problem document without request context.
    pub fn to_problem(&self) -> ProblemDetails {
        match self {
            Self::InvalidFields(fields) => {
                let mut problem = ProblemDetails::new(
                    StatusCode::BAD_REQUEST,
                    "Request body contains invalid fields",
                );
                problem.title = "Validation Error".to_string();
                problem.details = Some(json!({ "fields": fields }));
                problem
            }
            Self::Internal(_) => {
                ProblemDetails::new(self.status(), "An unexpected error occurred")
            }
            Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::Unprocessable(msg)
            | Self::ServiceUnavailable(msg) => ProblemDetails::new(self.status(), msg.clone()),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match &self {
            Self::Internal(msg) => {
                tracing::error!(
                    http_status_code = 500,
                    error_code = error_code(StatusCode::INTERNAL_SERVER_ERROR),
                    error_message = %msg,
                    "Unhandled error"
                );
            }
            Self::InvalidFields(fields) => {
                tracing::warn!(
                    http_status_code = 400,
                    error_code = error_code(StatusCode::BAD_REQUEST),
                    validation_errors = ?fields,
                    "Validation error"
                );
            }
            other => {
                let status = other.status();
                tracing::warn!(
                    http_status_code = status.as_u16(),
                    error_code = error_code(status),
                    error_detail = %other,
                    "HTTP exception"
                );
            }
        }

        self.to_problem().into_response()
    }
}

impl From<CoreError> for HttpError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Repository(repo_err) => repo_err.into(),
            CoreError::Validation(msg) => Self::BadRequest(msg),
            CoreError::InvalidFields(fields) => Self::InvalidFields(fields),
            err @ CoreError::UnsupportedCurrency(_) => Self::BadRequest(err.to_string()),
            err @ CoreError::RateUnavailable { .. } => Self::ServiceUnavailable(err.to_string()),
            CoreError::ExternalService(msg) => Self::ServiceUnavailable(msg),
            CoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<RepositoryError> for HttpError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => Self::NotFound(msg),
            RepositoryError::AlreadyExists(msg) => Self::Conflict(msg),
            RepositoryError::Constraint(msg) => Self::BadRequest(msg),
            RepositoryError::Storage(msg) => Self::Internal(format!("Storage: {msg}")),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Problem documents
// ─────────────────────────────────────────────────────────────────────────────

/// RFC 7807 error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub type_uri: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    pub instance: String,
    pub code: String,
    pub request_id: String,
    pub trace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ProblemDetails {
    /// Problem for `status` with the standard code and title.
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        let code = error_code(status);
        Self {
            type_uri: error_type_uri(code),
            title: status_title(status).to_string(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: String::new(),
            code: code.to_string(),
            request_id: UNKNOWN_ID.to_string(),
            trace_id: UNKNOWN_ID.to_string(),
            details: None,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Serialize without touching response extensions.
    pub(crate) fn body_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let mut response = (self.status_code(), Json(&self)).into_response();
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
        // Picked up by the tracing middleware to add request context.
        response.extensions_mut().insert(self);
        response
    }
}

/// Stable error code for a status.
pub fn error_code(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "VALIDATION.INVALID_FIELDS",
        401 => "AUTH.INVALID_TOKEN",
        403 => "AUTH.INSUFFICIENT_PERMISSIONS",
        404 => "RESOURCE.NOT_FOUND",
        409 => "CONFLICT.DUPLICATE",
        422 => "VALIDATION.UNPROCESSABLE",
        429 => "RATE_LIMIT.EXCEEDED",
        502 => "SERVER.BAD_GATEWAY",
        503 => "SERVER.UNAVAILABLE",
        504 => "SERVER.GATEWAY_TIMEOUT",
        _ => "SERVER.INTERNAL_ERROR",
    }
}

fn status_title(status: StatusCode) -> &'static str {
    match status.as_u16() {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Error",
    }
}

/// Documentation URI for an error code, in kebab case:
/// `RESOURCE.NOT_FOUND` becomes `.../errors/resource-not-found`.
pub fn error_type_uri(code: &str) -> String {
    format!(
        "https://docs.lineasupply.com/errors/{}",
        code.to_ascii_lowercase().replace(['.', '_'], "-")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_problem() {
        let problem = HttpError::NotFound("Product not found".to_string()).to_problem();
        assert_eq!(problem.status, 404);
        assert_eq!(problem.title, "Not Found");
        assert_eq!(problem.code, "RESOURCE.NOT_FOUND");
        assert_eq!(
            problem.type_uri,
            "https://docs.lineasupply.com/errors/resource-not-found"
        );
        assert_eq!(problem.request_id, UNKNOWN_ID);
    }

    #[test]
    fn test_type_uri_is_kebab_case() {
        assert_eq!(
            error_type_uri("SERVER.UNAVAILABLE"),
            "https://docs.lineasupply.com/errors/server-unavailable"
        );
        assert_eq!(
            error_type_uri("VALIDATION.UNPROCESSABLE"),
            "https://docs.lineasupply.com/errors/validation-unprocessable"
        );
        assert_eq!(
            error_type_uri("SERVER.INTERNAL_ERROR"),
            "https://docs.lineasupply.com/errors/server-internal-error"
        );
    }

    #[test]
    fn test_internal_detail_is_generic() {
        let problem = HttpError::Internal("disk on fire".to_string()).to_problem();
        assert_eq!(problem.detail, "An unexpected error occurred");
        assert_eq!(problem.code, "SERVER.INTERNAL_ERROR");
    }

    #[test]
    fn test_invalid_fields_problem_lists_fields() {
        let err = HttpError::InvalidFields(vec![FieldError::new("price", "Price must be positive")]);
        let value = serde_json::to_value(err.to_problem()).unwrap();
        assert_eq!(value["title"], "Validation Error");
        assert_eq!(value["details"]["fields"][0]["field"], "price");
    }

    #[test]
    fn test_details_omitted_when_absent() {
        let value = serde_json::to_value(ProblemDetails::new(StatusCode::CONFLICT, "dup")).unwrap();
        assert!(value.get("details").is_none());
        assert_eq!(value["code"], "CONFLICT.DUPLICATE");
    }

    #[test]
    fn test_core_error_mapping() {
        let err: HttpError = CoreError::RateUnavailable {
            from: "USD".to_string(),
            to: "EUR".to_string(),
        }
        .into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);

        let err: HttpError = RepositoryError::AlreadyExists("dup".to_string()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err: HttpError = CoreError::UnsupportedCurrency("XYZ".to_string()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_response_carries_problem_media_type() {
        let response = HttpError::Conflict("dup".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers()[header::CONTENT_TYPE], PROBLEM_JSON);
        assert!(response.extensions().get::<ProblemDetails>().is_some());
    }
}
