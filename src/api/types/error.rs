//! Error bodies returned by the HTTP API
//!
//! Every failure is rendered as `{"error": {"message", "type", "param"?, "code"?}}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequestError,
    NotFoundError,
    ServerError,
    ServiceUnavailableError,
}

#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: ErrorKind,
    pub message: String,
    pub param: Option<String>,
    pub code: Option<String>,
}

#[derive(Serialize)]
struct Envelope<'a> {
    error: Body<'a>,
}

#[derive(Serialize)]
struct Body<'a> {
    message: &'a str,
    #[serde(rename = "type")]
    kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    param: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
}

impl ApiError {
    fn with_kind(status: StatusCode, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status,
            kind,
            message: message.into(),
            param: None,
            code: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_kind(StatusCode::BAD_REQUEST, ErrorKind::InvalidRequestError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_kind(StatusCode::NOT_FOUND, ErrorKind::NotFoundError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::with_kind(StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::ServerError, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::with_kind(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::ServiceUnavailableError,
            message,
        )
    }

    /// Request field the error refers to
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.param = Some(param.into());
        self
    }

    /// Machine-readable error code
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn body(&self) -> serde_json::Value {
        serde_json::to_value(Envelope {
            error: Body {
                message: &self.message,
                kind: self.kind,
                param: self.param.as_deref(),
                code: self.code.as_deref(),
            },
        })
        .unwrap_or_default()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();

        match err {
            DomainError::Validation { message } => {
                Self::bad_request(message).with_param("resumeText")
            }
            DomainError::NotFound { message } => Self::not_found(message),
            DomainError::Provider { .. }
            | DomainError::Timeout { .. }
            | DomainError::MalformedResponse { .. } => {
                Self::unavailable(message).with_code("ai_unavailable")
            }
            DomainError::FallbackExhausted { .. } => {
                Self::unavailable(message).with_code("analysis_unavailable")
            }
            DomainError::Configuration { message }
            | DomainError::Storage { message }
            | DomainError::Internal { message } => Self::internal(message),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.status, self.kind_str(), self.message)
    }
}

impl ApiError {
    fn kind_str(&self) -> &'static str {
        match self.kind {
            ErrorKind::InvalidRequestError => "invalid_request_error",
            ErrorKind::NotFoundError => "not_found_error",
            ErrorKind::ServerError => "server_error",
            ErrorKind::ServiceUnavailableError => "service_unavailable_error",
        }
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_mapping() {
        let err: ApiError = DomainError::validation("too short").into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.kind, ErrorKind::InvalidRequestError);
        assert_eq!(err.message, "too short");
        assert_eq!(err.param.as_deref(), Some("resumeText"));

        let err: ApiError = DomainError::timeout("AI resume analysis", 100).into();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code.as_deref(), Some("ai_unavailable"));

        let err: ApiError = DomainError::storage("connection reset").into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.kind, ErrorKind::ServerError);
    }

    #[test]
    fn test_body_shape() {
        let body = ApiError::not_found("No such session").body();

        assert_eq!(body["error"]["type"], "not_found_error");
        assert_eq!(body["error"]["message"], "No such session");
        assert!(body["error"].get("param").is_none());
        assert!(body["error"].get("code").is_none());
    }

    #[test]
    fn test_display() {
        let err = ApiError::bad_request("bad").with_code("invalid_json");
        assert_eq!(err.to_string(), "400 Bad Request (invalid_request_error): bad");
    }
}
