//! Shared API error wrapper.
//!
//! Every handler maps its domain errors into [`ApiError`], which renders
//! as a JSON body of the shape `{"error": "...", "code": "..."}` with the
//! appropriate status. Keeping the mapping in one type keeps the wire
//! format identical across route families.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::billing::WebhookError;
use crate::domain::credits::CreditsError;

/// API-level error with an HTTP status and a stable machine-readable code.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<CreditsError> for ApiError {
    fn from(error: CreditsError) -> Self {
        let message = error.message();
        match error {
            CreditsError::InsufficientCredits { .. } => {
                Self::new(StatusCode::PAYMENT_REQUIRED, "INSUFFICIENT_CREDITS", message)
            }
            CreditsError::InvalidAmount(_) => {
                Self::new(StatusCode::BAD_REQUEST, "INVALID_AMOUNT", message)
            }
            CreditsError::FeatureNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "FEATURE_NOT_FOUND", message)
            }
            CreditsError::ValidationFailed { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
            }
            CreditsError::Infrastructure(_) => {
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred",
                )
            }
        }
    }
}

impl From<WebhookError> for ApiError {
    fn from(error: WebhookError) -> Self {
        let code = match &error {
            WebhookError::MissingSignature => "MISSING_SIGNATURE",
            WebhookError::InvalidSignature => "INVALID_SIGNATURE",
            WebhookError::StaleTimestamp { .. } => "STALE_TIMESTAMP",
            WebhookError::InvalidTimestamp => "INVALID_TIMESTAMP",
            WebhookError::ParseError(_) => "PARSE_ERROR",
            WebhookError::MissingMetadata(_) => "MISSING_METADATA",
            WebhookError::Database(_) => "INTERNAL_ERROR",
        };

        let message = if matches!(error, WebhookError::Database(_)) {
            "An unexpected error occurred".to_string()
        } else {
            error.to_string()
        };

        Self::new(error.status_code(), code, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({
                "error": self.message,
                "code": self.code
            })),
        )
            .into_response()
    }
}
