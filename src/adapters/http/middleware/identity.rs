//! Caller identity extractor for axum.
//!
//! Authentication is terminated upstream (API gateway or reverse proxy);
//! by the time a request reaches this service the caller is already
//! verified and identified by the `X-User-Id` header. This module turns
//! that header into a typed `UserId` at the handler boundary.
//!
//! ```text
//! Request → CallerIdentity extractor reads X-User-Id → UserId
//! ```
//!
//! # Example
//!
//! ```ignore
//! async fn my_handler(CallerIdentity(user_id): CallerIdentity) -> impl IntoResponse {
//!     format!("Hello, {}!", user_id)
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::UserId;

/// Header carrying the verified caller identity.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Extractor that resolves the caller's `UserId` from the `X-User-Id` header.
///
/// Rejects with 401 when the header is absent, not valid UTF-8, or fails
/// `UserId` validation.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub UserId);

impl<S> axum::extract::FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let raw = parts
                .headers
                .get(USER_ID_HEADER)
                .and_then(|value| value.to_str().ok())
                .ok_or(IdentityRejection::MissingHeader)?;

            let user_id = UserId::new(raw).map_err(|_| IdentityRejection::InvalidUserId)?;
            Ok(CallerIdentity(user_id))
        })
    }
}

/// Rejection type for identity resolution failures.
#[derive(Debug, Clone)]
pub enum IdentityRejection {
    /// No `X-User-Id` header was present (or it was not valid UTF-8).
    MissingHeader,

    /// The header was present but did not parse as a valid user id.
    InvalidUserId,
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        let (message, code) = match self {
            IdentityRejection::MissingHeader => ("Missing X-User-Id header", "UNAUTHENTICATED"),
            IdentityRejection::InvalidUserId => ("Invalid X-User-Id header", "INVALID_IDENTITY"),
        };

        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": message,
                "code": code
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::FromRequestParts;
    use axum::http::Request;

    // ════════════════════════════════════════════════════════════════════════════
    // CallerIdentity Extractor Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn caller_identity_extracts_user_id_from_header() {
        let request: Request<()> = Request::builder()
            .uri("/test")
            .header(USER_ID_HEADER, "user-123")
            .body(())
            .unwrap();

        let (mut parts, _body) = request.into_parts();

        let result: Result<CallerIdentity, IdentityRejection> =
            CallerIdentity::from_request_parts(&mut parts, &()).await;

        assert!(result.is_ok());
        let CallerIdentity(user_id) = result.unwrap();
        assert_eq!(user_id.as_str(), "user-123");
    }

    #[tokio::test]
    async fn caller_identity_fails_without_header() {
        let request: Request<()> = Request::builder().uri("/test").body(()).unwrap();

        let (mut parts, _body) = request.into_parts();

        let result: Result<CallerIdentity, IdentityRejection> =
            CallerIdentity::from_request_parts(&mut parts, &()).await;

        assert!(matches!(result, Err(IdentityRejection::MissingHeader)));
    }

    #[tokio::test]
    async fn caller_identity_fails_on_empty_header() {
        let request: Request<()> = Request::builder()
            .uri("/test")
            .header(USER_ID_HEADER, "")
            .body(())
            .unwrap();

        let (mut parts, _body) = request.into_parts();

        let result: Result<CallerIdentity, IdentityRejection> =
            CallerIdentity::from_request_parts(&mut parts, &()).await;

        assert!(matches!(result, Err(IdentityRejection::InvalidUserId)));
    }

    #[tokio::test]
    async fn header_name_lookup_is_case_insensitive() {
        let request: Request<()> = Request::builder()
            .uri("/test")
            .header("x-user-id", "user-456")
            .body(())
            .unwrap();

        let (mut parts, _body) = request.into_parts();

        let result: Result<CallerIdentity, IdentityRejection> =
            CallerIdentity::from_request_parts(&mut parts, &()).await;

        assert!(result.is_ok());
        assert_eq!(result.unwrap().0.as_str(), "user-456");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // IdentityRejection Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn missing_header_rejection_returns_401() {
        let rejection = IdentityRejection::MissingHeader;
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn invalid_user_id_rejection_returns_401() {
        let rejection = IdentityRejection::InvalidUserId;
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Type Safety Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn caller_identity_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CallerIdentity>();
        assert_send_sync::<IdentityRejection>();
    }
}
