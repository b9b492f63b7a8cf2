//! Credits-specific error types.
//!
//! Errors related to ledger mutations and feature access checks.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | InsufficientCredits | 402 |
//! | InvalidAmount | 400 |
//! | FeatureNotFound | 404 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, FeatureId};

/// Credits-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditsError {
    /// Balance is too low for the requested consumption.
    InsufficientCredits { required: i64, available: i64 },

    /// Amount must be a positive integer.
    InvalidAmount(i64),

    /// Feature id is not present in the catalog.
    FeatureNotFound(FeatureId),

    /// Validation failed.
    ValidationFailed { field: String, message: String },

    /// Infrastructure error.
    Infrastructure(String),
}

impl CreditsError {
    // Constructor functions for cleaner error creation

    pub fn insufficient_credits(required: i64, available: i64) -> Self {
        CreditsError::InsufficientCredits {
            required,
            available,
        }
    }

    pub fn invalid_amount(amount: i64) -> Self {
        CreditsError::InvalidAmount(amount)
    }

    pub fn feature_not_found(feature_id: FeatureId) -> Self {
        CreditsError::FeatureNotFound(feature_id)
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CreditsError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        CreditsError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CreditsError::InsufficientCredits { .. } => ErrorCode::InsufficientCredits,
            CreditsError::InvalidAmount(_) => ErrorCode::OutOfRange,
            CreditsError::FeatureNotFound(_) => ErrorCode::FeatureNotFound,
            CreditsError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            CreditsError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            CreditsError::InsufficientCredits {
                required,
                available,
            } => {
                format!(
                    "Insufficient credits: {} required, {} available",
                    required, available
                )
            }
            CreditsError::InvalidAmount(amount) => {
                format!("Amount must be positive, got {}", amount)
            }
            CreditsError::FeatureNotFound(feature_id) => {
                format!("Unknown feature: {}", feature_id)
            }
            CreditsError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            CreditsError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CreditsError::Infrastructure(_))
    }
}

impl std::fmt::Display for CreditsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for CreditsError {}

impl From<DomainError> for CreditsError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => CreditsError::ValidationFailed {
                field: "unknown".to_string(),
                message: err.to_string(),
            },
            _ => CreditsError::Infrastructure(err.to_string()),
        }
    }
}

impl From<CreditsError> for DomainError {
    fn from(err: CreditsError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_feature_id() -> FeatureId {
        FeatureId::new("ai_chat").unwrap()
    }

    // ============================================================
    // Constructor Tests
    // ============================================================

    #[test]
    fn insufficient_credits_creates_correctly() {
        let err = CreditsError::insufficient_credits(5, 2);
        assert!(matches!(
            err,
            CreditsError::InsufficientCredits {
                required: 5,
                available: 2
            }
        ));
        assert_eq!(err.code(), ErrorCode::InsufficientCredits);
    }

    #[test]
    fn invalid_amount_creates_correctly() {
        let err = CreditsError::invalid_amount(-3);
        assert!(matches!(err, CreditsError::InvalidAmount(-3)));
        assert_eq!(err.code(), ErrorCode::OutOfRange);
    }

    #[test]
    fn feature_not_found_creates_correctly() {
        let feature_id = test_feature_id();
        let err = CreditsError::feature_not_found(feature_id.clone());
        assert!(matches!(err, CreditsError::FeatureNotFound(ref f) if *f == feature_id));
        assert_eq!(err.code(), ErrorCode::FeatureNotFound);
    }

    #[test]
    fn validation_creates_correctly() {
        let err = CreditsError::validation("amount", "must be positive");
        assert!(matches!(
            err,
            CreditsError::ValidationFailed { ref field, ref message }
            if field == "amount" && message == "must be positive"
        ));
        assert_eq!(err.code(), ErrorCode::ValidationFailed);
    }

    #[test]
    fn infrastructure_creates_correctly() {
        let err = CreditsError::infrastructure("database connection lost");
        assert!(matches!(
            err,
            CreditsError::Infrastructure(ref m) if m == "database connection lost"
        ));
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }

    // ============================================================
    // Message Tests
    // ============================================================

    #[test]
    fn insufficient_credits_message_includes_both_amounts() {
        let err = CreditsError::insufficient_credits(10, 3);
        let msg = err.message();
        assert!(msg.contains("10"));
        assert!(msg.contains("3"));
    }

    #[test]
    fn feature_not_found_message_includes_feature_id() {
        let err = CreditsError::feature_not_found(test_feature_id());
        assert!(err.message().contains("ai_chat"));
    }

    // ============================================================
    // Retryable Tests
    // ============================================================

    #[test]
    fn infrastructure_errors_are_retryable() {
        let err = CreditsError::infrastructure("timeout");
        assert!(err.is_retryable());
    }

    #[test]
    fn insufficient_credits_is_not_retryable() {
        let err = CreditsError::insufficient_credits(5, 0);
        assert!(!err.is_retryable());
    }

    #[test]
    fn validation_errors_are_not_retryable() {
        let err = CreditsError::validation("amount", "must be positive");
        assert!(!err.is_retryable());
    }

    // ============================================================
    // Display Tests
    // ============================================================

    #[test]
    fn display_matches_message() {
        let err = CreditsError::invalid_amount(0);
        assert_eq!(format!("{}", err), err.message());
    }

    // ============================================================
    // Conversion Tests
    // ============================================================

    #[test]
    fn converts_to_domain_error() {
        let err = CreditsError::insufficient_credits(5, 1);
        let domain_err: DomainError = err.clone().into();
        assert_eq!(domain_err.code, err.code());
    }

    #[test]
    fn converts_from_domain_error() {
        let domain_err = DomainError::new(ErrorCode::DatabaseError, "pool exhausted");
        let credits_err: CreditsError = domain_err.into();
        assert!(matches!(credits_err, CreditsError::Infrastructure(_)));
    }
}
