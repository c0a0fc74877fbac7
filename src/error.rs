//! Crate-wide error taxonomy and the single error-to-status mapping.
//!
//! Every handler returns `ApiError`; the `IntoResponse` impl below is the
//! only place statuses are assigned, so equivalent failures always map to
//! the same code. 500 responses never carry internal detail.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::domain::discount::CouponRejection;
use crate::domain::ledger::LedgerError;
use crate::gateways::GatewayError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input (400).
    #[error("{0}")]
    Validation(String),
    /// Missing or invalid credentials (401).
    #[error("{0}")]
    Unauthorized(String),
    /// Authenticated but not allowed (403).
    #[error("{0}")]
    Forbidden(String),
    /// Record does not exist (404).
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Duplicate resource (409).
    #[error("{0}")]
    Conflict(String),
    /// A business rule rejected the request (400).
    #[error("{0}")]
    BusinessRule(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BusinessRule(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                StatusCode::CONFLICT
            }
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match (&self, status) {
            (Self::Database(sqlx::Error::Database(_)), StatusCode::CONFLICT) => {
                "Resource already exists".to_string()
            }
            (Self::Database(e), _) => {
                tracing::error!(error = %e, "database error");
                "Internal server error".to_string()
            }
            (Self::Internal(e), _) => {
                tracing::error!(error = %e, "unhandled error");
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<&str> = errors.field_errors().keys().copied().collect();
        fields.sort_unstable();
        Self::Validation(format!("Invalid fields: {}", fields.join(", ")))
    }
}

impl From<CouponRejection> for ApiError {
    fn from(rejection: CouponRejection) -> Self {
        Self::BusinessRule(rejection.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(error: LedgerError) -> Self {
        Self::BusinessRule(error.to_string())
    }
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        Self::BusinessRule(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_taxonomy() {
        assert_eq!(ApiError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("Product").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::BusinessRule("x".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn not_found_message_names_resource() {
        assert_eq!(ApiError::NotFound("Coupon").to_string(), "Coupon not found");
    }
}
