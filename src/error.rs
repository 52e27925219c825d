use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::{repo::CreateAccountError, subscription::SubscriptionRejection};

/// Every failure a request can end with.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("subscription key rejected: {0}")]
    Subscription(SubscriptionRejection),

    #[error("Missing Authorization header")]
    MissingToken,

    #[error("Invalid Authorization header")]
    MalformedAuthorization,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token has no subject")]
    MissingSubject,

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Account is locked due to too many failed login attempts. Try again later.")]
    AccountLocked,

    #[error("Account is not active")]
    AccountInactive,

    #[error("{0}")]
    Validation(String),

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Subscription(_)
            | AppError::MissingToken
            | AppError::MalformedAuthorization
            | AppError::InvalidToken
            | AppError::MissingSubject
            | AppError::UserNotFound
            | AppError::InvalidCredentials
            | AppError::AccountLocked
            | AppError::AccountInactive => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) | AppError::DuplicateUsername | AppError::DuplicateEmail => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short machine-readable code placed in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Subscription(SubscriptionRejection::Required) => "subscription_key_required",
            AppError::Subscription(SubscriptionRejection::InvalidKey) => "subscription_key_invalid",
            AppError::Subscription(SubscriptionRejection::Inactive) => "subscription_key_inactive",
            AppError::MissingToken => "missing_token",
            AppError::MalformedAuthorization => "malformed_authorization",
            AppError::InvalidToken => "invalid_token",
            AppError::MissingSubject => "missing_subject",
            AppError::UserNotFound => "user_not_found",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::AccountLocked => "account_locked",
            AppError::AccountInactive => "account_inactive",
            AppError::Validation(_) => "validation_error",
            AppError::DuplicateUsername => "duplicate_username",
            AppError::DuplicateEmail => "duplicate_email",
            AppError::NotFound(_) => "not_found",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl From<CreateAccountError> for AppError {
    fn from(e: CreateAccountError) -> Self {
        match e {
            CreateAccountError::DuplicateUsername => Self::DuplicateUsername,
            CreateAccountError::DuplicateEmail => Self::DuplicateEmail,
            CreateAccountError::Other(e) => Self::Internal(e),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                "An internal error occurred".to_string()
            }
            AppError::Subscription(reason) => format!("Subscription key {}", reason),
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: self.code(),
            message,
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_class() {
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::AccountLocked.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::DuplicateEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("Item").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("db down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let resp = AppError::Internal(anyhow::anyhow!("connection refused to 10.0.0.5")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("internal_error"));
        assert!(!text.contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn json_rejection_becomes_validation_error() {
        let req = axum::http::Request::builder()
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(r#"{"quantity":"two"}"#))
            .unwrap();
        let rejection = <axum::Json<crate::items::dto::ItemRequest> as axum::extract::FromRequest<()>>::from_request(req, &())
            .await
            .unwrap_err();

        let err = AppError::from(rejection);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "validation_error");
        assert!(err.to_string().contains("quantity"));
    }

    #[test]
    fn subscription_codes_are_distinct() {
        let codes = [
            AppError::Subscription(SubscriptionRejection::Required).code(),
            AppError::Subscription(SubscriptionRejection::InvalidKey).code(),
            AppError::Subscription(SubscriptionRejection::Inactive).code(),
        ];
        assert_ne!(codes[0], codes[1]);
        assert_ne!(codes[1], codes[2]);
    }
}
