use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;
use uuid::Uuid;

use crate::{auth::jwt::JwtKeys, error::AppError};

/// Bearer-token steps of the request gate, in order: header present and
/// shaped `Bearer <token>`, token verifies, subject claim present.
pub fn authenticate_bearer(headers: &HeaderMap, keys: &JwtKeys) -> Result<Uuid, AppError> {
    let auth = headers
        .get(AUTHORIZATION)
        .ok_or(AppError::MissingToken)?
        .to_str()
        .map_err(|_| AppError::MalformedAuthorization)?;

    let token = auth
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::MalformedAuthorization)?;

    let claims = keys.verify(token).ok_or_else(|| {
        warn!("invalid or expired token");
        AppError::InvalidToken
    })?;

    claims.subject().ok_or_else(|| {
        warn!("token without subject claim");
        AppError::MissingSubject
    })
}

/// Extracts and validates the JWT, returning the caller's account id.
/// The subscription key has already been checked by router middleware.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        authenticate_bearer(&parts.headers, &keys).map(AuthUser)
    }
}
