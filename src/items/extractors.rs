use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;

/// The `:id` segment of an item route. An id that is not a UUID cannot name
/// any item, so it is reported as not found.
#[derive(Debug, Clone, Copy)]
pub struct ItemId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ItemId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<Uuid>::from_request_parts(parts, state).await {
            Ok(Path(id)) => Ok(ItemId(id)),
            Err(rejection) => {
                debug!(%rejection, "unparseable item id");
                Err(AppError::NotFound("Item"))
            }
        }
    }
}
