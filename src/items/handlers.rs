use axum::{
    extract::State,
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    extract::{AppJson, AppQuery},
    items::{
        dto::{ItemRequest, Pagination},
        extractors::ItemId,
        repo_types::ListItem,
    },
    state::AppState,
};

pub fn item_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(add_item))
        .route(
            "/items/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
}

#[instrument(skip(state))]
pub async fn list_items(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppQuery(p): AppQuery<Pagination>,
) -> Result<Json<Vec<ListItem>>, AppError> {
    state.items.list(user_id, &p).await.map(Json)
}

#[instrument(skip(state))]
pub async fn get_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ItemId(id): ItemId,
) -> Result<Json<ListItem>, AppError> {
    state.items.get(user_id, id).await.map(Json)
}

#[instrument(skip(state, body))]
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(body): AppJson<ItemRequest>,
) -> Result<(StatusCode, HeaderMap, Json<ListItem>), AppError> {
    let fields = body.validate()?;
    let item = state.items.add(user_id, fields).await?;
    info!(%user_id, item_id = %item.id, "item added");

    let mut headers = HeaderMap::new();
    let location = HeaderValue::from_str(&format!("/api/v1/items/{}", item.id))
        .map_err(|e| AppError::Internal(e.into()))?;
    headers.insert(LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(item)))
}

#[instrument(skip(state, body))]
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ItemId(id): ItemId,
    AppJson(body): AppJson<ItemRequest>,
) -> Result<Json<ListItem>, AppError> {
    let fields = body.validate()?;
    state.items.update(user_id, id, fields).await.map(Json)
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    ItemId(id): ItemId,
) -> Result<StatusCode, AppError> {
    state.items.delete(user_id, id).await?;
    info!(%user_id, item_id = %id, "item deleted");
    Ok(StatusCode::NO_CONTENT)
}
