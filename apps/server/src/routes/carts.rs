//! `/api/carts`

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use storefront_core::{Cart, CartView, LineItem, ProductId};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/{cid}", get(fetch).put(replace).delete(remove))
        .route(
            "/{cid}/products/{pid}",
            post(add_product).put(set_quantity).delete(remove_product),
        )
}

#[derive(Debug, Deserialize)]
pub struct ReplaceCartBody {
    pub products: Vec<LineItem>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityBody {
    pub quantity: i64,
}

type LinePath = Result<Path<(String, ProductId)>, PathRejection>;

async fn list(State(state): State<AppState>) -> Json<Vec<Cart>> {
    Json(state.carts.list().await)
}

async fn create(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let cart = state.carts.create().await?;
    Ok((StatusCode::CREATED, Json(cart)))
}

async fn fetch(State(state): State<AppState>, Path(cid): Path<String>) -> ApiResult<Json<CartView>> {
    Ok(Json(state.carts.view(&cid).await?))
}

async fn replace(
    State(state): State<AppState>,
    Path(cid): Path<String>,
    body: Result<Json<ReplaceCartBody>, JsonRejection>,
) -> ApiResult<Json<Cart>> {
    let Json(body) = body?;
    Ok(Json(state.carts.replace_products(&cid, body.products).await?))
}

async fn remove(State(state): State<AppState>, Path(cid): Path<String>) -> ApiResult<StatusCode> {
    state.carts.remove(&cid).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_product(State(state): State<AppState>, path: LinePath) -> ApiResult<Json<Cart>> {
    let Path((cid, pid)) = path.map_err(ApiError::unknown_product)?;
    Ok(Json(state.carts.add_product(&cid, pid).await?))
}

async fn set_quantity(
    State(state): State<AppState>,
    path: LinePath,
    body: Result<Json<QuantityBody>, JsonRejection>,
) -> ApiResult<Json<Cart>> {
    let Path((cid, pid)) = path.map_err(ApiError::unknown_product)?;
    let Json(body) = body?;
    Ok(Json(state.carts.set_quantity(&cid, pid, body.quantity).await?))
}

async fn remove_product(State(state): State<AppState>, path: LinePath) -> ApiResult<StatusCode> {
    let Path((cid, pid)) = path.map_err(ApiError::unknown_product)?;
    state.carts.remove_product(&cid, pid).await?;
    Ok(StatusCode::NO_CONTENT)
}
