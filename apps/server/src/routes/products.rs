//! `/api/products`

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use storefront_core::{ListQuery, Product, ProductFields, ProductId};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

const BASE_PATH: &str = "/api/products";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route(
            "/{id}",
            get(fetch).put(update).patch(patch).delete(remove),
        )
}

/// Raw `?limit&page&sort&query` parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
    pub page: Option<u32>,
    pub sort: Option<String>,
    pub query: Option<String>,
}

/// Paginated list body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub status: &'static str,
    pub payload: Vec<Product>,
    pub total_pages: u32,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
    pub page: u32,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_link: Option<String>,
    pub next_link: Option<String>,
}

async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<ProductListResponse>> {
    let Query(params) = params?;
    let query = ListQuery::from_params(
        params.limit,
        params.page,
        params.sort.as_deref(),
        params.query,
    )?;

    let page = state.catalog.list(&query).await;
    Ok(Json(ProductListResponse {
        status: "success",
        prev_link: page.prev_page.map(|p| query.link(BASE_PATH, p)),
        next_link: page.next_page.map(|p| query.link(BASE_PATH, p)),
        payload: page.items,
        total_pages: page.total_pages,
        prev_page: page.prev_page,
        next_page: page.next_page,
        page: page.page,
        has_prev_page: page.has_prev,
        has_next_page: page.has_next,
    }))
}

async fn fetch(
    State(state): State<AppState>,
    id: Result<Path<ProductId>, PathRejection>,
) -> ApiResult<Json<Product>> {
    let Path(id) = id.map_err(ApiError::unknown_product)?;
    Ok(Json(state.catalog.get(id).await?))
}

async fn create(
    State(state): State<AppState>,
    body: Result<Json<ProductFields>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(fields) = body?;
    let product = state.catalog.create(&fields).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn update(
    State(state): State<AppState>,
    id: Result<Path<ProductId>, PathRejection>,
    body: Result<Json<ProductFields>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    let Path(id) = id.map_err(ApiError::unknown_product)?;
    let Json(fields) = body?;
    Ok(Json(state.catalog.update(id, &fields).await?))
}

async fn patch(
    State(state): State<AppState>,
    id: Result<Path<ProductId>, PathRejection>,
    body: Result<Json<ProductFields>, JsonRejection>,
) -> ApiResult<Json<Product>> {
    let Path(id) = id.map_err(ApiError::unknown_product)?;
    let Json(fields) = body?;
    Ok(Json(state.catalog.patch(id, &fields).await?))
}

async fn remove(
    State(state): State<AppState>,
    id: Result<Path<ProductId>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id.map_err(ApiError::unknown_product)?;
    state.catalog.remove(id).await?;

    // The catalog delete already committed; a failed purge leaves dangling
    // lines that cart views skip.
    match state.carts.purge_product(id).await {
        Ok(0) => {}
        Ok(carts) => info!(product_id = id, carts, "Carts updated after product delete"),
        Err(e) => warn!(product_id = id, error = %e, "Failed to purge deleted product from carts"),
    }

    Ok(StatusCode::NO_CONTENT)
}
