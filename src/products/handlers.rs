use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::{AdminUser, AuthGuard, AuthUser},
    error::AppResult,
    extract::Json,
    products::{
        dto::{
            ConsumedRequest, CreateProductRequest, DailyIntakeParams, DailyIntakeResponse,
            DayInfo, DayQuery, SearchQuery,
        },
        repo_types::{ConsumedProduct, Product},
        services,
    },
    state::AppState,
};

// --- routers ---

/// Catalog and intake routes, mounted under `/api/products`. Protected routes check the access token only.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/search", get(search_products))
        .route(
            "/daily-intake",
            get(daily_intake_preview).post(record_daily_intake),
        )
        .merge(consumption_routes::<false>())
}

/// Consumption routes that also require a live session, mounted under `/api/protected`.
pub fn protected_routes() -> Router<AppState> {
    consumption_routes::<true>()
}

/// Mounted under `/api/search`.
pub fn search_routes() -> Router<AppState> {
    Router::new().route("/products", get(search_products))
}

/// Anonymous calculator, mounted under `/api/public`.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/daily-intake", get(daily_intake_preview))
}

fn consumption_routes<const CHECK_SESSION: bool>() -> Router<AppState> {
    Router::new()
        .route("/consumed", post(add_consumed::<CHECK_SESSION>))
        .route("/consumed/:id", delete(delete_consumed::<CHECK_SESSION>))
        .route("/day-info", get(day_info::<CHECK_SESSION>))
}

// --- handlers ---

#[instrument(skip(state))]
pub async fn list_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(state.products.list_products().await?))
}

#[instrument(skip(state, body))]
pub async fn create_product(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let product = services::create_product(state.products.as_ref(), body).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip(state))]
pub async fn search_products(
    State(state): State<AppState>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let products = services::search_products(state.products.as_ref(), q.query.as_deref()).await?;
    Ok(Json(products))
}

#[instrument(skip(state))]
pub async fn daily_intake_preview(
    State(state): State<AppState>,
    Query(params): Query<DailyIntakeParams>,
) -> AppResult<Json<DailyIntakeResponse>> {
    let res = services::compute_daily_intake(state.products.as_ref(), &params, None).await?;
    Ok(Json(res))
}

#[instrument(skip(state, params))]
pub async fn record_daily_intake(
    State(state): State<AppState>,
    AuthUser { user_id }: AuthUser,
    Json(params): Json<DailyIntakeParams>,
) -> AppResult<Json<DailyIntakeResponse>> {
    let res =
        services::compute_daily_intake(state.products.as_ref(), &params, Some(user_id)).await?;
    Ok(Json(res))
}

#[instrument(skip(state, body))]
pub async fn add_consumed<const CHECK_SESSION: bool>(
    State(state): State<AppState>,
    AuthGuard { user_id }: AuthGuard<CHECK_SESSION>,
    Json(body): Json<ConsumedRequest>,
) -> AppResult<(StatusCode, Json<ConsumedProduct>)> {
    let row = services::record_consumption(state.products.as_ref(), user_id, body).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

#[instrument(skip(state))]
pub async fn delete_consumed<const CHECK_SESSION: bool>(
    State(state): State<AppState>,
    AuthGuard { user_id }: AuthGuard<CHECK_SESSION>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    services::delete_consumption(state.products.as_ref(), user_id, &id).await?;
    Ok(Json(serde_json::json!({
        "message": "Consumed product deleted successfully"
    })))
}

#[instrument(skip(state))]
pub async fn day_info<const CHECK_SESSION: bool>(
    State(state): State<AppState>,
    AuthGuard { user_id }: AuthGuard<CHECK_SESSION>,
    Query(q): Query<DayQuery>,
) -> AppResult<Json<DayInfo>> {
    let info = services::get_day_info(state.products.as_ref(), user_id, q.date.as_deref()).await?;
    Ok(Json(info))
}
