use axum::{extract::State, http::StatusCode, routing::post, Router};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{
            AccessTokenResponse, LoginRequest, MessageResponse, RefreshRequest, RegisterRequest,
            RegisterResponse, TokenPair,
        },
        services::{self, TokenService},
    },
    error::{AppError, AppResult},
    extract::Json,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
}

fn required_refresh_token(payload: RefreshRequest) -> AppResult<String> {
    payload
        .refresh_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Refresh token required".into()))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let user = services::register(state.auth.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".into(),
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    let tokens = services::login(&state, &payload.username, &payload.password).await?;
    Ok(Json(tokens))
}

#[instrument(skip(state, payload))]
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<MessageResponse>> {
    let refresh_token = required_refresh_token(payload)?;
    TokenService::from_state(&state).revoke(&refresh_token).await?;
    info!("session closed");
    Ok(Json(MessageResponse {
        message: "Logged out successfully".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AccessTokenResponse>> {
    let refresh_token = required_refresh_token(payload)?;
    let access_token = TokenService::from_state(&state)
        .refresh(&refresh_token)
        .await?;
    Ok(Json(AccessTokenResponse { access_token }))
}
