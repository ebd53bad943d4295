use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

/// Credential and token routes, mounted under `/api/public`.
pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
