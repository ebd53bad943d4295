use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;
use uuid::Uuid;

use crate::{
    auth::services::{TokenError, TokenService},
    error::AppError,
    state::AppState,
};

/// Header carrying the refresh token for session cross-checked routes.
pub const REFRESH_HEADER: &str = "refresh";

/// Validates the bearer access token. With `CHECK_SESSION` it also requires a
/// live session matching the token's user and the `Refresh` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthGuard<const CHECK_SESSION: bool> {
    pub user_id: Uuid,
}

/// Access token only.
pub type AuthUser = AuthGuard<false>;
/// Access token plus a matching persisted session.
pub type SessionUser = AuthGuard<true>;

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Access token required".into()))?;

    let token = auth
        .trim_start()
        .split_once(char::is_whitespace)
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid auth scheme".into()))?;
    Ok(token)
}

#[async_trait]
impl<const CHECK_SESSION: bool> FromRequestParts<AppState> for AuthGuard<CHECK_SESSION> {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let tokens = TokenService::from_state(state);
        let claims = tokens.verify_access(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::Unauthorized("Invalid token".into())
        })?;

        if CHECK_SESSION {
            let refresh = parts
                .headers
                .get(REFRESH_HEADER)
                .and_then(|h| h.to_str().ok())
                .filter(|t| !t.is_empty())
                .ok_or_else(|| AppError::Unauthorized("Invalid session".into()))?;
            tokens
                .check_session(claims.sub, refresh)
                .await
                .map_err(|e| match e {
                    TokenError::Store(s) => AppError::from(s),
                    _ => {
                        warn!(user_id = %claims.sub, "no session for access token");
                        AppError::Unauthorized("Invalid session".into())
                    }
                })?;
        }

        Ok(AuthGuard {
            user_id: claims.sub,
        })
    }
}

/// Authenticated user whose stored role is admin.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub user_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser { user_id } = AuthUser::from_request_parts(parts, state).await?;
        let user = state
            .auth
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
        if !user.is_admin() {
            warn!(user_id = %user_id, "admin route denied");
            return Err(AppError::Forbidden("Admin role required".into()));
        }
        Ok(AdminUser { user_id })
    }
}
