use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        claims::Claims,
        dto::{RegisterRequest, TokenPair},
        jwt::JwtKeys,
        password::{self, MIN_PASSWORD_LEN},
        repo::AuthStore,
        repo_types::{NewUser, Session, User},
    },
    error::{AppError, StoreError},
    state::AppState,
};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("session not found")]
    SessionNotFound,
    #[error("token signing failed: {0}")]
    Signing(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::InvalidToken => AppError::Unauthorized("Invalid or expired token".into()),
            TokenError::SessionNotFound => AppError::Unauthorized("Invalid refresh token".into()),
            TokenError::Signing(m) => AppError::Internal(m),
            TokenError::Store(s) => s.into(),
        }
    }
}

/// Issues, verifies, refreshes and revokes tokens against the session store.
pub struct TokenService<'a> {
    keys: &'a JwtKeys,
    store: &'a dyn AuthStore,
}

impl<'a> TokenService<'a> {
    pub fn new(keys: &'a JwtKeys, store: &'a dyn AuthStore) -> Self {
        Self { keys, store }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(&state.keys, state.auth.as_ref())
    }

    /// Signs both tokens and persists the session. No tokens leave this function unless the session row was written.
    pub async fn issue_tokens(&self, user_id: Uuid) -> Result<TokenPair, TokenError> {
        let access_token = self
            .keys
            .sign_access(user_id)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        let refresh_token = self
            .keys
            .sign_refresh(user_id)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        let created_at = OffsetDateTime::now_utc();
        let expires_at =
            created_at + TimeDuration::seconds(self.keys.refresh_ttl().as_secs() as i64);
        self.store
            .create_session(Session {
                id: Uuid::new_v4(),
                user_id,
                refresh_token: refresh_token.clone(),
                created_at,
                expires_at,
            })
            .await
            .map_err(|e| {
                error!(error = %e, user_id = %user_id, "session insert failed");
                TokenError::Store(e)
            })?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims, TokenError> {
        self.keys.verify_access(token).map_err(|e| {
            debug!(error = %e, "access token rejected");
            TokenError::InvalidToken
        })
    }

    /// Exchanges a live refresh token for a new access token. The refresh token itself is kept.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, TokenError> {
        let claims = self.keys.verify_refresh(refresh_token).map_err(|e| {
            warn!(error = %e, "refresh token rejected");
            TokenError::InvalidToken
        })?;

        match self.store.find_session(refresh_token).await? {
            Some(session)
                if session.user_id == claims.sub && session.is_live(OffsetDateTime::now_utc()) => {}
            _ => {
                warn!(user_id = %claims.sub, "refresh without live session");
                return Err(TokenError::SessionNotFound);
            }
        }

        self.keys
            .sign_access(claims.sub)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    pub async fn revoke(&self, refresh_token: &str) -> Result<(), TokenError> {
        let removed = self.store.delete_session(refresh_token).await?;
        debug!(removed, "session revoke");
        Ok(())
    }

    /// Requires a live session owned by `user_id` for the given refresh token.
    pub async fn check_session(&self, user_id: Uuid, refresh_token: &str) -> Result<(), TokenError> {
        self.store
            .find_user_session(user_id, refresh_token)
            .await?
            .filter(|s| s.is_live(OffsetDateTime::now_utc()))
            .map(|_| ())
            .ok_or(TokenError::SessionNotFound)
    }
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub async fn register(store: &dyn AuthStore, mut payload: RegisterRequest) -> Result<User, AppError> {
    payload.username = payload.username.trim().to_string();
    let email = payload
        .email
        .take()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());

    let name_len = payload.username.chars().count();
    if !(3..=64).contains(&name_len) {
        return Err(AppError::Validation(
            "Username must be between 3 and 64 characters".into(),
        ));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation("Password too short".into()));
    }
    if let Some(email) = &email {
        if !is_valid_email(email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::Validation("Invalid email".into()));
        }
    }

    if store.find_user_by_username(&payload.username).await?.is_some() {
        warn!(username = %payload.username, "username already registered");
        return Err(AppError::Conflict("Username already exists".into()));
    }
    if let Some(email) = &email {
        if store.find_user_by_email(email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::Conflict("Email already registered".into()));
        }
    }

    let password_hash =
        password::hash_password(&payload.password).map_err(|e| AppError::Internal(e.to_string()))?;

    // Concurrent registrations race past the pre-checks; the store's unique index decides.
    let user = store
        .create_user(NewUser {
            username: payload.username,
            email,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(constraint) if constraint.contains("email") => {
                AppError::Conflict("Email already registered".into())
            }
            StoreError::UniqueViolation(_) => AppError::Conflict("Username already exists".into()),
            other => other.into(),
        })?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

pub async fn login(state: &AppState, username: &str, plain: &str) -> Result<TokenPair, AppError> {
    let auth_failed = || AppError::Unauthorized("Authentication failed".into());

    let user = match state.auth.find_user_by_username(username.trim()).await? {
        Some(u) => u,
        None => {
            password::verify_against_decoy(plain);
            warn!(username = %username, "login unknown username");
            return Err(auth_failed());
        }
    };

    let ok = password::verify_password(plain, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(auth_failed());
    }

    let tokens = TokenService::from_state(state).issue_tokens(user.id).await?;
    info!(user_id = %user.id, "user logged in");
    Ok(tokens)
}
