use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    auth::repo_types::{NewUser, Session, User, ROLE_USER},
    db::PgStore,
    error::StoreError,
};

/// Credential and session persistence.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn create_session(&self, session: Session) -> Result<(), StoreError>;
    /// Live session holding this refresh token.
    async fn find_session(&self, refresh_token: &str) -> Result<Option<Session>, StoreError>;
    /// Live session holding this refresh token and owned by `user_id`.
    async fn find_user_session(
        &self,
        user_id: Uuid,
        refresh_token: &str,
    ) -> Result<Option<Session>, StoreError>;
    /// Returns whether a row was removed.
    async fn delete_session(&self, refresh_token: &str) -> Result<bool, StoreError>;
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at";
const SESSION_COLUMNS: &str = "id, user_id, refresh_token, created_at, expires_at";

#[async_trait]
impl AuthStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.username)
        .bind(user.email.as_deref())
        .bind(&user.password_hash)
        .bind(ROLE_USER)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(StoreError::from_sqlx)
    }

    async fn create_session(&self, session: Session) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, refresh_token, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.refresh_token)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn find_session(&self, refresh_token: &str) -> Result<Option<Session>, StoreError> {
        sqlx::query_as::<_, Session>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE refresh_token = $1 AND expires_at > now()
            "#
        ))
        .bind(refresh_token)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn find_user_session(
        &self,
        user_id: Uuid,
        refresh_token: &str,
    ) -> Result<Option<Session>, StoreError> {
        sqlx::query_as::<_, Session>(&format!(
            r#"
            SELECT {SESSION_COLUMNS}
            FROM sessions
            WHERE user_id = $1 AND refresh_token = $2 AND expires_at > now()
            "#
        ))
        .bind(user_id)
        .bind(refresh_token)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn delete_session(&self, refresh_token: &str) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM sessions WHERE refresh_token = $1")
            .bind(refresh_token)
            .execute(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(res.rows_affected() > 0)
    }
}
