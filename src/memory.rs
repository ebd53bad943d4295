//! In-process store used by tests. Mirrors the PostgreSQL constraints that
//! the services rely on: unique usernames, emails and refresh tokens, and
//! session expiry.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};

use async_trait::async_trait;
use time::{Duration as TimeDuration, OffsetDateTime};
use uuid::Uuid;

use crate::{
    auth::{
        repo::AuthStore,
        repo_types::{NewUser, Session, User, ROLE_ADMIN, ROLE_USER},
    },
    error::StoreError,
    products::{
        repo::ProductStore,
        repo_types::{ConsumedProduct, DailyIntake, NewProduct, Product},
    },
};

/// Flag `g - 1` of the product, as Postgres' 1-based `group_blood_not_allowed[g]`.
fn not_allowed_for(product: &Product, blood_group: u8) -> bool {
    (blood_group as usize)
        .checked_sub(1)
        .and_then(|i| product.group_blood_not_allowed.get(i))
        .copied()
        .unwrap_or(false)
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sessions: Vec<Session>,
    products: Vec<Product>,
    consumed: Vec<ConsumedProduct>,
    daily_intakes: Vec<DailyIntake>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }

    /// Makes every subsequent write fail with `StoreError::Unavailable`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Moves every session's expiry into the past.
    pub fn expire_sessions(&self) {
        let past = OffsetDateTime::now_utc() - TimeDuration::seconds(1);
        for s in self.tables().sessions.iter_mut() {
            s.expires_at = past;
        }
    }

    pub fn promote_to_admin(&self, user_id: Uuid) {
        if let Some(u) = self.tables().users.iter_mut().find(|u| u.id == user_id) {
            u.role = ROLE_ADMIN.to_string();
        }
    }

    pub fn daily_intake_count(&self) -> usize {
        self.tables().daily_intakes.len()
    }
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.check_writable()?;
        let mut t = self.tables();
        if t.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation("users_username_key".into()));
        }
        if user.email.is_some() && t.users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }
        let row = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: ROLE_USER.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(row.clone());
        Ok(row)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .tables()
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn create_session(&self, session: Session) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut t = self.tables();
        if t.sessions.iter().any(|s| s.refresh_token == session.refresh_token) {
            return Err(StoreError::UniqueViolation("sessions_refresh_token_key".into()));
        }
        t.sessions.push(session);
        Ok(())
    }

    async fn find_session(&self, refresh_token: &str) -> Result<Option<Session>, StoreError> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .tables()
            .sessions
            .iter()
            .find(|s| s.refresh_token == refresh_token && s.is_live(now))
            .cloned())
    }

    async fn find_user_session(
        &self,
        user_id: Uuid,
        refresh_token: &str,
    ) -> Result<Option<Session>, StoreError> {
        Ok(self
            .find_session(refresh_token)
            .await?
            .filter(|s| s.user_id == user_id))
    }

    async fn delete_session(&self, refresh_token: &str) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut t = self.tables();
        let before = t.sessions.len();
        t.sessions.retain(|s| s.refresh_token != refresh_token);
        Ok(t.sessions.len() != before)
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let mut all = self.tables().products.clone();
        all.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(all)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        self.check_writable()?;
        let row = Product {
            id: Uuid::new_v4(),
            title: product.title,
            categories: product.categories,
            weight: product.weight,
            calories: product.calories,
            group_blood_not_allowed: product.group_blood_not_allowed,
            recommended: product.recommended,
        };
        self.tables().products.push(row.clone());
        Ok(row)
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.tables().products.iter().find(|p| p.id == id).cloned())
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>, StoreError> {
        let needle = query.to_lowercase();
        Ok(self
            .list_products()
            .await?
            .into_iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&needle)
                    || p.categories.to_lowercase().contains(&needle)
            })
            .collect())
    }

    async fn products_not_allowed_for(&self, blood_group: u8) -> Result<Vec<Product>, StoreError> {
        Ok(self
            .list_products()
            .await?
            .into_iter()
            .filter(|p| not_allowed_for(p, blood_group))
            .collect())
    }

    async fn insert_consumed(&self, row: ConsumedProduct) -> Result<(), StoreError> {
        self.check_writable()?;
        self.tables().consumed.push(row);
        Ok(())
    }

    async fn delete_consumed(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut t = self.tables();
        let before = t.consumed.len();
        t.consumed.retain(|c| !(c.id == id && c.user_id == user_id));
        Ok(t.consumed.len() != before)
    }

    async fn consumed_between(
        &self,
        user_id: Uuid,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<(ConsumedProduct, Product)>, StoreError> {
        let t = self.tables();
        let mut rows: Vec<(ConsumedProduct, Product)> = t
            .consumed
            .iter()
            .filter(|c| c.user_id == user_id && c.date >= start && c.date <= end)
            .filter_map(|c| {
                t.products
                    .iter()
                    .find(|p| p.id == c.product_id)
                    .map(|p| (c.clone(), p.clone()))
            })
            .collect();
        rows.sort_by_key(|(c, _)| c.date);
        Ok(rows)
    }

    async fn insert_daily_intake(&self, row: DailyIntake) -> Result<(), StoreError> {
        self.check_writable()?;
        self.tables().daily_intakes.push(row);
        Ok(())
    }
}
