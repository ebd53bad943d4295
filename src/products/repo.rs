use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    db::{like_pattern, PgStore},
    error::StoreError,
    products::repo_types::{ConsumedJoinRow, ConsumedProduct, DailyIntake, NewProduct, Product},
};

/// Catalog, consumption log and daily intake persistence.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError>;
    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;
    /// Case-insensitive substring match on title or categories.
    async fn search_products(&self, query: &str) -> Result<Vec<Product>, StoreError>;
    /// Products flagged as not allowed for blood group `1..=4`.
    async fn products_not_allowed_for(&self, blood_group: u8) -> Result<Vec<Product>, StoreError>;

    async fn insert_consumed(&self, row: ConsumedProduct) -> Result<(), StoreError>;
    /// Deletes the row only when owned by `user_id`; returns whether a row was removed.
    async fn delete_consumed(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError>;
    /// Rows for `user_id` with `start <= date <= end`, joined to their products.
    async fn consumed_between(
        &self,
        user_id: Uuid,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<(ConsumedProduct, Product)>, StoreError>;

    async fn insert_daily_intake(&self, row: DailyIntake) -> Result<(), StoreError>;
}

const PRODUCT_COLUMNS: &str =
    "id, title, categories, weight, calories, group_blood_not_allowed, recommended";

#[async_trait]
impl ProductStore for PgStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY title"
        ))
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (id, title, categories, weight, calories, group_blood_not_allowed, recommended)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&product.title)
        .bind(&product.categories)
        .bind(product.weight)
        .bind(product.calories)
        .bind(&product.group_blood_not_allowed)
        .bind(product.recommended)
        .fetch_one(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn find_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn search_products(&self, query: &str) -> Result<Vec<Product>, StoreError> {
        sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE title ILIKE $1 OR categories ILIKE $1
            ORDER BY title
            "#
        ))
        .bind(like_pattern(query))
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn products_not_allowed_for(&self, blood_group: u8) -> Result<Vec<Product>, StoreError> {
        // Postgres arrays are 1-based, so the blood group is the index as-is.
        sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE group_blood_not_allowed[$1] IS TRUE
            ORDER BY title
            "#
        ))
        .bind(i32::from(blood_group))
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn insert_consumed(&self, row: ConsumedProduct) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO consumed_products (id, user_id, product_id, date, quantity)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.product_id)
        .bind(row.date)
        .bind(row.quantity)
        .execute(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn delete_consumed(&self, user_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        let res = sqlx::query("DELETE FROM consumed_products WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(StoreError::from_sqlx)?;
        Ok(res.rows_affected() > 0)
    }

    async fn consumed_between(
        &self,
        user_id: Uuid,
        start: OffsetDateTime,
        end: OffsetDateTime,
    ) -> Result<Vec<(ConsumedProduct, Product)>, StoreError> {
        let rows = sqlx::query_as::<_, ConsumedJoinRow>(
            r#"
            SELECT c.id, c.user_id, c.product_id, c.date, c.quantity,
                   p.title AS p_title, p.categories AS p_categories, p.weight AS p_weight,
                   p.calories AS p_calories,
                   p.group_blood_not_allowed AS p_group_blood_not_allowed,
                   p.recommended AS p_recommended
            FROM consumed_products c
            JOIN products p ON p.id = c.product_id
            WHERE c.user_id = $1 AND c.date >= $2 AND c.date <= $3
            ORDER BY c.date ASC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_daily_intake(&self, row: DailyIntake) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO daily_intakes
                (id, user_id, weight, height, age, blood_group, daily_kcal, not_recommended_products, date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.weight)
        .bind(row.height)
        .bind(row.age)
        .bind(row.blood_group)
        .bind(row.daily_kcal)
        .bind(&row.not_recommended_products)
        .bind(row.date)
        .execute(&self.db)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }
}
