use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Number of blood groups tracked per product.
pub const BLOOD_GROUPS: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub categories: String,
    pub weight: f64,   // grams the calorie figure refers to
    pub calories: f64, // kcal per `weight` grams
    /// Index `g - 1` is true when blood group `g` should avoid this product.
    pub group_blood_not_allowed: Vec<bool>,
    pub recommended: bool,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub categories: String,
    pub weight: f64,
    pub calories: f64,
    pub group_blood_not_allowed: Vec<bool>,
    pub recommended: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ConsumedProduct {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub quantity: f64, // grams
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyIntake {
    pub id: Uuid,
    pub user_id: Uuid,
    pub weight: f64,
    pub height: f64,
    pub age: f64,
    pub blood_group: i16,
    pub daily_kcal: f64,
    pub not_recommended_products: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
}

/// Flat row of `consumed_products JOIN products`.
#[derive(Debug, FromRow)]
pub struct ConsumedJoinRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub date: OffsetDateTime,
    pub quantity: f64,
    pub p_title: String,
    pub p_categories: String,
    pub p_weight: f64,
    pub p_calories: f64,
    pub p_group_blood_not_allowed: Vec<bool>,
    pub p_recommended: bool,
}

impl From<ConsumedJoinRow> for (ConsumedProduct, Product) {
    fn from(r: ConsumedJoinRow) -> Self {
        (
            ConsumedProduct {
                id: r.id,
                user_id: r.user_id,
                product_id: r.product_id,
                date: r.date,
                quantity: r.quantity,
            },
            Product {
                id: r.product_id,
                title: r.p_title,
                categories: r.p_categories,
                weight: r.p_weight,
                calories: r.p_calories,
                group_blood_not_allowed: r.p_group_blood_not_allowed,
                recommended: r.p_recommended,
            },
        )
    }
}
