use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::products::repo_types::Product;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub title: String,
    #[serde(default)]
    pub categories: String,
    pub weight: f64,
    pub calories: f64,
    pub group_blood_not_allowed: Vec<bool>,
    #[serde(default = "default_recommended")]
    pub recommended: bool,
}

fn default_recommended() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
}

/// Body metrics for the daily intake calculation. Accepted both as query
/// string and JSON body; values may be numbers or numeric strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyIntakeParams {
    pub weight: Option<Value>,
    pub height: Option<Value>,
    pub age: Option<Value>,
    #[serde(alias = "groupBloodNotAllowed", alias = "bloodType")]
    pub blood_group: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyIntakeResponse {
    pub daily_kcal: f64,
    pub not_recommended_products: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumedRequest {
    pub product_id: Option<String>,
    pub date: Option<String>,
    pub quantity: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumedEntry {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub quantity: f64,
    pub calories: f64,
    pub product: Product,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayInfo {
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub total_calories: f64,
    pub consumed_products: Vec<ConsumedEntry>,
}
