//! Pure calorie arithmetic: recommended daily intake and per-day totals.

use serde_json::Value;
use thiserror::Error;
use time::{
    format_description::well_known::Rfc3339,
    macros::{format_description, time},
    Date, OffsetDateTime,
};

use crate::{
    error::StoreError,
    products::repo_types::{ConsumedProduct, Product, BLOOD_GROUPS},
};

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Product not found")]
    ProductNotFound,
    #[error("Consumed product not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Mifflin-St Jeor basal metabolic rate in kcal/day.
///
/// Every input must be a positive finite number, and so must the result.
pub fn calculate_daily_kcal(
    weight_kg: Option<f64>,
    height_cm: Option<f64>,
    age_years: Option<f64>,
) -> Result<f64, IntakeError> {
    let invalid = || IntakeError::InvalidInput("Please provide valid weight, height, and age".into());
    let positive = |v: Option<f64>| v.filter(|x| x.is_finite() && *x > 0.0).ok_or_else(invalid);

    let weight = positive(weight_kg)?;
    let height = positive(height_cm)?;
    let age = positive(age_years)?;

    let kcal = 10.0 * weight + 6.25 * height - 5.0 * age + 5.0;
    if kcal.is_finite() && kcal > 0.0 {
        Ok(kcal)
    } else {
        Err(invalid())
    }
}

/// Reads a JSON number or numeric string.
pub fn numeric(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Blood group `1..=4` from a JSON number or numeric string.
pub fn blood_group(value: Option<&Value>) -> Result<u8, IntakeError> {
    numeric(value)
        .filter(|g| g.fract() == 0.0 && *g >= 1.0 && *g <= BLOOD_GROUPS as f64)
        .map(|g| g as u8)
        .ok_or_else(|| IntakeError::InvalidInput("Blood group must be 1, 2, 3 or 4".into()))
}

/// Parses `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_date(raw: Option<&str>) -> Result<OffsetDateTime, IntakeError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| IntakeError::InvalidInput("Date is required".into()))?;

    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map(|d| d.midnight().assume_utc())
        .map_err(|_| IntakeError::InvalidInput(format!("Invalid date: {raw}")))
}

/// UTC calendar day containing `at`: [00:00:00.000, 23:59:59.999].
pub fn day_window(at: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
    let day = at.to_offset(time::UtcOffset::UTC).date();
    let start = day.midnight().assume_utc();
    let end = day.with_time(time!(23:59:59.999)).assume_utc();
    (start, end)
}

/// Calories for `grams` of `product`, scaled from its reference weight.
pub fn calories_for(product: &Product, grams: f64) -> f64 {
    if product.weight > 0.0 {
        product.calories / product.weight * grams
    } else {
        0.0
    }
}

pub fn total_calories<'a, I>(items: I) -> f64
where
    I: IntoIterator<Item = (&'a ConsumedProduct, &'a Product)>,
{
    items
        .into_iter()
        .map(|(c, p)| calories_for(p, c.quantity))
        .sum()
}
