use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    products::{
        calories::{self, IntakeError},
        dto::{
            ConsumedEntry, ConsumedRequest, CreateProductRequest, DailyIntakeParams,
            DailyIntakeResponse, DayInfo,
        },
        repo::ProductStore,
        repo_types::{ConsumedProduct, DailyIntake, NewProduct, Product, BLOOD_GROUPS},
    },
};

impl From<IntakeError> for AppError {
    fn from(e: IntakeError) -> Self {
        match e {
            IntakeError::InvalidInput(m) => AppError::Validation(m),
            IntakeError::ProductNotFound => AppError::NotFound("Product not found".into()),
            IntakeError::NotFound => AppError::NotFound("Consumed product not found".into()),
            IntakeError::Store(s) => s.into(),
        }
    }
}

pub async fn create_product(
    store: &dyn ProductStore,
    req: CreateProductRequest,
) -> Result<Product, IntakeError> {
    let title = req.title.trim().to_string();
    if title.is_empty() {
        return Err(IntakeError::InvalidInput("Title is required".into()));
    }
    if !(req.weight.is_finite() && req.weight > 0.0) {
        return Err(IntakeError::InvalidInput("Weight must be positive".into()));
    }
    if !(req.calories.is_finite() && req.calories >= 0.0) {
        return Err(IntakeError::InvalidInput("Calories must not be negative".into()));
    }
    if req.group_blood_not_allowed.len() != BLOOD_GROUPS {
        return Err(IntakeError::InvalidInput(format!(
            "groupBloodNotAllowed must hold {BLOOD_GROUPS} flags"
        )));
    }

    let product = store
        .create_product(NewProduct {
            title,
            categories: req.categories.trim().to_string(),
            weight: req.weight,
            calories: req.calories,
            group_blood_not_allowed: req.group_blood_not_allowed,
            recommended: req.recommended,
        })
        .await?;
    info!(product_id = %product.id, title = %product.title, "product created");
    Ok(product)
}

pub async fn search_products(
    store: &dyn ProductStore,
    query: Option<&str>,
) -> Result<Vec<Product>, IntakeError> {
    let query = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| IntakeError::InvalidInput("Query string is required".into()))?;
    Ok(store.search_products(query).await?)
}

/// Recommended kcal plus the titles a blood group should avoid. Persisted only when `user_id` is given.
pub async fn compute_daily_intake(
    store: &dyn ProductStore,
    params: &DailyIntakeParams,
    user_id: Option<Uuid>,
) -> Result<DailyIntakeResponse, IntakeError> {
    let weight = calories::numeric(params.weight.as_ref());
    let height = calories::numeric(params.height.as_ref());
    let age = calories::numeric(params.age.as_ref());
    let daily_kcal = calories::calculate_daily_kcal(weight, height, age)?;
    let blood_group = calories::blood_group(params.blood_group.as_ref())?;

    let not_recommended_products: Vec<String> = store
        .products_not_allowed_for(blood_group)
        .await?
        .into_iter()
        .map(|p| p.title)
        .collect();

    if let (Some(user_id), Some(weight), Some(height), Some(age)) = (user_id, weight, height, age) {
        store
            .insert_daily_intake(DailyIntake {
                id: Uuid::new_v4(),
                user_id,
                weight,
                height,
                age,
                blood_group: i16::from(blood_group),
                daily_kcal,
                not_recommended_products: not_recommended_products.clone(),
                date: OffsetDateTime::now_utc(),
            })
            .await?;
        info!(user_id = %user_id, daily_kcal, "daily intake recorded");
    }

    Ok(DailyIntakeResponse {
        daily_kcal,
        not_recommended_products,
    })
}

pub async fn record_consumption(
    store: &dyn ProductStore,
    user_id: Uuid,
    req: ConsumedRequest,
) -> Result<ConsumedProduct, IntakeError> {
    let product_id = req
        .product_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| IntakeError::InvalidInput("productId is required".into()))?;
    let product_id = Uuid::parse_str(product_id)
        .map_err(|_| IntakeError::InvalidInput("Invalid productId".into()))?;
    let date = calories::parse_date(req.date.as_deref())?;
    let quantity = calories::numeric(req.quantity.as_ref())
        .filter(|q| q.is_finite() && *q > 0.0)
        .ok_or_else(|| IntakeError::InvalidInput("Quantity must be a positive number".into()))?;

    if store.find_product(product_id).await?.is_none() {
        warn!(user_id = %user_id, product_id = %product_id, "consumption of unknown product");
        return Err(IntakeError::ProductNotFound);
    }

    let row = ConsumedProduct {
        id: Uuid::new_v4(),
        user_id,
        product_id,
        date,
        quantity,
    };
    store.insert_consumed(row.clone()).await?;
    info!(user_id = %user_id, consumed_id = %row.id, "consumption recorded");
    Ok(row)
}

/// Deletes one of the caller's own rows. Someone else's row is reported as missing.
pub async fn delete_consumption(
    store: &dyn ProductStore,
    user_id: Uuid,
    consumed_id: &str,
) -> Result<(), IntakeError> {
    let id = Uuid::parse_str(consumed_id.trim()).map_err(|_| IntakeError::NotFound)?;
    if !store.delete_consumed(user_id, id).await? {
        return Err(IntakeError::NotFound);
    }
    info!(user_id = %user_id, consumed_id = %id, "consumption deleted");
    Ok(())
}

pub async fn get_day_info(
    store: &dyn ProductStore,
    user_id: Uuid,
    date: Option<&str>,
) -> Result<DayInfo, IntakeError> {
    let at = calories::parse_date(date)?;
    let (start, end) = calories::day_window(at);
    let rows = store.consumed_between(user_id, start, end).await?;

    let total_calories = calories::total_calories(rows.iter().map(|(c, p)| (c, p)));
    debug!(user_id = %user_id, entries = rows.len(), total_calories, "day info");

    let consumed_products = rows
        .into_iter()
        .map(|(c, p)| ConsumedEntry {
            id: c.id,
            date: c.date,
            quantity: c.quantity,
            calories: calories::calories_for(&p, c.quantity),
            product: p,
        })
        .collect();

    Ok(DayInfo {
        date: start,
        total_calories,
        consumed_products,
    })
}
