use anyhow::Context;
use time::{Duration, OffsetDateTime};
use tracing::instrument;
use uuid::Uuid;

use crate::daily_log;
use crate::error::ApiError;
use crate::nutrition::calculator::{self, MacroTotals, Per100g};
use crate::nutrition::category;
use crate::photos;
use crate::state::AppState;

use super::dto::{CreateMealRequest, FoodItemInput, UpdateMealRequest};
use super::repo::{self, FoodItem, Meal};

/// Timestamp for a meal logged "now". With an offset the meal is pinned to
/// the client's local midnight (stored in UTC) so it lands on the calendar
/// day the client saw; without one the server time is kept as is.
fn eaten_at_for_offset(utc_now: OffsetDateTime, offset_minutes: Option<i32>) -> OffsetDateTime {
    match offset_minutes {
        Some(offset) => {
            let local = utc_now - Duration::minutes(offset as i64);
            local.date().midnight().assume_utc()
        }
        None => utc_now,
    }
}

fn validated_items(items: &[FoodItemInput]) -> Result<(), ApiError> {
    for item in items {
        if !calculator::valid_weight(item.weight_grams) {
            return Err(ApiError::Validation(format!(
                "food item '{}' must have a positive weight in grams",
                item.name
            )));
        }
    }
    Ok(())
}

fn totals_for(items: &[FoodItemInput]) -> MacroTotals {
    calculator::sum(items.iter().map(|item| {
        (
            item.weight_grams,
            Per100g {
                calories: item.calories_per_100g,
                protein: item.protein_per_100g,
                fats: item.fats_per_100g,
                carbs: item.carbs_per_100g,
            },
        )
    }))
}

fn build_item(meal_id: Uuid, input: &FoodItemInput) -> FoodItem {
    FoodItem {
        id: Uuid::new_v4(),
        meal_id,
        name: input.name.clone(),
        weight_grams: input.weight_grams,
        calories_per_100g: input.calories_per_100g,
        protein_per_100g: input.protein_per_100g,
        fats_per_100g: input.fats_per_100g,
        carbs_per_100g: input.carbs_per_100g,
        added_manually: input.added_manually,
    }
}

async fn check_photo_owner(
    state: &AppState,
    user_id: Uuid,
    photo_id: Uuid,
) -> Result<(), ApiError> {
    let photo = photos::repo::get(&state.db, photo_id)
        .await?
        .ok_or(ApiError::NotFound("photo"))?;
    if photo.user_id != user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

#[instrument(skip(state, req), fields(user_id = %user_id))]
pub async fn create_meal(
    state: &AppState,
    user_id: Uuid,
    req: CreateMealRequest,
) -> Result<(Meal, Vec<FoodItem>), ApiError> {
    if req.food_items.is_empty() {
        return Err(ApiError::Validation("foodItems must not be empty".into()));
    }
    validated_items(&req.food_items)?;

    if let Some(photo_id) = req.photo_id {
        check_photo_owner(state, user_id, photo_id).await?;
    }

    let now = OffsetDateTime::now_utc();
    let eaten_at = eaten_at_for_offset(now, req.client_timezone_offset);
    let category = req.category.unwrap_or_else(|| {
        category::suggest(category::local_hour_from_offset(
            now,
            req.client_timezone_offset,
        ))
    });
    let totals = totals_for(&req.food_items);

    let meal = Meal {
        id: Uuid::new_v4(),
        user_id,
        photo_id: req.photo_id,
        eaten_at,
        category,
        total_calories: totals.calories,
        total_protein: totals.protein,
        total_fats: totals.fats,
        total_carbs: totals.carbs,
        created_at: now,
    };

    let mut tx = state.db.begin().await.context("begin tx")?;
    repo::insert_meal_tx(&mut tx, &meal).await?;
    let mut items = Vec::with_capacity(req.food_items.len());
    for (position, input) in req.food_items.iter().enumerate() {
        let item = build_item(meal.id, input);
        repo::insert_food_item_tx(&mut tx, &item, position as i32).await?;
        items.push(item);
    }
    daily_log::recompute_tx(&mut tx, user_id, eaten_at.date()).await?;
    tx.commit().await.context("commit tx")?;

    Ok((meal, items))
}

pub async fn get_meal(
    state: &AppState,
    user_id: Uuid,
    meal_id: Uuid,
) -> Result<(Meal, Vec<FoodItem>), ApiError> {
    let meal = repo::get_meal(&state.db, meal_id)
        .await?
        .ok_or(ApiError::NotFound("meal"))?;
    if meal.user_id != user_id {
        return Err(ApiError::Forbidden);
    }
    let items = repo::list_food_items(&state.db, meal_id).await?;
    Ok((meal, items))
}

#[instrument(skip(state, req), fields(user_id = %user_id, meal_id = %meal_id))]
pub async fn update_meal(
    state: &AppState,
    user_id: Uuid,
    meal_id: Uuid,
    req: UpdateMealRequest,
) -> Result<(Meal, Vec<FoodItem>), ApiError> {
    if req.category.is_none() && req.food_items.is_none() {
        return Err(ApiError::Validation("nothing to update".into()));
    }
    if let Some(items) = &req.food_items {
        if items.is_empty() {
            return Err(ApiError::Validation("foodItems must not be empty".into()));
        }
        validated_items(items)?;
    }

    let mut tx = state.db.begin().await.context("begin tx")?;
    let mut meal = repo::get_meal_tx(&mut tx, meal_id)
        .await?
        .ok_or(ApiError::NotFound("meal"))?;
    if meal.user_id != user_id {
        return Err(ApiError::Forbidden);
    }

    if let Some(new_category) = req.category {
        repo::update_category_tx(&mut tx, meal_id, new_category).await?;
        meal.category = new_category;
    }

    let mut replaced_items = None;
    if let Some(inputs) = &req.food_items {
        repo::delete_food_items_tx(&mut tx, meal_id).await?;
        let mut items = Vec::with_capacity(inputs.len());
        for (position, input) in inputs.iter().enumerate() {
            let item = build_item(meal_id, input);
            repo::insert_food_item_tx(&mut tx, &item, position as i32).await?;
            items.push(item);
        }
        let totals = totals_for(inputs);
        repo::update_totals_tx(&mut tx, meal_id, &totals).await?;
        meal.total_calories = totals.calories;
        meal.total_protein = totals.protein;
        meal.total_fats = totals.fats;
        meal.total_carbs = totals.carbs;
        replaced_items = Some(items);
    }

    daily_log::recompute_tx(&mut tx, user_id, meal.eaten_at.date()).await?;
    tx.commit().await.context("commit tx")?;

    let items = match replaced_items {
        Some(items) => items,
        None => repo::list_food_items(&state.db, meal_id).await?,
    };
    Ok((meal, items))
}

#[instrument(skip(state), fields(user_id = %user_id, meal_id = %meal_id))]
pub async fn delete_meal(state: &AppState, user_id: Uuid, meal_id: Uuid) -> Result<(), ApiError> {
    let mut tx = state.db.begin().await.context("begin tx")?;
    let meal = repo::get_meal_tx(&mut tx, meal_id)
        .await?
        .ok_or(ApiError::NotFound("meal"))?;
    if meal.user_id != user_id {
        return Err(ApiError::Forbidden);
    }
    // food_items go with the meal via ON DELETE CASCADE
    repo::delete_meal_tx(&mut tx, meal_id).await?;
    daily_log::recompute_tx(&mut tx, user_id, meal.eaten_at.date()).await?;
    tx.commit().await.context("commit tx")?;
    Ok(())
}
