use anyhow::Context;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::nutrition::calculator::MacroTotals;
use crate::nutrition::category::MealCategory;

#[derive(Debug, Clone, FromRow)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub photo_id: Option<Uuid>,
    pub eaten_at: OffsetDateTime,
    pub category: MealCategory,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_fats: f64,
    pub total_carbs: f64,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct FoodItem {
    pub id: Uuid,
    pub meal_id: Uuid,
    pub name: String,
    pub weight_grams: f64,
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,
    pub fats_per_100g: f64,
    pub carbs_per_100g: f64,
    pub added_manually: bool,
}

pub async fn get_meal(db: &PgPool, meal_id: Uuid) -> anyhow::Result<Option<Meal>> {
    sqlx::query_as::<_, Meal>(
        r#"
        SELECT id, user_id, photo_id, eaten_at, category,
               total_calories, total_protein, total_fats, total_carbs, created_at
        FROM meals
        WHERE id = $1
        "#,
    )
    .bind(meal_id)
    .fetch_optional(db)
    .await
    .context("get meal")
}

pub async fn get_meal_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
) -> anyhow::Result<Option<Meal>> {
    sqlx::query_as::<_, Meal>(
        r#"
        SELECT id, user_id, photo_id, eaten_at, category,
               total_calories, total_protein, total_fats, total_carbs, created_at
        FROM meals
        WHERE id = $1
        "#,
    )
    .bind(meal_id)
    .fetch_optional(&mut **tx)
    .await
    .context("get meal in tx")
}

pub async fn list_food_items(db: &PgPool, meal_id: Uuid) -> anyhow::Result<Vec<FoodItem>> {
    sqlx::query_as::<_, FoodItem>(
        r#"
        SELECT id, meal_id, name, weight_grams, calories_per_100g, protein_per_100g,
               fats_per_100g, carbs_per_100g, added_manually
        FROM food_items
        WHERE meal_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(meal_id)
    .fetch_all(db)
    .await
    .context("list food items")
}

pub async fn insert_meal_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal: &Meal,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO meals
            (id, user_id, photo_id, eaten_at, category,
             total_calories, total_protein, total_fats, total_carbs, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(meal.id)
    .bind(meal.user_id)
    .bind(meal.photo_id)
    .bind(meal.eaten_at)
    .bind(meal.category)
    .bind(meal.total_calories)
    .bind(meal.total_protein)
    .bind(meal.total_fats)
    .bind(meal.total_carbs)
    .bind(meal.created_at)
    .execute(&mut **tx)
    .await
    .context("insert meal")?;
    Ok(())
}

pub async fn insert_food_item_tx(
    tx: &mut Transaction<'_, Postgres>,
    item: &FoodItem,
    position: i32,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO food_items
            (id, meal_id, name, weight_grams, calories_per_100g, protein_per_100g,
             fats_per_100g, carbs_per_100g, added_manually, position)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(item.id)
    .bind(item.meal_id)
    .bind(&item.name)
    .bind(item.weight_grams)
    .bind(item.calories_per_100g)
    .bind(item.protein_per_100g)
    .bind(item.fats_per_100g)
    .bind(item.carbs_per_100g)
    .bind(item.added_manually)
    .bind(position)
    .execute(&mut **tx)
    .await
    .context("insert food item")?;
    Ok(())
}

pub async fn update_category_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    category: MealCategory,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE meals SET category = $2 WHERE id = $1")
        .bind(meal_id)
        .bind(category)
        .execute(&mut **tx)
        .await
        .context("update meal category")?;
    Ok(())
}

pub async fn update_totals_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
    totals: &MacroTotals,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE meals
        SET total_calories = $2, total_protein = $3, total_fats = $4, total_carbs = $5
        WHERE id = $1
        "#,
    )
    .bind(meal_id)
    .bind(totals.calories)
    .bind(totals.protein)
    .bind(totals.fats)
    .bind(totals.carbs)
    .execute(&mut **tx)
    .await
    .context("update meal totals")?;
    Ok(())
}

pub async fn delete_food_items_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM food_items WHERE meal_id = $1")
        .bind(meal_id)
        .execute(&mut **tx)
        .await
        .context("delete food items")?;
    Ok(())
}

pub async fn delete_meal_tx(
    tx: &mut Transaction<'_, Postgres>,
    meal_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM meals WHERE id = $1")
        .bind(meal_id)
        .execute(&mut **tx)
        .await
        .context("delete meal")?;
    Ok(())
}
