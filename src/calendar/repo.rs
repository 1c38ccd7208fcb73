use anyhow::Context;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::daily_log::DailyLog;
use crate::nutrition::category::MealCategory;

#[derive(Debug, FromRow)]
pub struct MealSummary {
    pub id: Uuid,
    pub eaten_at: OffsetDateTime,
    pub category: MealCategory,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_fats: f64,
    pub total_carbs: f64,
    pub food_items_count: i64,
}

/// Logs with `start <= log_date < end`, oldest first.
pub async fn daily_logs_in_range(
    db: &PgPool,
    user_id: Uuid,
    start: Date,
    end: Date,
) -> anyhow::Result<Vec<DailyLog>> {
    sqlx::query_as::<_, DailyLog>(
        r#"
        SELECT id, log_date, total_calories, total_protein, total_fats,
               total_carbs, target_calories, deviation_percent, goal_achieved
        FROM daily_logs
        WHERE user_id = $1 AND log_date >= $2 AND log_date < $3
        ORDER BY log_date ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(db)
    .await
    .context("list daily logs")
}

pub async fn daily_log_for_day(
    db: &PgPool,
    user_id: Uuid,
    day: Date,
) -> anyhow::Result<Option<DailyLog>> {
    sqlx::query_as::<_, DailyLog>(
        r#"
        SELECT id, log_date, total_calories, total_protein, total_fats,
               total_carbs, target_calories, deviation_percent, goal_achieved
        FROM daily_logs
        WHERE user_id = $1 AND log_date = $2
        "#,
    )
    .bind(user_id)
    .bind(day)
    .fetch_optional(db)
    .await
    .context("get daily log")
}

/// Meals whose `eaten_at` falls in the day's UTC window, oldest first.
pub async fn meals_for_day(
    db: &PgPool,
    user_id: Uuid,
    day: Date,
) -> anyhow::Result<Vec<MealSummary>> {
    let window_start = day.midnight().assume_utc();
    let window_end = window_start + time::Duration::days(1);

    sqlx::query_as::<_, MealSummary>(
        r#"
        SELECT m.id, m.eaten_at, m.category,
               m.total_calories, m.total_protein, m.total_fats, m.total_carbs,
               (SELECT COUNT(*) FROM food_items fi WHERE fi.meal_id = m.id) AS food_items_count
        FROM meals m
        WHERE m.user_id = $1 AND m.eaten_at >= $2 AND m.eaten_at < $3
        ORDER BY m.eaten_at ASC
        "#,
    )
    .bind(user_id)
    .bind(window_start)
    .bind(window_end)
    .fetch_all(db)
    .await
    .context("list meals for day")
}
