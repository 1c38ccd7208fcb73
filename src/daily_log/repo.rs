use anyhow::Context;
use sqlx::{FromRow, Postgres, Transaction};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::profiles;

use super::{summarize, DEFAULT_TARGET_CALORIES};

#[derive(Debug, Clone, FromRow)]
pub struct DailyLog {
    pub id: Uuid,
    pub log_date: Date,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_fats: f64,
    pub total_carbs: f64,
    pub target_calories: f64,
    pub deviation_percent: f64,
    pub goal_achieved: bool,
}

#[derive(Debug, FromRow)]
struct DayTotals {
    meal_count: i64,
    calories: f64,
    protein: f64,
    fats: f64,
    carbs: f64,
}

/// Re-derive the daily log for one user+day from the meals stored in that
/// day's UTC window. Runs on the caller's transaction so a meal mutation
/// and its log update commit or roll back together. With no meals left
/// the row is deleted; the delete is a no-op when none exists.
pub async fn recompute_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    day: Date,
) -> anyhow::Result<()> {
    let window_start = day.midnight().assume_utc();
    let window_end = window_start + time::Duration::days(1);

    let totals = sqlx::query_as::<_, DayTotals>(
        r#"
        SELECT COUNT(*) AS meal_count,
               COALESCE(SUM(total_calories), 0) AS calories,
               COALESCE(SUM(total_protein), 0) AS protein,
               COALESCE(SUM(total_fats), 0) AS fats,
               COALESCE(SUM(total_carbs), 0) AS carbs
        FROM meals
        WHERE user_id = $1 AND eaten_at >= $2 AND eaten_at < $3
        "#,
    )
    .bind(user_id)
    .bind(window_start)
    .bind(window_end)
    .fetch_one(&mut **tx)
    .await
    .context("sum meals for day")?;

    if totals.meal_count == 0 {
        sqlx::query("DELETE FROM daily_logs WHERE user_id = $1 AND log_date = $2")
            .bind(user_id)
            .bind(day)
            .execute(&mut **tx)
            .await
            .context("delete empty daily log")?;
        return Ok(());
    }

    let target = profiles::target_calories_tx(tx, user_id)
        .await?
        .unwrap_or(DEFAULT_TARGET_CALORIES);
    let summary = summarize(totals.calories, target);

    sqlx::query(
        r#"
        INSERT INTO daily_logs
            (id, user_id, log_date, total_calories, total_protein, total_fats, total_carbs,
             target_calories, deviation_percent, goal_achieved, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (user_id, log_date) DO UPDATE SET
            total_calories = EXCLUDED.total_calories,
            total_protein = EXCLUDED.total_protein,
            total_fats = EXCLUDED.total_fats,
            total_carbs = EXCLUDED.total_carbs,
            target_calories = EXCLUDED.target_calories,
            deviation_percent = EXCLUDED.deviation_percent,
            goal_achieved = EXCLUDED.goal_achieved,
            updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(day)
    .bind(totals.calories)
    .bind(totals.protein)
    .bind(totals.fats)
    .bind(totals.carbs)
    .bind(summary.target_calories)
    .bind(summary.deviation_percent)
    .bind(summary.goal_achieved)
    .bind(OffsetDateTime::now_utc())
    .execute(&mut **tx)
    .await
    .context("upsert daily log")?;

    Ok(())
}
