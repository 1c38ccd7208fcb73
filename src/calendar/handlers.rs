use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use time::{Date, Month};
use tracing::instrument;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{month_stats, DayResponse, MonthResponse};
use super::{format_date, repo, DATE_FORMAT};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/calendar", get(month_view))
        .route("/calendar/:date", get(day_view))
}

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    year: Option<i32>,
    month: Option<u8>,
}

fn is_iso_day(raw: &str) -> bool {
    lazy_static! {
        static ref DAY_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    }
    DAY_RE.is_match(raw)
}

fn first_of(year: i32, month: u8) -> anyhow::Result<Date> {
    let month = Month::try_from(month).context("month out of range")?;
    Date::from_calendar_date(year, month, 1).context("invalid calendar date")
}

fn month_bounds(year: i32, month: u8) -> Result<(Date, Date), ApiError> {
    if !(2000..=2100).contains(&year) {
        return Err(ApiError::Validation(
            "year must be between 2000 and 2100".into(),
        ));
    }
    if !(1..=12).contains(&month) {
        return Err(ApiError::Validation("month must be between 1 and 12".into()));
    }
    let start = first_of(year, month)?;
    let end = if month == 12 {
        first_of(year + 1, 1)?
    } else {
        first_of(year, month + 1)?
    };
    Ok((start, end))
}

fn parse_day(raw: &str) -> Result<Date, ApiError> {
    if !is_iso_day(raw) {
        return Err(ApiError::Validation(
            "date must be formatted YYYY-MM-DD".into(),
        ));
    }
    Date::parse(raw, DATE_FORMAT)
        .map_err(|_| ApiError::Validation(format!("{raw} is not a real calendar date")))
}

#[instrument(skip(state))]
async fn month_view(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthResponse>, ApiError> {
    let (Some(year), Some(month)) = (query.year, query.month) else {
        return Err(ApiError::Validation("year and month are required".into()));
    };
    let (start, end) = month_bounds(year, month)?;

    let logs = repo::daily_logs_in_range(&state.db, user_id, start, end).await?;
    let stats = month_stats(&logs);
    Ok(Json(MonthResponse {
        year,
        month,
        daily_logs: logs.into_iter().map(Into::into).collect(),
        stats,
    }))
}

#[instrument(skip(state))]
async fn day_view(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(date): Path<String>,
) -> Result<Json<DayResponse>, ApiError> {
    let day = parse_day(&date)?;

    let daily_log = repo::daily_log_for_day(&state.db, user_id, day).await?;
    let meals = repo::meals_for_day(&state.db, user_id, day).await?;
    Ok(Json(DayResponse {
        date: format_date(day),
        daily_log: daily_log.map(Into::into),
        meals: meals.into_iter().map(Into::into).collect(),
    }))
}
