use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{CreateMealRequest, MealResponse, UpdateMealRequest};
use super::services;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create_meal))
        .route(
            "/meals/:id",
            get(get_meal).patch(update_meal).delete(delete_meal),
        )
}

#[instrument(skip(state, req))]
async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateMealRequest>,
) -> Result<(StatusCode, HeaderMap, Json<MealResponse>), ApiError> {
    let (meal, items) = services::create_meal(&state, user_id, req).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/meals/{}", meal.id).parse() {
        headers.insert(header::LOCATION, location);
    }
    Ok((
        StatusCode::CREATED,
        headers,
        Json(MealResponse::from_rows(meal, items)),
    ))
}

#[instrument(skip(state))]
async fn get_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(meal_id): Path<Uuid>,
) -> Result<Json<MealResponse>, ApiError> {
    let (meal, items) = services::get_meal(&state, user_id, meal_id).await?;
    Ok(Json(MealResponse::from_rows(meal, items)))
}

#[instrument(skip(state, req))]
async fn update_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(meal_id): Path<Uuid>,
    Json(req): Json<UpdateMealRequest>,
) -> Result<Json<MealResponse>, ApiError> {
    let (meal, items) = services::update_meal(&state, user_id, meal_id, req).await?;
    Ok(Json(MealResponse::from_rows(meal, items)))
}

#[instrument(skip(state))]
async fn delete_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(meal_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    services::delete_meal(&state, user_id, meal_id).await?;
    Ok(StatusCode::OK)
}
