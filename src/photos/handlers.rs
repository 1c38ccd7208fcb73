use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{AnalysisResponse, AnalyzeRequest, PhotoStatusResponse, UploadPhotoResponse};
use super::services;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/photos/upload", post(upload_photo))
        .route("/photos/analyze", post(analyze_photo))
        .route("/photos/:id/status", get(photo_status))
        .route("/photos/:id/results", get(photo_results))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[instrument(skip(state, mp))]
async fn upload_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<UploadPhotoResponse>), ApiError> {
    let mut photo_bytes = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() == Some("photo") {
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(format!("unreadable multipart field: {}", e)))?;
            photo_bytes = Some(data);
            break;
        }
    }
    let Some(raw) = photo_bytes else {
        return Err(ApiError::Validation("photo field is required".into()));
    };

    let photo = services::ingest(&state, user_id, raw).await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadPhotoResponse {
            photo_id: photo.id,
            storage_url: photo.storage_url,
            processing_status: photo.processing_status,
        }),
    ))
}

#[instrument(skip(state, body))]
async fn analyze_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let Some(photo_id) = body.photo_id else {
        return Err(ApiError::Validation("photoId is required".into()));
    };

    let outcome = services::run_analysis(&state, user_id, photo_id).await?;
    Ok(Json(outcome.into()))
}

#[instrument(skip(state))]
async fn photo_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PhotoStatusResponse>, ApiError> {
    let status = services::get_status(&state, user_id, id).await?;
    Ok(Json(PhotoStatusResponse {
        photo_id: id,
        processing_status: status,
    }))
}

#[instrument(skip(state))]
async fn photo_results(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let outcome = services::get_results(&state, user_id, id).await?;
    Ok(Json(outcome.into()))
}
