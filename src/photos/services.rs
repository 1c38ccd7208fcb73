use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::ImageFormat;
use time::OffsetDateTime;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::vision::RecognizedFoodItem;

use super::repo::{self, FoodPhoto, PhotoStatus};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const JPEG_QUALITY: u8 = 80;

/// Interval clients poll status at, and how long a poller should keep
/// trying before giving up on a terminal state.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_POLL_MAX_WAIT: Duration = Duration::from_secs(60);

/// Shown whenever analysis ends in FAILED, whatever the classified cause
/// was. Provider detail stays in logs and the photo row.
pub const ANALYSIS_FAILED_MESSAGE: &str = "Could not recognize food in this photo";

pub struct PreparedImage {
    pub bytes: Bytes,
    pub ext: &'static str,
    pub content_type: &'static str,
}

/// Validate and normalize an upload. Web-decodable containers pass through
/// untouched; anything else the decoder understands is re-encoded to JPEG.
/// A failed sniff or decode fails the whole ingest; the original is never
/// stored unconverted.
pub fn prepare_image(raw: Bytes) -> Result<PreparedImage, ApiError> {
    if raw.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::PayloadTooLarge(MAX_UPLOAD_BYTES));
    }

    let format = image::guess_format(&raw).map_err(|_| ApiError::UnsupportedFormat)?;
    match format {
        ImageFormat::Jpeg => Ok(PreparedImage {
            bytes: raw,
            ext: "jpg",
            content_type: "image/jpeg",
        }),
        ImageFormat::Png => Ok(PreparedImage {
            bytes: raw,
            ext: "png",
            content_type: "image/png",
        }),
        ImageFormat::WebP => Ok(PreparedImage {
            bytes: raw,
            ext: "webp",
            content_type: "image/webp",
        }),
        ImageFormat::Gif => Ok(PreparedImage {
            bytes: raw,
            ext: "gif",
            content_type: "image/gif",
        }),
        _ => reencode_to_jpeg(&raw),
    }
}

fn reencode_to_jpeg(raw: &[u8]) -> Result<PreparedImage, ApiError> {
    let decoded = image::load_from_memory(raw).map_err(|_| ApiError::UnsupportedFormat)?;
    // JPEG has no alpha channel.
    let rgb = decoded.into_rgb8();
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|_| ApiError::UnsupportedFormat)?;
    Ok(PreparedImage {
        bytes: Bytes::from(out),
        ext: "jpg",
        content_type: "image/jpeg",
    })
}

/// Store an uploaded photo and create its record. Rows are born in
/// PROCESSING: ingestion implicitly starts the analysis lifecycle.
#[instrument(skip(state, raw), fields(user_id = %user_id, bytes = raw.len()))]
pub async fn ingest(state: &AppState, user_id: Uuid, raw: Bytes) -> Result<FoodPhoto, ApiError> {
    let prepared = prepare_image(raw)?;

    let photo_id = Uuid::new_v4();
    let key = format!("photos/{}/{}.{}", user_id, photo_id, prepared.ext);
    let stored = state
        .storage
        .put_object(&key, prepared.bytes, prepared.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    let photo = FoodPhoto {
        id: photo_id,
        user_id,
        storage_key: key.clone(),
        storage_url: stored.url,
        uploaded_at: OffsetDateTime::now_utc(),
        auto_delete_at: stored.auto_delete_at,
        processing_status: PhotoStatus::Processing,
        recognized_items: None,
    };

    if let Err(e) = repo::insert(&state.db, &photo).await {
        if let Err(cleanup) = state.storage.delete_object(&key).await {
            warn!(error = %cleanup, %key, "orphaned object cleanup failed");
        }
        return Err(ApiError::Internal(e));
    }

    Ok(photo)
}

/// What an analysis-facing endpoint reports about a photo.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub photo_id: Uuid,
    pub status: PhotoStatus,
    pub recognized_items: Option<Vec<RecognizedFoodItem>>,
}

async fn owned_photo(
    state: &AppState,
    user_id: Uuid,
    photo_id: Uuid,
) -> Result<FoodPhoto, ApiError> {
    let photo = repo::get(&state.db, photo_id)
        .await?
        .ok_or(ApiError::NotFound("photo"))?;
    if photo.user_id != user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(photo)
}

fn outcome_from_row(photo: FoodPhoto) -> Result<AnalysisOutcome, ApiError> {
    let recognized_items = match photo.recognized_items {
        Some(value) => Some(
            serde_json::from_value::<Vec<RecognizedFoodItem>>(value)
                .context("decode stored recognized items")?,
        ),
        None => None,
    };
    Ok(AnalysisOutcome {
        photo_id: photo.id,
        status: photo.processing_status,
        recognized_items,
    })
}

async fn stored_outcome(state: &AppState, photo_id: Uuid) -> Result<AnalysisOutcome, ApiError> {
    let photo = repo::get(&state.db, photo_id)
        .await?
        .ok_or(ApiError::NotFound("photo"))?;
    outcome_from_row(photo)
}

/// Drive one photo through analysis. Terminal photos return their stored
/// outcome without another model call; a lost race against a concurrent
/// call resolves the same way, so the first terminal write always wins.
#[instrument(skip(state), fields(user_id = %user_id, photo_id = %photo_id))]
pub async fn run_analysis(
    state: &AppState,
    user_id: Uuid,
    photo_id: Uuid,
) -> Result<AnalysisOutcome, ApiError> {
    let photo = owned_photo(state, user_id, photo_id).await?;
    if photo.processing_status.is_terminal() {
        return outcome_from_row(photo);
    }

    match state.vision.analyze(&photo.storage_url).await {
        Ok(items) => {
            let payload = serde_json::to_value(&items).context("serialize recognized items")?;
            if repo::mark_completed(&state.db, photo_id, &payload).await? {
                Ok(AnalysisOutcome {
                    photo_id,
                    status: PhotoStatus::Completed,
                    recognized_items: Some(items),
                })
            } else {
                stored_outcome(state, photo_id).await
            }
        }
        Err(e) => {
            warn!(error = %e, retryable = e.is_retryable(), "analysis failed");
            if repo::mark_failed(&state.db, photo_id, &e.to_string()).await? {
                Ok(AnalysisOutcome {
                    photo_id,
                    status: PhotoStatus::Failed,
                    recognized_items: None,
                })
            } else {
                stored_outcome(state, photo_id).await
            }
        }
    }
}

pub async fn get_status(
    state: &AppState,
    user_id: Uuid,
    photo_id: Uuid,
) -> Result<PhotoStatus, ApiError> {
    let photo = owned_photo(state, user_id, photo_id).await?;
    Ok(photo.processing_status)
}

/// Results become readable once the photo is terminal; asking earlier is
/// a client pacing error, not a server fault.
pub async fn get_results(
    state: &AppState,
    user_id: Uuid,
    photo_id: Uuid,
) -> Result<AnalysisOutcome, ApiError> {
    let photo = owned_photo(state, user_id, photo_id).await?;
    if !photo.processing_status.is_terminal() {
        return Err(ApiError::Validation("analysis is still in progress".into()));
    }
    outcome_from_row(photo)
}

/// Poll `fetch` until it reports a terminal status or the wait budget runs
/// out. Returns `Ok(None)` on timeout. The deadline is checked before each
/// sleep, so small budgets terminate deterministically.
pub async fn await_terminal_status<F, Fut, E>(
    mut fetch: F,
    poll_interval: Duration,
    max_wait: Duration,
) -> Result<Option<PhotoStatus>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PhotoStatus, E>>,
{
    let deadline = tokio::time::Instant::now() + max_wait;
    loop {
        let status = fetch().await?;
        if status.is_terminal() {
            return Ok(Some(status));
        }
        if tokio::time::Instant::now() + poll_interval > deadline {
            return Ok(None);
        }
        tokio::time::sleep(poll_interval).await;
    }
}
