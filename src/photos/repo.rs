use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Lifecycle of an uploaded photo. COMPLETED and FAILED are terminal.
/// UPLOADING never appears on stored rows; clients use it while the
/// upload request is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "photo_status", rename_all = "UPPERCASE")]
pub enum PhotoStatus {
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl PhotoStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PhotoStatus::Completed | PhotoStatus::Failed)
    }
}

/// Stored photo row. `last_error` stays in the table for operators and is
/// deliberately absent here; nothing in the request path reads it back.
#[derive(Debug, Clone, FromRow)]
pub struct FoodPhoto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub storage_key: String,
    pub storage_url: String,
    pub uploaded_at: OffsetDateTime,
    pub auto_delete_at: OffsetDateTime,
    pub processing_status: PhotoStatus,
    pub recognized_items: Option<serde_json::Value>,
}

pub async fn insert(db: &PgPool, photo: &FoodPhoto) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO food_photos
            (id, user_id, storage_key, storage_url, uploaded_at, auto_delete_at, processing_status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(photo.id)
    .bind(photo.user_id)
    .bind(&photo.storage_key)
    .bind(&photo.storage_url)
    .bind(photo.uploaded_at)
    .bind(photo.auto_delete_at)
    .bind(photo.processing_status)
    .execute(db)
    .await
    .context("insert food photo")?;
    Ok(())
}

pub async fn get(db: &PgPool, photo_id: Uuid) -> anyhow::Result<Option<FoodPhoto>> {
    sqlx::query_as::<_, FoodPhoto>(
        r#"
        SELECT id, user_id, storage_key, storage_url, uploaded_at, auto_delete_at,
               processing_status, recognized_items
        FROM food_photos
        WHERE id = $1
        "#,
    )
    .bind(photo_id)
    .fetch_optional(db)
    .await
    .context("get food photo")
}

/// Move a PROCESSING photo to COMPLETED and store the recognized items.
/// Returns false when the photo had already reached a terminal state, in
/// which case nothing changes: the first writer wins.
pub async fn mark_completed(
    db: &PgPool,
    photo_id: Uuid,
    items: &serde_json::Value,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE food_photos
        SET processing_status = 'COMPLETED', recognized_items = $2, last_error = NULL
        WHERE id = $1 AND processing_status = 'PROCESSING'
        "#,
    )
    .bind(photo_id)
    .bind(items)
    .execute(db)
    .await
    .context("mark photo completed")?;
    Ok(result.rows_affected() > 0)
}

/// Move a PROCESSING photo to FAILED, keeping the classified reason for
/// operators. Same first-writer-wins contract as `mark_completed`.
pub async fn mark_failed(db: &PgPool, photo_id: Uuid, reason: &str) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE food_photos
        SET processing_status = 'FAILED', last_error = $2
        WHERE id = $1 AND processing_status = 'PROCESSING'
        "#,
    )
    .bind(photo_id)
    .bind(reason)
    .execute(db)
    .await
    .context("mark photo failed")?;
    Ok(result.rows_affected() > 0)
}
