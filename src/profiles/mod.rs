use anyhow::Context;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Daily calorie target from the profile service's table, if the user set
/// one. Profiles are written elsewhere; this crate only reads them.
pub async fn target_calories_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
) -> anyhow::Result<Option<f64>> {
    sqlx::query_scalar::<_, f64>("SELECT target_calories FROM user_profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .context("fetch target calories")
}
