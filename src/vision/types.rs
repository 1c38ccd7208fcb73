use serde::{Deserialize, Serialize};

/// One food the model recognized on a photo. Weights are visual estimates
/// with no precision guarantee; clients edit them before saving a meal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognizedFoodItem {
    pub name: String,
    pub weight_grams: f64,
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,
    pub fats_per_100g: f64,
    pub carbs_per_100g: f64,
    pub confidence: f64,
}

/// Failure classification for one analysis attempt. The orchestrator turns
/// any of these into a FAILED photo status; retry policy is the caller's.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("model response did not match the expected contract: {0}")]
    InvalidModelResponse(String),
    #[error("vision provider rate limited the request")]
    RateLimited,
    #[error("vision provider rejected the credentials")]
    Auth,
    #[error("vision provider rejected the request: {0}")]
    BadRequest(String),
    #[error("transient failure talking to the vision provider: {0}")]
    Transient(String),
}

impl VisionError {
    /// Whether a later retry of the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VisionError::RateLimited | VisionError::Transient(_))
    }
}
