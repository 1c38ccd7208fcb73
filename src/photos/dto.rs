use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::vision::RecognizedFoodItem;

use super::repo::PhotoStatus;
use super::services::{AnalysisOutcome, ANALYSIS_FAILED_MESSAGE};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPhotoResponse {
    pub photo_id: Uuid,
    pub storage_url: String,
    pub processing_status: PhotoStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub photo_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoStatusResponse {
    pub photo_id: Uuid,
    pub processing_status: PhotoStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub photo_id: Uuid,
    pub processing_status: PhotoStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recognized_items: Option<Vec<RecognizedFoodItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl From<AnalysisOutcome> for AnalysisResponse {
    fn from(outcome: AnalysisOutcome) -> Self {
        let error = (outcome.status == PhotoStatus::Failed).then_some(ANALYSIS_FAILED_MESSAGE);
        Self {
            photo_id: outcome.photo_id,
            processing_status: outcome.status,
            recognized_items: outcome.recognized_items,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_outcome_carries_the_generic_message() {
        let response: AnalysisResponse = AnalysisOutcome {
            photo_id: Uuid::new_v4(),
            status: PhotoStatus::Failed,
            recognized_items: None,
        }
        .into();

        assert_eq!(response.error, Some(ANALYSIS_FAILED_MESSAGE));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["processingStatus"], "FAILED");
        assert!(json.get("recognizedItems").is_none());
    }

    #[test]
    fn completed_outcome_has_items_and_no_error() {
        let response: AnalysisResponse = AnalysisOutcome {
            photo_id: Uuid::new_v4(),
            status: PhotoStatus::Completed,
            recognized_items: Some(vec![]),
        }
        .into();

        assert_eq!(response.error, None);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["processingStatus"], "COMPLETED");
        assert_eq!(json["recognizedItems"], serde_json::json!([]));
        assert!(json.get("error").is_none());
    }
}
