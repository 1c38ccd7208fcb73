use serde::Deserialize;

use super::types::{RecognizedFoodItem, VisionError};

// Wire contract the prompt demands. Parsing is strict about shape and
// field types; anything else is InvalidModelResponse, never a silent
// empty result.
#[derive(Debug, Deserialize)]
struct VisionPayload {
    #[serde(rename = "foodItems")]
    food_items: Vec<WireFoodItem>,
}

#[derive(Debug, Deserialize)]
struct WireFoodItem {
    name: String,
    weight_grams: f64,
    calories_per_100g: f64,
    protein_per_100g: f64,
    fats_per_100g: f64,
    carbs_per_100g: f64,
    confidence: f64,
}

/// Parse the model's answer into recognized items. An empty `foodItems`
/// array is a valid outcome, distinct from a malformed payload.
pub fn parse_food_items(raw: &str) -> Result<Vec<RecognizedFoodItem>, VisionError> {
    let json = strip_code_fence(raw);
    let payload: VisionPayload = serde_json::from_str(json)
        .map_err(|e| VisionError::InvalidModelResponse(e.to_string()))?;

    Ok(payload
        .food_items
        .into_iter()
        .map(|item| RecognizedFoodItem {
            name: item.name,
            weight_grams: item.weight_grams,
            calories_per_100g: item.calories_per_100g,
            protein_per_100g: item.protein_per_100g,
            fats_per_100g: item.fats_per_100g,
            carbs_per_100g: item.carbs_per_100g,
            confidence: item.confidence.clamp(0.0, 1.0),
        })
        .collect())
}

// Models sometimes wrap the JSON in a markdown fence despite the prompt.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let opened = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let closed = opened.strip_suffix("```").unwrap_or(opened);
    closed.trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const APPLE: &str = r#"{"foodItems": [{"name": "apple", "weight_grams": 150,
        "calories_per_100g": 52, "protein_per_100g": 0.3, "fats_per_100g": 0.2,
        "carbs_per_100g": 14, "confidence": 0.9}]}"#;

    #[test]
    fn parses_plain_json() {
        let items = parse_food_items(APPLE).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "apple");
        assert_eq!(items[0].weight_grams, 150.0);
        assert_eq!(items[0].calories_per_100g, 52.0);
        assert_eq!(items[0].confidence, 0.9);
    }

    #[test]
    fn strips_json_fence() {
        let fenced = format!("```json\n{}\n```", APPLE);
        let items = parse_food_items(&fenced).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn strips_bare_fence() {
        let fenced = format!("```\n{}\n```", APPLE);
        let items = parse_food_items(&fenced).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn fenced_empty_list_is_a_valid_result() {
        let items = parse_food_items("```json\n{\"foodItems\": []}\n```").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn malformed_json_is_invalid_response() {
        let err = parse_food_items("I think this is pasta with tomato sauce").unwrap_err();
        assert!(matches!(err, VisionError::InvalidModelResponse(_)));
    }

    #[test]
    fn missing_field_is_invalid_response() {
        let err = parse_food_items(r#"{"foodItems": [{"name": "apple"}]}"#).unwrap_err();
        assert!(matches!(err, VisionError::InvalidModelResponse(_)));
    }

    #[test]
    fn wrong_field_type_is_invalid_response() {
        let err = parse_food_items(
            r#"{"foodItems": [{"name": "apple", "weight_grams": "lots",
                "calories_per_100g": 52, "protein_per_100g": 0.3,
                "fats_per_100g": 0.2, "carbs_per_100g": 14, "confidence": 0.9}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, VisionError::InvalidModelResponse(_)));
    }

    #[test]
    fn confidence_is_clamped_to_unit_interval() {
        let raw = r#"{"foodItems": [
            {"name": "a", "weight_grams": 1, "calories_per_100g": 1, "protein_per_100g": 1,
             "fats_per_100g": 1, "carbs_per_100g": 1, "confidence": 1.7},
            {"name": "b", "weight_grams": 1, "calories_per_100g": 1, "protein_per_100g": 1,
             "fats_per_100g": 1, "carbs_per_100g": 1, "confidence": -0.2}]}"#;
        let items = parse_food_items(raw).unwrap();
        assert_eq!(items[0].confidence, 1.0);
        assert_eq!(items[1].confidence, 0.0);
    }
}
