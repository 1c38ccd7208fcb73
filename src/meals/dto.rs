use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::nutrition::category::MealCategory;

use super::repo::{FoodItem, Meal};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItemInput {
    pub name: String,
    pub weight_grams: f64,
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,
    pub fats_per_100g: f64,
    pub carbs_per_100g: f64,
    #[serde(default)]
    pub added_manually: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMealRequest {
    pub category: Option<MealCategory>,
    #[serde(default)]
    pub food_items: Vec<FoodItemInput>,
    pub photo_id: Option<Uuid>,
    /// Minutes between UTC and the client's local time, in the JavaScript
    /// `getTimezoneOffset` convention (-180 for UTC+3).
    pub client_timezone_offset: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMealRequest {
    pub category: Option<MealCategory>,
    pub food_items: Option<Vec<FoodItemInput>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodItemResponse {
    pub id: Uuid,
    pub name: String,
    pub weight_grams: f64,
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,
    pub fats_per_100g: f64,
    pub carbs_per_100g: f64,
    pub added_manually: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealResponse {
    pub id: Uuid,
    pub photo_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub eaten_at: OffsetDateTime,
    pub category: MealCategory,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_fats: f64,
    pub total_carbs: f64,
    pub food_items: Vec<FoodItemResponse>,
}

impl MealResponse {
    pub fn from_rows(meal: Meal, items: Vec<FoodItem>) -> Self {
        Self {
            id: meal.id,
            photo_id: meal.photo_id,
            eaten_at: meal.eaten_at,
            category: meal.category,
            total_calories: meal.total_calories,
            total_protein: meal.total_protein,
            total_fats: meal.total_fats,
            total_carbs: meal.total_carbs,
            food_items: items
                .into_iter()
                .map(|item| FoodItemResponse {
                    id: item.id,
                    name: item.name,
                    weight_grams: item.weight_grams,
                    calories_per_100g: item.calories_per_100g,
                    protein_per_100g: item.protein_per_100g,
                    fats_per_100g: item.fats_per_100g,
                    carbs_per_100g: item.carbs_per_100g,
                    added_manually: item.added_manually,
                })
                .collect(),
        }
    }
}
