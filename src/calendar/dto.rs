use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::daily_log::DailyLog;
use crate::nutrition::category::MealCategory;
use crate::nutrition::round2;

use super::format_date;
use super::repo::MealSummary;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLogView {
    pub id: Uuid,
    pub date: String,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_fats: f64,
    pub total_carbs: f64,
    pub target_calories: f64,
    pub deviation_percent: f64,
    pub goal_achieved: bool,
}

impl From<DailyLog> for DailyLogView {
    fn from(log: DailyLog) -> Self {
        Self {
            id: log.id,
            date: format_date(log.log_date),
            total_calories: log.total_calories,
            total_protein: log.total_protein,
            total_fats: log.total_fats,
            total_carbs: log.total_carbs,
            target_calories: log.target_calories,
            deviation_percent: log.deviation_percent,
            goal_achieved: log.goal_achieved,
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthStats {
    pub total_days: i64,
    pub days_with_goal_achieved: i64,
    pub average_calories: f64,
    pub success_rate: f64,
}

/// Aggregate stats over the month's logged days. A month with no logs
/// reports zeros rather than dividing by nothing.
pub fn month_stats(logs: &[DailyLog]) -> MonthStats {
    if logs.is_empty() {
        return MonthStats {
            total_days: 0,
            days_with_goal_achieved: 0,
            average_calories: 0.0,
            success_rate: 0.0,
        };
    }
    let total_days = logs.len() as i64;
    let achieved = logs.iter().filter(|log| log.goal_achieved).count() as i64;
    let calories: f64 = logs.iter().map(|log| log.total_calories).sum();
    MonthStats {
        total_days,
        days_with_goal_achieved: achieved,
        average_calories: round2(calories / total_days as f64),
        success_rate: round2(achieved as f64 / total_days as f64 * 100.0),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthResponse {
    pub year: i32,
    pub month: u8,
    pub daily_logs: Vec<DailyLogView>,
    pub stats: MonthStats,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MealSummaryView {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub eaten_at: OffsetDateTime,
    pub category: MealCategory,
    pub total_calories: f64,
    pub total_protein: f64,
    pub total_fats: f64,
    pub total_carbs: f64,
    pub food_items_count: i64,
}

impl From<MealSummary> for MealSummaryView {
    fn from(meal: MealSummary) -> Self {
        Self {
            id: meal.id,
            eaten_at: meal.eaten_at,
            category: meal.category,
            total_calories: meal.total_calories,
            total_protein: meal.total_protein,
            total_fats: meal.total_fats,
            total_carbs: meal.total_carbs,
            food_items_count: meal.food_items_count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayResponse {
    pub date: String,
    pub daily_log: Option<DailyLogView>,
    pub meals: Vec<MealSummaryView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn log(day: u8, calories: f64, goal_achieved: bool) -> DailyLog {
        DailyLog {
            id: Uuid::new_v4(),
            log_date: date!(2025 - 03 - 01).replace_day(day).unwrap(),
            total_calories: calories,
            total_protein: 100.0,
            total_fats: 60.0,
            total_carbs: 200.0,
            target_calories: 2000.0,
            deviation_percent: 0.0,
            goal_achieved,
        }
    }

    #[test]
    fn empty_month_reports_zeros() {
        assert_eq!(
            month_stats(&[]),
            MonthStats {
                total_days: 0,
                days_with_goal_achieved: 0,
                average_calories: 0.0,
                success_rate: 0.0,
            }
        );
    }

    #[test]
    fn stats_average_and_success_rate() {
        let logs = vec![
            log(1, 2000.0, true),
            log(2, 2100.0, true),
            log(3, 2600.0, false),
        ];
        let stats = month_stats(&logs);
        assert_eq!(stats.total_days, 3);
        assert_eq!(stats.days_with_goal_achieved, 2);
        assert_eq!(stats.average_calories, 2233.33);
        assert_eq!(stats.success_rate, 66.67);
    }

    #[test]
    fn view_formats_date_as_iso_day() {
        let view = DailyLogView::from(log(7, 1800.0, true));
        assert_eq!(view.date, "2025-03-07");
    }
}
