pub mod repo;

pub use repo::{recompute_tx, DailyLog};

use crate::nutrition::round2;

/// Calorie target a day falls back to when the user never set one.
pub const DEFAULT_TARGET_CALORIES: f64 = 2000.0;
/// A day counts as on-goal when actual calories land within this percent
/// band around the target.
pub const GOAL_TOLERANCE_PERCENT: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DaySummary {
    pub target_calories: f64,
    pub deviation_percent: f64,
    pub goal_achieved: bool,
}

/// Deviation and goal verdict for a day's calorie total. Non-positive
/// targets are treated as absent so the division stays meaningful.
pub fn summarize(total_calories: f64, target_calories: f64) -> DaySummary {
    let target = if target_calories > 0.0 {
        target_calories
    } else {
        DEFAULT_TARGET_CALORIES
    };
    let deviation_percent = round2((total_calories - target) / target * 100.0);
    DaySummary {
        target_calories: target,
        deviation_percent,
        goal_achieved: deviation_percent.abs() <= GOAL_TOLERANCE_PERCENT,
    }
}
