use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "meal_category", rename_all = "UPPERCASE")]
pub enum MealCategory {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

/// Meal category for a local hour of day. The hour is normalized into
/// [0,24) first, so callers may pass shifted values directly.
pub fn suggest(local_hour: i32) -> MealCategory {
    match local_hour.rem_euclid(24) {
        6..=10 => MealCategory::Breakfast,
        11..=15 => MealCategory::Lunch,
        16..=20 => MealCategory::Dinner,
        _ => MealCategory::Snack,
    }
}

/// Local hour for a client-supplied timezone offset in minutes, using the
/// JavaScript `getTimezoneOffset` sign convention (UTC minus local, so
/// -180 means UTC+3). Without an offset the server's UTC hour is used,
/// a deliberate approximation.
pub fn local_hour_from_offset(utc_now: OffsetDateTime, offset_minutes: Option<i32>) -> i32 {
    let local = match offset_minutes {
        Some(offset) => utc_now - Duration::minutes(offset as i64),
        None => utc_now,
    };
    local.hour() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn partitions_the_day_into_four_buckets() {
        for hour in 0..24 {
            let expected = match hour {
                6..=10 => MealCategory::Breakfast,
                11..=15 => MealCategory::Lunch,
                16..=20 => MealCategory::Dinner,
                _ => MealCategory::Snack,
            };
            assert_eq!(suggest(hour), expected, "hour {hour}");
        }
    }

    #[test]
    fn bucket_edges() {
        assert_eq!(suggest(5), MealCategory::Snack);
        assert_eq!(suggest(6), MealCategory::Breakfast);
        assert_eq!(suggest(11), MealCategory::Lunch);
        assert_eq!(suggest(16), MealCategory::Dinner);
        assert_eq!(suggest(21), MealCategory::Snack);
    }

    #[test]
    fn periodic_over_whole_days() {
        for hour in 0..24 {
            assert_eq!(suggest(hour), suggest(hour + 24));
            assert_eq!(suggest(hour), suggest(hour + 24 * 3));
            assert_eq!(suggest(hour), suggest(hour - 24));
        }
    }

    #[test]
    fn offset_shifts_the_hour() {
        let utc = datetime!(2025-03-10 12:30 UTC);
        // UTC+3 client
        assert_eq!(local_hour_from_offset(utc, Some(-180)), 15);
        // UTC-5 client
        assert_eq!(local_hour_from_offset(utc, Some(300)), 7);
        assert_eq!(local_hour_from_offset(utc, None), 12);
    }

    #[test]
    fn offset_can_cross_midnight() {
        let utc = datetime!(2025-03-10 23:30 UTC);
        assert_eq!(local_hour_from_offset(utc, Some(-180)), 2);
        let utc = datetime!(2025-03-10 01:00 UTC);
        assert_eq!(local_hour_from_offset(utc, Some(300)), 20);
    }
}
