pub mod calculator;
pub mod category;

/// Nutrition values are stored with one decimal of precision.
pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Percentages and statistics are reported with two decimals.
pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
