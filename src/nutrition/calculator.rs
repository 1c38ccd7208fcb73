use serde::{Deserialize, Serialize};

use super::round1;

/// Macro quantities for a concrete amount of food: kcal for energy,
/// grams for the macros.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub fats: f64,
    pub carbs: f64,
}

/// Per-100g rates, the form food databases and the vision model report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Per100g {
    pub calories: f64,
    pub protein: f64,
    pub fats: f64,
    pub carbs: f64,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CalcError {
    #[error("weight must be a positive number of grams, got {0}")]
    InvalidWeight(f64),
}

pub(crate) fn valid_weight(weight_grams: f64) -> bool {
    weight_grams.is_finite() && weight_grams > 0.0
}

/// Scale per-100g rates to an actual portion weight. Each output is
/// rounded to one decimal.
pub fn for_weight(weight_grams: f64, per100: Per100g) -> Result<MacroTotals, CalcError> {
    if !valid_weight(weight_grams) {
        return Err(CalcError::InvalidWeight(weight_grams));
    }
    let factor = weight_grams / 100.0;
    Ok(MacroTotals {
        calories: round1(per100.calories * factor),
        protein: round1(per100.protein * factor),
        fats: round1(per100.fats * factor),
        carbs: round1(per100.carbs * factor),
    })
}

/// Fold `for_weight` over a list of portions. Portions with a non-positive
/// weight are skipped rather than failing the whole sum.
pub fn sum<I>(items: I) -> MacroTotals
where
    I: IntoIterator<Item = (f64, Per100g)>,
{
    let mut total = MacroTotals::default();
    for (weight_grams, per100) in items {
        if let Ok(portion) = for_weight(weight_grams, per100) {
            total.calories += portion.calories;
            total.protein += portion.protein;
            total.fats += portion.fats;
            total.carbs += portion.carbs;
        }
    }
    MacroTotals {
        calories: round1(total.calories),
        protein: round1(total.protein),
        fats: round1(total.fats),
        carbs: round1(total.carbs),
    }
}

/// Recompute totals for a new weight when only the old totals are at hand:
/// back-derives the implicit per-100g rates from `old_totals / old_weight`
/// and reapplies them. Callers must ensure the back-derivation is still
/// meaningful for their data (no unit drift since the totals were made).
pub fn rescale(
    old_weight: f64,
    new_weight: f64,
    old_totals: MacroTotals,
) -> Result<MacroTotals, CalcError> {
    if !valid_weight(old_weight) {
        return Err(CalcError::InvalidWeight(old_weight));
    }
    let per100 = Per100g {
        calories: old_totals.calories / old_weight * 100.0,
        protein: old_totals.protein / old_weight * 100.0,
        fats: old_totals.fats / old_weight * 100.0,
        carbs: old_totals.carbs / old_weight * 100.0,
    };
    for_weight(new_weight, per100)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHICKEN: Per100g = Per100g {
        calories: 165.0,
        protein: 31.0,
        fats: 3.6,
        carbs: 0.0,
    };

    fn close(a: f64, b: f64) {
        assert!((a - b).abs() <= 0.2, "{a} vs {b}");
    }

    #[test]
    fn scales_linearly_with_weight() {
        let single = for_weight(100.0, CHICKEN).unwrap();
        let double = for_weight(200.0, CHICKEN).unwrap();
        assert_eq!(double.calories, single.calories * 2.0);
        assert_eq!(double.protein, single.protein * 2.0);
        assert_eq!(double.fats, single.fats * 2.0);
        assert_eq!(double.carbs, single.carbs * 2.0);
    }

    #[test]
    fn chicken_portion_totals() {
        let totals = for_weight(200.0, CHICKEN).unwrap();
        assert_eq!(totals.calories, 330.0);
        assert_eq!(totals.protein, 62.0);
        assert_eq!(totals.fats, 7.2);
        assert_eq!(totals.carbs, 0.0);
    }

    #[test]
    fn outputs_round_to_one_decimal() {
        let per100 = Per100g {
            calories: 123.456,
            protein: 10.111,
            fats: 5.049,
            carbs: 33.333,
        };
        let totals = for_weight(150.0, per100).unwrap();
        assert_eq!(totals.calories, 185.2);
        assert_eq!(totals.protein, 15.2);
        assert_eq!(totals.fats, 7.6);
        assert_eq!(totals.carbs, 50.0);
    }

    #[test]
    fn rejects_non_positive_weight() {
        assert_eq!(
            for_weight(0.0, CHICKEN),
            Err(CalcError::InvalidWeight(0.0))
        );
        assert_eq!(
            for_weight(-50.0, CHICKEN),
            Err(CalcError::InvalidWeight(-50.0))
        );
        assert!(for_weight(f64::NAN, CHICKEN).is_err());
    }

    #[test]
    fn rescale_round_trips_with_for_weight() {
        let old = for_weight(180.0, CHICKEN).unwrap();
        let rescaled = rescale(180.0, 250.0, old).unwrap();
        let direct = for_weight(250.0, CHICKEN).unwrap();
        close(rescaled.calories, direct.calories);
        close(rescaled.protein, direct.protein);
        close(rescaled.fats, direct.fats);
        close(rescaled.carbs, direct.carbs);
    }

    #[test]
    fn rescale_rejects_non_positive_old_weight() {
        let totals = MacroTotals {
            calories: 100.0,
            protein: 10.0,
            fats: 5.0,
            carbs: 20.0,
        };
        assert!(rescale(0.0, 100.0, totals).is_err());
        assert!(rescale(-1.0, 100.0, totals).is_err());
    }

    #[test]
    fn sum_of_nothing_is_zero() {
        assert_eq!(sum(std::iter::empty()), MacroTotals::default());
    }

    #[test]
    fn sum_is_order_independent() {
        let rice = Per100g {
            calories: 130.0,
            protein: 2.7,
            fats: 0.3,
            carbs: 28.0,
        };
        let a = sum(vec![(200.0, CHICKEN), (150.0, rice)]);
        let b = sum(vec![(150.0, rice), (200.0, CHICKEN)]);
        assert_eq!(a, b);
    }

    #[test]
    fn sum_skips_non_positive_weights() {
        let with_junk = sum(vec![(200.0, CHICKEN), (0.0, CHICKEN), (-3.0, CHICKEN)]);
        let clean = sum(vec![(200.0, CHICKEN)]);
        assert_eq!(with_junk, clean);
    }
}
