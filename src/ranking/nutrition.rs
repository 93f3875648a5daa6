use crate::models::Nutrition;
use std::collections::BTreeMap;

/// Score how well a recipe's nutrition fits a condition's targets, in [0, 1].
///
/// Calories are only penalized above target; every other nutrient is
/// penalized for deviating in either direction. The penalty is relative to
/// the target and saturates at zero. With no comparable nutrients the score
/// is neutral (1.0).
pub fn nutrition_score(nutrition: &Nutrition, limits: &BTreeMap<String, f64>) -> f64 {
    let mut total = 0.0;
    let mut scored = 0usize;

    for (nutrient, target) in limits {
        let Some(actual) = nutrition.get(nutrient) else {
            continue;
        };

        let deviation = if nutrient == "calories" {
            (actual - target).max(0.0)
        } else {
            (actual - target).abs()
        };
        total += (1.0 - deviation / (target + 0.1)).max(0.0);
        scored += 1;
    }

    if scored == 0 {
        1.0
    } else {
        total / scored as f64
    }
}
