use crate::config::tables::HealthRule;
use crate::error::{Error, Result};
use crate::models::RecipeCandidate;
use crate::ranking::constraints::ConstraintSet;
use regex::Regex;
use tracing::debug;

/// Excluded for vegan and vegetarian diets
pub const MEAT_TERMS: &[&str] = &[
    "beef", "chicken", "pork", "fish", "shrimp", "meat", "turkey", "bacon",
];

/// Excluded for gluten-free diets
pub const GLUTEN_SOURCES: &[&str] = &["wheat", "barley", "rye", "bread", "pasta", "flour"];

/// Collect every ingredient term that disqualifies a recipe.
///
/// Multi-word allergens are split on whitespace, so "tree nuts" excludes
/// any recipe mentioning "tree" or "nuts".
pub fn exclusion_terms(constraints: &ConstraintSet) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    let mut push = |term: &str| {
        if !term.is_empty() && !terms.iter().any(|t| t == term) {
            terms.push(term.to_string());
        }
    };

    if constraints.has_restriction("vegan") || constraints.has_restriction("vegetarian") {
        for term in MEAT_TERMS {
            push(*term);
        }
    }

    if constraints.has_restriction("gluten-free") {
        for term in GLUTEN_SOURCES {
            push(*term);
        }
    }

    for allergen in &constraints.allergies {
        for word in allergen.split_whitespace() {
            push(&word.to_lowercase());
        }
    }

    terms
}

/// Case-insensitive whole-word matcher over a fixed set of terms
#[derive(Debug, Clone)]
pub struct ExclusionMatcher {
    pattern: Option<Regex>,
}

impl ExclusionMatcher {
    pub fn new(terms: &[String]) -> Result<Self> {
        if terms.is_empty() {
            return Ok(Self { pattern: None });
        }

        let alternatives = terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"(?i)(?:^|\W)(?:{alternatives})(?:\W|$)"))
            .map_err(|e| Error::Internal(format!("Failed to build exclusion pattern: {e}")))?;

        Ok(Self {
            pattern: Some(pattern),
        })
    }

    /// True when any term occurs in `text` as a whole word
    pub fn matches(&self, text: &str) -> bool {
        match &self.pattern {
            Some(pattern) => !text.is_empty() && pattern.is_match(text),
            None => false,
        }
    }
}

/// Drop recipes whose ingredients mention an excluded meat, gluten source or allergen
pub fn filter_dietary(
    candidates: Vec<RecipeCandidate>,
    constraints: &ConstraintSet,
) -> Result<Vec<RecipeCandidate>> {
    let terms = exclusion_terms(constraints);
    if terms.is_empty() {
        return Ok(candidates);
    }

    let matcher = ExclusionMatcher::new(&terms)?;
    let before = candidates.len();
    let kept: Vec<RecipeCandidate> = candidates
        .into_iter()
        .filter(|recipe| !matcher.matches(&recipe.ingredients))
        .collect();

    debug!(
        "Dietary filter kept {}/{} candidates ({} exclusion terms)",
        kept.len(),
        before,
        terms.len()
    );
    Ok(kept)
}

/// Case-insensitive substring match on the recipe's cuisine metadata
pub fn matches_cuisine(recipe: &RecipeCandidate, cuisine: &str) -> bool {
    recipe
        .cuisine
        .to_lowercase()
        .contains(&cuisine.trim().to_lowercase())
}

/// Hard-exclude recipes above any nutrient cap or carrying an avoid tag
pub fn filter_nutrient_limits(
    candidates: Vec<RecipeCandidate>,
    rule: &HealthRule,
) -> Vec<RecipeCandidate> {
    let before = candidates.len();
    let kept: Vec<RecipeCandidate> = candidates
        .into_iter()
        .filter(|recipe| within_limits(recipe, rule))
        .filter(|recipe| {
            let tags = recipe.tags.to_lowercase();
            !rule.avoid_tags.iter().any(|tag| tags.contains(tag.as_str()))
        })
        .collect();

    debug!("Nutrient filter kept {}/{} candidates", kept.len(), before);
    kept
}

fn within_limits(recipe: &RecipeCandidate, rule: &HealthRule) -> bool {
    rule.nutrient_limits
        .iter()
        .all(|(nutrient, limit)| match recipe.nutrition.get(nutrient) {
            Some(value) => value <= *limit,
            // Caps on nutrients we don't store (sugar, sodium) can't be checked
            None => true,
        })
}
