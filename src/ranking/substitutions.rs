use crate::config::tables::RuleTables;
use serde::Serialize;

pub const MAX_SUGGESTIONS: usize = 3;

/// Substitutes offered for one ingredient of a displayed recipe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientSubstitution {
    pub ingredient: String,
    pub substitutes: Vec<String>,
}

/// Propose up to three substitutes for `ingredient`.
///
/// Substitution keywords are matched as substrings of the ingredient, and
/// the cuisine's characteristic ingredients are appended. Anything
/// containing an active allergen is left out.
pub fn suggest_substitutions(
    tables: &RuleTables,
    ingredient: &str,
    allergies: &[String],
    cuisine: Option<&str>,
) -> Vec<String> {
    let ingredient = ingredient.trim().to_lowercase();
    let allergies: Vec<String> = allergies
        .iter()
        .map(|a| a.trim().to_lowercase())
        .filter(|a| !a.is_empty())
        .collect();
    let is_safe = |candidate: &str| {
        let candidate = candidate.to_lowercase();
        !allergies.iter().any(|a| candidate.contains(a.as_str()))
    };

    let mut suggestions: Vec<String> = Vec::new();
    let mut add = |candidate: &String| {
        if is_safe(candidate) && !suggestions.contains(candidate) {
            suggestions.push(candidate.clone());
        }
    };

    if !ingredient.is_empty() {
        for (keyword, options) in &tables.substitutions {
            if ingredient.contains(keyword.as_str()) {
                options.iter().for_each(&mut add);
            }
        }
    }

    if let Some(local) = cuisine.and_then(|c| tables.cuisine_ingredients(&c.trim().to_lowercase()))
    {
        local.iter().for_each(&mut add);
    }

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}

/// Suggestions for every ingredient of a recipe that has any
pub fn substitutions_for_ingredients<'a>(
    tables: &RuleTables,
    ingredients: impl IntoIterator<Item = &'a str>,
    allergies: &[String],
    cuisine: Option<&str>,
) -> Vec<IngredientSubstitution> {
    ingredients
        .into_iter()
        .filter_map(|ingredient| {
            let substitutes = suggest_substitutions(tables, ingredient, allergies, cuisine);
            (!substitutes.is_empty()).then(|| IngredientSubstitution {
                ingredient: ingredient.to_string(),
                substitutes,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allergies(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_milk_without_soy() {
        let tables = RuleTables::builtin();
        let subs = suggest_substitutions(&tables, "milk", &allergies(&["soy"]), None);

        assert!(subs.len() <= MAX_SUGGESTIONS);
        assert!(!subs.contains(&"soy milk".to_string()));
        assert_eq!(subs, vec!["almond milk", "oat milk", "coconut milk"]);
    }

    #[test]
    fn test_keyword_matched_as_substring() {
        let tables = RuleTables::builtin();
        let subs = suggest_substitutions(&tables, "  Whole Milk ", &[], None);
        assert_eq!(subs, vec!["almond milk", "soy milk", "oat milk"]);
    }

    #[test]
    fn test_cuisine_adaptations_appended() {
        let tables = RuleTables::builtin();
        let subs = suggest_substitutions(&tables, "butter", &[], Some("Mexican"));
        assert_eq!(subs, vec!["coconut oil", "olive oil", "avocado"]);

        let subs = suggest_substitutions(&tables, "rice", &[], Some("asian"));
        assert_eq!(subs, vec!["soy sauce", "ginger", "sesame"]);
    }

    #[test]
    fn test_duplicates_removed() {
        let tables = RuleTables::builtin();
        // cheese and asian cuisine both offer tofu
        let subs = suggest_substitutions(
            &tables,
            "cheese",
            &allergies(&["yeast", "cashew"]),
            Some("asian"),
        );
        assert_eq!(subs, vec!["tofu", "soy sauce", "ginger"]);
    }

    #[test]
    fn test_unknown_ingredient_and_cuisine() {
        let tables = RuleTables::builtin();
        assert!(suggest_substitutions(&tables, "rice", &[], Some("martian")).is_empty());
        assert!(suggest_substitutions(&tables, "", &[], None).is_empty());
    }

    #[test]
    fn test_substitutions_for_ingredients() {
        let tables = RuleTables::builtin();
        let subs = substitutions_for_ingredients(
            &tables,
            ["butter", "rice", "egg"],
            &allergies(&["coconut"]),
            None,
        );

        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].ingredient, "butter");
        assert_eq!(subs[0].substitutes, vec!["olive oil", "avocado"]);
        assert_eq!(subs[1].ingredient, "egg");
    }
}
