use crate::config::tables::RuleTables;
use crate::error::{Error, Result};
use crate::models::RecipeCandidate;
use crate::ranking::constraints::ConstraintSet;
use crate::ranking::diversity::diversify;
use crate::ranking::filter::{filter_dietary, filter_nutrient_limits, matches_cuisine};
use crate::ranking::nutrition::nutrition_score;
use crate::ranking::score::{sort_by_combined, ScoreWeights};
use crate::search::SearchMatch;
use std::sync::Arc;
use tracing::{debug, info};

/// Turns raw search matches plus constraints into the final ranked list
#[derive(Debug, Clone)]
pub struct RankingPipeline {
    tables: Arc<RuleTables>,
    weights: ScoreWeights,
}

impl RankingPipeline {
    pub fn new(tables: Arc<RuleTables>, weights: ScoreWeights) -> Self {
        Self { tables, weights }
    }

    pub fn tables(&self) -> &RuleTables {
        &self.tables
    }

    /// Build candidates from search matches.
    ///
    /// Matches with incomplete metadata are dropped, as are matches outside
    /// the requested cuisine. Fails with [`Error::NoMatches`] when nothing
    /// survives.
    pub fn assemble(
        &self,
        matches: Vec<SearchMatch>,
        constraints: &ConstraintSet,
    ) -> Result<Vec<RecipeCandidate>> {
        let total = matches.len();
        let mut candidates = Vec::with_capacity(total);

        for m in matches {
            let recipe = match RecipeCandidate::from_metadata(&m.id, m.score, &m.metadata) {
                Ok(recipe) => recipe,
                Err(Error::PartialMetadata(field)) => {
                    debug!("Dropping match {}: missing {}", m.id, field);
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Some(cuisine) = &constraints.cuisine {
                if !matches_cuisine(&recipe, cuisine) {
                    continue;
                }
            }

            candidates.push(recipe);
        }

        debug!("Assembled {}/{} candidates", candidates.len(), total);

        if candidates.is_empty() {
            return Err(Error::NoMatches);
        }
        Ok(candidates)
    }

    /// Filter, score, sort and diversify assembled candidates.
    ///
    /// Fails with [`Error::AllFiltered`] when the dietary, allergy or
    /// nutrient filters exclude every candidate.
    pub fn rank(
        &self,
        candidates: Vec<RecipeCandidate>,
        constraints: &ConstraintSet,
    ) -> Result<Vec<RecipeCandidate>> {
        let assembled = candidates.len();
        let mut candidates = filter_dietary(candidates, constraints)?;

        let rule = match &constraints.health_condition {
            Some(condition) => Some(self.tables.health_rule(condition).ok_or_else(|| {
                Error::Validation(format!("Unknown health condition '{condition}'"))
            })?),
            None => None,
        };

        if let Some(rule) = rule {
            candidates = filter_nutrient_limits(candidates, rule);
        }

        if candidates.is_empty() {
            info!("All {} candidates excluded by filters", assembled);
            return Err(Error::AllFiltered);
        }

        for recipe in candidates.iter_mut() {
            recipe.nutrition_score = match rule {
                Some(rule) => nutrition_score(&recipe.nutrition, &rule.nutrient_limits),
                None => 1.0,
            };
        }

        self.weights.apply(&mut candidates, constraints.diversity_level);
        sort_by_combined(&mut candidates);

        let ranked = diversify(candidates, constraints.diversity_level);
        debug!(
            "Ranked {} of {} candidates (diversity {})",
            ranked.len(),
            assembled,
            constraints.diversity_level
        );
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pipeline() -> RankingPipeline {
        RankingPipeline::new(Arc::new(RuleTables::builtin()), ScoreWeights::default())
    }

    fn search_match(
        id: &str,
        score: f64,
        name: &str,
        ingredients: &str,
        calories: f64,
    ) -> SearchMatch {
        SearchMatch {
            id: id.to_string(),
            score,
            metadata: json!({
                "name": name,
                "ingredients": ingredients,
                "instructions": "Cook it.",
                "tags": "",
                "cuisine": "italian",
                "calories": calories,
                "protein": 10.0,
                "carbs": 20.0,
                "fats": 8.0
            })
            .as_object()
            .cloned()
            .unwrap(),
        }
    }

    fn constraints(
        restrictions: &str,
        condition: Option<&str>,
        cuisine: Option<&str>,
        diversity: i64,
    ) -> ConstraintSet {
        ConstraintSet::normalize(
            restrictions,
            "",
            condition,
            cuisine,
            diversity,
            &RuleTables::builtin(),
        )
        .unwrap()
    }

    #[test]
    fn test_assemble_drops_partial_matches() {
        let mut broken = search_match("2", 0.9, "Broken", "rice", 100.0);
        broken.metadata.remove("calories");

        let candidates = pipeline()
            .assemble(
                vec![search_match("1", 0.8, "Risotto", "rice", 450.0), broken],
                &constraints("", None, None, 1),
            )
            .unwrap();

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "1");
    }

    #[test]
    fn test_assemble_cuisine_filter_yields_no_matches() {
        let result = pipeline().assemble(
            vec![search_match("1", 0.8, "Risotto", "rice", 450.0)],
            &constraints("", None, Some("mexican"), 1),
        );
        assert!(matches!(result, Err(Error::NoMatches)));
    }

    #[test]
    fn test_rank_all_filtered() {
        let p = pipeline();
        let c = constraints("vegetarian", None, None, 1);
        let stew = search_match("1", 0.8, "Beef Stew", "beef, carrots, potato", 500.0);
        let candidates = p.assemble(vec![stew], &c).unwrap();

        assert!(matches!(p.rank(candidates, &c), Err(Error::AllFiltered)));
    }

    #[test]
    fn test_rank_orders_by_combined_score() {
        let p = pipeline();
        let c = constraints("", Some("weight loss"), None, 1);
        let matches = vec![
            search_match("far", 0.60, "Salad", "lettuce", 200.0),
            search_match("close", 0.95, "Soup", "lentils", 350.0),
            search_match("heavy", 0.99, "Lasagna", "pasta, cheese", 900.0),
        ];

        let ranked = p.rank(p.assemble(matches, &c).unwrap(), &c).unwrap();
        let ids: Vec<&str> = ranked.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["close", "far"]);
        assert_eq!(ranked[0].nutrition_score, 1.0);
        assert!((ranked[0].combined_score - (0.6 * 0.95 + 0.3 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_rank_keeps_top_three_with_diversity() {
        let p = pipeline();
        let c = constraints("", None, None, 5);
        let matches: Vec<SearchMatch> = (0..20)
            .map(|i| {
                search_match(
                    &i.to_string(),
                    1.0 - i as f64 * 0.01,
                    "Pasta",
                    "tomato",
                    300.0,
                )
            })
            .collect();

        let ranked = p.rank(p.assemble(matches, &c).unwrap(), &c).unwrap();
        let top: Vec<&str> = ranked.iter().take(3).map(|r| r.id.as_str()).collect();
        assert_eq!(top, vec!["0", "1", "2"]);
        // 17 tail items, 10% kept
        assert_eq!(ranked.len(), 3 + 2);
    }
}
