use crate::models::RecipeCandidate;
use crate::ranking::constraints::MAX_DIVERSITY;
use std::cmp::Ordering;

/// Weights used to blend the per-recipe signals into one ranking score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub similarity: f64,
    pub nutrition: f64,
    pub diversity: f64,
    /// Map the 1-5 diversity level onto [0, 1] instead of using it raw
    pub normalize_diversity: bool,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            similarity: 0.6,
            nutrition: 0.3,
            diversity: 0.1,
            normalize_diversity: false,
        }
    }
}

impl ScoreWeights {
    pub fn with_normalized_diversity(mut self, normalize: bool) -> Self {
        self.normalize_diversity = normalize;
        self
    }

    /// `0.6 * similarity + 0.3 * nutrition + 0.1 * diversity` with the default weights.
    ///
    /// The diversity term is the raw level unless normalization is enabled,
    /// so it shifts every candidate by the same constant.
    pub fn combine(&self, similarity: f64, nutrition_score: f64, diversity_level: u8) -> f64 {
        let diversity = if self.normalize_diversity {
            (diversity_level as f64 - 1.0) / (MAX_DIVERSITY as f64 - 1.0)
        } else {
            diversity_level as f64
        };

        self.similarity * similarity + self.nutrition * nutrition_score + self.diversity * diversity
    }

    /// Fill in `combined_score` for every candidate
    pub fn apply(&self, candidates: &mut [RecipeCandidate], diversity_level: u8) {
        for recipe in candidates.iter_mut() {
            recipe.combined_score =
                self.combine(recipe.similarity_score, recipe.nutrition_score, diversity_level);
        }
    }
}

/// Sort descending by combined score; ties keep their search order
pub fn sort_by_combined(candidates: &mut [RecipeCandidate]) {
    candidates.sort_by(|a, b| {
        b.combined_score
            .partial_cmp(&a.combined_score)
            .unwrap_or(Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Nutrition;

    fn candidate(id: &str, similarity: f64, nutrition_score: f64) -> RecipeCandidate {
        RecipeCandidate {
            id: id.to_string(),
            name: id.to_string(),
            ingredients: String::new(),
            instructions: String::new(),
            tags: String::new(),
            cuisine: String::new(),
            nutrition: Nutrition::default(),
            similarity_score: similarity,
            nutrition_score,
            combined_score: 0.0,
        }
    }

    #[test]
    fn test_combined_score_formula() {
        let weights = ScoreWeights::default();
        let score = weights.combine(0.8, 1.0, 3);
        assert!((score - 1.08).abs() < 1e-9);
    }

    #[test]
    fn test_normalized_diversity() {
        let weights = ScoreWeights::default().with_normalized_diversity(true);
        assert!((weights.combine(0.8, 1.0, 1) - 0.78).abs() < 1e-9);
        assert!((weights.combine(0.8, 1.0, 5) - 0.88).abs() < 1e-9);
    }

    #[test]
    fn test_apply_and_sort() {
        let mut candidates = vec![
            candidate("a", 0.5, 1.0),
            candidate("b", 0.9, 0.2),
            candidate("c", 0.9, 1.0),
        ];
        ScoreWeights::default().apply(&mut candidates, 2);
        sort_by_combined(&mut candidates);

        let order: Vec<&str> = candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        assert!((candidates[0].combined_score - (0.54 + 0.3 + 0.2)).abs() < 1e-9);
    }
}
