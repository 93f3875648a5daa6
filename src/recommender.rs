use crate::config::{tables::RuleTables, Settings};
use crate::models::RecipeCandidate;
use crate::ranking::constraints::{split_terms, ConstraintSet, DEFAULT_DIVERSITY};
use crate::ranking::substitutions::substitutions_for_ingredients;
use crate::ranking::{
    suggest_substitutions, IngredientSubstitution, RankingPipeline, ScoreWeights,
};
use crate::search::{retry::with_backoff, Embedder, HttpEmbedder, PineconeIndex, VectorIndex};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Raw recommendation input, as typed by the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub restrictions: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub health_condition: Option<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default = "default_diversity")]
    pub diversity: i64,
}

fn default_diversity() -> i64 {
    DEFAULT_DIVERSITY as i64
}

impl Default for RecommendationRequest {
    fn default() -> Self {
        Self {
            query: String::new(),
            restrictions: String::new(),
            allergies: String::new(),
            health_condition: None,
            cuisine: None,
            diversity: default_diversity(),
        }
    }
}

/// A ranked recipe ready for display
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub recipe: RecipeCandidate,
    pub substitutions: Vec<IngredientSubstitution>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationSet {
    /// Candidates that survived filtering, before display truncation
    pub total: usize,
    pub results: Vec<Recommendation>,
}

/// Answers recommendation requests against the vector index
#[derive(Clone)]
pub struct Recommender {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    pipeline: RankingPipeline,
    initial_results: usize,
    display_count: usize,
}

impl Recommender {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        tables: Arc<RuleTables>,
        settings: &Settings,
    ) -> Self {
        let weights =
            ScoreWeights::default().with_normalized_diversity(settings.ranking.normalize_diversity);

        Self {
            index,
            embedder,
            pipeline: RankingPipeline::new(tables, weights),
            initial_results: settings.ranking.initial_results,
            display_count: settings.ranking.display_count,
        }
    }

    /// Connect to the index and embedding service, retrying with backoff
    pub async fn connect(settings: &Settings, tables: Arc<RuleTables>) -> Result<Self> {
        let embedder = with_backoff(&settings.retry, "Embedding service", || {
            HttpEmbedder::connect(&settings.embedding, settings.vector.dimension)
        })
        .await?;

        let index = with_backoff(&settings.retry, "Vector index", || {
            PineconeIndex::connect(&settings.vector)
        })
        .await?;

        if index.dimension() != embedder.dimension() {
            return Err(Error::ServiceInit(format!(
                "Index dimension {} does not match embedding dimension {}",
                index.dimension(),
                embedder.dimension()
            )));
        }

        Ok(Self::new(
            Arc::new(index),
            Arc::new(embedder),
            tables,
            settings,
        ))
    }

    pub fn tables(&self) -> &RuleTables {
        self.pipeline.tables()
    }

    /// Whether the index and embedder agree on the vector dimension
    pub fn is_ready(&self) -> bool {
        self.index.dimension() == self.embedder.dimension()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn constraints(&self, request: &RecommendationRequest) -> Result<ConstraintSet> {
        ConstraintSet::normalize(
            &request.restrictions,
            &request.allergies,
            request.health_condition.as_deref(),
            request.cuisine.as_deref(),
            request.diversity,
            self.tables(),
        )
    }

    /// Run a full recommendation request.
    ///
    /// Empty results surface as [`Error::NoMatches`] or
    /// [`Error::AllFiltered`]; anything unexpected becomes [`Error::Query`].
    pub async fn recommend(&self, request: &RecommendationRequest) -> Result<RecommendationSet> {
        let constraints = self.constraints(request)?;
        let search_text = search_text(&request.query, constraints.cuisine.as_deref());
        if search_text.is_empty() {
            return Err(Error::Validation("Query cannot be empty".to_string()));
        }

        info!(
            "Recommending for '{}' (diversity {})",
            search_text, constraints.diversity_level
        );

        self.run(&search_text, &constraints).await.map_err(|e| match e {
            Error::NoMatches | Error::AllFiltered | Error::Validation(_) => e,
            other => {
                error!("Recommendation failed: {}", other.log_safe());
                Error::Query(other.to_string())
            }
        })
    }

    async fn run(
        &self,
        search_text: &str,
        constraints: &ConstraintSet,
    ) -> Result<RecommendationSet> {
        let vector = self.embedder.encode(search_text).await?;
        let matches = self.index.query(&vector, self.initial_results, true).await?;
        debug!("Search returned {} matches", matches.len());

        let candidates = self.pipeline.assemble(matches, constraints)?;
        let ranked = self.pipeline.rank(candidates, constraints)?;
        let total = ranked.len();

        let results = ranked
            .into_iter()
            .take(self.display_count)
            .map(|recipe| {
                let substitutions = if constraints.wants_substitutions() {
                    substitutions_for_ingredients(
                        self.tables(),
                        recipe.ingredient_list(),
                        &constraints.allergies,
                        constraints.cuisine.as_deref(),
                    )
                } else {
                    Vec::new()
                };
                Recommendation {
                    recipe,
                    substitutions,
                }
            })
            .collect();

        Ok(RecommendationSet { total, results })
    }

    /// Substitutes for a single ingredient, outside of any ranking request
    pub fn substitutions(
        &self,
        ingredient: &str,
        allergies: &str,
        cuisine: Option<&str>,
    ) -> Vec<String> {
        substitutions(self.tables(), ingredient, allergies, cuisine)
    }
}

/// Substitutes for one ingredient given a raw comma-separated allergy list
pub fn substitutions(
    tables: &RuleTables,
    ingredient: &str,
    allergies: &str,
    cuisine: Option<&str>,
) -> Vec<String> {
    let cuisine = cuisine
        .map(|c| c.trim().to_lowercase())
        .filter(|c| !c.is_empty() && c != "any");
    suggest_substitutions(tables, ingredient, &split_terms(allergies), cuisine.as_deref())
}

/// Text embedded for the nearest-neighbor query: the query plus the cuisine
fn search_text(query: &str, cuisine: Option<&str>) -> String {
    format!("{} {}", query.trim(), cuisine.unwrap_or("")).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_text() {
        assert_eq!(
            search_text(" vegetarian pasta ", Some("italian")),
            "vegetarian pasta italian"
        );
        assert_eq!(search_text("soup", None), "soup");
        assert_eq!(search_text("  ", None), "");
    }

    #[test]
    fn test_substitutions_with_raw_allergies() {
        let tables = RuleTables::builtin();
        let subs = substitutions(&tables, "Milk", " Soy , ", Some("Any"));
        assert_eq!(subs, vec!["almond milk", "oat milk", "coconut milk"]);
    }

    #[test]
    fn test_request_defaults() {
        let request: RecommendationRequest =
            serde_json::from_str(r#"{"query": "curry"}"#).unwrap();
        assert_eq!(request.diversity, 3);
        assert!(request.health_condition.is_none());
        assert!(request.allergies.is_empty());
    }
}
