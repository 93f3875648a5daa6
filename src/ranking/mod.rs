// Candidate ranking: constraint normalization, filtering, scoring and diversification

pub mod constraints;
pub mod diversity;
pub mod filter;
pub mod nutrition;
pub mod pipeline;
pub mod score;
pub mod substitutions;

// Re-exports
pub use constraints::ConstraintSet;
pub use pipeline::RankingPipeline;
pub use score::ScoreWeights;
pub use substitutions::{suggest_substitutions, IngredientSubstitution};
