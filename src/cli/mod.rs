// Command-line interface

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "recipe-recommender")]
#[command(about = "Diet-aware recipe recommendations", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the recommendation server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long, env = "HOST")]
        host: Option<String>,
    },

    /// Ask a running server for recommendations
    Recommend {
        /// What you feel like eating
        query: String,

        /// Comma-separated dietary restrictions (vegan, vegetarian, gluten-free)
        #[arg(long, default_value = "")]
        restrictions: String,

        /// Comma-separated allergies
        #[arg(long, default_value = "")]
        allergies: String,

        /// Health condition (see `check-rules`)
        #[arg(long)]
        condition: Option<String>,

        /// Preferred cuisine
        #[arg(long)]
        cuisine: Option<String>,

        /// Result diversity from 1 (most similar) to 5 (most varied)
        #[arg(long, default_value_t = 3)]
        diversity: i64,
    },

    /// Suggest substitutes for an ingredient
    Substitute {
        /// Ingredient to replace
        ingredient: String,

        /// Comma-separated allergies to avoid in suggestions
        #[arg(long, default_value = "")]
        allergies: String,

        /// Cuisine whose staples may be suggested
        #[arg(long)]
        cuisine: Option<String>,
    },

    /// Validate, embed and upload recipes to the vector index
    Ingest {
        /// JSON array or YAML list of recipes
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Validate a rule tables file and summarize it
    CheckRules {
        /// Rule tables YAML (defaults to RULES_PATH or the built-in tables)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_recommend() {
        let cli = Cli::parse_from([
            "recipe-recommender",
            "recommend",
            "spicy noodles",
            "--allergies",
            "peanuts",
            "--diversity",
            "5",
        ]);

        match cli.command {
            Commands::Recommend {
                query,
                allergies,
                diversity,
                condition,
                ..
            } => {
                assert_eq!(query, "spicy noodles");
                assert_eq!(allergies, "peanuts");
                assert_eq!(diversity, 5);
                assert!(condition.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
