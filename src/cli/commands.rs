use crate::config::{tables::RuleTables, Settings};
use crate::ingest::{load_records, IngestReport, Ingestor};
use crate::recommender::{self, RecommendationRequest};
use crate::{Error, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Ask a running server for recommendations and print them
pub async fn recommend(server_url: &str, request: &RecommendationRequest) -> Result<()> {
    let results = fetch_recommendations(server_url, request).await?;
    print!("{}", format_recommendations(&results));
    Ok(())
}

async fn fetch_recommendations(
    server_url: &str,
    request: &RecommendationRequest,
) -> Result<RecommendationResponse> {
    let client = Client::new();
    let url = format!("{}/api/recommend", server_url.trim_end_matches('/'));
    debug!("POST {}", url);

    let response = client.post(&url).json(request).send().await?;
    let status = response.status();

    if !status.is_success() {
        let message = response
            .json::<ErrorResponse>()
            .await
            .map(|e| e.error)
            .unwrap_or_else(|_| format!("HTTP {status}"));

        return Err(match status {
            StatusCode::NOT_FOUND => Error::NotFound(message),
            StatusCode::BAD_REQUEST => Error::Validation(message),
            _ => Error::Query(message),
        });
    }

    Ok(response.json().await?)
}

/// Print substitutes for one ingredient using the local rule tables
pub fn substitute(
    tables: &RuleTables,
    ingredient: &str,
    allergies: &str,
    cuisine: Option<&str>,
) -> Result<()> {
    if ingredient.trim().is_empty() {
        return Err(Error::Validation("Ingredient cannot be empty".to_string()));
    }

    let substitutes = recommender::substitutions(tables, ingredient, allergies, cuisine);
    if substitutes.is_empty() {
        println!("No substitutes known for \"{}\"", ingredient.trim());
    } else {
        println!("Substitutes for \"{}\":", ingredient.trim());
        for substitute in substitutes {
            println!("  - {substitute}");
        }
    }
    Ok(())
}

/// Load recipes from a file and upload them to the vector index
pub async fn ingest(settings: &Settings, input: &Path) -> Result<IngestReport> {
    let records = load_records(input)?;
    info!("Read {} records from {}", records.len(), input.display());

    let ingestor = Ingestor::connect(settings).await?;
    let report = ingestor.run(records).await?;

    println!(
        "\x1b[32m\u{2713}\x1b[0m Ingestion complete: {} indexed, {} skipped ({} batches)",
        report.indexed, report.skipped, report.batches
    );
    Ok(report)
}

/// Validate rule tables and print what they contain
pub fn check_rules(path: Option<&Path>) -> Result<()> {
    match RuleTables::load(path) {
        Ok(tables) => {
            let source = path
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "built-in tables".to_string());
            println!("\x1b[32m\u{2713}\x1b[0m Valid rule tables: {source}");
            println!("  Version: {}", tables.version);
            println!(
                "  Health conditions: {}",
                tables.condition_names().join(", ")
            );
            println!("  Cuisines: {}", tables.cuisine_names().join(", "));
            println!("  Substitution keywords: {}", tables.substitutions.len());
            Ok(())
        }
        Err(e) => {
            println!("\x1b[31m\u{2717}\x1b[0m Invalid rule tables: {}", e);
            Err(e)
        }
    }
}

fn format_recommendations(results: &RecommendationResponse) -> String {
    let mut out = String::new();

    if results.results.is_empty() {
        out.push_str("No recipes found\n");
        return out;
    }

    out.push_str(&format!(
        "\nFound {} recipes, showing {}:\n\n",
        results.total,
        results.results.len()
    ));
    out.push_str(&format!(
        "{:<4} {:<36} {:<10} {:>8} {:>7}\n",
        "#", "Name", "Cuisine", "Calories", "Score"
    ));
    out.push_str(&format!("{}\n", "-".repeat(69)));

    for (rank, recipe) in results.results.iter().enumerate() {
        out.push_str(&format!(
            "{:<4} {:<36} {:<10} {:>8.0} {:>7.3}\n",
            rank + 1,
            truncate(&recipe.name, 34),
            truncate(
                recipe
                    .cuisine
                    .as_deref()
                    .filter(|c| !c.is_empty())
                    .unwrap_or("-"),
                10
            ),
            recipe.nutrition.calories,
            recipe.combined_score
        ));
    }

    let with_subs: Vec<&RecommendationItem> = results
        .results
        .iter()
        .filter(|r| !r.substitutions.is_empty())
        .collect();

    if !with_subs.is_empty() {
        out.push_str("\nSubstitutions:\n");
        for recipe in with_subs {
            out.push_str(&format!("  {}\n", recipe.name));
            for sub in &recipe.substitutions {
                out.push_str(&format!(
                    "    {} -> {}\n",
                    sub.ingredient,
                    sub.substitutes.join(", ")
                ));
            }
        }
    }

    out
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

// Response types (matching API models)

#[derive(Debug, Deserialize)]
struct RecommendationResponse {
    total: usize,
    results: Vec<RecommendationItem>,
}

#[derive(Debug, Deserialize)]
struct RecommendationItem {
    name: String,
    #[serde(default)]
    cuisine: Option<String>,
    nutrition: NutritionSummary,
    combined_score: f64,
    #[serde(default)]
    substitutions: Vec<SubstitutionItem>,
}

#[derive(Debug, Deserialize)]
struct NutritionSummary {
    calories: f64,
}

#[derive(Debug, Deserialize)]
struct SubstitutionItem {
    ingredient: String,
    substitutes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}
