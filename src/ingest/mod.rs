// Batch ingestion of recipe records into the vector index

pub mod validation;

use crate::config::{IngestConfig, Settings};
use crate::search::{
    retry::with_backoff, Embedder, HttpEmbedder, PineconeIndex, VectorIndex, VectorRecord,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use validation::{validate_recipe, ValidRecipe};

/// A scalar that may arrive as a number or as numeric text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Text(String),
}

impl RawField {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawField::Number(n) => Some(*n),
            RawField::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for RawField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RawField::Number(n) => write!(f, "{n}"),
            RawField::Text(text) => write!(f, "{}", text.trim()),
        }
    }
}

/// One recipe row as found in an input file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecipe {
    #[serde(default)]
    pub id: Option<RawField>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ingredients: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub calories: Option<RawField>,
    #[serde(default)]
    pub protein: Option<RawField>,
    #[serde(default)]
    pub carbs: Option<RawField>,
    #[serde(default)]
    pub fats: Option<RawField>,
    #[serde(default)]
    pub tags: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestReport {
    pub total: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub batches: usize,
}

/// Load raw records from a CSV table, a JSON array or a YAML list, chosen
/// by extension
pub fn load_records(path: &Path) -> Result<Vec<RawRecipe>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    let records = match extension.as_deref() {
        Some("csv") => read_csv(path)?,
        Some("json") => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&std::fs::read_to_string(path)?)?,
        _ => {
            return Err(Error::Validation(format!(
                "Unsupported input format: {} (expected .csv, .json, .yaml or .yml)",
                path.display()
            )))
        }
    };

    Ok(records)
}

/// Header row names the columns; empty cells deserialize as `None`
fn read_csv(path: &Path) -> Result<Vec<RawRecipe>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_path(path)?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

/// Text sent to the embedding model for one recipe
pub fn embedding_text(recipe: &ValidRecipe) -> String {
    let n = &recipe.nutrition;
    let nutrition = format!(
        "{} calories, {}g protein, {}g carbs, {}g fats",
        n.calories, n.protein, n.carbs, n.fats
    );
    format!(
        "Recipe: {}\nCuisine: {}\nIngredients: {}\nInstructions: {}\nNutrition: {}\nDietary Tags: {}",
        recipe.name,
        recipe.cuisine.as_deref().unwrap_or("unknown"),
        recipe.ingredients,
        recipe.instructions,
        nutrition,
        recipe.tags
    )
}

/// Flat metadata stored alongside the vector
pub fn recipe_metadata(recipe: &ValidRecipe) -> Map<String, Value> {
    let n = &recipe.nutrition;
    let mut metadata = Map::new();
    metadata.insert("name".into(), recipe.name.clone().into());
    metadata.insert("ingredients".into(), recipe.ingredients.clone().into());
    metadata.insert("instructions".into(), recipe.instructions.clone().into());
    metadata.insert(
        "cuisine".into(),
        recipe
            .cuisine
            .as_deref()
            .unwrap_or("")
            .to_lowercase()
            .into(),
    );
    metadata.insert("calories".into(), n.calories.into());
    metadata.insert("protein".into(), n.protein.into());
    metadata.insert("carbs".into(), n.carbs.into());
    metadata.insert("fats".into(), n.fats.into());
    metadata.insert("tags".into(), recipe.tags.to_lowercase().into());
    metadata
}

/// Validates, embeds and upserts recipe records in batches
pub struct Ingestor {
    index: Arc<dyn VectorIndex>,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    batch_delay: Duration,
}

impl Ingestor {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn Embedder>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            index,
            embedder,
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }

    /// Connect to the embedding service and create the index if needed
    pub async fn connect(settings: &Settings) -> Result<Self> {
        let embedder = with_backoff(&settings.retry, "Embedding service", || {
            HttpEmbedder::connect(&settings.embedding, settings.vector.dimension)
        })
        .await?;

        let index = with_backoff(&settings.retry, "Vector index", || {
            PineconeIndex::ensure(&settings.vector)
        })
        .await?;
        info!("Ingesting into index '{}'", index.name());

        Ok(Self::new(
            Arc::new(index),
            Arc::new(embedder),
            &settings.ingest,
        ))
    }

    /// Ingest all records. Invalid records are skipped and counted; a failed
    /// upsert aborts the run.
    pub async fn run(&self, records: Vec<RawRecipe>) -> Result<IngestReport> {
        let mut report = IngestReport {
            total: records.len(),
            ..Default::default()
        };
        let batch_count = records.len().div_ceil(self.batch_size);
        info!("Loaded {} recipes", report.total);

        for (batch_idx, batch) in records.chunks(self.batch_size).enumerate() {
            let offset = batch_idx * self.batch_size;
            let mut vectors = Vec::with_capacity(batch.len());

            for (i, raw) in batch.iter().enumerate() {
                let row = offset + i;
                match self.prepare(row, raw).await {
                    Ok(record) => vectors.push(record),
                    Err(e) => {
                        warn!("Skipping recipe {}: {}", row, e.log_safe());
                        report.skipped += 1;
                    }
                }
            }

            if vectors.is_empty() {
                debug!("Batch {} had no valid recipes", batch_idx + 1);
                continue;
            }

            let count = vectors.len();
            self.index.upsert(vectors).await?;
            report.indexed += count;
            report.batches += 1;
            info!(
                "Processed batch {}/{} ({} recipes)",
                batch_idx + 1,
                batch_count,
                count
            );

            if batch_idx + 1 < batch_count && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        info!(
            "Ingestion complete: {} indexed, {} skipped",
            report.indexed, report.skipped
        );
        Ok(report)
    }

    async fn prepare(&self, row: usize, raw: &RawRecipe) -> Result<VectorRecord> {
        let recipe = validate_recipe(raw)?;
        let values = self.embedder.encode(&embedding_text(&recipe)).await?;

        Ok(VectorRecord {
            id: raw
                .id
                .as_ref()
                .map(|id| id.to_string())
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| row.to_string()),
            values,
            metadata: recipe_metadata(&recipe),
        })
    }
}
