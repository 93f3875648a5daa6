// External search services: the vector index and the embedding model

pub mod embedding;
pub mod pinecone;
pub mod retry;

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use embedding::HttpEmbedder;
pub use pinecone::PineconeIndex;

/// Dimension of all-MiniLM-L6-v2 sentence embeddings
pub const EMBEDDING_DIM: usize = 384;

/// One nearest-neighbor hit returned by the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub id: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// A vector with flat metadata, as written to the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Map<String, Value>,
}

/// Nearest-neighbor search over indexed recipes
#[async_trait::async_trait]
pub trait VectorIndex: Send + Sync {
    /// Matches ordered by descending similarity
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>>;

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()>;

    /// Vector dimension the index was created with
    fn dimension(&self) -> usize;
}

/// Turns text into a fixed-size embedding
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn encode(&self, text: &str) -> Result<Vec<f32>>;

    fn dimension(&self) -> usize;
}
