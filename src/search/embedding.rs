use crate::config::EmbeddingConfig;
use crate::search::Embedder;
use crate::{Error, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Client for a sentence-embedding server exposing `POST /embed`
/// (text-embeddings-inference compatible)
#[derive(Clone)]
pub struct HttpEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    inputs: &'a str,
}

impl HttpEmbedder {
    /// Create the client and probe the server once to learn its dimension
    pub async fn connect(config: &EmbeddingConfig, expected_dimension: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        let mut embedder = Self {
            client,
            endpoint: format!("{}/embed", config.url.trim_end_matches('/')),
            model: config.model.clone(),
            dimension: expected_dimension,
        };

        let probe = embedder
            .request("recipe")
            .await
            .map_err(|e| Error::ServiceInit(format!("Embedding service unavailable: {e}")))?;

        if probe.len() != expected_dimension {
            return Err(Error::Config(format!(
                "Embedding model '{}' produces {} dimensions, expected {}",
                embedder.model,
                probe.len(),
                expected_dimension
            )));
        }
        embedder.dimension = probe.len();

        info!(
            "Embedding service ready: {} ({} dimensions)",
            embedder.model, embedder.dimension
        );
        Ok(embedder)
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Embedding {} chars", text.len());

        let response = self
            .client
            .post(&self.endpoint)
            .json(&EmbedRequest { inputs: text })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Query(format!(
                "Embedding request failed: HTTP {}",
                response.status()
            )));
        }

        let mut vectors: Vec<Vec<f32>> = response.json().await?;
        if vectors.is_empty() {
            return Err(Error::Query("Embedding service returned no vectors".to_string()));
        }
        Ok(vectors.swap_remove(0))
    }
}

#[async_trait::async_trait]
impl Embedder for HttpEmbedder {
    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.request(text).await?;
        if vector.len() != self.dimension {
            return Err(Error::Query(format!(
                "Embedding has {} dimensions, expected {}",
                vector.len(),
                self.dimension
            )));
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(url: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            url: url.to_string(),
            model: "all-MiniLM-L6-v2".to_string(),
            timeout_seconds: 5,
        }
    }

    #[tokio::test]
    async fn test_connect_and_encode() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embed")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([vec![0.25_f32; 4]]).to_string())
            .expect(2)
            .create_async()
            .await;

        let embedder = HttpEmbedder::connect(&config(&server.url()), 4).await.unwrap();
        let vector = embedder.encode("vegetarian pasta").await.unwrap();

        assert_eq!(vector, vec![0.25; 4]);
        assert_eq!(embedder.dimension(), 4);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_config_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embed")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([vec![0.5_f32; 3]]).to_string())
            .create_async()
            .await;

        let result = HttpEmbedder::connect(&config(&server.url()), 384).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_server_error_is_init_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/embed")
            .with_status(503)
            .create_async()
            .await;

        let result = HttpEmbedder::connect(&config(&server.url()), 384).await;
        assert!(matches!(result, Err(Error::ServiceInit(_))));
    }
}
