use crate::config::VectorConfig;
use crate::search::{SearchMatch, VectorIndex, VectorRecord};
use crate::{Error, Result};
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

const API_VERSION: &str = "2024-07";

/// A freshly created index takes a while before its host accepts writes
const READY_POLL_INTERVAL: Duration = Duration::from_millis(500);
const READY_POLL_ATTEMPTS: u32 = 120;

/// Pinecone serverless index accessed over its REST API
#[derive(Clone)]
pub struct PineconeIndex {
    client: Client,
    name: String,
    host: String,
    dimension: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct IndexDescription {
    host: String,
    dimension: usize,
    #[serde(default)]
    status: IndexStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IndexStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<SearchMatch>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest {
    vectors: Vec<VectorRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

fn build_client(config: &VectorConfig) -> Result<Client> {
    let api_key = config
        .api_key
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| Error::Config("PINECONE_API_KEY is not set".to_string()))?;

    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::HeaderName::from_static("api-key"),
        header::HeaderValue::from_str(api_key)
            .map_err(|_| Error::Config("Invalid Pinecone API key header".to_string()))?,
    );
    headers.insert(
        header::HeaderName::from_static("x-pinecone-api-version"),
        header::HeaderValue::from_static(API_VERSION),
    );

    Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))
}

/// Index hosts are returned without a scheme
fn host_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

impl PineconeIndex {
    /// Connect to an existing index and verify its dimension
    pub async fn connect(config: &VectorConfig) -> Result<Self> {
        let client = build_client(config)?;
        let control_url = config.control_url.trim_end_matches('/').to_string();

        let description = describe(&client, &control_url, &config.index_name)
            .await?
            .ok_or_else(|| {
                Error::ServiceInit(format!("Index '{}' does not exist", config.index_name))
            })?;

        if description.dimension != config.dimension {
            return Err(Error::Config(format!(
                "Index '{}' has dimension {}, expected {}",
                config.index_name, description.dimension, config.dimension
            )));
        }

        info!(
            "Connected to index '{}' (dimension {})",
            config.index_name, description.dimension
        );

        Ok(Self {
            client,
            name: config.index_name.clone(),
            host: host_url(&description.host),
            dimension: description.dimension,
        })
    }

    /// Connect to the index, creating it (or recreating it on a dimension
    /// mismatch) when needed. Used by ingestion.
    pub async fn ensure(config: &VectorConfig) -> Result<Self> {
        let client = build_client(config)?;
        let control_url = config.control_url.trim_end_matches('/').to_string();

        let description = match describe(&client, &control_url, &config.index_name).await? {
            Some(existing) if existing.dimension == config.dimension => existing,
            Some(existing) => {
                warn!(
                    "Recreating index '{}' with dimension {} (was {})",
                    config.index_name, config.dimension, existing.dimension
                );
                delete_index(&client, &control_url, &config.index_name).await?;
                create_index(&client, &control_url, &config.index_name, config.dimension).await?;
                wait_until_ready(&client, &control_url, &config.index_name).await?
            }
            None => {
                info!("Creating index '{}'", config.index_name);
                create_index(&client, &control_url, &config.index_name, config.dimension).await?;
                wait_until_ready(&client, &control_url, &config.index_name).await?
            }
        };

        Ok(Self {
            client,
            name: config.index_name.clone(),
            host: host_url(&description.host),
            dimension: description.dimension,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.host, path);
        debug!("Index request: POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            error!("Index API error: {} - {}", status, error_body);
            return Err(Error::Query(format!("Index API error: {status}")));
        }

        Ok(response.json::<T>().await?)
    }
}

async fn describe(
    client: &Client,
    control_url: &str,
    name: &str,
) -> Result<Option<IndexDescription>> {
    let url = format!("{control_url}/indexes/{name}");
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| Error::ServiceInit(format!("Index control plane unreachable: {e}")))?;

    match response.status() {
        StatusCode::NOT_FOUND => Ok(None),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(Error::Config("Index authentication failed".to_string()))
        }
        status if !status.is_success() => Err(Error::ServiceInit(format!(
            "Failed to describe index '{name}': HTTP {status}"
        ))),
        _ => Ok(Some(response.json::<IndexDescription>().await.map_err(|e| {
            Error::ServiceInit(format!("Malformed index description: {e}"))
        })?)),
    }
}

async fn create_index(
    client: &Client,
    control_url: &str,
    name: &str,
    dimension: usize,
) -> Result<()> {
    let body = serde_json::json!({
        "name": name,
        "dimension": dimension,
        "metric": "cosine",
        "spec": { "serverless": { "cloud": "aws", "region": "us-east-1" } },
    });

    let response = client
        .post(format!("{control_url}/indexes"))
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::ServiceInit(format!("Failed to create index: {e}")))?;

    if !response.status().is_success() {
        return Err(Error::ServiceInit(format!(
            "Failed to create index '{name}': HTTP {}",
            response.status()
        )));
    }
    Ok(())
}

/// Poll the control plane until a new index reports ready
async fn wait_until_ready(
    client: &Client,
    control_url: &str,
    name: &str,
) -> Result<IndexDescription> {
    for attempt in 1..=READY_POLL_ATTEMPTS {
        if let Some(description) = describe(client, control_url, name).await? {
            if description.status.ready {
                info!("Index '{}' is ready", name);
                return Ok(description);
            }
        }
        debug!(
            "Index '{}' not ready yet (poll {}/{})",
            name, attempt, READY_POLL_ATTEMPTS
        );
        sleep(READY_POLL_INTERVAL).await;
    }

    Err(Error::ServiceInit(format!(
        "Index '{name}' did not become ready in time"
    )))
}

async fn delete_index(client: &Client, control_url: &str, name: &str) -> Result<()> {
    let response = client
        .delete(format!("{control_url}/indexes/{name}"))
        .send()
        .await
        .map_err(|e| Error::ServiceInit(format!("Failed to delete index: {e}")))?;

    if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
        return Err(Error::ServiceInit(format!(
            "Failed to delete index '{name}': HTTP {}",
            response.status()
        )));
    }
    Ok(())
}

#[async_trait::async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<SearchMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata,
            include_values: false,
        };
        let response: QueryResponse = self.post("/query", &request).await?;
        debug!("Index returned {} matches", response.matches.len());
        Ok(response.matches)
    }

    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<()> {
        let expected = records.len();
        let response: UpsertResponse = self
            .post("/vectors/upsert", &UpsertRequest { vectors: records })
            .await?;
        if response.upserted_count != expected {
            warn!(
                "Index acknowledged {} of {} upserted vectors",
                response.upserted_count, expected
            );
        }
        Ok(())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(control_url: &str, dimension: usize) -> VectorConfig {
        VectorConfig {
            api_key: Some("test-key".to_string()),
            index_name: "recipes".to_string(),
            control_url: control_url.to_string(),
            dimension,
            timeout_seconds: 5,
        }
    }

    #[test]
    fn test_host_url() {
        assert_eq!(
            host_url("recipes-abc.svc.pinecone.io"),
            "https://recipes-abc.svc.pinecone.io"
        );
        assert_eq!(host_url("http://127.0.0.1:1234/"), "http://127.0.0.1:1234");
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let mut cfg = config("http://127.0.0.1:1", 384);
        cfg.api_key = None;
        assert!(matches!(
            PineconeIndex::connect(&cfg).await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_and_query() {
        let mut server = mockito::Server::new_async().await;
        let host = server.url();

        let describe = server
            .mock("GET", "/indexes/recipes")
            .match_header("api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "host": host, "dimension": 384 }).to_string())
            .create_async()
            .await;

        let query = server
            .mock("POST", "/query")
            .match_body(mockito::Matcher::PartialJson(
                json!({ "topK": 2, "includeMetadata": true }),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "matches": [
                        { "id": "1", "score": 0.93, "metadata": { "name": "Dal" } },
                        { "id": "2", "score": 0.71, "metadata": { "name": "Soup" } }
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let index = PineconeIndex::connect(&config(&host, 384)).await.unwrap();
        assert_eq!(index.dimension(), 384);

        let matches = index.query(&[0.1; 384], 2, true).await.unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].id, "1");
        assert_eq!(matches[0].metadata["name"], "Dal");

        describe.assert_async().await;
        query.assert_async().await;
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_config_error() {
        let mut server = mockito::Server::new_async().await;
        let host = server.url();

        server
            .mock("GET", "/indexes/recipes")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "host": host, "dimension": 768 }).to_string())
            .create_async()
            .await;

        let result = PineconeIndex::connect(&config(&host, 384)).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_ensure_creates_missing_index() {
        let mut server = mockito::Server::new_async().await;
        let host = server.url();

        let describe_missing = server
            .mock("GET", "/indexes/recipes")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/indexes")
            .match_body(mockito::Matcher::PartialJson(
                json!({ "name": "recipes", "dimension": 384, "metric": "cosine" }),
            ))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "host": host, "dimension": 384, "status": { "ready": false } })
                    .to_string(),
            )
            .create_async()
            .await;
        let describe_initializing = server
            .mock("GET", "/indexes/recipes")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "host": host, "dimension": 384, "status": { "ready": false } })
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let describe_ready = server
            .mock("GET", "/indexes/recipes")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({ "host": host, "dimension": 384, "status": { "ready": true } })
                    .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let upsert = server
            .mock("POST", "/vectors/upsert")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "upsertedCount": 1 }).to_string())
            .create_async()
            .await;

        let index = PineconeIndex::ensure(&config(&host, 384)).await.unwrap();
        index
            .upsert(vec![VectorRecord {
                id: "0".to_string(),
                values: vec![0.0; 384],
                metadata: serde_json::Map::new(),
            }])
            .await
            .unwrap();

        describe_missing.assert_async().await;
        create.assert_async().await;
        describe_initializing.assert_async().await;
        describe_ready.assert_async().await;
        upsert.assert_async().await;
    }
}
