use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Search match is missing metadata field: {0}")]
    PartialMetadata(String),

    #[error("No recipes found. Try different filters.")]
    NoMatches,

    #[error("No recipes match all your criteria. Try relaxing some filters.")]
    AllFiltered,

    #[error("Failed to initialize services: {0}")]
    ServiceInit(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

fn redact(msg: &str) -> Option<String> {
    let lower = msg.to_lowercase();
    if lower.contains("password")
        || lower.contains("secret")
        || lower.contains("token")
        || lower.contains("key")
    {
        None
    } else {
        Some(msg.to_string())
    }
}

impl Error {
    /// Get a sanitized error message safe for logging
    /// Filters out potentially sensitive information
    pub fn log_safe(&self) -> String {
        match self {
            // Request errors may echo the index host or headers
            Error::Http(_) => "External HTTP request failed".to_string(),

            Error::ServiceInit(msg) => match redact(msg) {
                Some(msg) => format!("Service initialization failed: {msg}"),
                None => "Service initialization failed (details redacted)".to_string(),
            },
            Error::Internal(msg) => match redact(msg) {
                Some(msg) => format!("Internal error: {msg}"),
                None => "Internal error (details redacted)".to_string(),
            },
            Error::Query(msg) => match redact(msg) {
                Some(msg) => format!("Query failed: {msg}"),
                None => "Query failed (details redacted)".to_string(),
            },

            Error::Json(_) => "Malformed JSON payload".to_string(),
            Error::Yaml(_) => "Malformed YAML document".to_string(),
            Error::Csv(_) => "Malformed CSV data".to_string(),
            Error::InvalidUrl(_) => "Invalid URL provided".to_string(),
            Error::Io(_) => "File system operation failed".to_string(),
            Error::MissingField(field) => format!("Missing required field: {field}"),
            Error::PartialMetadata(field) => format!("Search match missing field: {field}"),
            Error::NoMatches => "No candidates returned by search".to_string(),
            Error::AllFiltered => "All candidates excluded by filters".to_string(),
            Error::Config(msg) => format!("Configuration error: {msg}"),
            Error::NotFound(msg) => format!("Not found: {msg}"),
            Error::Validation(msg) => format!("Validation error: {msg}"),
        }
    }
}

// Implement IntoResponse for API error handling
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::error!("Request error: {}", self.log_safe());

        let (status, error_message) = match &self {
            Error::NoMatches | Error::AllFiltered => (StatusCode::NOT_FOUND, self.to_string()),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Error::Http(_) => (
                StatusCode::BAD_GATEWAY,
                "External service error".to_string(),
            ),
            Error::ServiceInit(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Search services unavailable".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong while finding recipes".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_safe_redacts_keys() {
        let err = Error::ServiceInit("bad Api-Key header abc123".to_string());
        assert!(!err.log_safe().contains("abc123"));

        let err = Error::Internal("index unreachable".to_string());
        assert_eq!(err.log_safe(), "Internal error: index unreachable");
    }

    #[test]
    fn test_empty_result_status_codes() {
        assert_eq!(
            Error::NoMatches.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::AllFiltered.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Query("boom".to_string()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_empty_result_messages_differ() {
        assert_ne!(Error::NoMatches.to_string(), Error::AllFiltered.to_string());
    }
}
