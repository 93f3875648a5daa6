pub mod config;
pub mod error;
pub mod models;

// Ranking core
pub mod ranking;
pub mod recommender;

// External services
pub mod search;

// Batch ingestion
pub mod ingest;

// Interfaces
pub mod api;
pub mod cli;

// Re-exports
pub use config::Settings;
pub use error::{Error, Result};
pub use recommender::Recommender;
