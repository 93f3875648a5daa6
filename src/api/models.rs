use serde::{Deserialize, Serialize};

/// Substitution lookup parameters
#[derive(Debug, Clone, Deserialize)]
pub struct SubstitutionParams {
    #[serde(default)]
    pub ingredient: String,
    #[serde(default)]
    pub allergies: String,
    #[serde(default)]
    pub cuisine: Option<String>,
}

/// Substitution lookup response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubstitutionResponse {
    pub ingredient: String,
    pub substitutes: Vec<String>,
}

/// Choices offered to clients for the select-style inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsResponse {
    /// Health conditions, led by the "none" sentinel
    pub health_conditions: Vec<String>,
    /// Cuisines, led by the "any" sentinel
    pub cuisines: Vec<String>,
    pub diversity: DiversityRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversityRange {
    pub min: u8,
    pub max: u8,
    pub default: u8,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Readiness check response
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub index_name: String,
    pub vector_dimension: usize,
    pub rules_version: u32,
}
