use crate::config::tables::RuleTables;
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::BTreeSet;

pub const MIN_DIVERSITY: u8 = 1;
pub const MAX_DIVERSITY: u8 = 5;
pub const DEFAULT_DIVERSITY: u8 = 3;

const NO_CONDITION: &str = "none";
const ANY_CUISINE: &str = "any";

/// Normalized user constraints for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintSet {
    pub restrictions: BTreeSet<String>,
    pub allergies: Vec<String>,
    pub health_condition: Option<String>,
    pub cuisine: Option<String>,
    pub diversity_level: u8,
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self {
            restrictions: BTreeSet::new(),
            allergies: Vec::new(),
            health_condition: None,
            cuisine: None,
            diversity_level: DEFAULT_DIVERSITY,
        }
    }
}

/// Split a comma-separated list into lowercase, trimmed, non-empty terms.
/// Duplicates are dropped, first occurrence wins.
pub fn split_terms(raw: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in raw.split(',').map(|t| t.trim().to_lowercase()) {
        if !term.is_empty() && !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// Normalize a single label; blank or the given sentinel means "unset"
fn optional_label(raw: Option<&str>, sentinel: &str) -> Option<String> {
    raw.map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty() && s != sentinel)
}

impl ConstraintSet {
    /// Build a constraint set from raw form input.
    ///
    /// An unrecognized health condition is rejected; every other axis
    /// degrades to "no constraint" when blank.
    pub fn normalize(
        restrictions: &str,
        allergies: &str,
        health_condition: Option<&str>,
        cuisine: Option<&str>,
        diversity: i64,
        tables: &RuleTables,
    ) -> Result<Self> {
        let health_condition = optional_label(health_condition, NO_CONDITION);
        if let Some(condition) = &health_condition {
            if tables.health_rule(condition).is_none() {
                return Err(Error::Validation(format!(
                    "Unknown health condition '{condition}'. Expected one of: {}",
                    tables.condition_names().join(", ")
                )));
            }
        }

        Ok(Self {
            restrictions: split_terms(restrictions).into_iter().collect(),
            allergies: split_terms(allergies),
            health_condition,
            cuisine: optional_label(cuisine, ANY_CUISINE),
            diversity_level: diversity.clamp(MIN_DIVERSITY as i64, MAX_DIVERSITY as i64) as u8,
        })
    }

    pub fn has_restriction(&self, label: &str) -> bool {
        self.restrictions.contains(label)
    }

    /// Substitutions are only worth showing when something constrains ingredients
    pub fn wants_substitutions(&self) -> bool {
        !self.allergies.is_empty() || self.health_condition.is_some()
    }
}
