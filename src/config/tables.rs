use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Static lookup tables consulted by the ranking pipeline.
///
/// Loaded once at startup and shared read-only between requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTables {
    pub version: u32,
    #[serde(default)]
    pub health_conditions: BTreeMap<String, HealthRule>,
    #[serde(default)]
    pub cuisines: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub substitutions: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthRule {
    /// Nutrient caps, used both as hard filter and as scoring target
    #[serde(default)]
    pub nutrient_limits: BTreeMap<String, f64>,
    #[serde(default)]
    pub preferred_tags: Vec<String>,
    #[serde(default)]
    pub avoid_tags: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn limits(items: &[(&str, f64)]) -> BTreeMap<String, f64> {
    items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

impl Default for RuleTables {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleTables {
    /// The tables shipped with the recommender
    pub fn builtin() -> Self {
        let mut health_conditions = BTreeMap::new();
        health_conditions.insert(
            "diabetes".to_string(),
            HealthRule {
                nutrient_limits: limits(&[("carbs", 30.0), ("sugar", 10.0)]),
                preferred_tags: strings(&["low-carb", "diabetic-friendly"]),
                avoid_tags: strings(&["high-sugar"]),
            },
        );
        health_conditions.insert(
            "heart health".to_string(),
            HealthRule {
                nutrient_limits: limits(&[("fats", 15.0), ("sodium", 500.0)]),
                preferred_tags: strings(&["low-fat", "heart-healthy"]),
                avoid_tags: strings(&["high-fat"]),
            },
        );
        health_conditions.insert(
            "weight loss".to_string(),
            HealthRule {
                nutrient_limits: limits(&[("calories", 400.0)]),
                preferred_tags: strings(&["low-calorie"]),
                avoid_tags: strings(&["high-calorie"]),
            },
        );

        let mut cuisines = BTreeMap::new();
        cuisines.insert(
            "italian".to_string(),
            strings(&["tomato", "basil", "olive oil", "garlic"]),
        );
        cuisines.insert(
            "mexican".to_string(),
            strings(&["beans", "corn", "avocado", "chili"]),
        );
        cuisines.insert(
            "indian".to_string(),
            strings(&["curry", "spices", "lentils", "yogurt"]),
        );
        cuisines.insert(
            "asian".to_string(),
            strings(&["soy sauce", "ginger", "sesame", "tofu"]),
        );

        let mut substitutions = BTreeMap::new();
        substitutions.insert(
            "milk".to_string(),
            strings(&["almond milk", "soy milk", "oat milk", "coconut milk"]),
        );
        substitutions.insert(
            "butter".to_string(),
            strings(&["coconut oil", "olive oil", "avocado"]),
        );
        substitutions.insert(
            "cheese".to_string(),
            strings(&["nutritional yeast", "cashew cheese", "tofu"]),
        );
        substitutions.insert(
            "egg".to_string(),
            strings(&["flaxseed meal + water", "chia seeds + water", "applesauce"]),
        );
        substitutions.insert(
            "meat".to_string(),
            strings(&["tofu", "tempeh", "jackfruit", "mushrooms"]),
        );

        Self {
            version: 1,
            health_conditions,
            cuisines,
            substitutions,
        }
    }

    /// Load rule tables from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read rule tables from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let tables: RuleTables = serde_yaml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse rule tables from {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let tables = tables.normalized();
        tables.validate()?;
        Ok(tables)
    }

    /// Load from `path` when given, otherwise use the built-in tables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Lowercase every key so lookups can use normalized user input
    fn normalized(self) -> Self {
        let lower = |s: String| s.trim().to_lowercase();

        Self {
            version: self.version,
            health_conditions: self
                .health_conditions
                .into_iter()
                .map(|(k, rule)| {
                    let rule = HealthRule {
                        nutrient_limits: rule
                            .nutrient_limits
                            .into_iter()
                            .map(|(n, v)| (lower(n), v))
                            .collect(),
                        preferred_tags: rule.preferred_tags.into_iter().map(lower).collect(),
                        avoid_tags: rule.avoid_tags.into_iter().map(lower).collect(),
                    };
                    (lower(k), rule)
                })
                .collect(),
            cuisines: self
                .cuisines
                .into_iter()
                .map(|(k, v)| (lower(k), v))
                .collect(),
            substitutions: self
                .substitutions
                .into_iter()
                .map(|(k, v)| (lower(k), v))
                .collect(),
        }
    }

    /// Validate the tables
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(Error::Config(format!(
                "Unsupported rule tables version: {}. Expected version 1",
                self.version
            )));
        }

        for (name, rule) in &self.health_conditions {
            if name.is_empty() {
                return Err(Error::Config(
                    "Health condition name cannot be empty".to_string(),
                ));
            }
            if name == "none" {
                return Err(Error::Config(
                    "'none' is reserved and cannot name a health condition".to_string(),
                ));
            }
            for (nutrient, limit) in &rule.nutrient_limits {
                if !limit.is_finite() || *limit < 0.0 {
                    return Err(Error::Config(format!(
                        "Health condition '{name}': {nutrient} limit must be non-negative"
                    )));
                }
            }
            if rule.avoid_tags.iter().any(|t| t.is_empty()) {
                return Err(Error::Config(format!(
                    "Health condition '{name}': avoid tags cannot be empty"
                )));
            }
        }

        for (name, ingredients) in &self.cuisines {
            if name.is_empty() || name == "any" {
                return Err(Error::Config(format!("Invalid cuisine name: '{name}'")));
            }
            if ingredients.is_empty() {
                return Err(Error::Config(format!(
                    "Cuisine '{name}' must list at least one ingredient"
                )));
            }
        }

        for (keyword, substitutes) in &self.substitutions {
            if keyword.is_empty() {
                return Err(Error::Config(
                    "Substitution keyword cannot be empty".to_string(),
                ));
            }
            if substitutes.is_empty() {
                return Err(Error::Config(format!(
                    "Substitution '{keyword}' must list at least one substitute"
                )));
            }
        }

        Ok(())
    }

    pub fn health_rule(&self, condition: &str) -> Option<&HealthRule> {
        self.health_conditions.get(condition)
    }

    pub fn cuisine_ingredients(&self, cuisine: &str) -> Option<&[String]> {
        self.cuisines.get(cuisine).map(Vec::as_slice)
    }

    pub fn condition_names(&self) -> Vec<String> {
        self.health_conditions.keys().cloned().collect()
    }

    pub fn cuisine_names(&self) -> Vec<String> {
        self.cuisines.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_tables_are_valid() {
        let tables = RuleTables::builtin();
        assert!(tables.validate().is_ok());
        assert_eq!(
            tables.condition_names(),
            vec!["diabetes", "heart health", "weight loss"]
        );
        assert_eq!(tables.cuisine_names().len(), 4);

        let weight_loss = tables.health_rule("weight loss").unwrap();
        assert_eq!(weight_loss.nutrient_limits.get("calories"), Some(&400.0));
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
version: 1
health_conditions:
  Low Sodium:
    nutrient_limits:
      sodium: 300
    avoid_tags: [salty]
cuisines:
  Greek: [feta, olives]
substitutions:
  cream: [coconut cream]
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let tables = RuleTables::from_file(file.path()).unwrap();
        assert!(tables.health_rule("low sodium").is_some());
        assert_eq!(
            tables.cuisine_ingredients("greek"),
            Some(&["feta".to_string(), "olives".to_string()][..])
        );
        assert!(tables.substitutions.contains_key("cream"));
    }

    #[test]
    fn test_rejects_negative_limit() {
        let yaml = r#"
version: 1
health_conditions:
  broken:
    nutrient_limits:
      calories: -5
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        assert!(matches!(
            RuleTables::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut tables = RuleTables::builtin();
        tables.version = 2;
        assert!(tables.validate().is_err());
    }

    #[test]
    fn test_load_without_path_uses_builtin() {
        let tables = RuleTables::load(None).unwrap();
        assert_eq!(tables.substitutions.len(), 5);
    }
}
