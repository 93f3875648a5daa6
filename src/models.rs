use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Macronutrients stored with every indexed recipe
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Nutrition {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl Nutrition {
    /// Look up a nutrient by its metadata key
    pub fn get(&self, nutrient: &str) -> Option<f64> {
        match nutrient {
            "calories" => Some(self.calories),
            "protein" => Some(self.protein),
            "carbs" => Some(self.carbs),
            "fats" => Some(self.fats),
            _ => None,
        }
    }
}

/// A recipe flowing through the ranking pipeline for a single request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeCandidate {
    pub id: String,
    pub name: String,
    pub ingredients: String,
    pub instructions: String,
    pub tags: String,
    pub cuisine: String,
    pub nutrition: Nutrition,
    pub similarity_score: f64,
    pub nutrition_score: f64,
    pub combined_score: f64,
}

impl RecipeCandidate {
    /// Build a candidate from a search match's flat metadata.
    ///
    /// Fails with [`Error::PartialMetadata`] naming the first missing field.
    pub fn from_metadata(id: &str, similarity: f64, metadata: &Map<String, Value>) -> Result<Self> {
        Ok(Self {
            id: id.to_string(),
            name: text_field(metadata, "name")?,
            ingredients: text_field(metadata, "ingredients")?,
            instructions: text_field(metadata, "instructions")?,
            tags: optional_text(metadata, "tags"),
            cuisine: optional_text(metadata, "cuisine").to_lowercase(),
            nutrition: Nutrition {
                calories: number_field(metadata, "calories")?,
                protein: number_field(metadata, "protein")?,
                carbs: number_field(metadata, "carbs")?,
                fats: number_field(metadata, "fats")?,
            },
            similarity_score: similarity,
            nutrition_score: 1.0,
            combined_score: 0.0,
        })
    }

    /// Ingredients split on commas and newlines, trimmed, blanks dropped
    pub fn ingredient_list(&self) -> Vec<&str> {
        self.ingredients
            .split([',', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn text_field(metadata: &Map<String, Value>, key: &str) -> Result<String> {
    match metadata.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(Error::PartialMetadata(key.to_string())),
    }
}

fn optional_text(metadata: &Map<String, Value>, key: &str) -> String {
    match metadata.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn number_field(metadata: &Map<String, Value>, key: &str) -> Result<f64> {
    let value = match metadata.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match value {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(Error::PartialMetadata(key.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_metadata() {
        let meta = metadata(json!({
            "name": "Lentil Soup",
            "ingredients": "lentils, carrots, onion",
            "instructions": "Simmer everything.",
            "tags": "vegan,gluten-free",
            "cuisine": "Indian",
            "calories": 320.0,
            "protein": 18,
            "carbs": "45",
            "fats": 4.5
        }));

        let recipe = RecipeCandidate::from_metadata("7", 0.91, &meta).unwrap();
        assert_eq!(recipe.id, "7");
        assert_eq!(recipe.cuisine, "indian");
        assert_eq!(recipe.nutrition.carbs, 45.0);
        assert_eq!(recipe.nutrition.protein, 18.0);
        assert_eq!(recipe.similarity_score, 0.91);
        assert_eq!(recipe.nutrition_score, 1.0);
    }

    #[test]
    fn test_missing_field_is_partial_metadata() {
        let meta = metadata(json!({
            "name": "Mystery",
            "ingredients": "rice",
            "instructions": "Cook.",
            "calories": 100,
            "protein": 2,
            "carbs": 20
        }));

        match RecipeCandidate::from_metadata("1", 0.5, &meta) {
            Err(Error::PartialMetadata(field)) => assert_eq!(field, "fats"),
            other => panic!("expected partial metadata error, got {other:?}"),
        }
    }

    #[test]
    fn test_tags_and_cuisine_are_optional() {
        let meta = metadata(json!({
            "name": "Toast",
            "ingredients": "bread",
            "instructions": "Toast it.",
            "calories": 80,
            "protein": 3,
            "carbs": 15,
            "fats": 1
        }));

        let recipe = RecipeCandidate::from_metadata("2", 0.4, &meta).unwrap();
        assert_eq!(recipe.tags, "");
        assert_eq!(recipe.cuisine, "");
    }

    #[test]
    fn test_ingredient_list() {
        let meta = metadata(json!({
            "name": "Salad",
            "ingredients": "lettuce, tomato\ncucumber,, olive oil ",
            "instructions": "Toss.",
            "calories": 120,
            "protein": 2,
            "carbs": 8,
            "fats": 9
        }));

        let recipe = RecipeCandidate::from_metadata("3", 0.7, &meta).unwrap();
        assert_eq!(
            recipe.ingredient_list(),
            vec!["lettuce", "tomato", "cucumber", "olive oil"]
        );
    }

    #[test]
    fn test_nutrition_lookup() {
        let nutrition = Nutrition {
            calories: 500.0,
            protein: 20.0,
            carbs: 60.0,
            fats: 10.0,
        };
        assert_eq!(nutrition.get("fats"), Some(10.0));
        assert_eq!(nutrition.get("sodium"), None);
    }
}
