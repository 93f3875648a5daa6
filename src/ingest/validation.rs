// Validation of raw recipe records before they are embedded
use crate::error::{Error, Result};
use crate::ingest::{RawField, RawRecipe};
use crate::models::Nutrition;
use crate::ranking::filter::GLUTEN_SOURCES;
use tracing::warn;

const NON_VEGAN: &[&str] = &["milk", "cheese", "butter", "egg", "honey", "yogurt", "cream"];

/// A record that passed validation and is ready to embed
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecipe {
    pub name: String,
    pub ingredients: String,
    pub instructions: String,
    pub cuisine: Option<String>,
    pub nutrition: Nutrition,
    pub tags: String,
}

fn required_text(value: &Option<String>, field: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(Error::MissingField(field.to_string())),
    }
}

fn required_number(value: &Option<RawField>, field: &str) -> Result<f64> {
    let raw = value
        .as_ref()
        .ok_or_else(|| Error::MissingField(field.to_string()))?;

    if let RawField::Text(text) = raw {
        if text.trim().is_empty() {
            return Err(Error::MissingField(field.to_string()));
        }
    }

    match raw.as_number() {
        Some(n) if n.is_finite() && n >= 0.0 => Ok(n),
        _ => Err(Error::Validation(format!(
            "Field {field} must be a non-negative number"
        ))),
    }
}

/// Check a raw record for completeness and for claims its ingredients
/// contradict.
pub fn validate_recipe(raw: &RawRecipe) -> Result<ValidRecipe> {
    let name = required_text(&raw.name, "name")?;
    let ingredients = required_text(&raw.ingredients, "ingredients")?;
    let instructions = required_text(&raw.instructions, "instructions")?;
    let nutrition = Nutrition {
        calories: required_number(&raw.calories, "calories")?,
        protein: required_number(&raw.protein, "protein")?,
        carbs: required_number(&raw.carbs, "carbs")?,
        fats: required_number(&raw.fats, "fats")?,
    };
    let tags = required_text(&raw.tags, "tags")?;

    let name_lower = name.to_lowercase();
    let ingredients_lower = ingredients.to_lowercase();
    let tags_lower = tags.to_lowercase();

    if name_lower.contains("curry") && !ingredients_lower.contains("curry") {
        return Err(Error::Validation(format!(
            "Recipe {name} claims to be curry but lists no curry ingredient"
        )));
    }

    if name_lower.contains("chocolate")
        && !ingredients_lower.contains("cocoa")
        && !ingredients_lower.contains("chocolate")
    {
        return Err(Error::Validation(format!(
            "Recipe {name} claims to be chocolate but lists no cocoa or chocolate"
        )));
    }

    if tags_lower.contains("vegan") {
        if let Some(item) = NON_VEGAN.iter().find(|i| ingredients_lower.contains(*i)) {
            warn!("Recipe {} tagged vegan contains {}", name, item);
            return Err(Error::Validation(format!(
                "Recipe {name} claims to be vegan but contains animal products"
            )));
        }
    }

    if tags_lower.contains("gluten-free")
        && GLUTEN_SOURCES.iter().any(|s| ingredients_lower.contains(s))
    {
        return Err(Error::Validation(format!(
            "Recipe {name} claims to be gluten-free but contains gluten"
        )));
    }

    let cuisine = raw
        .cuisine
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);

    Ok(ValidRecipe {
        name,
        ingredients,
        instructions,
        cuisine,
        nutrition,
        tags,
    })
}
