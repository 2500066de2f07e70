//! Recipe model with its ingredients and ordered steps.

use serde::{Deserialize, Serialize};

use super::resolve_slug;
use crate::cooking::scale_quantity;
use crate::errors::AppError;

/// Difficulty shown on the recipe card.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// One ingredient line, quantity expressed for `Recipe::base_portions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub quantity: f64,
    pub unit: String,
}

/// One instruction step. `order` starts at 1.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeStep {
    pub id: String,
    pub order: i64,
    pub description: String,
    /// Minutes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    /// Names of the ingredients this step consumes.
    #[serde(default)]
    pub ingredients: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub difficulty: Difficulty,
    /// Minutes
    pub prep_time: i64,
    /// Minutes
    pub cook_time: i64,
    pub base_portions: i64,
    pub category: String,
    pub image: Option<String>,
    pub published: bool,
    pub created_at: String,
    pub updated_at: String,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<RecipeStep>,
}

impl Recipe {
    /// Copy of the recipe with ingredient quantities rescaled to `portions`.
    pub fn scaled(&self, portions: i64) -> RecipeView {
        let mut recipe = self.clone();
        for ingredient in &mut recipe.ingredients {
            ingredient.quantity =
                scale_quantity(ingredient.quantity, self.base_portions, portions);
        }
        RecipeView { recipe, portions }
    }
}

/// Recipe as returned by the detail endpoints, with the portion count the
/// ingredient quantities are expressed for.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeView {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub portions: i64,
}

/// Ingredient line as submitted by the admin form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientInput {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

/// Step as submitted by the admin form. Its order is its array position.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    pub description: String,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub ingredients: Vec<String>,
}

/// Request body for creating or fully replacing a recipe.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub prep_time: i64,
    #[serde(default)]
    pub cook_time: i64,
    pub base_portions: i64,
    #[serde(default)]
    pub category: String,
    /// Existing image URL to keep. Ignored when a file is uploaded.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub ingredients: Vec<IngredientInput>,
    #[serde(default)]
    pub steps: Vec<StepInput>,
}

/// A validated, normalized recipe ready to be written.
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub prep_time: i64,
    pub cook_time: i64,
    pub base_portions: i64,
    pub category: String,
    pub image: Option<String>,
    pub published: bool,
    pub ingredients: Vec<IngredientInput>,
    pub steps: Vec<StepInput>,
}

impl RecipeRequest {
    /// Check field shapes and normalize whitespace.
    pub fn validate(self) -> Result<RecipeDraft, AppError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }

        let slug = resolve_slug(self.slug.as_deref(), &title).map_err(AppError::Validation)?;

        if self.base_portions <= 0 {
            return Err(AppError::Validation(
                "basePortions must be greater than 0".to_string(),
            ));
        }
        if self.prep_time < 0 || self.cook_time < 0 {
            return Err(AppError::Validation(
                "prepTime and cookTime cannot be negative".to_string(),
            ));
        }

        if self.ingredients.is_empty() {
            return Err(AppError::Validation(
                "At least one ingredient is required".to_string(),
            ));
        }
        let mut ingredients = Vec::with_capacity(self.ingredients.len());
        for (i, ingredient) in self.ingredients.into_iter().enumerate() {
            let name = ingredient.name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::Validation(format!(
                    "Ingredient {} needs a name",
                    i + 1
                )));
            }
            if !ingredient.quantity.is_finite() || ingredient.quantity <= 0.0 {
                return Err(AppError::Validation(format!(
                    "Ingredient '{}' needs a quantity greater than 0",
                    name
                )));
            }
            ingredients.push(IngredientInput {
                name,
                quantity: ingredient.quantity,
                unit: ingredient.unit.trim().to_string(),
            });
        }

        if self.steps.is_empty() {
            return Err(AppError::Validation(
                "At least one step is required".to_string(),
            ));
        }
        let mut steps = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.into_iter().enumerate() {
            let description = step.description.trim().to_string();
            if description.is_empty() {
                return Err(AppError::Validation(format!(
                    "Step {} needs a description",
                    i + 1
                )));
            }
            if matches!(step.duration, Some(d) if d <= 0) {
                return Err(AppError::Validation(format!(
                    "Step {} duration must be greater than 0",
                    i + 1
                )));
            }
            let mut used = Vec::new();
            for name in step.ingredients {
                let name = name.trim();
                let wanted = name.to_lowercase();
                let known = ingredients
                    .iter()
                    .find(|ing| ing.name.to_lowercase() == wanted);
                match known {
                    Some(ing) if !used.contains(&ing.name) => used.push(ing.name.clone()),
                    Some(_) => {}
                    None => {
                        return Err(AppError::Validation(format!(
                            "Step {} uses unknown ingredient '{}'",
                            i + 1,
                            name
                        )))
                    }
                }
            }
            steps.push(StepInput {
                description,
                duration: step.duration,
                ingredients: used,
            });
        }

        Ok(RecipeDraft {
            title,
            slug,
            description: self.description.trim().to_string(),
            difficulty: self.difficulty,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            base_portions: self.base_portions,
            category: self.category.trim().to_string(),
            image: self.image.filter(|url| !url.trim().is_empty()),
            published: self.published,
            ingredients,
            steps,
        })
    }
}

/// Query parameters of the recipe list.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    #[serde(default)]
    pub category: Option<String>,
}

/// Query parameters of the recipe detail endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct PortionsQuery {
    #[serde(default)]
    pub portions: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> RecipeRequest {
        serde_json::from_value(value).unwrap()
    }

    fn tarte() -> serde_json::Value {
        json!({
            "title": "Tarte",
            "slug": "tarte",
            "basePortions": 4,
            "ingredients": [{ "name": "Farine", "quantity": 200, "unit": "g" }],
            "steps": [{ "description": "Mélanger les ingrédients secs ensemble" }]
        })
    }

    #[test]
    fn test_minimal_request_gets_defaults() {
        let draft = request(tarte()).validate().unwrap();
        assert_eq!(draft.slug, "tarte");
        assert_eq!(draft.difficulty, Difficulty::Easy);
        assert_eq!(draft.prep_time, 0);
        assert!(!draft.published);
        assert_eq!(draft.ingredients.len(), 1);
        assert_eq!(draft.steps.len(), 1);
    }

    #[test]
    fn test_rejects_bad_portions_and_quantities() {
        let mut body = tarte();
        body["basePortions"] = json!(0);
        assert!(request(body).validate().is_err());

        let mut body = tarte();
        body["ingredients"][0]["quantity"] = json!(0);
        assert!(request(body).validate().is_err());

        let mut body = tarte();
        body["ingredients"] = json!([]);
        assert!(request(body).validate().is_err());

        let mut body = tarte();
        body["steps"] = json!([{ "description": "   " }]);
        assert!(request(body).validate().is_err());
    }

    #[test]
    fn test_step_ingredients_must_exist() {
        let mut body = tarte();
        body["steps"][0]["ingredients"] = json!(["farine"]);
        let draft = request(body).validate().unwrap();
        assert_eq!(draft.steps[0].ingredients, vec!["Farine".to_string()]);

        let mut body = tarte();
        body["steps"][0]["ingredients"] = json!(["Sucre"]);
        assert!(request(body).validate().is_err());
    }

    #[test]
    fn test_scaled_view() {
        let recipe = Recipe {
            id: "r1".into(),
            title: "Tarte".into(),
            slug: "tarte".into(),
            description: String::new(),
            difficulty: Difficulty::Easy,
            prep_time: 0,
            cook_time: 0,
            base_portions: 4,
            category: String::new(),
            image: None,
            published: true,
            created_at: String::new(),
            updated_at: String::new(),
            ingredients: vec![Ingredient {
                id: "i1".into(),
                name: "Farine".into(),
                quantity: 200.0,
                unit: "g".into(),
            }],
            steps: vec![],
        };

        let view = recipe.scaled(8);
        assert_eq!(view.portions, 8);
        assert_eq!(view.recipe.ingredients[0].quantity, 400.0);

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["portions"], 8);
        assert_eq!(json["basePortions"], 4);
        assert_eq!(json["ingredients"][0]["quantity"], 400.0);
    }
}
