use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored recipe.
///
/// `ingredient_count` is denormalized for list views and always equals
/// `ingredients.len()` when produced by one of the mappers below.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    /// Assigned by storage; 0 until the recipe has been created.
    pub id: i64,
    /// Internal id of the user who created the recipe. Never taken from client input.
    pub owner_id: i64,
    pub title: String,
    pub ingredients: Vec<String>,
    pub ingredient_count: i64,
    pub directions: Vec<String>,
    pub notes: String,
    pub prep_time: String,
    pub cook_time: String,
    pub servings: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Structured recipe as returned by the completion API.
///
/// Field names match the JSON schema the model is constrained to. Anything the
/// model could not determine comes back as an empty string, not a missing key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub title: String,
    pub ingredients: Vec<String>,
    pub directions: Vec<String>,
    pub prep_time: String,
    pub cook_time: String,
    pub servings: i64,
}

impl Draft {
    pub fn to_recipe(self, owner_id: i64) -> Recipe {
        let now = Utc::now();
        Recipe {
            id: 0,
            owner_id,
            title: self.title,
            ingredient_count: self.ingredients.len() as i64,
            ingredients: self.ingredients,
            directions: self.directions,
            notes: String::new(),
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Fields submitted from the edit form.
///
/// Ingredients and directions arrive as newline-delimited text, one entry per line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecipeForm {
    pub title: String,
    pub ingredients: String,
    /// Ignored: the count is derived from `ingredients`.
    #[serde(default)]
    pub number_of_ingredients: i64,
    pub directions: String,
    #[serde(default)]
    pub notes: String,
    pub prep_time: String,
    pub cook_time: String,
    pub servings: i64,
}

impl RecipeForm {
    /// Pre-filled form for an existing recipe.
    pub fn from_recipe(recipe: &Recipe) -> Self {
        RecipeForm {
            title: recipe.title.clone(),
            ingredients: recipe.ingredients.join("\n"),
            number_of_ingredients: recipe.ingredient_count,
            directions: recipe.directions.join("\n"),
            notes: recipe.notes.clone(),
            prep_time: recipe.prep_time.clone(),
            cook_time: recipe.cook_time.clone(),
            servings: recipe.servings,
        }
    }

    /// Note that an empty field yields a single empty entry, not an empty list.
    pub fn to_recipe(self, owner_id: i64) -> Recipe {
        let now = Utc::now();
        let ingredients = split_lines(&self.ingredients);
        Recipe {
            id: 0,
            owner_id,
            title: self.title,
            ingredient_count: ingredients.len() as i64,
            ingredients,
            directions: split_lines(&self.directions),
            notes: self.notes,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            created_at: now,
            updated_at: now,
        }
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

/// Verified identity handed over by the login layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    /// Subject id issued by the identity provider
    pub user_id: String,
    /// Identity provider name, e.g. "google"
    pub provider: String,
}

impl ProviderIdentity {
    pub fn new(user_id: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            provider: provider.into(),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub user_id: String,
    pub provider: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
