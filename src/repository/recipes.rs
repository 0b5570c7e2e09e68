use crate::database::{Database, JsonArray};
use crate::error::StorageError;
use crate::model::Recipe;
use chrono::Utc;
use log::debug;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, Row};

const SELECT_RECIPE: &str = "
    SELECT id, user_id, title, ingredients, number_of_ingredients, directions, notes,
           prep_time, cook_time, servings, created_at, updated_at
    FROM recipes";

impl<'r> FromRow<'r, SqliteRow> for Recipe {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        // Both list columns are NOT NULL, so a null never reaches this point in practice.
        let ingredients: JsonArray<String> = row.try_get("ingredients")?;
        let directions: JsonArray<String> = row.try_get("directions")?;

        Ok(Recipe {
            id: row.try_get("id")?,
            owner_id: row.try_get("user_id")?,
            title: row.try_get("title")?,
            ingredients: ingredients.into_inner().unwrap_or_default(),
            ingredient_count: row.try_get("number_of_ingredients")?,
            directions: directions.into_inner().unwrap_or_default(),
            notes: row.try_get("notes")?,
            prep_time: row.try_get("prep_time")?,
            cook_time: row.try_get("cook_time")?,
            servings: row.try_get("servings")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// The only place recipes are read from or written to storage.
#[derive(Debug, Clone)]
pub struct RecipeRepository {
    pool: SqlitePool,
}

impl RecipeRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// `None` when no recipe has this id.
    pub async fn get(&self, id: i64) -> Result<Option<Recipe>, StorageError> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!("{} WHERE id = ?", SELECT_RECIPE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(recipe)
    }

    /// All recipes of one owner, newest first.
    pub async fn get_for_owner(&self, owner_id: i64) -> Result<Vec<Recipe>, StorageError> {
        let recipes = sqlx::query_as::<_, Recipe>(&format!(
            "{} WHERE user_id = ? ORDER BY id DESC",
            SELECT_RECIPE
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(recipes)
    }

    /// Recipes of one owner whose title contains `term`, using SQLite `LIKE`
    /// semantics (ASCII case-insensitive). An empty term matches every title.
    pub async fn search(&self, owner_id: i64, term: &str) -> Result<Vec<Recipe>, StorageError> {
        let recipes = sqlx::query_as::<_, Recipe>(&format!(
            "{} WHERE user_id = ? AND title LIKE '%' || ? || '%' ORDER BY id DESC",
            SELECT_RECIPE
        ))
        .bind(owner_id)
        .bind(term)
        .fetch_all(&self.pool)
        .await?;

        Ok(recipes)
    }

    /// Insert `recipe` and return the stored row, including its new id.
    pub async fn create(&self, recipe: &Recipe) -> Result<Recipe, StorageError> {
        let result = sqlx::query(
            "INSERT INTO recipes (user_id, title, ingredients, number_of_ingredients, directions, notes,
                                  prep_time, cook_time, servings, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(recipe.owner_id)
        .bind(&recipe.title)
        .bind(JsonArray::new(recipe.ingredients.clone()))
        .bind(recipe.ingredient_count)
        .bind(JsonArray::new(recipe.directions.clone()))
        .bind(&recipe.notes)
        .bind(&recipe.prep_time)
        .bind(&recipe.cook_time)
        .bind(recipe.servings)
        .bind(recipe.created_at)
        .bind(recipe.updated_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("Inserted recipe {} for user {}", id, recipe.owner_id);

        self.get(id)
            .await?
            .ok_or(StorageError::Database(sqlx::Error::RowNotFound))
    }

    /// Overwrite every editable field of the recipe with id `recipe.id`.
    ///
    /// Owner and creation time are never changed; `updated_at` is set to now.
    /// Returns `None` when no recipe has that id.
    pub async fn update(&self, recipe: &Recipe) -> Result<Option<Recipe>, StorageError> {
        let result = sqlx::query(
            "UPDATE recipes
             SET title = ?, ingredients = ?, number_of_ingredients = ?, directions = ?, notes = ?,
                 prep_time = ?, cook_time = ?, servings = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&recipe.title)
        .bind(JsonArray::new(recipe.ingredients.clone()))
        .bind(recipe.ingredient_count)
        .bind(JsonArray::new(recipe.directions.clone()))
        .bind(&recipe.notes)
        .bind(&recipe.prep_time)
        .bind(&recipe.cook_time)
        .bind(recipe.servings)
        .bind(Utc::now())
        .bind(recipe.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(recipe.id).await
    }

    /// `true` if a row was removed; deleting a missing id is not an error.
    pub async fn delete(&self, id: i64) -> Result<bool, StorageError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
