use super::{storage_failure, RecipePipeline};
use crate::error::ServiceError;
use crate::model::{ProviderIdentity, Recipe};
use log::{debug, info, warn};

impl RecipePipeline {
    /// A single recipe, visible to its owner only.
    pub async fn get_recipe(
        &self,
        identity: Option<&ProviderIdentity>,
        id: i64,
    ) -> Result<Recipe, ServiceError> {
        let user = self.authenticate(identity).await?;
        self.owned_recipe(&user, id).await
    }

    /// The caller's recipes, newest first.
    pub async fn list_recipes(
        &self,
        identity: Option<&ProviderIdentity>,
    ) -> Result<Vec<Recipe>, ServiceError> {
        let user = self.authenticate(identity).await?;
        self.recipes
            .get_for_owner(user.id)
            .await
            .map_err(storage_failure)
    }

    /// The caller's recipes whose title contains `term`.
    pub async fn search_recipes(
        &self,
        identity: Option<&ProviderIdentity>,
        term: &str,
    ) -> Result<Vec<Recipe>, ServiceError> {
        let user = self.authenticate(identity).await?;
        let recipes = self
            .recipes
            .search(user.id, term)
            .await
            .map_err(storage_failure)?;

        debug!("Search '{}' matched {} recipes for user {}", term, recipes.len(), user.id);
        Ok(recipes)
    }

    /// Delete recipe `id` if the caller owns it.
    ///
    /// A missing id is not an error: the result is `false`.
    pub async fn delete_recipe(
        &self,
        identity: Option<&ProviderIdentity>,
        id: i64,
    ) -> Result<bool, ServiceError> {
        let user = self.authenticate(identity).await?;

        let existing = self.recipes.get(id).await.map_err(storage_failure)?;
        match existing {
            None => {
                debug!("Recipe {} already absent", id);
                return Ok(false);
            }
            Some(recipe) if recipe.owner_id != user.id => {
                warn!("User {} denied deleting recipe {}", user.id, id);
                return Err(ServiceError::Forbidden);
            }
            Some(_) => {}
        }

        let deleted = self.recipes.delete(id).await.map_err(storage_failure)?;
        if deleted {
            info!("Deleted recipe {} for user {}", id, user.id);
        }
        Ok(deleted)
    }
}
