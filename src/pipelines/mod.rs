//! Request-level flows: sign-in, ingestion, edits and owner-scoped reads.
//!
//! Every failure is logged once, where it is detected, and returned as a
//! [`ServiceError`] for the boundary to translate.

mod ingest;
mod read;

pub use ingest::{ImageUpload, RecipeRequest};

use crate::database::Database;
use crate::error::{ExtractionError, ServiceError, StorageError};
use crate::model::{ProviderIdentity, Recipe, User};
use crate::providers::LlmProvider;
use crate::repository::{RecipeRepository, UserRepository};
use log::{error, info, warn};
use std::sync::Arc;

/// Coordinates extraction, mapping, authorization and persistence.
///
/// Holds only shared handles, so one instance serves concurrent requests.
#[derive(Clone)]
pub struct RecipePipeline {
    recipes: RecipeRepository,
    users: UserRepository,
    provider: Arc<dyn LlmProvider>,
}

impl RecipePipeline {
    pub fn new(db: &Database, provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            recipes: RecipeRepository::new(db),
            users: UserRepository::new(db),
            provider,
        }
    }

    pub fn recipes(&self) -> &RecipeRepository {
        &self.recipes
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    /// Register or look up the user behind a freshly verified identity.
    pub async fn sign_in(&self, identity: &ProviderIdentity) -> Result<User, ServiceError> {
        if !is_well_formed(identity) {
            return Err(unauthorized("identity is missing a user id or provider"));
        }

        let user = self
            .users
            .find_or_create(identity)
            .await
            .map_err(storage_failure)?;

        info!("User {} signed in via {}", user.id, user.provider);
        Ok(user)
    }

    /// Resolve the caller of a request to a stored user.
    pub async fn authenticate(
        &self,
        identity: Option<&ProviderIdentity>,
    ) -> Result<User, ServiceError> {
        let identity = identity.ok_or_else(|| unauthorized("no identity on request"))?;
        if !is_well_formed(identity) {
            return Err(unauthorized("identity is missing a user id or provider"));
        }

        self.users
            .get_by_provider_id(&identity.user_id, &identity.provider)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| unauthorized("identity does not match a registered user"))
    }

    /// Fetch a recipe and check that `user` owns it.
    async fn owned_recipe(&self, user: &User, id: i64) -> Result<Recipe, ServiceError> {
        let recipe = self
            .recipes
            .get(id)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| not_found(id))?;

        if recipe.owner_id != user.id {
            warn!("User {} denied access to recipe {}", user.id, id);
            return Err(ServiceError::Forbidden);
        }

        Ok(recipe)
    }
}

/// Parse a recipe id taken from a path segment.
pub fn parse_recipe_id(raw: &str) -> Result<i64, ServiceError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(bad_input("missing recipe id".to_string()));
    }
    raw.parse::<i64>()
        .map_err(|_| bad_input(format!("invalid recipe id '{}'", raw)))
}

fn is_well_formed(identity: &ProviderIdentity) -> bool {
    !identity.user_id.trim().is_empty() && !identity.provider.trim().is_empty()
}

fn unauthorized(reason: &str) -> ServiceError {
    warn!("Unauthorized request: {}", reason);
    ServiceError::Unauthorized
}

fn not_found(id: i64) -> ServiceError {
    warn!("Recipe {} not found", id);
    ServiceError::NotFound(id)
}

fn bad_input(reason: String) -> ServiceError {
    warn!("Bad input: {}", reason);
    ServiceError::BadInput(reason)
}

fn extraction_failure(err: ExtractionError) -> ServiceError {
    error!("Recipe extraction failed: {}", err);
    ServiceError::Extraction(err)
}

fn storage_failure(err: StorageError) -> ServiceError {
    error!("Storage failure: {}", err);
    ServiceError::Storage(err)
}
