//! Personal recipe service core.
//!
//! Pasted text or a photo of a recipe is structured by a chat completions
//! model into a [`Draft`], mapped to a [`Recipe`] owned by the signed-in
//! user, and stored in SQLite. Recipes can then be listed, searched, edited
//! through a [`RecipeForm`] and deleted by their owner.
//!
//! ```no_run
//! use std::sync::Arc;
//! use sourdough::{AppConfig, Database, OpenAIProvider, ProviderIdentity, RecipePipeline, RecipeRequest};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::load()?;
//! let db = Database::connect(&config.database.path, config.database.max_connections).await?;
//! let pipeline = RecipePipeline::new(&db, Arc::new(OpenAIProvider::new(&config.llm)?));
//!
//! let me = ProviderIdentity::new("108234", "google");
//! pipeline.sign_in(&me).await?;
//! let id = pipeline
//!     .create_recipe(Some(&me), RecipeRequest::text("2 eggs\n1 cup flour\nMix and bake."))
//!     .await?;
//! println!("stored recipe {}", id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod model;
pub mod pipelines;
pub mod providers;
pub mod repository;

pub use config::{load_config, AppConfig, DatabaseConfig, LlmConfig};
pub use database::{Database, JsonArray};
pub use error::{ExtractionError, ServiceError, StorageError};
pub use model::{Draft, ProviderIdentity, Recipe, RecipeForm, User};
pub use pipelines::{parse_recipe_id, ImageUpload, RecipePipeline, RecipeRequest};
pub use providers::{LlmProvider, OpenAIProvider, RecipeInput};
pub use repository::{RecipeRepository, UserRepository};
