use super::{bad_input, extraction_failure, not_found, storage_failure, RecipePipeline};
use crate::error::ServiceError;
use crate::model::{ProviderIdentity, RecipeForm};
use crate::providers::RecipeInput;
use log::{debug, info};

/// An uploaded image with the MIME type the client declared for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Body of a "new recipe" request. The client may send text, an image, both or neither.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeRequest {
    pub text: Option<String>,
    pub image: Option<ImageUpload>,
}

impl RecipeRequest {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn image(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            text: None,
            image: Some(ImageUpload {
                data,
                content_type: content_type.into(),
            }),
        }
    }

    /// Pick the modality to extract from. A non-empty image wins over text;
    /// blank text counts as absent.
    pub fn into_input(self) -> Result<RecipeInput, ServiceError> {
        if let Some(image) = self.image.filter(|image| !image.data.is_empty()) {
            return Ok(RecipeInput::Image {
                data: image.data,
                mime_type: image.content_type,
            });
        }

        match self.text {
            Some(text) if !text.trim().is_empty() => Ok(RecipeInput::Text(text)),
            _ => Err(bad_input("recipe text or image is required".to_string())),
        }
    }
}

impl RecipePipeline {
    /// Extract a recipe from `request` and store it for the caller.
    ///
    /// Returns the id of the new recipe. Nothing is written when extraction fails.
    pub async fn create_recipe(
        &self,
        identity: Option<&ProviderIdentity>,
        request: RecipeRequest,
    ) -> Result<i64, ServiceError> {
        let user = self.authenticate(identity).await?;
        let input = request.into_input()?;

        debug!(
            "Extracting recipe from {} with {}",
            input.kind(),
            self.provider.provider_name()
        );
        let draft = self
            .provider
            .format(&input)
            .await
            .map_err(extraction_failure)?;

        let recipe = draft.to_recipe(user.id);
        let created = self
            .recipes
            .create(&recipe)
            .await
            .map_err(storage_failure)?;

        info!(
            "Created recipe {} ({} ingredients) for user {}",
            created.id, created.ingredient_count, user.id
        );
        Ok(created.id)
    }

    /// Overwrite recipe `id` with the edited form. Only the owner may do this.
    pub async fn update_recipe(
        &self,
        identity: Option<&ProviderIdentity>,
        id: i64,
        form: RecipeForm,
    ) -> Result<i64, ServiceError> {
        let user = self.authenticate(identity).await?;
        self.owned_recipe(&user, id).await?;

        let mut recipe = form.to_recipe(user.id);
        recipe.id = id;

        let updated = self
            .recipes
            .update(&recipe)
            .await
            .map_err(storage_failure)?
            // Deleted between the ownership check and the write.
            .ok_or_else(|| not_found(id))?;

        info!("Updated recipe {} for user {}", updated.id, user.id);
        Ok(updated.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Draft;
    use crate::pipelines::tests::{pipeline_with, StubProvider};
    use std::sync::Arc;

    fn banana_bread() -> Draft {
        Draft {
            title: "Banana Bread".to_string(),
            ingredients: vec!["3 bananas".to_string(), "2 cups flour".to_string()],
            directions: vec!["Mash".to_string(), "Bake".to_string()],
            prep_time: "15 minutes".to_string(),
            cook_time: "1 hour".to_string(),
            servings: 8,
        }
    }

    #[test]
    fn test_image_takes_precedence_over_text() {
        let request = RecipeRequest {
            text: Some("2 eggs".to_string()),
            image: Some(ImageUpload {
                data: vec![1, 2, 3],
                content_type: "image/jpeg".to_string(),
            }),
        };

        assert_eq!(
            request.into_input().unwrap(),
            RecipeInput::Image {
                data: vec![1, 2, 3],
                mime_type: "image/jpeg".to_string()
            }
        );
    }

    #[test]
    fn test_empty_image_falls_back_to_text() {
        let request = RecipeRequest {
            text: Some("2 eggs".to_string()),
            image: Some(ImageUpload {
                data: Vec::new(),
                content_type: "image/png".to_string(),
            }),
        };

        assert_eq!(
            request.into_input().unwrap(),
            RecipeInput::Text("2 eggs".to_string())
        );
    }

    #[test]
    fn test_no_input_is_bad_input() {
        assert!(matches!(
            RecipeRequest::default().into_input(),
            Err(ServiceError::BadInput(_))
        ));
        assert!(matches!(
            RecipeRequest::text("  \n\t").into_input(),
            Err(ServiceError::BadInput(_))
        ));
    }

    #[tokio::test]
    async fn test_create_recipe_from_text() {
        let provider = Arc::new(StubProvider::returning(banana_bread()));
        let pipeline = pipeline_with(provider.clone()).await;
        let identity = ProviderIdentity::new("alice", "google");
        let user = pipeline.sign_in(&identity).await.unwrap();

        let id = pipeline
            .create_recipe(Some(&identity), RecipeRequest::text("bananas, flour, bake"))
            .await
            .unwrap();

        let stored = pipeline.recipes().get(id).await.unwrap().unwrap();
        assert_eq!(stored.owner_id, user.id);
        assert_eq!(stored.title, "Banana Bread");
        assert_eq!(stored.ingredient_count, 2);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(
            provider.calls.lock().unwrap()[0],
            RecipeInput::Text("bananas, flour, bake".to_string())
        );
    }

    #[tokio::test]
    async fn test_create_recipe_from_image() {
        let provider = Arc::new(StubProvider::returning(banana_bread()));
        let pipeline = pipeline_with(provider.clone()).await;
        let identity = ProviderIdentity::new("alice", "google");
        pipeline.sign_in(&identity).await.unwrap();

        pipeline
            .create_recipe(Some(&identity), RecipeRequest::image(vec![0xff, 0xd8], "image/jpeg"))
            .await
            .unwrap();

        assert_eq!(
            provider.calls.lock().unwrap()[0],
            RecipeInput::Image {
                data: vec![0xff, 0xd8],
                mime_type: "image/jpeg".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_create_never_calls_provider() {
        let provider = Arc::new(StubProvider::returning(banana_bread()));
        let pipeline = pipeline_with(provider.clone()).await;

        let result = pipeline
            .create_recipe(None, RecipeRequest::text("2 eggs"))
            .await;

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_extraction_failure_writes_nothing() {
        let provider = Arc::new(StubProvider::default());
        let pipeline = pipeline_with(provider.clone()).await;
        let identity = ProviderIdentity::new("alice", "google");
        let user = pipeline.sign_in(&identity).await.unwrap();

        let result = pipeline
            .create_recipe(Some(&identity), RecipeRequest::text("2 eggs"))
            .await;

        assert!(matches!(result, Err(ServiceError::Extraction(_))));
        assert!(pipeline.recipes().get_for_owner(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_by_owner() {
        let pipeline = pipeline_with(Arc::new(StubProvider::returning(banana_bread()))).await;
        let identity = ProviderIdentity::new("alice", "google");
        pipeline.sign_in(&identity).await.unwrap();
        let id = pipeline
            .create_recipe(Some(&identity), RecipeRequest::text("banana bread"))
            .await
            .unwrap();

        let form = RecipeForm {
            title: "Chocolate Banana Bread".to_string(),
            ingredients: "3 bananas\n2 cups flour\n1 cup chocolate chips".to_string(),
            number_of_ingredients: 1,
            directions: "Mash\nFold in chips\nBake".to_string(),
            notes: "Freezes well".to_string(),
            prep_time: "20 minutes".to_string(),
            cook_time: "1 hour".to_string(),
            servings: 10,
        };

        let updated_id = pipeline
            .update_recipe(Some(&identity), id, form)
            .await
            .unwrap();
        assert_eq!(updated_id, id);

        let stored = pipeline.recipes().get(id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Chocolate Banana Bread");
        assert_eq!(stored.ingredient_count, 3);
        assert_eq!(stored.notes, "Freezes well");
    }

    #[tokio::test]
    async fn test_update_by_other_user_is_forbidden() {
        let pipeline = pipeline_with(Arc::new(StubProvider::returning(banana_bread()))).await;
        let alice = ProviderIdentity::new("alice", "google");
        let mallory = ProviderIdentity::new("mallory", "github");
        pipeline.sign_in(&alice).await.unwrap();
        pipeline.sign_in(&mallory).await.unwrap();

        let id = pipeline
            .create_recipe(Some(&alice), RecipeRequest::text("banana bread"))
            .await
            .unwrap();

        let form = RecipeForm {
            title: "Hijacked".to_string(),
            ..Default::default()
        };
        let result = pipeline.update_recipe(Some(&mallory), id, form).await;
        assert!(matches!(result, Err(ServiceError::Forbidden)));

        let stored = pipeline.recipes().get(id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Banana Bread");
    }

    #[tokio::test]
    async fn test_update_missing_recipe_is_not_found() {
        let pipeline = pipeline_with(Arc::new(StubProvider::default())).await;
        let identity = ProviderIdentity::new("alice", "google");
        pipeline.sign_in(&identity).await.unwrap();

        let result = pipeline
            .update_recipe(Some(&identity), 999, RecipeForm::default())
            .await;
        assert!(matches!(result, Err(ServiceError::NotFound(999))));
    }
}
