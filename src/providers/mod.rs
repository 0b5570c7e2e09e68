mod open_ai;
mod prompt;
mod schema;

pub use open_ai::OpenAIProvider;
pub use prompt::{IMAGE_EXTRACTION_PROMPT, TEXT_EXTRACTION_PROMPT};
pub use schema::{draft_schema, SCHEMA_NAME};

use crate::error::ExtractionError;
use crate::model::Draft;
use async_trait::async_trait;

/// What the user submitted for extraction. Exactly one modality per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeInput {
    /// Pasted recipe text
    Text(String),
    /// Raw image bytes with their declared MIME type
    Image { data: Vec<u8>, mime_type: String },
}

impl RecipeInput {
    pub fn kind(&self) -> &'static str {
        match self {
            RecipeInput::Text(_) => "text",
            RecipeInput::Image { .. } => "image",
        }
    }
}

/// Unified trait for completion backends that turn unstructured input into a [`Draft`].
///
/// Implementations hold no per-request state and are shared across requests.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "openai")
    fn provider_name(&self) -> &str;

    /// Structure pasted recipe text.
    async fn format_from_text(&self, text: &str) -> Result<Draft, ExtractionError>;

    /// Structure a recipe photographed in `image`.
    async fn format_from_image(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> Result<Draft, ExtractionError>;

    async fn format(&self, input: &RecipeInput) -> Result<Draft, ExtractionError> {
        match input {
            RecipeInput::Text(text) => self.format_from_text(text).await,
            RecipeInput::Image { data, mime_type } => {
                self.format_from_image(data, mime_type).await
            }
        }
    }
}
