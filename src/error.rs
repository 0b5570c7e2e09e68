use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while asking the completion API to structure a recipe
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// The response schema could not be built or drifted from the draft shape
    #[error("Failed to generate response schema: {0}")]
    Schema(String),

    /// The provider is missing required configuration
    #[error("Provider configuration error: {0}")]
    Config(String),

    /// Transport failure talking to the completion API
    #[error("Request to completion API failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The completion API answered with a non-success status
    #[error("Completion API error ({status}): {body}")]
    Api { status: StatusCode, body: String },

    /// The response carried no choice or no textual content
    #[error("Completion API returned no content")]
    MissingContent,

    /// The model declined to produce the structured output
    #[error("Model refused to extract the recipe: {0}")]
    Refused(String),

    /// The content did not decode into a recipe draft
    #[error("Failed to decode recipe draft: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors raised by the recipe and user repositories
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to prepare database location: {0}")]
    Io(#[from] std::io::Error),
}

/// Caller-visible outcome of a pipeline operation
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No identity, or one that does not resolve to a known user
    #[error("Unauthorized")]
    Unauthorized,

    /// No recipe with the given id
    #[error("Recipe {0} not found")]
    NotFound(i64),

    /// Authenticated, but not the owner of the recipe
    #[error("Forbidden")]
    Forbidden,

    /// Missing or unparseable input
    #[error("Bad input: {0}")]
    BadInput(String),

    #[error("Recipe extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl ServiceError {
    /// HTTP status the request boundary should answer with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::BadInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Extraction(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
