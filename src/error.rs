use thiserror::Error;

/// Failures of the two-step generation call.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("prompt must not be empty")]
    EmptyPrompt,

    #[error("network error: {0}")]
    Network(String),

    #[error("generation api returned status {0}")]
    HttpStatus(u16),

    #[error("malformed json: {0}")]
    MalformedJson(String),

    #[error("invalid response shape: {0}")]
    InvalidResponseShape(String),
}

#[derive(Debug, Error)]
pub enum ImageStoreError {
    #[error("network error: {0}")]
    Network(String),

    #[error("image host returned status {0}")]
    HttpStatus(u16),

    #[error("failed to write image {filename}: {source}")]
    Write {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("image not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read meals: {0}")]
    Read(#[source] sqlx::Error),

    #[error("failed to write meal: {0}")]
    Write(#[source] sqlx::Error),

    #[error("meal not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("invalid meal: {0}")]
    InvalidMeal(&'static str),
}

/// Anything that can abort an orchestration flow in `meals::services`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Image(#[from] ImageStoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
