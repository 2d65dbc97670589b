use leverage_ai::GenerateError;
use leverage_core::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RevisionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Every drafting attempt failed; there is nothing to return.
    #[error("no candidate produced after {attempts} attempts: {source}")]
    NoCandidate {
        attempts: u32,
        #[source]
        source: GenerateError,
    },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write results: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize results: {0}")]
    Json(#[from] serde_json::Error),
}
