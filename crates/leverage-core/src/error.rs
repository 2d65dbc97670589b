use thiserror::Error;

/// Setup problems the operator must fix. Raised at construction or
/// validation time, never per evaluation call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfRange { name: String, value: f64 },

    #[error("base score {base} plus signal weights {weights} exceeds 1.0")]
    WeightBudgetExceeded { base: f64, weights: f64 },

    #[error("duplicate scorer name: {0}")]
    DuplicateScorer(String),

    #[error("signal '{0}' is configured but no scorer is registered for it")]
    MissingScorer(String),

    #[error("scorer '{0}' is registered but has no configuration entry")]
    UnconfiguredScorer(String),

    #[error("no exemplars available for '{0}'")]
    MissingExemplars(String),

    #[error("labeled corpus is empty")]
    EmptyCorpus,

    #[error("{0} must be at least 1")]
    ZeroLimit(&'static str),

    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("corpus file not found: {0}")]
    NotFound(std::path::PathBuf),

    #[error("corpus read error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corpus JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate example id: {0}")]
    DuplicateId(String),

    #[error("example {0} has empty text")]
    EmptyText(String),
}
