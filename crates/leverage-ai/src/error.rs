use std::time::Duration;

use thiserror::Error;

/// Failure talking to, or understanding, an LLM.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("malformed response ({reason}); raw: {raw}")]
    Malformed { reason: String, raw: String },

    #[error("score {value} outside [0, 1]; raw: {raw}")]
    OutOfRange { value: f64, raw: String },

    #[error("{0} environment variable not set")]
    MissingApiKey(&'static str),
}

impl LlmError {
    /// Worth retrying: network trouble, timeouts, rate limits, server errors.
    /// Malformed or out-of-range answers are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) | Self::Transient(_) => true,
            Self::Server { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed { .. } | Self::OutOfRange { .. } | Self::MissingApiKey(_) => false,
        }
    }
}

/// Failure of a scorer that could not fail closed.
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("candidate text is empty")]
    EmptyCandidate,

    #[error("scorer '{name}' failed: {reason}")]
    Failed { name: String, reason: String },
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("generator returned empty text")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(LlmError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(LlmError::Transient("reset".into()).is_transient());
        assert!(
            LlmError::Server {
                status: 429,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            LlmError::Server {
                status: 529,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !LlmError::Server {
                status: 400,
                body: String::new()
            }
            .is_transient()
        );
        assert!(
            !LlmError::Malformed {
                reason: "eof".into(),
                raw: String::new()
            }
            .is_transient()
        );
        assert!(!LlmError::OutOfRange { value: 7.0, raw: "7".into() }.is_transient());
    }
}
