//! Capability traits at the edge of the gate: the judge that scores one
//! signal, the critic that reads a whole post, and the writer that drafts.
//!
//! Each is swappable; tests plug in deterministic doubles.

use async_trait::async_trait;
use leverage_core::{AnnotatedExample, Candidate, Critique, QualityReport};

use crate::error::{GenerateError, LlmError};

/// What a judge is being asked to measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeKind {
    /// Higher score = signal more strongly present.
    Signal,
    /// Higher score = cleaner; `1 - score` is the default penalty.
    AntiPattern,
}

impl JudgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::AntiPattern => "anti_pattern",
        }
    }
}

/// Everything one judge call needs.
#[derive(Debug, Clone, Copy)]
pub struct JudgeRequest<'a> {
    pub kind: JudgeKind,
    pub name: &'a str,
    pub rubric: &'a str,
    /// Examples that show the desired behaviour.
    pub positive: &'a [AnnotatedExample],
    /// Examples that show what to avoid.
    pub negative: &'a [AnnotatedExample],
    pub reference: &'a str,
    pub candidate: &'a str,
}

/// A judge's answer. `score` is expected in [0, 1]; callers check.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Judgment {
    pub score: f64,
    pub justification: String,
    pub evidence: Vec<String>,
    pub recommendations: Vec<String>,
    /// Explicit penalty for anti-patterns; `None` means `1 - score`.
    pub penalty: Option<f64>,
}

impl Judgment {
    pub fn new(score: f64, justification: impl Into<String>) -> Self {
        Self {
            score,
            justification: justification.into(),
            ..Default::default()
        }
    }
}

#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, request: &JudgeRequest<'_>) -> Result<Judgment, LlmError>;
}

/// Whole-post reader that answers "would a sharp reader feel smarter, and
/// would they share it?".
#[async_trait]
pub trait Critic: Send + Sync {
    async fn critique(&self, reference: &str, candidate: &str) -> Result<Critique, LlmError>;
}

/// Input to one drafting step.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub context: String,
    /// Draft being revised, if any.
    pub previous: Option<Candidate>,
    /// Report on `previous`.
    pub feedback: Option<QualityReport>,
}

impl GenerationRequest {
    pub fn initial(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            previous: None,
            feedback: None,
        }
    }

    pub fn revision(
        context: impl Into<String>,
        previous: Candidate,
        feedback: QualityReport,
    ) -> Self {
        Self {
            context: context.into(),
            previous: Some(previous),
            feedback: Some(feedback),
        }
    }

    pub fn is_revision(&self) -> bool {
        self.previous.is_some()
    }

    /// Wrap generated text as the next candidate in this lineage.
    pub fn candidate(&self, text: impl Into<String>) -> Candidate {
        match &self.previous {
            Some(prev) => prev.revise(text),
            None => Candidate::new(text),
        }
    }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Candidate, GenerateError>;

    /// A new starting context after `discarded` was judged unsalvageable.
    /// Generators without a topic source reuse the old context.
    async fn fresh_context(&self, discarded: &str) -> Result<String, GenerateError> {
        Ok(discarded.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_request_bumps_revision() {
        let first = Candidate::new("draft one");
        let req = GenerationRequest::revision("ctx", first, QualityReport::default());
        assert!(req.is_revision());
        let next = req.candidate("draft two");
        assert_eq!(next.revision(), 1);
        assert_eq!(next.text(), "draft two");
    }

    #[test]
    fn initial_request_starts_at_zero() {
        let req = GenerationRequest::initial("ctx");
        assert!(!req.is_revision());
        assert_eq!(req.candidate("hello").revision(), 0);
    }
}
