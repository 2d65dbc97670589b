//! LLM-facing half of the Leverage quality gate.
//!
//! Defines the capability traits the gate depends on ([`Judge`], [`Critic`],
//! [`ContentGenerator`]), a Claude-backed implementation of each, retry and
//! timeout handling, few-shot exemplar selection from the labeled corpus,
//! and the signal and anti-pattern scorers built on top.

pub mod claude;
pub mod error;
pub mod exemplar;
pub mod heuristic;
pub mod prompt;
pub mod retry;
pub mod rubric;
pub mod scorer;
pub mod traits;

pub use claude::{Claude, ClaudeWriter, DEFAULT_MODEL};
pub use error::{GenerateError, LlmError, ScoreError};
pub use exemplar::{ExemplarPolicy, Exemplars};
pub use heuristic::{NumberContrastHeuristic, StructureHeuristic, WALL_OF_TEXT};
pub use retry::RetryPolicy;
pub use scorer::{
    AntiPatternScorer, JudgedAntiPattern, JudgedSignal, ScorerSet, SignalScorer, judged_scorers,
};
pub use traits::{
    ContentGenerator, Critic, GenerationRequest, Judge, JudgeKind, JudgeRequest, Judgment,
};
