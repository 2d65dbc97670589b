//! The Leverage quality gate: weighted aggregation of signal and
//! anti-pattern scorers, a bounded generate → evaluate → revise loop, and a
//! harness that measures the gate against human labels.

pub mod aggregator;
pub mod error;
pub mod revision;
pub mod validation;

pub use aggregator::{QualityAggregator, compose};
pub use error::{RevisionError, ValidationError};
pub use revision::{Attempt, Phase, RevisionLoop, RevisionOutcome, RevisionStatus};
pub use validation::{
    Calibration, Difficulty, DifficultyStats, ExampleResult, Misclassified, ValidationHarness,
    ValidationSummary,
};
