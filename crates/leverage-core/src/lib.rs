//! Core types for the Leverage quality gate: candidates, scorer results,
//! quality reports, tunable configuration, the labeled corpus, and detection
//! metrics.

pub mod candidate;
pub mod config;
pub mod corpus;
pub mod error;
pub mod metrics;
pub mod report;
pub mod result;

pub use candidate::Candidate;
pub use config::{
    AntiPatternWeight, GateConfig, RevisionConfig, Settings, SignalWeight, ValidationConfig,
};
pub use corpus::{
    AnnotatedExample, AnnotatedSignal, Corpus, CorpusLoader, CorpusSummary, EngagementMetrics,
    ExampleAnalysis, ExampleTier, JsonFileLoader,
};
pub use error::{ConfigError, CorpusError};
pub use metrics::{ConfusionMatrix, SignalComparison, Verdict};
pub use report::{Critique, QualityReport};
pub use result::{AntiPatternResult, SignalResult, is_unit_interval};
