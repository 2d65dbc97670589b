//! Per-scorer outputs consumed by the aggregator.

use serde::{Deserialize, Serialize};

/// Outcome of one leverage-signal scorer against one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalResult {
    pub signal_name: String,
    /// 0.0 = signal absent, 1.0 = textbook example of the signal.
    pub score: f64,
    /// Matched excerpts, judge justification, or failure notes.
    pub evidence: Vec<String>,
    pub recommendations: Vec<String>,
}

impl SignalResult {
    pub fn new(signal_name: impl Into<String>, score: f64) -> Self {
        Self {
            signal_name: signal_name.into(),
            score,
            evidence: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    /// Fail-closed result: the signal is treated as absent and the reason is
    /// kept in `evidence` so reports can surface it.
    pub fn failed(signal_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            evidence: vec![format!("{FAILURE_PREFIX}{reason}")],
            ..Self::new(signal_name, 0.0)
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendations.push(recommendation.into());
        self
    }

    /// True when this result was produced by a fail-closed path.
    pub fn is_failure(&self) -> bool {
        self.evidence.iter().any(|e| e.starts_with(FAILURE_PREFIX))
    }
}

/// Outcome of one anti-pattern scorer against one candidate.
///
/// `score` follows the same polarity as signals: 1.0 means the defect is
/// absent, 0.0 means it is severe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AntiPatternResult {
    pub pattern_name: String,
    pub score: f64,
    /// Explicit penalty reported by the scorer. When absent the penalty is
    /// `1 - score`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub penalty: Option<f64>,
    #[serde(default)]
    pub evidence: Vec<String>,
    pub recommendations: Vec<String>,
}

impl AntiPatternResult {
    pub fn new(pattern_name: impl Into<String>, score: f64) -> Self {
        Self {
            pattern_name: pattern_name.into(),
            score,
            penalty: None,
            evidence: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    /// Fail-closed result for a judge failure: no penalty is applied, the
    /// reason is kept in `evidence`.
    pub fn failed(pattern_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            evidence: vec![format!("{FAILURE_PREFIX}{reason}")],
            ..Self::new(pattern_name, 1.0)
        }
    }

    /// Worst case: defect treated as fully present.
    pub fn worst_case(pattern_name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            penalty: Some(1.0),
            evidence: vec![format!("{FAILURE_PREFIX}{reason}")],
            ..Self::new(pattern_name, 0.0)
        }
    }

    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.penalty = Some(penalty);
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendations.push(recommendation.into());
        self
    }

    /// Amount subtracted from the final score.
    pub fn penalty(&self) -> f64 {
        self.penalty.unwrap_or(1.0 - self.score)
    }

    pub fn is_failure(&self) -> bool {
        self.evidence.iter().any(|e| e.starts_with(FAILURE_PREFIX))
    }
}

/// Marker prepended to evidence entries written by fail-closed paths.
pub const FAILURE_PREFIX: &str = "scorer failure: ";

/// True when `value` is a finite number inside `[0, 1]`.
pub fn is_unit_interval(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}
