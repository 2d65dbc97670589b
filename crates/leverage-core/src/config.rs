//! Tunable constants for the quality gate, the revision loop and the
//! validation harness.
//!
//! Defaults carry the values the gate was first calibrated with. They are
//! starting points: recalibrate with `leverage validate` rather than editing
//! logic.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

/// Weight and "good" threshold for one leverage signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalWeight {
    pub name: String,
    pub weight: f64,
    /// Below this score the scorer's recommendations are surfaced.
    #[serde(default = "default_signal_good")]
    pub good_threshold: f64,
}

/// "Good" threshold for one anti-pattern (score polarity: 1.0 = absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntiPatternWeight {
    pub name: String,
    #[serde(default = "default_anti_pattern_good")]
    pub good_threshold: f64,
}

fn default_signal_good() -> f64 {
    0.5
}

fn default_anti_pattern_good() -> f64 {
    0.9
}

/// Score composition and reporting constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub base_score: f64,
    pub pass_threshold: f64,
    /// Signal score at or above which it is reported as a strength.
    pub strength_threshold: f64,
    /// Signal score below which it is reported as a weakness.
    pub weakness_threshold: f64,
    /// Anti-pattern penalty above which it is reported as a weakness.
    pub penalty_floor: f64,
    pub max_recommendations: usize,
    pub signals: Vec<SignalWeight>,
    pub anti_patterns: Vec<AntiPatternWeight>,
}

impl Default for GateConfig {
    fn default() -> Self {
        let signal = |name: &str, weight: f64| SignalWeight {
            name: name.to_string(),
            weight,
            good_threshold: default_signal_good(),
        };
        let anti = |name: &str| AntiPatternWeight {
            name: name.to_string(),
            good_threshold: default_anti_pattern_good(),
        };
        Self {
            base_score: 0.20,
            pass_threshold: 0.85,
            strength_threshold: 0.80,
            weakness_threshold: 0.50,
            penalty_floor: 0.10,
            max_recommendations: 5,
            signals: vec![
                signal("shocking_number_contrast", 0.15),
                signal("side_by_side_comparison", 0.12),
                signal("contrarian_with_proof", 0.12),
                signal("detailed_breakdown", 0.15),
                signal("reveals_hidden_mechanism", 0.10),
                signal("comeback_story", 0.08),
                signal("david_vs_goliath", 0.08),
            ],
            anti_patterns: vec![anti("cringy_hook"), anti("broad_appeal"), anti("forensic_detail")],
        }
    }
}

impl GateConfig {
    /// A config with no scorers, for assembling custom gates.
    pub fn empty(base_score: f64, pass_threshold: f64) -> Self {
        Self {
            base_score,
            pass_threshold,
            signals: Vec::new(),
            anti_patterns: Vec::new(),
            ..Self::default()
        }
    }

    pub fn with_signal(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.signals.push(SignalWeight {
            name: name.into(),
            weight,
            good_threshold: default_signal_good(),
        });
        self
    }

    pub fn with_anti_pattern(mut self, name: impl Into<String>) -> Self {
        self.anti_patterns.push(AntiPatternWeight {
            name: name.into(),
            good_threshold: default_anti_pattern_good(),
        });
        self
    }

    /// Sum of all signal weights.
    pub fn total_weight(&self) -> f64 {
        self.signals.iter().map(|s| s.weight).sum()
    }

    pub fn signal(&self, name: &str) -> Option<&SignalWeight> {
        self.signals.iter().find(|s| s.name == name)
    }

    pub fn anti_pattern(&self, name: &str) -> Option<&AntiPatternWeight> {
        self.anti_patterns.iter().find(|a| a.name == name)
    }

    /// Check the weight invariant and that every constant is a probability.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("base_score", self.base_score)?;
        check_unit("pass_threshold", self.pass_threshold)?;
        check_unit("strength_threshold", self.strength_threshold)?;
        check_unit("weakness_threshold", self.weakness_threshold)?;
        check_unit("penalty_floor", self.penalty_floor)?;
        if self.max_recommendations == 0 {
            return Err(ConfigError::ZeroLimit("max_recommendations"));
        }

        let mut seen = HashSet::new();
        for s in &self.signals {
            check_unit(&format!("weight of {}", s.name), s.weight)?;
            check_unit(&format!("good_threshold of {}", s.name), s.good_threshold)?;
            if !seen.insert(s.name.as_str()) {
                return Err(ConfigError::DuplicateScorer(s.name.clone()));
            }
        }
        for a in &self.anti_patterns {
            check_unit(&format!("good_threshold of {}", a.name), a.good_threshold)?;
            if !seen.insert(a.name.as_str()) {
                return Err(ConfigError::DuplicateScorer(a.name.clone()));
            }
        }

        let weights = self.total_weight();
        // Tolerate float noise from summing decimal weights.
        if self.base_score + weights > 1.0 + 1e-9 {
            return Err(ConfigError::WeightBudgetExceeded {
                base: self.base_score,
                weights,
            });
        }
        Ok(())
    }
}

/// Revision loop limits and restart detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevisionConfig {
    /// Drafts evaluated per cycle, the first draft included.
    pub max_attempts: u32,
    /// Fresh-topic restarts allowed before "unsalvageable" feedback is
    /// treated as an ordinary revision request.
    pub max_restarts: u32,
    /// Case-insensitive phrases in the critic's verdict that trigger a
    /// restart.
    pub restart_markers: Vec<String>,
}

impl Default for RevisionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            max_restarts: 2,
            restart_markers: vec![
                "fundamentally weak".to_string(),
                "boring insight".to_string(),
                "surface-level".to_string(),
            ],
        }
    }
}

impl RevisionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroLimit("max_attempts"));
        }
        Ok(())
    }
}

/// Validation harness thresholds and pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Signal breakdown score at or above which a signal counts as detected.
    pub detection_threshold: f64,
    /// Anti-pattern breakdown score below which it counts as detected.
    pub anti_pattern_detection_threshold: f64,
    /// Pause between examples to stay under judge rate limits.
    pub inter_request_delay_ms: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            detection_threshold: 0.70,
            anti_pattern_detection_threshold: 0.90,
            inter_request_delay_ms: 1000,
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("detection_threshold", self.detection_threshold)?;
        check_unit(
            "anti_pattern_detection_threshold",
            self.anti_pattern_detection_threshold,
        )
    }
}

/// Everything tunable, as stored in a settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub gate: GateConfig,
    pub revision: RevisionConfig,
    pub validation: ValidationConfig,
}

impl Settings {
    /// Load settings from a JSON file. Missing sections take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let settings = Self::from_json(&raw)?;
        info!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gate.validate()?;
        self.revision.validate()?;
        self.validation.validate()
    }
}

fn check_unit(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            name: name.to_string(),
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gate_is_valid_and_budgeted() {
        let cfg = GateConfig::default();
        cfg.validate().unwrap();
        assert!((cfg.total_weight() - 0.80).abs() < 1e-9);
        assert!(cfg.base_score + cfg.total_weight() <= 1.0 + 1e-9);
        assert_eq!(cfg.pass_threshold, 0.85);
        assert_eq!(cfg.signals.len(), 7);
        assert_eq!(cfg.anti_patterns.len(), 3);
    }

    #[test]
    fn weight_budget_overflow_rejected() {
        let cfg = GateConfig::empty(0.5, 0.85)
            .with_signal("a", 0.3)
            .with_signal("b", 0.3);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::WeightBudgetExceeded { .. })
        ));
    }

    #[test]
    fn negative_weight_rejected() {
        let cfg = GateConfig::empty(0.2, 0.85).with_signal("a", -0.1);
        assert!(matches!(cfg.validate(), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn nan_threshold_rejected() {
        let cfg = GateConfig::empty(0.2, f64::NAN);
        assert!(matches!(cfg.validate(), Err(ConfigError::OutOfRange { .. })));
    }

    #[test]
    fn duplicate_names_rejected_across_kinds() {
        let cfg = GateConfig::empty(0.2, 0.85)
            .with_signal("hook", 0.1)
            .with_anti_pattern("hook");
        assert!(matches!(cfg.validate(), Err(ConfigError::DuplicateScorer(n)) if n == "hook"));
    }

    #[test]
    fn zero_attempts_rejected() {
        let cfg = RevisionConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroLimit(_))));
    }

    #[test]
    fn settings_partial_json_fills_defaults() {
        let settings = Settings::from_json(
            r#"{ "gate": { "pass_threshold": 0.8 }, "validation": { "inter_request_delay_ms": 0 } }"#,
        )
        .unwrap();
        assert_eq!(settings.gate.pass_threshold, 0.8);
        assert_eq!(settings.gate.base_score, 0.20);
        assert_eq!(settings.gate.signals.len(), 7);
        assert_eq!(settings.revision.max_attempts, 5);
        assert_eq!(settings.validation.inter_request_delay_ms, 0);
        assert_eq!(settings.validation.detection_threshold, 0.70);
    }

    #[test]
    fn settings_reject_invalid_file() {
        let err = Settings::from_json(r#"{ "gate": { "base_score": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { .. }));
    }

    #[test]
    fn settings_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leverage.json");
        std::fs::write(&path, r#"{ "revision": { "max_attempts": 3 } }"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.revision.max_attempts, 3);
        assert_eq!(settings.revision.restart_markers.len(), 3);
    }
}
