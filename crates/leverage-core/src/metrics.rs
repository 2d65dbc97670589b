//! Detection metrics for comparing the gate against human labels.

use serde::{Deserialize, Serialize};

/// Annotated vs detected signals for one example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalComparison {
    pub annotated: Vec<String>,
    pub detected: Vec<String>,
    /// Annotated and detected.
    pub correctly_detected: Vec<String>,
    /// Annotated but not detected.
    pub missed: Vec<String>,
    /// Detected but not annotated.
    pub false_positives: Vec<String>,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl SignalComparison {
    /// Compare two signal sets. Precision is 0 when nothing was detected;
    /// recall is 0 when nothing was annotated.
    pub fn compute(annotated: &[String], detected: &[String]) -> Self {
        let correctly_detected: Vec<String> = annotated
            .iter()
            .filter(|s| detected.contains(s))
            .cloned()
            .collect();
        let missed: Vec<String> = annotated
            .iter()
            .filter(|s| !detected.contains(s))
            .cloned()
            .collect();
        let false_positives: Vec<String> = detected
            .iter()
            .filter(|s| !annotated.contains(s))
            .cloned()
            .collect();

        let hits = correctly_detected.len() as f64;
        let precision = if detected.is_empty() {
            0.0
        } else {
            hits / detected.len() as f64
        };
        let recall = if annotated.is_empty() {
            0.0
        } else {
            hits / annotated.len() as f64
        };

        Self {
            annotated: annotated.to_vec(),
            detected: detected.to_vec(),
            correctly_detected,
            missed,
            false_positives,
            precision,
            recall,
            f1: f1(precision, recall),
        }
    }
}

/// Harmonic mean of precision and recall; 0 when both are 0.
pub fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

/// How a pass/fail prediction relates to the ground-truth quality label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Quality example that passed.
    TruePositive,
    /// Flop that passed.
    FalsePositive,
    /// Flop that failed.
    TrueNegative,
    /// Quality example that failed.
    FalseNegative,
}

impl Verdict {
    pub fn classify(expected_quality: bool, predicted_passing: bool) -> Self {
        match (expected_quality, predicted_passing) {
            (true, true) => Self::TruePositive,
            (false, true) => Self::FalsePositive,
            (false, false) => Self::TrueNegative,
            (true, false) => Self::FalseNegative,
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, Self::TruePositive | Self::TrueNegative)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TruePositive => "true_positive",
            Self::FalsePositive => "false_positive",
            Self::TrueNegative => "true_negative",
            Self::FalseNegative => "false_negative",
        }
    }
}

/// Pass/fail confusion matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn record(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::TruePositive => self.true_positives += 1,
            Verdict::FalsePositive => self.false_positives += 1,
            Verdict::TrueNegative => self.true_negatives += 1,
            Verdict::FalseNegative => self.false_negatives += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// Share of quality examples that passed.
    pub fn quality_accuracy(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_negatives,
        )
    }

    /// Share of flops that failed.
    pub fn flop_accuracy(&self) -> f64 {
        ratio(
            self.true_negatives,
            self.true_negatives + self.false_positives,
        )
    }

    pub fn precision(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_positives,
        )
    }

    pub fn recall(&self) -> f64 {
        self.quality_accuracy()
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn perfect_detection() {
        let c = SignalComparison::compute(&names(&["a", "b"]), &names(&["b", "a"]));
        assert_eq!(c.precision, 1.0);
        assert_eq!(c.recall, 1.0);
        assert_eq!(c.f1, 1.0);
        assert!(c.missed.is_empty());
        assert!(c.false_positives.is_empty());
    }

    #[test]
    fn partial_detection() {
        // 1 hit, 1 miss, 1 false positive: P = 1/2, R = 1/2.
        let c = SignalComparison::compute(&names(&["a", "b"]), &names(&["a", "c"]));
        assert_eq!(c.correctly_detected, names(&["a"]));
        assert_eq!(c.missed, names(&["b"]));
        assert_eq!(c.false_positives, names(&["c"]));
        assert!((c.precision - 0.5).abs() < 1e-12);
        assert!((c.recall - 0.5).abs() < 1e-12);
        assert!((c.f1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn nothing_detected_is_zero() {
        let c = SignalComparison::compute(&names(&["a"]), &[]);
        assert_eq!(c.precision, 0.0);
        assert_eq!(c.recall, 0.0);
        assert_eq!(c.f1, 0.0);
    }

    #[test]
    fn f1_harmonic_mean() {
        assert!((f1(1.0, 0.5) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(f1(0.0, 0.0), 0.0);
    }

    #[test]
    fn verdict_classification() {
        assert_eq!(Verdict::classify(true, true), Verdict::TruePositive);
        assert_eq!(Verdict::classify(false, true), Verdict::FalsePositive);
        assert_eq!(Verdict::classify(false, false), Verdict::TrueNegative);
        assert_eq!(Verdict::classify(true, false), Verdict::FalseNegative);
        assert!(Verdict::TrueNegative.is_correct());
        assert!(!Verdict::FalseNegative.is_correct());
    }

    #[test]
    fn confusion_matrix_rates() {
        let mut m = ConfusionMatrix::default();
        for v in [
            Verdict::TruePositive,
            Verdict::TruePositive,
            Verdict::FalseNegative,
            Verdict::TrueNegative,
            Verdict::FalsePositive,
        ] {
            m.record(v);
        }
        assert_eq!(m.total(), 5);
        assert!((m.accuracy() - 0.6).abs() < 1e-12);
        assert!((m.quality_accuracy() - 2.0 / 3.0).abs() < 1e-12);
        assert!((m.flop_accuracy() - 0.5).abs() < 1e-12);
        assert!((m.precision() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_matrix_is_zero_not_nan() {
        let m = ConfusionMatrix::default();
        assert_eq!(m.accuracy(), 0.0);
        assert_eq!(m.flop_accuracy(), 0.0);
    }
}
