//! Measure the gate against human-labeled examples.
//!
//! Each example is run through the aggregator and its pass/fail decision is
//! compared with the quality label. Where a quality example carries
//! annotated signals the gate scores, the detected signals are compared with
//! them too. The summary
//! adds calibration figures for tuning the pass threshold.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use leverage_core::{
    AnnotatedExample, ConfigError, ConfusionMatrix, SignalComparison, ValidationConfig, Verdict,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregator::QualityAggregator;
use crate::error::ValidationError;

/// How hard an example should be to pass, by annotated signal count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Three or more signals.
    Easy,
    Medium,
    /// A single signal.
    Hard,
    /// No annotated signals.
    Extreme,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [Self::Easy, Self::Medium, Self::Hard, Self::Extreme];

    pub fn from_signal_count(count: usize) -> Self {
        match count {
            0 => Self::Extreme,
            1 => Self::Hard,
            2 => Self::Medium,
            _ => Self::Easy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Extreme => "extreme",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleResult {
    pub id: String,
    pub expected_quality: bool,
    pub is_passing: bool,
    pub final_score: f64,
    pub verdict: Verdict,
    pub difficulty: Difficulty,
    /// Present when the example has annotated signals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signals: Option<SignalComparison>,
    /// Anti-patterns detected on flop examples.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub anti_patterns_detected: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Misclassified {
    pub id: String,
    pub verdict: Verdict,
    pub final_score: f64,
    pub missing_signals: Vec<String>,
    pub extra_signals: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyStats {
    pub difficulty: Difficulty,
    pub total: usize,
    pub passed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Calibration {
    pub pass_threshold: f64,
    pub mean_quality_score: f64,
    pub mean_flop_score: f64,
    /// `mean_quality_score - mean_flop_score`.
    pub margin: f64,
    /// Observed score that, used as the pass threshold, maximizes accuracy.
    pub best_threshold: f64,
    pub best_threshold_accuracy: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    /// RFC 3339.
    pub generated_at: String,
    pub total: usize,
    pub matrix: ConfusionMatrix,
    pub accuracy: f64,
    pub quality_accuracy: f64,
    pub flop_accuracy: f64,
    /// Averaged over examples with annotated signals.
    pub signal_precision: f64,
    pub signal_recall: f64,
    pub signal_f1: f64,
    pub compared_examples: usize,
    pub difficulty: Vec<DifficultyStats>,
    pub misclassified: Vec<Misclassified>,
    pub calibration: Calibration,
    pub diagnosis: Vec<String>,
    pub examples: Vec<ExampleResult>,
}

impl ValidationSummary {
    /// Write as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<(), ValidationError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), "validation results written");
        Ok(())
    }
}

pub struct ValidationHarness {
    aggregator: Arc<QualityAggregator>,
    config: ValidationConfig,
}

impl ValidationHarness {
    pub fn new(
        aggregator: Arc<QualityAggregator>,
        config: ValidationConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { aggregator, config })
    }

    /// Evaluate every example in order, pausing `inter_request_delay_ms`
    /// between them.
    pub async fn validate(
        &self,
        examples: &[AnnotatedExample],
    ) -> Result<ValidationSummary, ValidationError> {
        if examples.is_empty() {
            return Err(ConfigError::EmptyCorpus.into());
        }
        let delay = Duration::from_millis(self.config.inter_request_delay_ms);

        let mut results = Vec::with_capacity(examples.len());
        for (i, example) in examples.iter().enumerate() {
            if i > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let result = self.check(example).await;
            info!(
                n = i + 1,
                of = examples.len(),
                id = %result.id,
                score = result.final_score,
                verdict = result.verdict.as_str(),
                "validated example"
            );
            results.push(result);
        }

        Ok(summarize(
            results,
            self.aggregator.config().pass_threshold,
        ))
    }

    async fn check(&self, example: &AnnotatedExample) -> ExampleResult {
        let report = self.aggregator.evaluate("", &example.text).await;
        let verdict = Verdict::classify(example.is_quality_label, report.is_passing);
        if !report.failures.is_empty() {
            warn!(id = %example.id, failures = ?report.failures, "scorers failed closed");
        }

        // Flops are annotated with anti-patterns and unscored names can never
        // be detected, so only configured signals on quality posts compare.
        let gate = self.aggregator.config();
        let annotated: Vec<String> = example
            .signal_names()
            .into_iter()
            .filter(|name| gate.signal(name).is_some())
            .collect();
        let signals = (example.is_quality_label && !annotated.is_empty()).then(|| {
            let detected = report.detected_signals(self.config.detection_threshold);
            SignalComparison::compute(&annotated, &detected)
        });
        let anti_patterns_detected = if example.is_quality_label {
            Vec::new()
        } else {
            report.detected_anti_patterns(self.config.anti_pattern_detection_threshold)
        };

        ExampleResult {
            id: example.id.clone(),
            expected_quality: example.is_quality_label,
            is_passing: report.is_passing,
            final_score: report.final_score,
            verdict,
            difficulty: Difficulty::from_signal_count(annotated.len()),
            signals,
            anti_patterns_detected,
            failures: report.failures,
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Build the summary from per-example results. Pure apart from the timestamp.
pub fn summarize(results: Vec<ExampleResult>, pass_threshold: f64) -> ValidationSummary {
    let mut matrix = ConfusionMatrix::default();
    for r in &results {
        matrix.record(r.verdict);
    }

    let compared: Vec<&SignalComparison> =
        results.iter().filter_map(|r| r.signals.as_ref()).collect();
    let signal_precision = mean(compared.iter().map(|c| c.precision));
    let signal_recall = mean(compared.iter().map(|c| c.recall));
    let signal_f1 = mean(compared.iter().map(|c| c.f1));

    let difficulty = Difficulty::ALL
        .iter()
        .map(|d| DifficultyStats {
            difficulty: *d,
            total: results.iter().filter(|r| r.difficulty == *d).count(),
            passed: results
                .iter()
                .filter(|r| r.difficulty == *d && r.is_passing)
                .count(),
        })
        .filter(|s| s.total > 0)
        .collect::<Vec<_>>();

    let misclassified = results
        .iter()
        .filter(|r| !r.verdict.is_correct())
        .map(|r| Misclassified {
            id: r.id.clone(),
            verdict: r.verdict,
            final_score: r.final_score,
            missing_signals: r.signals.as_ref().map(|s| s.missed.clone()).unwrap_or_default(),
            extra_signals: r
                .signals
                .as_ref()
                .map(|s| s.false_positives.clone())
                .unwrap_or_default(),
        })
        .collect();

    let calibration = calibrate(&results, pass_threshold);
    let diagnosis = diagnose(
        &matrix,
        &calibration,
        &difficulty,
        signal_recall,
        !compared.is_empty(),
    );

    ValidationSummary {
        generated_at: chrono::Utc::now().to_rfc3339(),
        total: results.len(),
        accuracy: matrix.accuracy(),
        quality_accuracy: matrix.quality_accuracy(),
        flop_accuracy: matrix.flop_accuracy(),
        matrix,
        signal_precision,
        signal_recall,
        signal_f1,
        compared_examples: compared.len(),
        difficulty,
        misclassified,
        calibration,
        diagnosis,
        examples: results,
    }
}

fn calibrate(results: &[ExampleResult], pass_threshold: f64) -> Calibration {
    let mean_quality_score = mean(
        results
            .iter()
            .filter(|r| r.expected_quality)
            .map(|r| r.final_score),
    );
    let mean_flop_score = mean(
        results
            .iter()
            .filter(|r| !r.expected_quality)
            .map(|r| r.final_score),
    );

    let accuracy_at = |t: f64| {
        let correct = results
            .iter()
            .filter(|r| (r.final_score >= t) == r.expected_quality)
            .count();
        if results.is_empty() {
            0.0
        } else {
            correct as f64 / results.len() as f64
        }
    };

    // Ties go to the candidate closest to the configured threshold.
    let mut best_threshold = pass_threshold;
    let mut best_accuracy = accuracy_at(pass_threshold);
    for t in results.iter().map(|r| r.final_score) {
        let acc = accuracy_at(t);
        let closer = (t - pass_threshold).abs() < (best_threshold - pass_threshold).abs();
        if acc > best_accuracy || (acc == best_accuracy && closer) {
            best_threshold = t;
            best_accuracy = acc;
        }
    }

    Calibration {
        pass_threshold,
        mean_quality_score,
        mean_flop_score,
        margin: mean_quality_score - mean_flop_score,
        best_threshold,
        best_threshold_accuracy: best_accuracy,
    }
}

fn diagnose(
    matrix: &ConfusionMatrix,
    calibration: &Calibration,
    difficulty: &[DifficultyStats],
    signal_recall: f64,
    compared: bool,
) -> Vec<String> {
    let mut hints = Vec::new();
    let predicted_pass = matrix.true_positives + matrix.false_positives;
    if predicted_pass > 0 && matrix.precision() < 0.7 {
        hints.push(format!(
            "Low precision ({:.0}%): flops are passing. Raise the pass threshold or strengthen anti-pattern penalties.",
            matrix.precision() * 100.0
        ));
    }
    if matrix.true_positives + matrix.false_negatives > 0 && matrix.recall() < 0.7 {
        hints.push(format!(
            "Low recall ({:.0}%): quality examples are failing. Lower the pass threshold or revisit signal weights.",
            matrix.recall() * 100.0
        ));
    }
    if matrix.false_positives > matrix.true_positives {
        hints.push("More flops pass than quality examples: the gate rewards the wrong things.".into());
    }
    if let Some(hard) = difficulty.iter().find(|d| d.difficulty == Difficulty::Hard)
        && hard.total > 0
        && (hard.passed as f64) < hard.total as f64 * 0.5
    {
        hints.push(format!(
            "Single-signal examples mostly fail ({}/{} pass): one strong signal cannot reach the threshold with current weights.",
            hard.passed, hard.total
        ));
    }
    if calibration.margin < 0.1 {
        hints.push(format!(
            "Quality and flop scores barely separate (margin {:.2}).",
            calibration.margin
        ));
    }
    if (calibration.best_threshold - calibration.pass_threshold).abs() > 1e-9
        && calibration.best_threshold_accuracy > 0.0
    {
        hints.push(format!(
            "A pass threshold of {:.2} would reach {:.0}% accuracy.",
            calibration.best_threshold,
            calibration.best_threshold_accuracy * 100.0
        ));
    }
    if compared && signal_recall < 0.5 {
        hints.push(format!(
            "Signal detection misses most annotated signals (recall {:.0}%). Check rubrics and exemplars.",
            signal_recall * 100.0
        ));
    }
    hints
}
