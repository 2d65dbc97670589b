//! Weighted aggregation of independent scorers into one pass/fail report.
//!
//! `final = clamp(base + Σ weight·signal − Σ penalty, 0, 1)` and the report
//! passes when `final >= pass_threshold`. Every scorer runs on its own task;
//! a scorer that errors, panics, or returns an out-of-range score is
//! replaced by its worst case so a report is always produced.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use leverage_ai::{AntiPatternScorer, Critic, ScoreError, ScorerSet, SignalScorer};
use leverage_core::{
    AntiPatternResult, Candidate, ConfigError, Critique, GateConfig, QualityReport, SignalResult,
    is_unit_interval,
};
use tokio::task::JoinError;
use tracing::{debug, info, warn};

pub struct QualityAggregator {
    config: GateConfig,
    scorers: ScorerSet,
    critic: Option<Arc<dyn Critic>>,
}

impl QualityAggregator {
    /// Validate `config` and check that it and `scorers` name the same
    /// signals and anti-patterns.
    pub fn new(config: GateConfig, scorers: ScorerSet) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut seen = HashSet::new();
        for name in scorers.names() {
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateScorer(name.to_string()));
            }
        }
        for s in &scorers.signals {
            if config.signal(s.name()).is_none() {
                return Err(ConfigError::UnconfiguredScorer(s.name().to_string()));
            }
        }
        for a in &scorers.anti_patterns {
            if config.anti_pattern(a.name()).is_none() {
                return Err(ConfigError::UnconfiguredScorer(a.name().to_string()));
            }
        }
        for name in config
            .signals
            .iter()
            .map(|s| &s.name)
            .chain(config.anti_patterns.iter().map(|a| &a.name))
        {
            if !seen.contains(name.as_str()) {
                return Err(ConfigError::MissingScorer(name.clone()));
            }
        }

        Ok(Self {
            config,
            scorers,
            critic: None,
        })
    }

    pub fn with_critic(mut self, critic: Arc<dyn Critic>) -> Self {
        self.critic = Some(critic);
        self
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn scorers(&self) -> &ScorerSet {
        &self.scorers
    }

    pub async fn evaluate(&self, reference: &str, candidate: &str) -> QualityReport {
        self.evaluate_shared(Arc::from(reference), Arc::from(candidate))
            .await
    }

    pub async fn evaluate_candidate(
        &self,
        reference: &str,
        candidate: &Candidate,
    ) -> QualityReport {
        self.evaluate_shared(Arc::from(reference), candidate.shared_text())
            .await
    }

    async fn evaluate_shared(&self, reference: Arc<str>, candidate: Arc<str>) -> QualityReport {
        let signal_tasks = self.scorers.signals.iter().map(|scorer| {
            let scorer: Arc<dyn SignalScorer> = Arc::clone(scorer);
            let (reference, candidate) = (Arc::clone(&reference), Arc::clone(&candidate));
            tokio::spawn(async move { scorer.measure(&reference, &candidate).await })
        });
        let anti_tasks = self.scorers.anti_patterns.iter().map(|scorer| {
            let scorer: Arc<dyn AntiPatternScorer> = Arc::clone(scorer);
            let (reference, candidate) = (Arc::clone(&reference), Arc::clone(&candidate));
            tokio::spawn(async move { scorer.measure(&reference, &candidate).await })
        });
        let critic_task = self.critic.as_ref().map(|critic| {
            let critic = Arc::clone(critic);
            let (reference, candidate) = (Arc::clone(&reference), Arc::clone(&candidate));
            tokio::spawn(async move { critic.critique(&reference, &candidate).await })
        });

        let (signal_outcomes, anti_outcomes) =
            futures::join!(join_all(signal_tasks), join_all(anti_tasks));

        let mut failures = Vec::new();
        let signals: Vec<SignalResult> = self
            .scorers
            .signals
            .iter()
            .zip(signal_outcomes)
            .map(|(scorer, outcome)| sanitize_signal(scorer.name(), outcome, &mut failures))
            .collect();
        let anti_patterns: Vec<AntiPatternResult> = self
            .scorers
            .anti_patterns
            .iter()
            .zip(anti_outcomes)
            .map(|(scorer, outcome)| sanitize_anti_pattern(scorer.name(), outcome, &mut failures))
            .collect();

        let critique = match critic_task {
            Some(task) => match task.await {
                Ok(Ok(c)) => Some(c),
                Ok(Err(e)) => {
                    warn!(error = %e, "critic failed, report has no critique");
                    None
                }
                Err(e) => {
                    warn!(error = %e, "critic task panicked, report has no critique");
                    None
                }
            },
            None => None,
        };

        let mut report = compose(&self.config, &signals, &anti_patterns, critique);
        report.failures = failures;
        info!(
            final_score = report.final_score,
            passing = report.is_passing,
            signal_score = report.signal_score,
            penalty = report.anti_pattern_penalty,
            failures = report.failures.len(),
            "candidate evaluated"
        );
        report
    }
}

fn sanitize_signal(
    name: &str,
    outcome: Result<Result<SignalResult, ScoreError>, JoinError>,
    failures: &mut Vec<String>,
) -> SignalResult {
    let reason = match outcome {
        Ok(Ok(result)) if is_unit_interval(result.score) => {
            if result.is_failure() {
                failures.push(format!("{name}: judge failure"));
            }
            return SignalResult {
                signal_name: name.to_string(),
                ..result
            };
        }
        Ok(Ok(result)) => format!("score {} outside [0, 1]", result.score),
        Ok(Err(e)) => e.to_string(),
        Err(e) => format!("scorer task failed: {e}"),
    };
    warn!(scorer = name, reason = %reason, "signal replaced by worst case");
    failures.push(format!("{name}: {reason}"));
    SignalResult::failed(name, reason)
}

fn sanitize_anti_pattern(
    name: &str,
    outcome: Result<Result<AntiPatternResult, ScoreError>, JoinError>,
    failures: &mut Vec<String>,
) -> AntiPatternResult {
    let reason = match outcome {
        Ok(Ok(result))
            if is_unit_interval(result.score) && result.penalty.is_none_or(is_unit_interval) =>
        {
            if result.is_failure() {
                failures.push(format!("{name}: judge failure"));
            }
            return AntiPatternResult {
                pattern_name: name.to_string(),
                ..result
            };
        }
        Ok(Ok(result)) => format!(
            "score {} / penalty {:?} outside [0, 1]",
            result.score, result.penalty
        ),
        Ok(Err(e)) => e.to_string(),
        Err(e) => format!("scorer task failed: {e}"),
    };
    warn!(scorer = name, reason = %reason, "anti-pattern replaced by worst case");
    failures.push(format!("{name}: {reason}"));
    AntiPatternResult::worst_case(name, reason)
}

fn label(name: &str) -> String {
    name.replace('_', " ")
}

/// Combine sanitized scorer outputs into a report. Pure.
pub fn compose(
    config: &GateConfig,
    signals: &[SignalResult],
    anti_patterns: &[AntiPatternResult],
    critique: Option<Critique>,
) -> QualityReport {
    let mut signal_breakdown = BTreeMap::new();
    let mut anti_pattern_breakdown = BTreeMap::new();
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut ranked: Vec<(f64, &str)> = Vec::new();

    let mut signal_score = 0.0;
    for s in signals {
        let Some(cfg) = config.signal(&s.signal_name) else {
            debug!(scorer = %s.signal_name, "unconfigured signal ignored");
            continue;
        };
        signal_score += cfg.weight * s.score;
        signal_breakdown.insert(s.signal_name.clone(), s.score);

        if s.score >= config.strength_threshold {
            strengths.push(format!("{} ({:.2})", label(&s.signal_name), s.score));
        } else if s.score < config.weakness_threshold {
            weaknesses.push(format!("missing {} ({:.2})", label(&s.signal_name), s.score));
        }
        if s.score < cfg.good_threshold {
            let impact = cfg.weight * (1.0 - s.score);
            ranked.extend(s.recommendations.iter().map(|r| (impact, r.as_str())));
        }
    }

    let mut anti_pattern_penalty = 0.0;
    for a in anti_patterns {
        let Some(cfg) = config.anti_pattern(&a.pattern_name) else {
            debug!(scorer = %a.pattern_name, "unconfigured anti-pattern ignored");
            continue;
        };
        let penalty = a.penalty();
        anti_pattern_penalty += penalty;
        anti_pattern_breakdown.insert(a.pattern_name.clone(), a.score);

        if penalty > config.penalty_floor {
            weaknesses.push(format!("issue: {} (-{:.2})", label(&a.pattern_name), penalty));
        }
        if a.score < cfg.good_threshold {
            ranked.extend(a.recommendations.iter().map(|r| (penalty, r.as_str())));
        }
    }

    // Stable sort keeps scorer order among equal impacts.
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut seen = HashSet::new();
    let mut recommendations = Vec::new();
    let critic_recs = critique
        .iter()
        .flat_map(|c| c.recommendations.iter().map(String::as_str));
    for rec in ranked.into_iter().map(|(_, r)| r).chain(critic_recs) {
        let rec = rec.trim();
        if rec.is_empty() || !seen.insert(rec.to_lowercase()) {
            continue;
        }
        recommendations.push(rec.to_string());
        if recommendations.len() == config.max_recommendations {
            break;
        }
    }

    let final_score = (config.base_score + signal_score - anti_pattern_penalty).clamp(0.0, 1.0);
    QualityReport {
        final_score,
        is_passing: final_score >= config.pass_threshold,
        signal_breakdown,
        anti_pattern_breakdown,
        strengths,
        weaknesses,
        recommendations,
        signal_score,
        anti_pattern_penalty,
        failures: Vec::new(),
        critique,
    }
}
