//! Generate → evaluate → revise loop around a [`QualityAggregator`].
//!
//! An explicit state machine:
//!
//! ```text
//! Drafting → Evaluating → Passed
//!                       → Revising   → Drafting (same lineage, with feedback)
//!                       → Restarting → Drafting (fresh context, history dropped)
//!                       → Exhausted
//! ```
//!
//! Attempts are sequential. Restarts are bounded by `max_restarts`, and each
//! restart resets the attempt counter, so the loop runs at most
//! `(max_restarts + 1) * max_attempts` drafts.

use std::sync::Arc;

use leverage_ai::{ContentGenerator, GenerateError, GenerationRequest};
use leverage_core::{Candidate, ConfigError, QualityReport, RevisionConfig};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregator::QualityAggregator;
use crate::error::RevisionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Drafting,
    Evaluating,
    Passed,
    Revising,
    Restarting,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionStatus {
    Passed,
    /// Out of attempts; the result is the last evaluated draft.
    Exhausted,
}

/// One evaluated draft.
#[derive(Debug, Clone, Serialize)]
pub struct Attempt {
    pub candidate: Candidate,
    pub report: QualityReport,
}

#[derive(Debug)]
pub struct RevisionState {
    pub phase: Phase,
    pub context: String,
    /// Drafting attempts in the current lineage, starting at 1.
    pub attempt: u32,
    pub restarts: u32,
    /// Evaluated drafts of the current lineage, oldest first.
    pub history: Vec<Attempt>,
    pending: Option<Candidate>,
    /// Last draft of a lineage dropped by a restart.
    discarded: Option<Attempt>,
    last_error: Option<GenerateError>,
}

impl RevisionState {
    fn new(context: String) -> Self {
        Self {
            phase: Phase::Drafting,
            context,
            attempt: 0,
            restarts: 0,
            history: Vec::new(),
            pending: None,
            discarded: None,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionOutcome {
    pub candidate: Candidate,
    pub report: QualityReport,
    pub attempts: u32,
    pub restarts: u32,
    pub status: RevisionStatus,
    pub history: Vec<Attempt>,
}

pub struct RevisionLoop {
    aggregator: Arc<QualityAggregator>,
    generator: Arc<dyn ContentGenerator>,
    config: RevisionConfig,
}

impl RevisionLoop {
    pub fn new(
        aggregator: Arc<QualityAggregator>,
        generator: Arc<dyn ContentGenerator>,
        config: RevisionConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            aggregator,
            generator,
            config,
        })
    }

    pub async fn run(
        &self,
        initial_context: impl Into<String>,
    ) -> Result<RevisionOutcome, RevisionError> {
        let mut state = RevisionState::new(initial_context.into());
        loop {
            state = match state.phase {
                Phase::Drafting => self.draft(state).await,
                Phase::Evaluating => self.evaluate(state).await,
                Phase::Revising => RevisionState {
                    phase: Phase::Drafting,
                    ..state
                },
                Phase::Restarting => self.restart(state).await,
                Phase::Passed | Phase::Exhausted => return finish(state),
            };
        }
    }

    async fn draft(&self, mut state: RevisionState) -> RevisionState {
        state.attempt += 1;
        let request = match state.history.last() {
            Some(last) => GenerationRequest::revision(
                state.context.clone(),
                last.candidate.clone(),
                last.report.clone(),
            ),
            None => GenerationRequest::initial(state.context.clone()),
        };

        let generated = match self.generator.generate(&request).await {
            Ok(candidate) if candidate.is_empty() => Err(GenerateError::Empty),
            other => other,
        };
        match generated {
            Ok(candidate) => {
                state.pending = Some(candidate);
                state.phase = Phase::Evaluating;
            }
            Err(e) => {
                warn!(attempt = state.attempt, error = %e, "drafting failed, attempt consumed");
                state.last_error = Some(e);
                state.phase = if !state.history.is_empty() {
                    self.decide(&state)
                } else if state.attempt >= self.config.max_attempts {
                    Phase::Exhausted
                } else {
                    Phase::Drafting
                };
            }
        }
        state
    }

    async fn evaluate(&self, mut state: RevisionState) -> RevisionState {
        let Some(candidate) = state.pending.take() else {
            state.phase = Phase::Drafting;
            return state;
        };
        let report = self
            .aggregator
            .evaluate_candidate(&state.context, &candidate)
            .await;
        state.history.push(Attempt { candidate, report });
        state.phase = self.decide(&state);
        state
    }

    /// Next phase after the latest report in `state.history`.
    fn decide(&self, state: &RevisionState) -> Phase {
        let Some(last) = state.history.last() else {
            return Phase::Drafting;
        };
        let phase = if last.report.is_passing {
            Phase::Passed
        } else if state.restarts < self.config.max_restarts && self.unsalvageable(&last.report) {
            Phase::Restarting
        } else if state.attempt >= self.config.max_attempts {
            Phase::Exhausted
        } else {
            Phase::Revising
        };
        info!(
            attempt = state.attempt,
            restarts = state.restarts,
            score = last.report.final_score,
            next = ?phase,
            "revision step"
        );
        phase
    }

    fn unsalvageable(&self, report: &QualityReport) -> bool {
        let verdict = report.critic_verdict();
        !verdict.is_empty()
            && self
                .config
                .restart_markers
                .iter()
                .any(|m| verdict.contains(&m.to_lowercase()))
    }

    async fn restart(&self, mut state: RevisionState) -> RevisionState {
        match self.generator.fresh_context(&state.context).await {
            Ok(context) => state.context = context,
            Err(e) => warn!(error = %e, "no fresh context, restarting from the old one"),
        }
        state.discarded = state.history.pop();
        state.history.clear();
        state.attempt = 0;
        state.restarts += 1;
        state.phase = Phase::Drafting;
        info!(restarts = state.restarts, "topic judged unsalvageable, restarting");
        state
    }
}

fn finish(state: RevisionState) -> Result<RevisionOutcome, RevisionError> {
    let status = match state.phase {
        Phase::Passed => RevisionStatus::Passed,
        _ => RevisionStatus::Exhausted,
    };
    let last = match state.history.last() {
        Some(last) => last.clone(),
        None => match state.discarded {
            Some(discarded) => discarded,
            None => {
                return Err(RevisionError::NoCandidate {
                    attempts: state.attempt,
                    source: state.last_error.unwrap_or(GenerateError::Empty),
                });
            }
        },
    };
    Ok(RevisionOutcome {
        candidate: last.candidate,
        report: last.report,
        attempts: state.attempt,
        restarts: state.restarts,
        status,
        history: state.history,
    })
}
