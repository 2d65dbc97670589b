//! Signal and anti-pattern scorers.
//!
//! A scorer measures one property of a candidate against a reference
//! context. Judged scorers delegate to a [`Judge`] with a rubric and corpus
//! exemplars and fail closed when the judge cannot give a usable answer:
//! a signal scores 0, an anti-pattern scores 1 with no penalty.

use std::sync::Arc;

use async_trait::async_trait;
use leverage_core::{
    AntiPatternResult, ConfigError, Corpus, GateConfig, SignalResult, is_unit_interval,
};
use tracing::{debug, warn};

use crate::error::{LlmError, ScoreError};
use crate::exemplar::{ExemplarPolicy, Exemplars};
use crate::retry::RetryPolicy;
use crate::rubric::rubric;
use crate::traits::{Judge, JudgeKind, JudgeRequest, Judgment};

#[async_trait]
pub trait SignalScorer: Send + Sync {
    fn name(&self) -> &str;

    /// Errors only on an empty candidate; judge trouble is folded into the
    /// result.
    async fn measure(&self, reference: &str, candidate: &str) -> Result<SignalResult, ScoreError>;
}

#[async_trait]
pub trait AntiPatternScorer: Send + Sync {
    fn name(&self) -> &str;

    async fn measure(
        &self,
        reference: &str,
        candidate: &str,
    ) -> Result<AntiPatternResult, ScoreError>;
}

/// Shared state of a judged scorer.
struct JudgedScorer {
    name: String,
    rubric: String,
    exemplars: Exemplars,
    judge: Arc<dyn Judge>,
    retry: RetryPolicy,
}

impl JudgedScorer {
    async fn ask(
        &self,
        kind: JudgeKind,
        reference: &str,
        candidate: &str,
    ) -> Result<Judgment, LlmError> {
        let request = JudgeRequest {
            kind,
            name: &self.name,
            rubric: &self.rubric,
            positive: &self.exemplars.positive,
            negative: &self.exemplars.negative,
            reference,
            candidate,
        };
        let judge = self.judge.as_ref();
        let request = &request;
        let judgment = self
            .retry
            .run(&self.name, move || judge.judge(request))
            .await?;

        if !is_unit_interval(judgment.score) {
            return Err(LlmError::OutOfRange {
                value: judgment.score,
                raw: judgment.justification,
            });
        }
        if let Some(penalty) = judgment.penalty
            && !is_unit_interval(penalty)
        {
            return Err(LlmError::OutOfRange {
                value: penalty,
                raw: judgment.justification,
            });
        }
        Ok(judgment)
    }
}

fn non_empty(candidate: &str) -> Result<(), ScoreError> {
    if candidate.trim().is_empty() {
        Err(ScoreError::EmptyCandidate)
    } else {
        Ok(())
    }
}

/// A leverage signal scored by an LLM judge.
pub struct JudgedSignal(JudgedScorer);

impl JudgedSignal {
    pub fn new(
        name: impl Into<String>,
        rubric: impl Into<String>,
        exemplars: Exemplars,
        judge: Arc<dyn Judge>,
        retry: RetryPolicy,
    ) -> Self {
        Self(JudgedScorer {
            name: name.into(),
            rubric: rubric.into(),
            exemplars,
            judge,
            retry,
        })
    }
}

#[async_trait]
impl SignalScorer for JudgedSignal {
    fn name(&self) -> &str {
        &self.0.name
    }

    async fn measure(&self, reference: &str, candidate: &str) -> Result<SignalResult, ScoreError> {
        non_empty(candidate)?;
        match self.0.ask(JudgeKind::Signal, reference, candidate).await {
            Ok(j) => {
                debug!(scorer = %self.0.name, score = j.score, "signal judged");
                let mut result = SignalResult::new(&self.0.name, j.score);
                if !j.justification.is_empty() {
                    result.evidence.push(j.justification);
                }
                result.evidence.extend(j.evidence);
                result.recommendations = j.recommendations;
                Ok(result)
            }
            Err(e) => {
                warn!(scorer = %self.0.name, error = %e, "judge failed, signal scored 0");
                Ok(SignalResult::failed(&self.0.name, e))
            }
        }
    }
}

/// An anti-pattern scored by an LLM judge.
pub struct JudgedAntiPattern(JudgedScorer);

impl JudgedAntiPattern {
    pub fn new(
        name: impl Into<String>,
        rubric: impl Into<String>,
        exemplars: Exemplars,
        judge: Arc<dyn Judge>,
        retry: RetryPolicy,
    ) -> Self {
        Self(JudgedScorer {
            name: name.into(),
            rubric: rubric.into(),
            exemplars,
            judge,
            retry,
        })
    }
}

#[async_trait]
impl AntiPatternScorer for JudgedAntiPattern {
    fn name(&self) -> &str {
        &self.0.name
    }

    async fn measure(
        &self,
        reference: &str,
        candidate: &str,
    ) -> Result<AntiPatternResult, ScoreError> {
        non_empty(candidate)?;
        match self.0.ask(JudgeKind::AntiPattern, reference, candidate).await {
            Ok(j) => {
                debug!(scorer = %self.0.name, score = j.score, "anti-pattern judged");
                let mut result = AntiPatternResult::new(&self.0.name, j.score);
                result.penalty = j.penalty;
                if !j.justification.is_empty() {
                    result.evidence.push(j.justification);
                }
                result.evidence.extend(j.evidence);
                result.recommendations = j.recommendations;
                Ok(result)
            }
            Err(e) => {
                warn!(scorer = %self.0.name, error = %e, "judge failed, no penalty applied");
                Ok(AntiPatternResult::failed(&self.0.name, e))
            }
        }
    }
}

/// The scorers an aggregator runs.
#[derive(Default, Clone)]
pub struct ScorerSet {
    pub signals: Vec<Arc<dyn SignalScorer>>,
    pub anti_patterns: Vec<Arc<dyn AntiPatternScorer>>,
}

impl ScorerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signal(mut self, scorer: impl SignalScorer + 'static) -> Self {
        self.signals.push(Arc::new(scorer));
        self
    }

    pub fn with_anti_pattern(mut self, scorer: impl AntiPatternScorer + 'static) -> Self {
        self.anti_patterns.push(Arc::new(scorer));
        self
    }

    /// Replace any scorer with the same name, or add it.
    pub fn replace_signal(&mut self, scorer: Arc<dyn SignalScorer>) {
        self.signals.retain(|s| s.name() != scorer.name());
        self.signals.push(scorer);
    }

    pub fn replace_anti_pattern(&mut self, scorer: Arc<dyn AntiPatternScorer>) {
        self.anti_patterns.retain(|s| s.name() != scorer.name());
        self.anti_patterns.push(scorer);
    }

    pub fn names(&self) -> Vec<&str> {
        self.signals
            .iter()
            .map(|s| s.name())
            .chain(self.anti_patterns.iter().map(|a| a.name()))
            .collect()
    }
}

/// Build one judged scorer per configured signal and anti-pattern, each
/// with its rubric and exemplars from `corpus`.
pub fn judged_scorers(
    config: &GateConfig,
    corpus: &Corpus,
    judge: Arc<dyn Judge>,
    policy: &ExemplarPolicy,
    retry: &RetryPolicy,
) -> Result<ScorerSet, ConfigError> {
    let mut set = ScorerSet::new();
    for signal in &config.signals {
        let text =
            rubric(&signal.name).ok_or_else(|| ConfigError::MissingScorer(signal.name.clone()))?;
        let exemplars = Exemplars::for_signal(corpus, &signal.name, policy)?;
        set = set.with_signal(JudgedSignal::new(
            &signal.name,
            text,
            exemplars,
            Arc::clone(&judge),
            retry.clone(),
        ));
    }
    for pattern in &config.anti_patterns {
        let text =
            rubric(&pattern.name).ok_or_else(|| ConfigError::MissingScorer(pattern.name.clone()))?;
        let exemplars = Exemplars::for_anti_pattern(corpus, &pattern.name, policy)?;
        set = set.with_anti_pattern(JudgedAntiPattern::new(
            &pattern.name,
            text,
            exemplars,
            Arc::clone(&judge),
            retry.clone(),
        ));
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use leverage_core::{AnnotatedExample, AnnotatedSignal, EngagementMetrics};

    use crate::rubric::SHOCKING_NUMBER_CONTRAST;

    /// Scores 0.9 for "$X vs $Y" style contrasts, 0.1 otherwise.
    struct ContrastJudge;

    #[async_trait]
    impl Judge for ContrastJudge {
        async fn judge(&self, req: &JudgeRequest<'_>) -> Result<Judgment, LlmError> {
            let score = if req.candidate.contains(" vs ") && req.candidate.matches('$').count() >= 2
            {
                0.9
            } else {
                0.1
            };
            Ok(Judgment::new(score, "stub"))
        }
    }

    /// Replays a fixed sequence of outcomes, then repeats the last one.
    struct ScriptedJudge {
        script: Mutex<Vec<Result<Judgment, LlmError>>>,
        calls: AtomicU32,
    }

    impl ScriptedJudge {
        fn new(script: Vec<Result<Judgment, LlmError>>) -> Self {
            Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Judge for ScriptedJudge {
        async fn judge(&self, _req: &JudgeRequest<'_>) -> Result<Judgment, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                match &script[0] {
                    Ok(j) => Ok(j.clone()),
                    Err(_) => Err(LlmError::Transient("scripted".into())),
                }
            }
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(200),
        }
    }

    fn signal(judge: Arc<dyn Judge>) -> JudgedSignal {
        JudgedSignal::new(
            SHOCKING_NUMBER_CONTRAST,
            "Two numbers against each other.",
            Exemplars::default(),
            judge,
            fast_retry(),
        )
    }

    fn anti(judge: Arc<dyn Judge>) -> JudgedAntiPattern {
        JudgedAntiPattern::new(
            "cringy_hook",
            "Clickbait openers.",
            Exemplars::default(),
            judge,
            fast_retry(),
        )
    }

    fn malformed() -> LlmError {
        LlmError::Malformed {
            reason: "not json".into(),
            raw: "I like it".into(),
        }
    }

    #[tokio::test]
    async fn empty_candidate_is_an_error() {
        let scorer = signal(Arc::new(ContrastJudge));
        let err = scorer.measure("ctx", "   ").await.unwrap_err();
        assert!(matches!(err, ScoreError::EmptyCandidate));
    }

    #[tokio::test]
    async fn malformed_judge_fails_closed_without_retry() {
        let judge = Arc::new(ScriptedJudge::new(vec![Err(malformed()), Err(malformed())]));
        let scorer = signal(judge.clone());
        let result = scorer.measure("", "some post").await.unwrap();
        assert_eq!(result.score, 0.0);
        assert!(result.is_failure());
        assert_eq!(judge.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let judge = Arc::new(ScriptedJudge::new(vec![
            Err(LlmError::Transient("reset".into())),
            Ok(Judgment::new(0.75, "fine")),
        ]));
        let scorer = signal(judge.clone());
        let result = scorer.measure("", "some post").await.unwrap();
        assert_eq!(result.score, 0.75);
        assert_eq!(result.evidence, vec!["fine".to_string()]);
        assert_eq!(judge.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn out_of_range_score_fails_closed() {
        let judge = Arc::new(ScriptedJudge::new(vec![Ok(Judgment::new(7.0, "oops"))]));
        let result = signal(judge).measure("", "some post").await.unwrap();
        assert_eq!(result.score, 0.0);
        assert!(result.is_failure());
    }

    #[tokio::test]
    async fn anti_pattern_judge_failure_applies_no_penalty() {
        let judge = Arc::new(ScriptedJudge::new(vec![Err(malformed())]));
        let result = anti(judge).measure("", "some post").await.unwrap();
        assert_eq!(result.score, 1.0);
        assert_eq!(result.penalty(), 0.0);
        assert!(result.is_failure());
    }

    #[tokio::test]
    async fn anti_pattern_keeps_explicit_penalty() {
        let mut judgment = Judgment::new(0.6, "mild clickbait");
        judgment.penalty = Some(0.15);
        judgment.recommendations = vec!["Open with the number".into()];
        let judge = Arc::new(ScriptedJudge::new(vec![Ok(judgment)]));
        let result = anti(judge).measure("", "Let that sink in.").await.unwrap();
        assert_eq!(result.score, 0.6);
        assert_eq!(result.penalty(), 0.15);
        assert_eq!(result.recommendations, vec!["Open with the number".to_string()]);
    }

    fn example(id: &str, quality: bool, success: bool, signals: &[&str]) -> AnnotatedExample {
        AnnotatedExample {
            id: id.into(),
            text: format!("post {id}"),
            engagement_metrics: EngagementMetrics::default(),
            is_quality_label: quality,
            is_successful: success,
            annotated_signals: signals
                .iter()
                .map(|s| AnnotatedSignal {
                    signal: s.to_string(),
                    impact: "high".into(),
                    note: String::new(),
                })
                .collect(),
            analysis: None,
        }
    }

    /// Scores like [`ContrastJudge`] but only when the request carries
    /// positive exemplars; records what each request carried.
    #[derive(Default)]
    struct ExemplarJudge {
        seen: Mutex<Vec<(Vec<String>, Vec<String>)>>,
    }

    #[async_trait]
    impl Judge for ExemplarJudge {
        async fn judge(&self, req: &JudgeRequest<'_>) -> Result<Judgment, LlmError> {
            let ids = |list: &[AnnotatedExample]| -> Vec<String> {
                list.iter().map(|e| e.id.clone()).collect()
            };
            self.seen
                .lock()
                .unwrap()
                .push((ids(req.positive), ids(req.negative)));
            if req.positive.is_empty() {
                return Err(LlmError::Malformed {
                    reason: "no exemplars".into(),
                    raw: String::new(),
                });
            }
            ContrastJudge.judge(req).await
        }
    }

    fn contrast_post(id: &str, quality: bool, success: bool) -> AnnotatedExample {
        AnnotatedExample {
            text: format!("{id}: Chick-fil-A does $9.2M vs $4M per store at Subway."),
            ..example(id, quality, success, &[SHOCKING_NUMBER_CONTRAST])
        }
    }

    #[tokio::test]
    async fn number_contrast_separates_specific_from_generic() {
        let corpus = Corpus::new(vec![
            contrast_post("P1", true, true),
            contrast_post("P2", true, true),
            contrast_post("P3", true, true),
            example("F1", false, false, &[]),
        ])
        .unwrap();
        let exemplars =
            Exemplars::for_signal(&corpus, SHOCKING_NUMBER_CONTRAST, &ExemplarPolicy::default())
                .unwrap();
        assert!(!exemplars.fallback_used);

        let judge = Arc::new(ExemplarJudge::default());
        let scorer = JudgedSignal::new(
            SHOCKING_NUMBER_CONTRAST,
            rubric(SHOCKING_NUMBER_CONTRAST).unwrap(),
            exemplars,
            judge.clone(),
            fast_retry(),
        );
        let strong = scorer
            .measure("", "Chipotle does $9.2M vs $4M per store for Qdoba.")
            .await
            .unwrap();
        let weak = scorer
            .measure("", "Our new menu is amazing and customers love it!")
            .await
            .unwrap();
        assert!(strong.score >= 0.8, "got {}", strong.score);
        assert!(weak.score <= 0.2, "got {}", weak.score);

        let seen = judge.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        for (positive, negative) in seen.iter() {
            assert_eq!(positive, &vec!["P1".to_string(), "P2".into(), "P3".into()]);
            assert_eq!(negative, &vec!["F1".to_string()]);
        }
    }

    #[tokio::test]
    async fn unlucky_exemplars_fill_in_when_proven_are_scarce() {
        let corpus = Corpus::new(vec![
            contrast_post("U1", true, false),
            contrast_post("U2", true, false),
            example("F1", false, false, &[]),
        ])
        .unwrap();
        let exemplars =
            Exemplars::for_signal(&corpus, SHOCKING_NUMBER_CONTRAST, &ExemplarPolicy::default())
                .unwrap();
        assert!(exemplars.fallback_used);

        let judge = Arc::new(ExemplarJudge::default());
        let scorer = JudgedSignal::new(
            SHOCKING_NUMBER_CONTRAST,
            "Two numbers against each other.",
            exemplars,
            judge.clone(),
            fast_retry(),
        );
        let result = scorer
            .measure("", "Wingstop: $1.9M vs $1.1M average unit volume.")
            .await
            .unwrap();
        assert!(result.score >= 0.8);
        let seen = judge.seen.lock().unwrap();
        assert_eq!(seen[0].0, vec!["U1".to_string(), "U2".into()]);
    }

    #[test]
    fn judged_scorers_follow_config() {
        let config = GateConfig::empty(0.2, 0.85)
            .with_signal(SHOCKING_NUMBER_CONTRAST, 0.15)
            .with_anti_pattern("cringy_hook");
        let corpus = Corpus::new(vec![
            example("P1", true, true, &[SHOCKING_NUMBER_CONTRAST]),
            example("F1", false, false, &[]),
        ])
        .unwrap();
        let set = judged_scorers(
            &config,
            &corpus,
            Arc::new(ContrastJudge),
            &ExemplarPolicy::default(),
            &fast_retry(),
        )
        .unwrap();
        assert_eq!(set.names(), vec![SHOCKING_NUMBER_CONTRAST, "cringy_hook"]);
    }

    #[test]
    fn judged_scorers_reject_unknown_rubric() {
        let config = GateConfig::empty(0.2, 0.85).with_signal("vibes", 0.1);
        let corpus = Corpus::new(vec![example("P1", true, true, &["vibes"])]).unwrap();
        let err = judged_scorers(
            &config,
            &corpus,
            Arc::new(ContrastJudge),
            &ExemplarPolicy::default(),
            &fast_retry(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, ConfigError::MissingScorer(name) if name == "vibes"));
    }
}
