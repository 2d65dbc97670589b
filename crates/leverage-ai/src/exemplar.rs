//! Few-shot exemplar selection from the labeled corpus.
//!
//! Positive exemplars come from *proven* posts (quality label and measured
//! success). When a signal has too few proven posts, *unlucky* ones (quality
//! but unproven) fill the gap and the fallback is flagged.

use leverage_core::{AnnotatedExample, ConfigError, Corpus, ExampleTier};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExemplarPolicy {
    /// Below this many proven positives, unlucky examples are added.
    pub min_proven: usize,
    pub max_positive: usize,
    pub max_negative: usize,
}

impl Default for ExemplarPolicy {
    fn default() -> Self {
        Self {
            min_proven: 3,
            max_positive: 5,
            max_negative: 3,
        }
    }
}

/// Exemplars chosen for one scorer.
#[derive(Debug, Clone, Default)]
pub struct Exemplars {
    pub positive: Vec<AnnotatedExample>,
    pub negative: Vec<AnnotatedExample>,
    /// True when proven examples were supplemented by lower tiers.
    pub fallback_used: bool,
}

impl Exemplars {
    /// Positive examples that demonstrate `signal`, and flops that lack it.
    pub fn for_signal(
        corpus: &Corpus,
        signal: &str,
        policy: &ExemplarPolicy,
    ) -> Result<Self, ConfigError> {
        let proven: Vec<&AnnotatedExample> = corpus
            .with_signal(signal)
            .filter(|e| e.tier() == ExampleTier::Proven)
            .collect();
        let unlucky = corpus
            .with_signal(signal)
            .filter(|e| e.tier() == ExampleTier::Unlucky);
        let (positive, fallback_used) = fill_positive(signal, proven, unlucky, policy);
        if positive.is_empty() {
            return Err(ConfigError::MissingExemplars(signal.to_string()));
        }

        let negative = corpus
            .flops()
            .filter(|e| !e.has_signal(signal))
            .take(policy.max_negative)
            .cloned()
            .collect();

        Ok(Self {
            positive,
            negative,
            fallback_used,
        })
    }

    /// Clean quality posts as positives, and flops showing `pattern` as
    /// negatives. When no flop is annotated with the pattern, any flop is
    /// used instead.
    pub fn for_anti_pattern(
        corpus: &Corpus,
        pattern: &str,
        policy: &ExemplarPolicy,
    ) -> Result<Self, ConfigError> {
        let proven: Vec<&AnnotatedExample> = corpus.proven().collect();
        let (positive, mut fallback_used) =
            fill_positive(pattern, proven, corpus.unlucky(), policy);

        let mut negative: Vec<AnnotatedExample> = corpus
            .flops()
            .filter(|e| e.has_signal(pattern))
            .take(policy.max_negative)
            .cloned()
            .collect();
        if negative.is_empty() {
            negative = corpus.flops().take(policy.max_negative).cloned().collect();
            if !negative.is_empty() {
                warn!(
                    scorer = pattern,
                    "no flops annotated with this anti-pattern, using unannotated flops"
                );
                fallback_used = true;
            }
        }

        if positive.is_empty() && negative.is_empty() {
            return Err(ConfigError::MissingExemplars(pattern.to_string()));
        }
        Ok(Self {
            positive,
            negative,
            fallback_used,
        })
    }
}

fn fill_positive<'a>(
    name: &str,
    proven: Vec<&'a AnnotatedExample>,
    unlucky: impl Iterator<Item = &'a AnnotatedExample>,
    policy: &ExemplarPolicy,
) -> (Vec<AnnotatedExample>, bool) {
    let proven_count = proven.len();
    let mut positive: Vec<AnnotatedExample> = proven
        .into_iter()
        .take(policy.max_positive)
        .cloned()
        .collect();

    let mut fallback_used = false;
    if proven_count < policy.min_proven {
        let room = policy.max_positive.saturating_sub(positive.len());
        let before = positive.len();
        positive.extend(unlucky.take(room).cloned());
        if positive.len() > before {
            fallback_used = true;
            warn!(
                scorer = name,
                proven = proven_count,
                min_proven = policy.min_proven,
                supplemented = positive.len() - before,
                "too few proven exemplars, supplementing with unlucky examples"
            );
        }
    }
    (positive, fallback_used)
}

#[cfg(test)]
mod tests {
    use super::*;
    use leverage_core::{AnnotatedSignal, EngagementMetrics};

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

    fn ids(v: &[AnnotatedExample]) -> Vec<&str> {
        v.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn enough_proven_means_no_fallback() {
        let corpus = Corpus::new(vec![
            example("P1", true, true, &["comeback_story"]),
            example("P2", true, true, &["comeback_story"]),
            example("P3", true, true, &["comeback_story"]),
            example("U1", true, false, &["comeback_story"]),
            example("F1", false, false, &[]),
        ])
        .unwrap();
        let ex = Exemplars::for_signal(&corpus, "comeback_story", &ExemplarPolicy::default())
            .unwrap();
        assert_eq!(ids(&ex.positive), vec!["P1", "P2", "P3"]);
        assert_eq!(ids(&ex.negative), vec!["F1"]);
        assert!(!ex.fallback_used);
    }

    #[test]
    fn few_proven_supplements_with_unlucky() {
        let corpus = Corpus::new(vec![
            example("P1", true, true, &["david_vs_goliath"]),
            example("U1", true, false, &["david_vs_goliath"]),
            example("U2", true, false, &["other"]),
            example("F1", false, false, &[]),
        ])
        .unwrap();
        let ex = Exemplars::for_signal(&corpus, "david_vs_goliath", &ExemplarPolicy::default())
            .unwrap();
        assert_eq!(ids(&ex.positive), vec!["P1", "U1"]);
        assert!(ex.fallback_used);
    }

    #[test]
    fn negatives_exclude_flops_with_the_signal() {
        let corpus = Corpus::new(vec![
            example("P1", true, true, &["detailed_breakdown"]),
            example("F1", false, false, &["detailed_breakdown"]),
            example("F2", false, false, &[]),
        ])
        .unwrap();
        let ex = Exemplars::for_signal(&corpus, "detailed_breakdown", &ExemplarPolicy::default())
            .unwrap();
        assert_eq!(ids(&ex.negative), vec!["F2"]);
    }

    #[test]
    fn no_positive_examples_is_config_error() {
        let corpus = Corpus::new(vec![example("F1", false, false, &[])]).unwrap();
        let err = Exemplars::for_signal(&corpus, "comeback_story", &ExemplarPolicy::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingExemplars(name) if name == "comeback_story"));
    }

    #[test]
    fn anti_pattern_prefers_annotated_flops() {
        let corpus = Corpus::new(vec![
            example("P1", true, true, &[]),
            example("F1", false, false, &[]),
            example("F2", false, false, &["cringy_hook"]),
        ])
        .unwrap();
        let ex = Exemplars::for_anti_pattern(&corpus, "cringy_hook", &ExemplarPolicy::default())
            .unwrap();
        assert_eq!(ids(&ex.negative), vec!["F2"]);
        assert_eq!(ids(&ex.positive), vec!["P1"]);
    }

    #[test]
    fn anti_pattern_falls_back_to_any_flop() {
        let corpus = Corpus::new(vec![
            example("P1", true, true, &[]),
            example("P2", true, true, &[]),
            example("P3", true, true, &[]),
            example("F1", false, false, &[]),
        ])
        .unwrap();
        let ex = Exemplars::for_anti_pattern(&corpus, "broad_appeal", &ExemplarPolicy::default())
            .unwrap();
        assert_eq!(ids(&ex.negative), vec!["F1"]);
        assert!(ex.fallback_used);
    }
}
