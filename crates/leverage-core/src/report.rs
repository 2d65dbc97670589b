//! The aggregate quality decision for one candidate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Qualitative verdict from a critic pass ("would you feel smarter, would
/// you share it").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Critique {
    /// Did the reader come away understanding something non-obvious?
    pub feels_smarter: bool,
    /// Would the reader repost it to their own network?
    pub would_share: bool,
    pub overall_pass: bool,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// One paragraph of unfiltered feedback.
    #[serde(default)]
    pub brutal_truth: String,
}

/// Aggregate evaluation of one candidate.
///
/// `final_score = clamp(base + signal_score - anti_pattern_penalty, 0, 1)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub final_score: f64,
    pub is_passing: bool,
    /// signal name → score
    pub signal_breakdown: BTreeMap<String, f64>,
    /// anti-pattern name → score (1.0 = defect absent)
    pub anti_pattern_breakdown: BTreeMap<String, f64>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    /// Ranked, de-duplicated, capped.
    pub recommendations: Vec<String>,
    /// Σ weight × score across signals.
    pub signal_score: f64,
    /// Σ penalty across anti-patterns.
    pub anti_pattern_penalty: f64,
    /// Scorers whose output was substituted by a fail-closed value.
    #[serde(default)]
    pub failures: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critique: Option<Critique>,
}

impl QualityReport {
    /// Signals whose score is at or above `threshold`, in name order.
    pub fn detected_signals(&self, threshold: f64) -> Vec<String> {
        self.signal_breakdown
            .iter()
            .filter(|(_, score)| **score >= threshold)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Anti-patterns whose score is below `threshold`, in name order.
    pub fn detected_anti_patterns(&self, threshold: f64) -> Vec<String> {
        self.anti_pattern_breakdown
            .iter()
            .filter(|(_, score)| **score < threshold)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// The critic's verdict (brutal truth and issues) lowercased, or an empty
    /// string when no critique ran. Restart markers are matched against this.
    pub fn critic_verdict(&self) -> String {
        let Some(critique) = &self.critique else {
            return String::new();
        };
        std::iter::once(critique.brutal_truth.as_str())
            .chain(critique.issues.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n")
            .to_lowercase()
    }

    /// Feedback text handed to a writer when asking for a revision.
    pub fn revision_brief(&self) -> String {
        let mut brief = format!(
            "Quality score: {:.2} ({})\n",
            self.final_score,
            if self.is_passing { "passing" } else { "not passing" }
        );
        if !self.weaknesses.is_empty() {
            brief.push_str("\nIssues:\n");
            for w in &self.weaknesses {
                brief.push_str(&format!("- {w}\n"));
            }
        }
        if !self.recommendations.is_empty() {
            brief.push_str("\nRecommendations:\n");
            for (i, r) in self.recommendations.iter().enumerate() {
                brief.push_str(&format!("{}. {r}\n", i + 1));
            }
        }
        if !self.strengths.is_empty() {
            brief.push_str("\nKeep:\n");
            for s in &self.strengths {
                brief.push_str(&format!("- {s}\n"));
            }
        }
        if let Some(critique) = &self.critique
            && !critique.brutal_truth.is_empty()
        {
            brief.push_str(&format!("\nBrutal truth: {}\n", critique.brutal_truth));
        }
        brief
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> QualityReport {
        QualityReport {
            final_score: 0.62,
            is_passing: false,
            signal_breakdown: BTreeMap::from([
                ("detailed_breakdown".to_string(), 0.9),
                ("comeback_story".to_string(), 0.2),
                ("shocking_number_contrast".to_string(), 0.7),
            ]),
            anti_pattern_breakdown: BTreeMap::from([
                ("cringy_hook".to_string(), 0.5),
                ("broad_appeal".to_string(), 1.0),
            ]),
            strengths: vec!["detailed breakdown (0.90)".into()],
            weaknesses: vec!["missing comeback story (0.20)".into()],
            recommendations: vec!["Lead with the number".into()],
            signal_score: 0.42,
            anti_pattern_penalty: 0.5,
            failures: vec![],
            critique: None,
        }
    }

    #[test]
    fn detected_signals_respects_threshold() {
        assert_eq!(
            report().detected_signals(0.7),
            vec!["detailed_breakdown", "shocking_number_contrast"]
        );
    }

    #[test]
    fn detected_anti_patterns_below_threshold() {
        assert_eq!(report().detected_anti_patterns(0.9), vec!["cringy_hook"]);
    }

    #[test]
    fn critic_verdict_covers_only_the_critique() {
        let mut r = report();
        assert_eq!(r.critic_verdict(), "");
        r.critique = Some(Critique {
            brutal_truth: "This is a Fundamentally Weak topic.".into(),
            issues: vec!["Surface-level framing".into()],
            ..Default::default()
        });
        let text = r.critic_verdict();
        assert!(text.contains("fundamentally weak topic"));
        assert!(text.contains("surface-level framing"));
        assert!(!text.contains("missing comeback story"));
        assert!(!text.contains("lead with the number"));
    }

    #[test]
    fn revision_brief_lists_issues_and_recommendations() {
        let brief = report().revision_brief();
        assert!(brief.starts_with("Quality score: 0.62 (not passing)"));
        assert!(brief.contains("- missing comeback story (0.20)"));
        assert!(brief.contains("1. Lead with the number"));
        assert!(brief.contains("Keep:"));
    }

    #[test]
    fn serializes_spec_field_names() {
        let json = serde_json::to_value(report()).unwrap();
        for key in [
            "finalScore",
            "isPassing",
            "signalBreakdown",
            "antiPatternBreakdown",
            "strengths",
            "weaknesses",
            "recommendations",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        assert!(json.get("critique").is_none());
    }
}
