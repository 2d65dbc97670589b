//! Rule-based scorers that need no judge.
//!
//! Cheap and deterministic. They can stand in for judged scorers when no API
//! key is available, or run alongside them under their own names.

use std::sync::LazyLock;

use async_trait::async_trait;
use leverage_core::{AntiPatternResult, SignalResult};
use regex::Regex;

use crate::error::ScoreError;
use crate::rubric::SHOCKING_NUMBER_CONTRAST;
use crate::scorer::{AntiPatternScorer, SignalScorer};

const QUANTITY: &str = r"\$?\d[\d,]*(?:\.\d+)?\s*(?:(?:k|m|b|bn|million|billion|x)\b|%)?";

static RE_CONTRAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)({QUANTITY})\s*(?:vs\.?|versus|compared to|against)\s*({QUANTITY})"
    ))
    .unwrap()
});

static RE_QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i){QUANTITY}")).unwrap());

/// Parse a matched quantity like "$9.2M" or "1,200" into a number.
fn quantity_value(raw: &str) -> Option<f64> {
    let lower = raw.trim().to_lowercase();
    let digits: String = lower
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '$' | ',' | '.'))
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let base: f64 = digits.parse().ok()?;
    let unit = lower.trim_start_matches(|c: char| {
        c.is_ascii_digit() || matches!(c, '$' | ',' | '.') || c.is_whitespace()
    });
    let scale = match unit {
        "k" => 1e3,
        "m" | "million" => 1e6,
        "b" | "bn" | "billion" => 1e9,
        _ => 1.0,
    };
    Some(base * scale)
}

/// Detects two quantities set against each other ("$9.2M vs $4M").
///
/// Scores 0.9 for a contrast where one side is at least double the other,
/// 0.8 for a narrower contrast. Without a contrast: 0.4 with two or more
/// numbers, 0.2 with one, 0.0 with none.
pub struct NumberContrastHeuristic {
    name: String,
}

impl Default for NumberContrastHeuristic {
    fn default() -> Self {
        Self::named(SHOCKING_NUMBER_CONTRAST)
    }
}

impl NumberContrastHeuristic {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn score_text(&self, text: &str) -> SignalResult {
        let mut best: Option<(f64, &str)> = None;
        for caps in RE_CONTRAST.captures_iter(text) {
            let (Some(whole), Some(a), Some(b)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let ratio = match (quantity_value(a.as_str()), quantity_value(b.as_str())) {
                (Some(x), Some(y)) if x.min(y) > 0.0 => x.max(y) / x.min(y),
                _ => 1.0,
            };
            if best.is_none_or(|(r, _)| ratio > r) {
                best = Some((ratio, whole.as_str()));
            }
        }

        if let Some((ratio, excerpt)) = best {
            let score = if ratio >= 2.0 { 0.9 } else { 0.8 };
            return SignalResult::new(&self.name, score)
                .with_evidence(format!("contrast: \"{}\" ({ratio:.1}x)", excerpt.trim()));
        }

        let numbers = RE_QUANTITY.find_iter(text).count();
        let score = match numbers {
            0 => 0.0,
            1 => 0.2,
            _ => 0.4,
        };
        SignalResult::new(&self.name, score)
            .with_evidence(format!("{numbers} number(s), no direct contrast"))
            .with_recommendation(
                "Put two specific numbers side by side in the hook (e.g. \"$9.2M vs $4M per store\")",
            )
    }
}

#[async_trait]
impl SignalScorer for NumberContrastHeuristic {
    fn name(&self) -> &str {
        &self.name
    }

    async fn measure(&self, _reference: &str, candidate: &str) -> Result<SignalResult, ScoreError> {
        if candidate.trim().is_empty() {
            return Err(ScoreError::EmptyCandidate);
        }
        Ok(self.score_text(candidate))
    }
}

pub const WALL_OF_TEXT: &str = "wall_of_text";

/// Penalizes long unbroken paragraphs.
///
/// Score is driven by the longest paragraph: up to 60 words is clean (1.0),
/// up to 100 is 0.7, up to 150 is 0.4, anything longer 0.1.
pub struct StructureHeuristic {
    name: String,
}

impl Default for StructureHeuristic {
    fn default() -> Self {
        Self::named(WALL_OF_TEXT)
    }
}

impl StructureHeuristic {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn score_text(&self, text: &str) -> AntiPatternResult {
        let longest = text
            .split("\n\n")
            .map(|p| p.split_whitespace().count())
            .max()
            .unwrap_or(0);
        let score = match longest {
            0..=60 => 1.0,
            61..=100 => 0.7,
            101..=150 => 0.4,
            _ => 0.1,
        };
        let result = AntiPatternResult::new(&self.name, score)
            .with_evidence(format!("longest paragraph: {longest} words"));
        if score < 1.0 {
            result.with_recommendation("Break long paragraphs into two or three sentences each")
        } else {
            result
        }
    }
}

#[async_trait]
impl AntiPatternScorer for StructureHeuristic {
    fn name(&self) -> &str {
        &self.name
    }

    async fn measure(
        &self,
        _reference: &str,
        candidate: &str,
    ) -> Result<AntiPatternResult, ScoreError> {
        if candidate.trim().is_empty() {
            return Err(ScoreError::EmptyCandidate);
        }
        Ok(self.score_text(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_quantities() {
        assert!((quantity_value("$9.2M").unwrap() - 9.2e6).abs() < 1e-3);
        assert_eq!(quantity_value("$4 million"), Some(4e6));
        assert_eq!(quantity_value("1,200"), Some(1200.0));
        assert_eq!(quantity_value("17x"), Some(17.0));
    }

    #[test]
    fn wide_contrast_scores_high() {
        let h = NumberContrastHeuristic::default();
        let r = h.score_text("Chick-fil-A: $9.2M vs $4M per store at Subway's best units.");
        assert_eq!(r.score, 0.9);
        assert!(r.evidence[0].contains("$9.2M vs $4M"));
        assert!(r.recommendations.is_empty());
    }

    #[test]
    fn narrow_contrast_still_counts() {
        let h = NumberContrastHeuristic::default();
        let r = h.score_text("Margins went 18% versus 15% a year earlier.");
        assert_eq!(r.score, 0.8);
    }

    #[test]
    fn generic_text_scores_low() {
        let h = NumberContrastHeuristic::default();
        assert_eq!(
            h.score_text("Our new menu is amazing and customers love it!").score,
            0.0
        );
        assert_eq!(h.score_text("We opened 40 new stores this year.").score, 0.2);
        let r = h.score_text("Sales of $3M and 12 new stores.");
        assert_eq!(r.score, 0.4);
        assert_eq!(r.recommendations.len(), 1);
    }

    #[tokio::test]
    async fn empty_candidate_is_rejected() {
        let h = NumberContrastHeuristic::default();
        assert!(matches!(
            h.measure("", "").await,
            Err(ScoreError::EmptyCandidate)
        ));
        let s = StructureHeuristic::default();
        assert!(matches!(
            s.measure("", " \n").await,
            Err(ScoreError::EmptyCandidate)
        ));
    }

    #[test]
    fn short_paragraphs_are_clean() {
        let s = StructureHeuristic::default();
        let r = s.score_text("Hook line.\n\nShort body.\n\nClosing thought.");
        assert_eq!(r.score, 1.0);
        assert_eq!(r.penalty(), 0.0);
    }

    #[test]
    fn wall_of_text_is_penalized() {
        let s = StructureHeuristic::default();
        let wall = "word ".repeat(200);
        let r = s.score_text(&wall);
        assert_eq!(r.score, 0.1);
        assert!((r.penalty() - 0.9).abs() < 1e-12);
        assert_eq!(r.recommendations.len(), 1);
    }
}
