//! Judge prompt construction and response parsing.

use leverage_core::{AnnotatedExample, is_unit_interval};
use serde::Deserialize;

use crate::error::LlmError;
use crate::traits::{JudgeKind, JudgeRequest, Judgment};

/// Positive examples shown in full.
const MAX_POSITIVE_IN_PROMPT: usize = 5;
/// Negative examples are clipped to this many bytes.
const NEGATIVE_EXCERPT_BYTES: usize = 300;

pub const JUDGE_SYSTEM_PROMPT: &str = "You are a demanding editor who scores \
LinkedIn posts on one narrow criterion at a time. You compare the candidate \
against real posts that did and did not work, and you answer only with JSON.";

/// Render the user prompt for one judge call.
pub fn judge_prompt(request: &JudgeRequest<'_>) -> String {
    let mut out = String::new();
    let what = match request.kind {
        JudgeKind::Signal => "LEVERAGE SIGNAL",
        JudgeKind::AntiPattern => "ANTI-PATTERN",
    };
    out.push_str(&format!("{what}: {}\n\n", request.name));
    out.push_str("RUBRIC:\n");
    out.push_str(request.rubric.trim());
    out.push_str("\n\n");

    if !request.positive.is_empty() {
        let heading = match request.kind {
            JudgeKind::Signal => "POSTS THAT NAIL THIS SIGNAL",
            JudgeKind::AntiPattern => "POSTS THAT AVOID THIS PROBLEM",
        };
        out.push_str(&format!("{heading}:\n\n"));
        for example in request.positive.iter().take(MAX_POSITIVE_IN_PROMPT) {
            out.push_str(&example.format_for_prompt());
            out.push_str("\n---\n\n");
        }
    }

    if !request.negative.is_empty() {
        let heading = match request.kind {
            JudgeKind::Signal => "POSTS THAT FLOPPED",
            JudgeKind::AntiPattern => "POSTS THAT SHOW THIS PROBLEM",
        };
        out.push_str(&format!("{heading}:\n\n"));
        for example in request.negative {
            out.push_str(&negative_excerpt(example));
            out.push_str("\n---\n\n");
        }
    }

    if !request.reference.trim().is_empty() {
        out.push_str("CONTEXT THE POST WAS WRITTEN FROM:\n");
        out.push_str(request.reference.trim());
        out.push_str("\n\n");
    }

    out.push_str("CANDIDATE POST:\n");
    out.push_str(request.candidate.trim());
    out.push_str("\n\n");

    let polarity = match request.kind {
        JudgeKind::Signal => "1.0 means the signal is present and executed as well as the best examples; 0.0 means it is absent",
        JudgeKind::AntiPattern => "1.0 means the problem is completely absent; 0.0 means it dominates the post",
    };
    out.push_str(&format!(
        "Score the candidate from 0.0 to 1.0, where {polarity}.\n\
         Quote the exact phrases that drove your score as evidence. \
         If the score is below 0.8, give concrete rewrites as recommendations.\n\n\
         Respond with JSON only:\n\
         {{\"score\": 0.0, \"justification\": \"...\", \"evidence\": [\"...\"], \"recommendations\": [\"...\"]}}"
    ));
    out
}

fn negative_excerpt(example: &AnnotatedExample) -> String {
    let mut out = format!(
        "POST {}:\n{}",
        example.id,
        truncate_to_char_boundary(&example.text, NEGATIVE_EXCERPT_BYTES)
    );
    if example.text.len() > NEGATIVE_EXCERPT_BYTES {
        out.push_str("...");
    }
    out.push('\n');
    if let Some(why) = example
        .analysis
        .as_ref()
        .and_then(|a| a.what_worked_or_didnt_work.as_deref())
    {
        out.push_str(&format!("\nWHY IT FAILED: {why}\n"));
    }
    out
}

#[derive(Debug, Deserialize)]
struct RawJudgment {
    score: f64,
    #[serde(default, alias = "reasoning", alias = "reason")]
    justification: String,
    #[serde(default)]
    evidence: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    penalty: Option<f64>,
}

/// Parse a judge's raw text into a [`Judgment`].
///
/// Tolerates markdown fences and prose around the JSON object. A score or
/// penalty outside `[0, 1]` is rejected rather than clamped.
pub fn parse_judgment(raw: &str) -> Result<Judgment, LlmError> {
    let body = extract_json_object(raw).ok_or_else(|| LlmError::Malformed {
        reason: "no JSON object in response".into(),
        raw: raw.to_string(),
    })?;
    let parsed: RawJudgment = serde_json::from_str(body).map_err(|e| LlmError::Malformed {
        reason: e.to_string(),
        raw: raw.to_string(),
    })?;

    if !is_unit_interval(parsed.score) {
        return Err(LlmError::OutOfRange {
            value: parsed.score,
            raw: raw.to_string(),
        });
    }
    if let Some(penalty) = parsed.penalty
        && !is_unit_interval(penalty)
    {
        return Err(LlmError::OutOfRange {
            value: penalty,
            raw: raw.to_string(),
        });
    }

    Ok(Judgment {
        score: parsed.score,
        justification: parsed.justification,
        evidence: parsed.evidence,
        recommendations: parsed.recommendations,
        penalty: parsed.penalty,
    })
}

/// The outermost `{ ... }` span of a response, after stripping code fences.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let stripped = strip_code_blocks(raw);
    let start = stripped.find('{')?;
    let end = stripped.rfind('}')?;
    (end > start).then(|| &stripped[start..=end])
}

/// Strip markdown code blocks from a response.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Truncate a string to at most `max_bytes` bytes at a character boundary.
pub fn truncate_to_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use leverage_core::{ExampleAnalysis, EngagementMetrics};

    fn example(id: &str, text: &str, quality: bool, why: Option<&str>) -> AnnotatedExample {
        AnnotatedExample {
            id: id.into(),
            text: text.into(),
            engagement_metrics: EngagementMetrics::default(),
            is_quality_label: quality,
            is_successful: quality,
            annotated_signals: Vec::new(),
            analysis: why.map(|w| ExampleAnalysis {
                what_worked_or_didnt_work: Some(w.into()),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"score\": 0.85, \"justification\": \"strong\", \"evidence\": [\"$9.2M vs $4M\"]}\n```";
        let j = parse_judgment(raw).unwrap();
        assert_eq!(j.score, 0.85);
        assert_eq!(j.justification, "strong");
        assert_eq!(j.evidence, vec!["$9.2M vs $4M".to_string()]);
        assert!(j.recommendations.is_empty());
        assert_eq!(j.penalty, None);
    }

    #[test]
    fn parses_json_wrapped_in_prose() {
        let raw = "Here is my assessment:\n{\"score\": 0.3, \"reasoning\": \"vague\"}\nThanks.";
        let j = parse_judgment(raw).unwrap();
        assert_eq!(j.score, 0.3);
        assert_eq!(j.justification, "vague");
    }

    #[test]
    fn prose_only_is_malformed() {
        let err = parse_judgment("I would rate this highly.").unwrap_err();
        assert!(matches!(err, LlmError::Malformed { .. }));
    }

    #[test]
    fn missing_score_is_malformed() {
        let err = parse_judgment("{\"justification\": \"no number\"}").unwrap_err();
        assert!(matches!(err, LlmError::Malformed { .. }));
    }

    #[test]
    fn score_out_of_range_is_rejected() {
        let err = parse_judgment("{\"score\": 8}").unwrap_err();
        assert!(matches!(err, LlmError::OutOfRange { value, .. } if value == 8.0));
        let err = parse_judgment("{\"score\": 0.5, \"penalty\": -0.2}").unwrap_err();
        assert!(matches!(err, LlmError::OutOfRange { .. }));
    }

    #[test]
    fn prompt_includes_rubric_examples_and_candidate() {
        let positive = vec![example("P054", "Chipotle makes $9.2M per store", true, None)];
        let negative = vec![example(
            "P010",
            &"x".repeat(400),
            false,
            Some("No numbers, generic take"),
        )];
        let req = JudgeRequest {
            kind: JudgeKind::Signal,
            name: "shocking_number_contrast",
            rubric: "Two numbers side by side.",
            positive: &positive,
            negative: &negative,
            reference: "",
            candidate: "Our new menu is great.",
        };
        let prompt = judge_prompt(&req);
        assert!(prompt.contains("LEVERAGE SIGNAL: shocking_number_contrast"));
        assert!(prompt.contains("Two numbers side by side."));
        assert!(prompt.contains("POST P054:"));
        assert!(prompt.contains("WHY IT FAILED: No numbers, generic take"));
        assert!(prompt.contains("CANDIDATE POST:\nOur new menu is great."));
        assert!(!prompt.contains(&"x".repeat(301)));
        assert!(!prompt.contains("CONTEXT THE POST WAS WRITTEN FROM"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "Hello 世界";
        let truncated = truncate_to_char_boundary(text, 8);
        assert!(truncated.len() <= 8);
        assert!(text.starts_with(truncated));
        assert_eq!(truncate_to_char_boundary("Hello", 100), "Hello");
    }
}
