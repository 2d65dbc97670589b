//! Terminal rendering for reports, validation summaries and corpus stats.
//!
//! Everything prints as a vertical card: a `=== title ===` line, then
//! sections of aligned `label  value` rows.

use leverage_ai::Exemplars;
use leverage_core::{AnnotatedExample, ConfigError, CorpusSummary, GateConfig, QualityReport};
use leverage_gate::{RevisionOutcome, RevisionStatus, ValidationSummary};

const MAX_LIST_ITEMS: usize = 10;
const PREVIEW_CHARS: usize = 72;

// ── Quality report ──

pub fn print_report(report: &QualityReport, config: &GateConfig) {
    let verdict = if report.is_passing { "PASS" } else { "FAIL" };
    println!("=== {verdict} {:.2} ===", report.final_score);
    println!();

    println!("Score");
    row("base", format!("{:.2}", config.base_score));
    row("signal score", format!("+{:.2}", report.signal_score));
    row(
        "anti-pattern penalty",
        format!("-{:.2}", report.anti_pattern_penalty),
    );
    row("pass threshold", format!("{:.2}", config.pass_threshold));
    println!();

    println!("Signals");
    for (name, score) in &report.signal_breakdown {
        let weight = config.signal(name).map_or(0.0, |s| s.weight);
        row(name, format!("{score:.2}  {}  w={weight:.2}", bar(*score)));
    }
    println!();

    if !report.anti_pattern_breakdown.is_empty() {
        println!("Anti-patterns");
        for (name, score) in &report.anti_pattern_breakdown {
            row(name, format!("{score:.2}  {}", bar(*score)));
        }
        println!();
    }

    print_list("Strengths", &report.strengths);
    print_list("Weaknesses", &report.weaknesses);
    print_numbered("Recommendations", &report.recommendations);
    print_list("Scorer failures", &report.failures);

    if let Some(critique) = &report.critique {
        println!("Critic");
        row("feels smarter", yes_no(critique.feels_smarter));
        row("would share", yes_no(critique.would_share));
        row("overall", if critique.overall_pass { "pass" } else { "fail" });
        if !critique.brutal_truth.is_empty() {
            row("brutal truth", &critique.brutal_truth);
        }
        for issue in critique.issues.iter().take(MAX_LIST_ITEMS) {
            println!("  - {issue}");
        }
        println!();
    }
}

// ── Validation ──

pub fn print_summary(summary: &ValidationSummary) {
    println!("=== Validation: {} examples ===", summary.total);
    println!("{}", summary.generated_at);
    println!();

    let m = &summary.matrix;
    println!("Classification");
    row("accuracy", pct(summary.accuracy));
    row("quality recognised", pct(summary.quality_accuracy));
    row("flops rejected", pct(summary.flop_accuracy));
    row(
        "confusion (tp fp tn fn)",
        format!(
            "{} {} {} {}",
            m.true_positives, m.false_positives, m.true_negatives, m.false_negatives
        ),
    );
    println!();

    println!("Signal detection");
    row("examples compared", summary.compared_examples);
    row("precision", pct(summary.signal_precision));
    row("recall", pct(summary.signal_recall));
    row("f1", format!("{:.2}", summary.signal_f1));
    println!();

    println!("Difficulty");
    for tier in &summary.difficulty {
        if tier.total > 0 {
            row(
                tier.difficulty.as_str(),
                format!("{}/{} passed", tier.passed, tier.total),
            );
        }
    }
    println!();

    let c = &summary.calibration;
    println!("Calibration");
    row("pass threshold", format!("{:.2}", c.pass_threshold));
    row("mean quality score", format!("{:.2}", c.mean_quality_score));
    row("mean flop score", format!("{:.2}", c.mean_flop_score));
    row("margin", format!("{:+.2}", c.margin));
    row(
        "best threshold",
        format!(
            "{:.2} ({})",
            c.best_threshold,
            pct(c.best_threshold_accuracy)
        ),
    );
    println!();

    if !summary.misclassified.is_empty() {
        println!("Misclassified ({}):", summary.misclassified.len());
        for miss in summary.misclassified.iter().take(MAX_LIST_ITEMS) {
            println!(
                "    {:<24} {:<16} {:.2}",
                miss.id,
                miss.verdict.as_str(),
                miss.final_score
            );
            if !miss.missing_signals.is_empty() {
                println!("      missing: {}", miss.missing_signals.join(", "));
            }
            if !miss.extra_signals.is_empty() {
                println!("      extra:   {}", miss.extra_signals.join(", "));
            }
        }
        if summary.misclassified.len() > MAX_LIST_ITEMS {
            println!(
                "    ... and {} more",
                summary.misclassified.len() - MAX_LIST_ITEMS
            );
        }
        println!();
    }

    print_list("Diagnosis", &summary.diagnosis);
}

// ── Corpus ──

pub fn print_corpus_summary(summary: &CorpusSummary) {
    println!("=== Corpus: {} examples ===", summary.total);
    println!();

    println!("Tiers");
    row("quality", summary.quality);
    row("  proven", summary.proven);
    row("  unlucky", summary.unlucky);
    row("flops", summary.flops);
    println!();

    if !summary.signal_frequency.is_empty() {
        println!("Annotated signals");
        for (signal, count) in summary.signal_frequency.iter().take(MAX_LIST_ITEMS) {
            row(signal, count);
        }
        println!();
    }
}

pub fn print_exemplars(name: &str, selection: &Result<Exemplars, ConfigError>) {
    match selection {
        Ok(ex) => {
            let fallback = if ex.fallback_used { " (fallback)" } else { "" };
            println!(
                "  {:<26} +{} -{}{fallback}",
                name,
                ex.positive.len(),
                ex.negative.len()
            );
            let ids = |list: &[AnnotatedExample]| {
                list.iter().map(|e| e.id.as_str()).collect::<Vec<_>>().join(", ")
            };
            if !ex.positive.is_empty() {
                println!("      + {}", ids(&ex.positive));
            }
            if !ex.negative.is_empty() {
                println!("      - {}", ids(&ex.negative));
            }
        }
        Err(e) => println!("  {:<26} unavailable: {e}", name),
    }
}

// ── Revision ──

pub fn print_outcome(outcome: &RevisionOutcome) {
    let status = match outcome.status {
        RevisionStatus::Passed => "passed",
        RevisionStatus::Exhausted => "out of attempts",
    };
    println!(
        "=== {status}: {:.2} after {} attempt(s) ===",
        outcome.report.final_score, outcome.attempts
    );
    if outcome.restarts > 0 {
        println!("restarted {} time(s)", outcome.restarts);
    }
    println!();

    if outcome.history.len() > 1 {
        println!("History");
        for (i, attempt) in outcome.history.iter().enumerate() {
            row(
                &format!("attempt {}", i + 1),
                format!(
                    "{:.2}  {}",
                    attempt.report.final_score,
                    preview(attempt.candidate.text())
                ),
            );
        }
        println!();
    }

    println!("{}", outcome.candidate.text());
    println!();

    if !outcome.report.is_passing {
        print_numbered("Open recommendations", &outcome.report.recommendations);
    }
}

// ── Helpers ──

fn row(label: &str, value: impl std::fmt::Display) {
    println!("  {:<26} {}", label, value);
}

fn print_list(header: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{header}");
    for item in items.iter().take(MAX_LIST_ITEMS) {
        println!("  - {item}");
    }
    if items.len() > MAX_LIST_ITEMS {
        println!("    ... and {} more", items.len() - MAX_LIST_ITEMS);
    }
    println!();
}

fn print_numbered(header: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{header}");
    for (i, item) in items.iter().enumerate() {
        println!("  {}. {item}", i + 1);
    }
    println!();
}

fn bar(score: f64) -> String {
    let filled = (score.clamp(0.0, 1.0) * 10.0).round() as usize;
    format!("{}{}", "#".repeat(filled), ".".repeat(10 - filled))
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

/// First line of `text`, cut to a fixed width.
fn preview(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if line.chars().count() <= PREVIEW_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_is_ten_wide() {
        assert_eq!(bar(0.0), "..........");
        assert_eq!(bar(0.55), "######....");
        assert_eq!(bar(1.0), "##########");
        assert_eq!(bar(1.7), "##########");
    }

    #[test]
    fn preview_takes_first_nonblank_line() {
        assert_eq!(preview("\n\nHook line.\nBody."), "Hook line.");
        let long = "x".repeat(100);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
        assert!(p.ends_with("..."));
    }

    #[test]
    fn percentages_have_one_decimal() {
        assert_eq!(pct(0.8333), "83.3%");
        assert_eq!(pct(1.0), "100.0%");
    }
}
