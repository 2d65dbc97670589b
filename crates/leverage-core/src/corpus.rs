//! Labeled reference corpus: human-annotated examples of content that did and
//! did not work.
//!
//! Each example carries a quality label (structurally good or not), a success
//! flag (did it actually perform), and the leverage signals an annotator saw
//! in it. The corpus is loaded once per run and shared read-only by every
//! scorer and by the validation harness.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CorpusError;

/// Real-world engagement numbers for an example.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngagementMetrics {
    pub total_reactions: u64,
    pub likes: u64,
    pub comments: u64,
    pub reposts: u64,
    pub engagement_score: f64,
}

/// Free-text annotator analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExampleAnalysis {
    pub how_it_made_readers_feel: Option<String>,
    pub what_they_learned: Option<String>,
    pub why_shareable_or_not: Option<String>,
    pub what_worked_or_didnt_work: Option<String>,
}

/// One human-annotated signal (or, on flops, anti-pattern) in an example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedSignal {
    #[serde(alias = "signalName")]
    pub signal: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub note: String,
}

/// A labeled example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedExample {
    pub id: String,
    pub text: String,
    #[serde(default, alias = "engagement")]
    pub engagement_metrics: EngagementMetrics,
    /// Structurally high quality, regardless of how it performed.
    #[serde(alias = "hasViralElements")]
    pub is_quality_label: bool,
    /// Measured real-world success.
    #[serde(default, alias = "isViral")]
    pub is_successful: bool,
    #[serde(default, alias = "leverageSignals")]
    pub annotated_signals: Vec<AnnotatedSignal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ExampleAnalysis>,
}

/// Trust tier of an example when used as a few-shot exemplar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExampleTier {
    /// Quality and measured success.
    Proven,
    /// Quality, but did not perform.
    Unlucky,
    /// Not quality.
    Flop,
}

impl ExampleTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proven => "proven",
            Self::Unlucky => "unlucky",
            Self::Flop => "flop",
        }
    }
}

impl AnnotatedExample {
    pub fn tier(&self) -> ExampleTier {
        match (self.is_quality_label, self.is_successful) {
            (true, true) => ExampleTier::Proven,
            (true, false) => ExampleTier::Unlucky,
            (false, _) => ExampleTier::Flop,
        }
    }

    pub fn has_signal(&self, signal: &str) -> bool {
        self.annotated_signals.iter().any(|s| s.signal == signal)
    }

    pub fn signal_names(&self) -> Vec<String> {
        self.annotated_signals.iter().map(|s| s.signal.clone()).collect()
    }

    /// Render for inclusion in a few-shot prompt.
    pub fn format_for_prompt(&self) -> String {
        let mut out = format!("POST {}:\n{}\n", self.id, self.text);
        if let Some(why) = self
            .analysis
            .as_ref()
            .and_then(|a| a.what_worked_or_didnt_work.as_deref())
        {
            out.push_str(&format!("\nANALYSIS: {why}\n"));
        }
        if !self.annotated_signals.is_empty() {
            out.push_str("\nLEVERAGE SIGNALS:\n");
            for s in &self.annotated_signals {
                out.push_str(&format!("- {} ({}): {}\n", s.signal, s.impact, s.note));
            }
        }
        out
    }
}

/// Summary statistics for a corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusSummary {
    pub total: usize,
    pub quality: usize,
    pub flops: usize,
    pub proven: usize,
    pub unlucky: usize,
    /// Annotated signal → number of quality examples carrying it, most
    /// common first (ties by name).
    pub signal_frequency: Vec<(String, usize)>,
}

/// Read-only set of labeled examples.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    examples: Vec<AnnotatedExample>,
}

impl Corpus {
    /// Build a corpus, rejecting duplicate IDs and empty texts.
    pub fn new(examples: Vec<AnnotatedExample>) -> Result<Self, CorpusError> {
        let mut ids = HashSet::new();
        for ex in &examples {
            if !ids.insert(ex.id.as_str()) {
                return Err(CorpusError::DuplicateId(ex.id.clone()));
            }
            if ex.text.trim().is_empty() {
                return Err(CorpusError::EmptyText(ex.id.clone()));
            }
        }
        Ok(Self { examples })
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CorpusError> {
        Self::new(serde_json::from_str(raw)?)
    }

    pub fn examples(&self) -> &[AnnotatedExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&AnnotatedExample> {
        self.examples.iter().find(|e| e.id == id)
    }

    pub fn quality(&self) -> impl Iterator<Item = &AnnotatedExample> {
        self.examples.iter().filter(|e| e.is_quality_label)
    }

    pub fn flops(&self) -> impl Iterator<Item = &AnnotatedExample> {
        self.examples.iter().filter(|e| !e.is_quality_label)
    }

    pub fn proven(&self) -> impl Iterator<Item = &AnnotatedExample> {
        self.by_tier(ExampleTier::Proven)
    }

    pub fn unlucky(&self) -> impl Iterator<Item = &AnnotatedExample> {
        self.by_tier(ExampleTier::Unlucky)
    }

    pub fn by_tier(&self, tier: ExampleTier) -> impl Iterator<Item = &AnnotatedExample> {
        self.examples.iter().filter(move |e| e.tier() == tier)
    }

    /// Examples of any tier annotated with `signal`.
    pub fn with_signal<'a>(
        &'a self,
        signal: &'a str,
    ) -> impl Iterator<Item = &'a AnnotatedExample> + 'a {
        self.examples.iter().filter(move |e| e.has_signal(signal))
    }

    /// Proven examples with the most annotated signals, up to `count`.
    pub fn best(&self, count: usize) -> Vec<&AnnotatedExample> {
        let mut best: Vec<&AnnotatedExample> = self.proven().collect();
        best.sort_by(|a, b| {
            b.annotated_signals
                .len()
                .cmp(&a.annotated_signals.len())
                .then_with(|| a.id.cmp(&b.id))
        });
        best.truncate(count);
        best
    }

    pub fn summary(&self) -> CorpusSummary {
        let mut freq: HashMap<&str, usize> = HashMap::new();
        for ex in self.quality() {
            for s in &ex.annotated_signals {
                *freq.entry(s.signal.as_str()).or_default() += 1;
            }
        }
        let mut signal_frequency: Vec<(String, usize)> =
            freq.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        signal_frequency.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        CorpusSummary {
            total: self.examples.len(),
            quality: self.quality().count(),
            flops: self.flops().count(),
            proven: self.proven().count(),
            unlucky: self.unlucky().count(),
            signal_frequency,
        }
    }
}

/// Source of labeled examples.
pub trait CorpusLoader {
    fn load(&self) -> Result<Corpus, CorpusError>;
}

/// Loads a JSON array of [`AnnotatedExample`] from disk.
pub struct JsonFileLoader {
    path: PathBuf,
}

impl JsonFileLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl CorpusLoader for JsonFileLoader {
    fn load(&self) -> Result<Corpus, CorpusError> {
        if !self.path.exists() {
            return Err(CorpusError::NotFound(self.path.clone()));
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let corpus = Corpus::from_json_str(&raw)?;
        info!(
            path = %self.path.display(),
            examples = corpus.len(),
            "loaded labeled corpus"
        );
        Ok(corpus)
    }
}
