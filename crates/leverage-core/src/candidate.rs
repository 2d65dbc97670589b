//! Generated text awaiting (or having received) a quality evaluation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// One draft of a piece of content.
///
/// Candidates are immutable. A revision is a new `Candidate` produced by
/// [`Candidate::revise`], which bumps the revision number and leaves the
/// original untouched. The text is reference-counted so concurrent scorers
/// can share it without copying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    text: Arc<str>,
    revision: u32,
}

impl Candidate {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Arc::from(text.into()),
            revision: 0,
        }
    }

    /// A new candidate that replaces this one, one revision later.
    pub fn revise(&self, text: impl Into<String>) -> Self {
        Self {
            text: Arc::from(text.into()),
            revision: self.revision + 1,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Shared handle to the text, for fan-out to spawned tasks.
    pub fn shared_text(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    /// 0 for a first draft, incremented by each revision.
    pub fn revision(&self) -> u32 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}
