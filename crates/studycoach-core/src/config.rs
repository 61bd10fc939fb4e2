//! Tunables for the analysis pipeline.
//!
//! Every component takes an `&AnalysisConfig` instead of reading module-level
//! constants, so tests can swap vocabularies and counts freely.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

const DEFAULT_STOP_WORDS: &[&str] = &[
    "this", "that", "with", "from", "your", "about", "these", "those", "which", "their", "have",
    "will", "there", "here", "where", "when", "then", "into", "over", "under", "also", "such",
    "than", "only", "very", "more", "most", "much", "many", "some", "been", "were", "what",
    "shall", "should", "could", "would", "might", "must",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Normalized texts shorter than this (in chars) are rejected by the assembler.
    pub min_text_chars: usize,
    /// Sentences must be strictly longer than this (in chars).
    pub min_sentence_chars: usize,
    /// Terms must be strictly longer than this (in chars).
    pub min_term_chars: usize,

    pub summary_sentences: usize,
    pub summary_terms: usize,
    pub block_count: usize,
    pub bullets_per_block: usize,

    pub cloze_questions: usize,
    pub cloze_terms: usize,

    pub mcq_questions: usize,
    pub mcq_terms: usize,
    /// Below this many distinct terms the MCQ generator returns its fallback.
    pub mcq_min_terms: usize,
    pub mcq_distractor_pool: usize,
    pub mcq_distractors: usize,

    /// Placeholder that replaces a masked term.
    pub mask: String,
    pub stop_words: BTreeSet<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 100,
            min_sentence_chars: 30,
            min_term_chars: 3,
            summary_sentences: 5,
            summary_terms: 20,
            block_count: 3,
            bullets_per_block: 4,
            cloze_questions: 5,
            cloze_terms: 40,
            mcq_questions: 6,
            mcq_terms: 50,
            mcq_min_terms: 6,
            mcq_distractor_pool: 12,
            mcq_distractors: 3,
            mask: "____".to_string(),
            stop_words: DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::InvalidInput(format!("analysis config: {e}")))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidInput(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&txt)
    }

    pub fn is_stop_word(&self, lowercase_word: &str) -> bool {
        self.stop_words.contains(lowercase_word)
    }

    /// Apply per-request overrides on top of this config.
    pub fn with_overrides(&self, o: &AnalysisOverrides) -> Self {
        let mut out = self.clone();
        if let Some(n) = o.summary_sentences {
            out.summary_sentences = n.clamp(1, 30);
        }
        if let Some(n) = o.block_count {
            out.block_count = n.clamp(1, 10);
        }
        if let Some(n) = o.bullets_per_block {
            out.bullets_per_block = n.clamp(1, 10);
        }
        if let Some(n) = o.cloze_questions {
            out.cloze_questions = n.clamp(1, 30);
        }
        if let Some(n) = o.mcq_questions {
            out.mcq_questions = n.clamp(1, 30);
        }
        out
    }
}

/// Optional per-request counts; absent fields keep the configured value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisOverrides {
    pub summary_sentences: Option<usize>,
    pub block_count: Option<usize>,
    pub bullets_per_block: Option<usize>,
    pub cloze_questions: Option<usize>,
    pub mcq_questions: Option<usize>,
}
