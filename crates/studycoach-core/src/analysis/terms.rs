use super::textprep::{char_len, tokens};
use crate::AnalysisConfig;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermCount {
    pub term: String,
    pub count: usize,
}

/// All qualifying terms, most frequent first; equal counts keep first-seen order.
pub fn ranked_terms(text: &str, cfg: &AnalysisConfig) -> Vec<TermCount> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<TermCount> = Vec::new();
    for tok in tokens(text) {
        if char_len(tok.text) <= cfg.min_term_chars {
            continue;
        }
        let w = tok.text.to_lowercase();
        if cfg.is_stop_word(&w) {
            continue;
        }
        match index.get(&w) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(w.clone(), counts.len());
                counts.push(TermCount { term: w, count: 1 });
            }
        }
    }
    // Stable: ties stay in first-seen order.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

pub fn top_terms(text: &str, k: usize, cfg: &AnalysisConfig) -> Vec<String> {
    ranked_terms(text, cfg)
        .into_iter()
        .take(k)
        .map(|t| t.term)
        .collect()
}
