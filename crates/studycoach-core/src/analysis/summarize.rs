use super::segment::sentences;
use super::terms::top_terms;
use super::textprep::tokens;
use crate::{AnalysisConfig, SummaryBlock};
use std::collections::HashSet;

pub const NO_SENTENCES: &str = "No clear sentences extracted.";

pub const REFLECTION_FOOTER: &str = "\n\nReflection:\n- What is the main concept?\n- Which example illustrates it?\n- How can you apply it?";

const NO_SENTENCES_BLOCK_TITLE: &str = "Summary";
const NO_SENTENCES_BLOCK_BULLET: &str =
    "No clear sentences could be extracted from this document. Try a text-based file.";

/// Number of tokens in each sentence that belong to the term set.
fn scores(sents: &[&str], terms: &HashSet<String>) -> Vec<usize> {
    sents
        .iter()
        .map(|s| {
            let lower = s.to_lowercase();
            tokens(&lower).filter(|t| terms.contains(t.text)).count()
        })
        .collect()
}

/// Indices in descending score; equal scores keep document order.
fn by_score(indices: impl Iterator<Item = usize>, scores: &[usize]) -> Vec<usize> {
    let mut order: Vec<usize> = indices.collect();
    order.sort_by(|&a, &b| scores[b].cmp(&scores[a]));
    order
}

fn term_set(text: &str, cfg: &AnalysisConfig) -> HashSet<String> {
    top_terms(text, cfg.summary_terms, cfg).into_iter().collect()
}

/// First sentence, then the best-scoring others, then the reflection footer.
pub fn summarize_flat(text: &str, cfg: &AnalysisConfig) -> String {
    let sents = sentences(text, cfg.min_sentence_chars);
    let Some(first) = sents.first() else {
        return NO_SENTENCES.to_string();
    };
    let scores = scores(&sents, &term_set(text, cfg));

    let mut pick = vec![*first];
    pick.extend(
        by_score(1..sents.len(), &scores)
            .into_iter()
            .take(cfg.summary_sentences.saturating_sub(1))
            .map(|i| sents[i]),
    );
    let mut out = pick.join("\n");
    out.push_str(REFLECTION_FOOTER);
    out
}

/// Top `block_count * bullets_per_block` sentences by score, grouped into titled blocks.
pub fn summarize_blocks(text: &str, cfg: &AnalysisConfig) -> Vec<SummaryBlock> {
    let sents = sentences(text, cfg.min_sentence_chars);
    if sents.is_empty() {
        return vec![SummaryBlock {
            title: NO_SENTENCES_BLOCK_TITLE.to_string(),
            bullets: vec![NO_SENTENCES_BLOCK_BULLET.to_string()],
        }];
    }
    let scores = scores(&sents, &term_set(text, cfg));
    let per_block = cfg.bullets_per_block.max(1);

    let mut order = by_score(0..sents.len(), &scores);
    order.truncate(cfg.block_count.saturating_mul(per_block));
    order
        .chunks(per_block)
        .take(cfg.block_count)
        .enumerate()
        .map(|(n, chunk)| SummaryBlock {
            title: format!("Key ideas #{}", n + 1),
            bullets: chunk.iter().map(|&i| sents[i].to_string()).collect(),
        })
        .collect()
}
