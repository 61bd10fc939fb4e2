use super::segment::sentences;
use super::terms::top_terms;
use super::textprep::{char_len, find_word, mask_token, tokens};
use crate::{AnalysisConfig, ClozeQuestion};
use std::collections::HashSet;

const FALLBACK_HINT: &str = "key term";
const GENERIC_STEM: &str = "Write down one key idea from this document: ____";
const GENERIC_HINT: &str = "use your own words";

fn length_hint(term: &str) -> String {
    format!("length: {}", char_len(term))
}

/// Fill-in-the-blank questions, at most one per sentence and one per term.
pub fn generate(text: &str, cfg: &AnalysisConfig) -> Vec<ClozeQuestion> {
    if cfg.cloze_questions == 0 {
        return Vec::new();
    }
    let sents = sentences(text, cfg.min_sentence_chars);
    let Some(first) = sents.first().copied() else {
        return vec![generic()];
    };
    let terms = top_terms(text, cfg.cloze_terms, cfg);

    let mut used: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for s in &sents {
        let hit = terms
            .iter()
            .filter(|t| !used.contains(t.as_str()))
            .find_map(|t| find_word(s, t).map(|tok| (t, tok)));
        if let Some((term, tok)) = hit {
            out.push(ClozeQuestion {
                stem: mask_token(s, &tok, &cfg.mask),
                hint: length_hint(term),
            });
            used.insert(term.as_str());
        }
        if out.len() >= cfg.cloze_questions {
            break;
        }
    }

    if out.is_empty() {
        out.push(first_long_word(first, cfg).unwrap_or_else(generic));
    }
    out
}

/// Low-quality fallback: blank out the first word of 4+ chars in the opening sentence.
fn first_long_word(sentence: &str, cfg: &AnalysisConfig) -> Option<ClozeQuestion> {
    let tok = tokens(sentence).find(|t| char_len(t.text) >= 4)?;
    Some(ClozeQuestion {
        stem: mask_token(sentence, &tok, &cfg.mask),
        hint: FALLBACK_HINT.to_string(),
    })
}

fn generic() -> ClozeQuestion {
    ClozeQuestion {
        stem: GENERIC_STEM.to_string(),
        hint: GENERIC_HINT.to_string(),
    }
}
