use super::segment::sentences;
use super::terms::top_terms;
use super::textprep::{find_word, mask_token};
use crate::{AnalysisConfig, McQuestion};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

const FALLBACK_ANSWER: &str = "Its central concept and supporting examples";

/// Fixed question set served when the vocabulary is too thin to build real items.
pub fn fallback() -> Vec<McQuestion> {
    vec![McQuestion {
        question: "What should you focus on first when reviewing this document?".to_string(),
        choices: vec![
            FALLBACK_ANSWER.to_string(),
            "The page numbers".to_string(),
            "The font and layout".to_string(),
            "The file name".to_string(),
        ],
        answer_index: 0,
        explanation: format!(
            "The correct answer is \"{FALLBACK_ANSWER}\". Not enough distinct terms were found to build specific questions."
        ),
    }]
}

/// Multiple-choice questions with distractors drawn from the other top terms.
///
/// `rng` drives distractor selection and choice order; seed it for reproducible output.
pub fn generate<R: Rng + ?Sized>(text: &str, cfg: &AnalysisConfig, rng: &mut R) -> Vec<McQuestion> {
    let terms = top_terms(text, cfg.mcq_terms, cfg);
    if terms.len() < cfg.mcq_min_terms.max(cfg.mcq_distractors + 1) {
        return fallback();
    }
    let sents = sentences(text, cfg.min_sentence_chars);

    let mut used: HashSet<&str> = HashSet::new();
    let mut out = Vec::new();
    for term in &terms {
        if out.len() >= cfg.mcq_questions {
            break;
        }
        if !used.insert(term.as_str()) {
            continue;
        }
        let Some((sentence, tok)) = sents
            .iter()
            .find_map(|s| find_word(s, term).map(|tok| (*s, tok)))
        else {
            continue;
        };

        // The pool never shrinks below the number of distractors a question needs.
        let pool: Vec<&String> = terms
            .iter()
            .filter(|t| *t != term)
            .take(cfg.mcq_distractor_pool.max(cfg.mcq_distractors))
            .collect();
        let mut choices: Vec<String> = pool
            .choose_multiple(rng, cfg.mcq_distractors)
            .map(|t| (*t).clone())
            .collect();
        choices.push(term.clone());
        choices.shuffle(rng);
        let Some(answer_index) = choices.iter().position(|c| c == term) else {
            continue;
        };

        out.push(McQuestion {
            question: format!(
                "Which term best fills the blank? {}",
                mask_token(sentence, &tok, &cfg.mask)
            ),
            choices,
            answer_index,
            explanation: format!("The correct answer is \"{term}\", as in: {sentence}"),
        });
    }

    // Keep whatever was built; only an empty result falls back.
    if out.is_empty() {
        return fallback();
    }
    out
}
