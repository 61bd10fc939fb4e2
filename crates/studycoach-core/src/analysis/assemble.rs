use super::textprep::{char_len, normalize};
use super::{cloze, mcq, summarize};
use crate::{AnalysisConfig, AnalysisOptions, AnalysisReport, Error, Result, SummaryStyle};
use rand::Rng;

/// Normalize `raw`, gate on length, and build the requested report parts.
pub fn analyze<R: Rng + ?Sized>(
    raw: &str,
    opts: &AnalysisOptions,
    cfg: &AnalysisConfig,
    rng: &mut R,
) -> Result<AnalysisReport> {
    let text = normalize(raw);
    let chars = char_len(&text);
    if chars < cfg.min_text_chars {
        return Err(Error::InsufficientContent {
            chars,
            min: cfg.min_text_chars,
        });
    }

    let (summary, summary_blocks) = match opts.summary {
        SummaryStyle::Flat => (Some(summarize::summarize_flat(&text, cfg)), None),
        SummaryStyle::Blocks => (None, Some(summarize::summarize_blocks(&text, cfg))),
    };
    let quiz = opts.cloze.then(|| cloze::generate(&text, cfg));
    let mcq = if opts.mcq {
        Some(mcq::generate(&text, cfg, rng))
    } else {
        None
    };

    Ok(AnalysisReport {
        ok: true,
        summary,
        summary_blocks,
        quiz,
        mcq,
    })
}
