//! Document in, report out: extraction plus analysis, off the async runtime.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use studycoach_core::{
    analyze, AnalysisConfig, AnalysisOptions, AnalysisOverrides, AnalysisReport, Error,
    FetchResponse, Result, SummaryStyle,
};
use studycoach_local::{extract_document, DocumentFormat};

/// Raw document bytes plus the hints the format sniffer may use.
#[derive(Debug, Clone)]
pub struct Document {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub file_name: Option<String>,
}

impl Document {
    pub fn from_fetch(resp: FetchResponse) -> Self {
        let file_name = resp.file_name();
        Self {
            bytes: resp.bytes,
            content_type: resp.content_type,
            file_name,
        }
    }
}

/// Report options accepted by every processing endpoint, as JSON fields or query parameters.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ProcessOptions {
    pub summary: Option<SummaryStyle>,
    pub cloze: Option<bool>,
    pub mcq: Option<bool>,
    pub summary_sentences: Option<usize>,
    pub block_count: Option<usize>,
    pub bullets_per_block: Option<usize>,
    pub cloze_questions: Option<usize>,
    pub mcq_questions: Option<usize>,
}

impl ProcessOptions {
    pub fn resolve(&self, base: &AnalysisConfig) -> (AnalysisOptions, AnalysisConfig) {
        let d = AnalysisOptions::default();
        let opts = AnalysisOptions {
            summary: self.summary.unwrap_or(d.summary),
            cloze: self.cloze.unwrap_or(d.cloze),
            mcq: self.mcq.unwrap_or(d.mcq),
        };
        let cfg = base.with_overrides(&AnalysisOverrides {
            summary_sentences: self.summary_sentences,
            block_count: self.block_count,
            bullets_per_block: self.bullets_per_block,
            cloze_questions: self.cloze_questions,
            mcq_questions: self.mcq_questions,
        });
        (opts, cfg)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentMeta {
    pub format: DocumentFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    pub bytes: usize,
    pub text_chars: usize,
    pub warnings: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResponse {
    #[serde(flatten)]
    pub report: AnalysisReport,
    pub document: DocumentMeta,
}

pub fn process_blocking<R: Rng + ?Sized>(
    doc: &Document,
    opts: &AnalysisOptions,
    cfg: &AnalysisConfig,
    rng: &mut R,
) -> Result<ProcessResponse> {
    let t0 = Instant::now();
    let extracted = extract_document(
        &doc.bytes,
        doc.content_type.as_deref(),
        doc.file_name.as_deref(),
    )?;
    let text_chars = extracted.text.chars().count();
    for w in &extracted.warnings {
        tracing::warn!(format = extracted.format.as_str(), warning = *w, "extraction warning");
    }
    let report = analyze(&extracted.text, opts, cfg, rng)?;
    tracing::info!(
        format = extracted.format.as_str(),
        bytes = doc.bytes.len(),
        text_chars,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "document analyzed"
    );
    Ok(ProcessResponse {
        report,
        document: DocumentMeta {
            format: extracted.format,
            file_name: doc.file_name.clone(),
            bytes: doc.bytes.len(),
            text_chars,
            warnings: extracted.warnings,
        },
    })
}

/// Run [`process_blocking`] on the blocking pool with a freshly seeded RNG.
pub async fn process(
    doc: Document,
    opts: AnalysisOptions,
    cfg: AnalysisConfig,
) -> Result<ProcessResponse> {
    tokio::task::spawn_blocking(move || {
        let mut rng = StdRng::from_entropy();
        process_blocking(&doc, &opts, &cfg, &mut rng)
    })
    .await
    .map_err(|e| Error::InternalFault(format!("analysis task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes() -> Document {
        Document {
            bytes: "Glaciers carve valleys as they slowly advance over bedrock. \
                    Meltwater from glaciers deposits sediment in outwash plains. \
                    Moraines mark the furthest advance of glaciers during ice ages."
                .as_bytes()
                .to_vec(),
            content_type: Some("text/plain".into()),
            file_name: Some("glaciers.txt".into()),
        }
    }

    #[test]
    fn resolve_defaults_to_blocks_with_both_quizzes() {
        let (opts, cfg) = ProcessOptions::default().resolve(&AnalysisConfig::default());
        assert_eq!(opts, AnalysisOptions::default());
        assert_eq!(cfg, AnalysisConfig::default());
    }

    #[test]
    fn resolve_applies_clamped_overrides() {
        let o = ProcessOptions {
            summary: Some(SummaryStyle::Flat),
            mcq: Some(false),
            cloze_questions: Some(500),
            ..ProcessOptions::default()
        };
        let (opts, cfg) = o.resolve(&AnalysisConfig::default());
        assert_eq!(opts.summary, SummaryStyle::Flat);
        assert!(opts.cloze && !opts.mcq);
        assert_eq!(cfg.cloze_questions, 30);
    }

    #[test]
    fn process_reports_document_metadata() {
        let doc = notes();
        let r = process_blocking(
            &doc,
            &AnalysisOptions::legacy(),
            &AnalysisConfig::default(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert_eq!(r.document.format, DocumentFormat::Text);
        assert_eq!(r.document.bytes, doc.bytes.len());
        assert!(r.report.summary.unwrap().starts_with("Glaciers carve valleys"));

        let v = serde_json::to_value(process_blocking(
            &doc,
            &AnalysisOptions::default(),
            &AnalysisConfig::default(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap())
        .unwrap();
        assert_eq!(v["ok"], true);
        assert_eq!(v["document"]["format"], "text");
        assert!(v["summary_blocks"].is_array());
        assert!(v.get("summary").is_none());
    }

    #[test]
    fn short_documents_are_insufficient() {
        let doc = Document {
            bytes: b"too short".to_vec(),
            content_type: Some("text/plain".into()),
            file_name: None,
        };
        let err = process_blocking(
            &doc,
            &AnalysisOptions::default(),
            &AnalysisConfig::default(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
        assert_eq!(err.code(), "insufficient_content");
    }

    #[tokio::test]
    async fn process_runs_off_the_runtime() {
        let r = process(notes(), AnalysisOptions::default(), AnalysisConfig::default())
            .await
            .unwrap();
        assert!(r.report.mcq.is_some());
    }
}
