use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryBlock {
    pub title: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClozeQuestion {
    /// Source sentence with one term occurrence replaced by the mask.
    pub stem: String,
    pub hint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct McQuestion {
    pub question: String,
    pub choices: Vec<String>,
    pub answer_index: usize,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStyle {
    /// One string: selected sentences plus the reflection footer.
    Flat,
    /// Titled groups of bullets.
    #[default]
    Blocks,
}

/// Which parts of the report a caller wants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub summary: SummaryStyle,
    pub cloze: bool,
    pub mcq: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            summary: SummaryStyle::Blocks,
            cloze: true,
            mcq: true,
        }
    }
}

impl AnalysisOptions {
    /// The `{ok, summary, quiz}` shape served by `/process_pdf`.
    pub fn legacy() -> Self {
        Self {
            summary: SummaryStyle::Flat,
            cloze: true,
            mcq: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisReport {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_blocks: Option<Vec<SummaryBlock>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Vec<ClozeQuestion>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcq: Option<Vec<McQuestion>>,
}
