use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod analysis;
pub mod config;
pub mod types;

pub use analysis::assemble::analyze;
pub use config::{AnalysisConfig, AnalysisOverrides};
pub use types::{
    AnalysisOptions, AnalysisReport, ClozeQuestion, McQuestion, SummaryBlock, SummaryStyle,
};

/// Every failure a request can surface. Generators never produce these; only the
/// assembler and the I/O collaborators in front of it do.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to download document: {0}")]
    DownloadFailed(String),
    #[error("unsupported document type: {0}")]
    UnsupportedFormat(String),
    #[error("failed to extract text: {0}")]
    ExtractionFailed(String),
    #[error("too little text extracted ({chars} chars, need at least {min})")]
    InsufficientContent { chars: usize, min: usize },
    #[error("lms request failed: {0}")]
    Lms(String),
    #[error("internal fault: {0}")]
    InternalFault(String),
}

impl Error {
    /// Stable machine-readable code, used by the HTTP layer and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::DownloadFailed(_) => "download_failed",
            Error::UnsupportedFormat(_) => "unsupported_format",
            Error::ExtractionFailed(_) => "extraction_failed",
            Error::InsufficientContent { .. } => "insufficient_content",
            Error::Lms(_) => "lms_failed",
            Error::InternalFault(_) => "internal_fault",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    /// Timeout for the whole download (connect + body).
    pub timeout_ms: Option<u64>,
    /// Hard cap on bytes read from the response body.
    pub max_bytes: Option<u64>,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_ms: None,
            max_bytes: None,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Only absolute http(s) URLs are downloadable.
    pub fn parsed_url(&self) -> Result<url::Url> {
        let u = url::Url::parse(self.url.trim())
            .map_err(|e| Error::DownloadFailed(format!("invalid url {:?}: {e}", self.url)))?;
        match u.scheme() {
            "http" | "https" => Ok(u),
            other => Err(Error::DownloadFailed(format!(
                "unsupported url scheme: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResponse {
    pub url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FetchResponse {
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).to_string()
    }

    /// Last path segment of the final URL, used as a format hint.
    pub fn file_name(&self) -> Option<String> {
        let u = url::Url::parse(&self.final_url).ok()?;
        let last = u.path_segments()?.next_back()?.trim();
        (!last.is_empty()).then(|| last.to_string())
    }
}

#[async_trait::async_trait]
pub trait FetchBackend: Send + Sync {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse>;
}

/// Simplified shape for anything listed out of a learning-management system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LmsItem {
    pub id: u64,
    pub name: String,
    pub url: String,
}

/// Token pass-through access to a remote LMS. The token is opaque and never stored.
#[async_trait::async_trait]
pub trait LmsBackend: Send + Sync {
    async fn courses(&self, token: &str) -> Result<Vec<LmsItem>>;
    async fn course_files(&self, token: &str, course_id: u64) -> Result<Vec<LmsItem>>;
    async fn download(&self, token: &str, file_url: &str) -> Result<FetchResponse>;
}
