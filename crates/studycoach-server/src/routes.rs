use crate::error::ApiError;
use crate::pipeline::{self, Document, ProcessOptions, ProcessResponse};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use studycoach_core::{
    AnalysisConfig, AnalysisOptions, AnalysisReport, Error, FetchBackend, FetchRequest,
    LmsBackend, LmsItem,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared, read-only per-process state. Nothing here changes after startup.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<dyn FetchBackend>,
    pub lms: Option<Arc<dyn LmsBackend>>,
    pub analysis: Arc<AnalysisConfig>,
    pub fetch_timeout_ms: u64,
    pub max_download_bytes: u64,
}

impl AppState {
    pub fn new(fetcher: Arc<dyn FetchBackend>, analysis: AnalysisConfig) -> Self {
        Self {
            fetcher,
            lms: None,
            analysis: Arc::new(analysis),
            fetch_timeout_ms: 20_000,
            max_download_bytes: 50 * 1024 * 1024,
        }
    }

    pub fn with_lms(mut self, lms: Arc<dyn LmsBackend>) -> Self {
        self.lms = Some(lms);
        self
    }

    pub fn with_limits(mut self, fetch_timeout_ms: u64, max_download_bytes: u64) -> Self {
        self.fetch_timeout_ms = fetch_timeout_ms;
        self.max_download_bytes = max_download_bytes;
        self
    }

    fn lms(&self) -> Result<&Arc<dyn LmsBackend>, ApiError> {
        self.lms.as_ref().ok_or_else(|| {
            ApiError(Error::InvalidInput(
                "moodle is not configured on this server (set STUDYCOACH_MOODLE_URL)".into(),
            ))
        })
    }

    async fn download(&self, url: &str) -> Result<Document, ApiError> {
        if url.trim().is_empty() {
            return Err(Error::InvalidInput("missing url".into()).into());
        }
        let mut req = FetchRequest::new(url);
        req.timeout_ms = Some(self.fetch_timeout_ms);
        req.max_bytes = Some(self.max_download_bytes);
        let resp = self.fetcher.fetch(&req).await?;
        Ok(Document::from_fetch(resp))
    }
}

pub fn router(state: AppState) -> Router {
    // Uploads are bounded by the same cap as downloads.
    let body_limit = usize::try_from(state.max_download_bytes).unwrap_or(usize::MAX);
    Router::new()
        .route("/health", get(health))
        .route("/process_pdf", post(process_pdf))
        .route("/process_url", post(process_url))
        .route("/process_upload", post(process_upload))
        .route("/moodle/courses", get(moodle_courses))
        .route("/moodle/courses/:id/files", get(moodle_course_files))
        .route("/moodle/file", get(moodle_file))
        .route("/moodle/process", post(moodle_process))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "name": "studycoach",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
struct PdfRequest {
    url: String,
}

/// The original mobile-client contract: flat summary plus cloze quiz, nothing else.
async fn process_pdf(
    State(st): State<AppState>,
    Json(req): Json<PdfRequest>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let doc = st.download(&req.url).await?;
    let cfg = AnalysisConfig::clone(&st.analysis);
    let out = pipeline::process(doc, AnalysisOptions::legacy(), cfg).await?;
    Ok(Json(out.report))
}

#[derive(Debug, Deserialize)]
struct UrlRequest {
    url: String,
    #[serde(flatten)]
    options: ProcessOptions,
}

async fn process_url(
    State(st): State<AppState>,
    Json(req): Json<UrlRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let doc = st.download(&req.url).await?;
    run(&st, doc, &req.options).await
}

async fn process_upload(
    State(st): State<AppState>,
    Query(options): Query<ProcessOptions>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("multipart: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidInput(format!("multipart: {e}")))?;
        if bytes.is_empty() {
            return Err(Error::InvalidInput("uploaded file is empty".into()).into());
        }
        let doc = Document {
            bytes: bytes.to_vec(),
            content_type,
            file_name,
        };
        return run(&st, doc, &options).await;
    }
    Err(Error::InvalidInput("multipart field \"file\" is required".into()).into())
}

async fn run(
    st: &AppState,
    doc: Document,
    options: &ProcessOptions,
) -> Result<Json<ProcessResponse>, ApiError> {
    let (opts, cfg) = options.resolve(&st.analysis);
    Ok(Json(pipeline::process(doc, opts, cfg).await?))
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: String,
}

async fn moodle_courses(
    State(st): State<AppState>,
    Query(q): Query<TokenQuery>,
) -> Result<Json<Vec<LmsItem>>, ApiError> {
    Ok(Json(st.lms()?.courses(&q.token).await?))
}

async fn moodle_course_files(
    State(st): State<AppState>,
    Path(course_id): Path<u64>,
    Query(q): Query<TokenQuery>,
) -> Result<Json<Vec<LmsItem>>, ApiError> {
    Ok(Json(st.lms()?.course_files(&q.token, course_id).await?))
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    token: String,
    url: String,
}

/// Raw pass-through of one course file, with the upstream content type.
async fn moodle_file(
    State(st): State<AppState>,
    Query(q): Query<FileQuery>,
) -> Result<Response, ApiError> {
    let resp = st.lms()?.download(&q.token, &q.url).await?;
    let mut headers = HeaderMap::new();
    let ct = resp
        .content_type
        .as_deref()
        .and_then(|c| HeaderValue::from_str(c).ok())
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, ct);
    if let Some(name) = resp.file_name() {
        if let Ok(v) = HeaderValue::from_str(&format!("attachment; filename=\"{name}\"")) {
            headers.insert(header::CONTENT_DISPOSITION, v);
        }
    }
    Ok((headers, resp.bytes).into_response())
}

#[derive(Debug, Deserialize)]
struct MoodleProcessRequest {
    token: String,
    url: String,
    #[serde(flatten)]
    options: ProcessOptions,
}

async fn moodle_process(
    State(st): State<AppState>,
    Json(req): Json<MoodleProcessRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let resp = st.lms()?.download(&req.token, &req.url).await?;
    run(&st, Document::from_fetch(resp), &req.options).await
}
