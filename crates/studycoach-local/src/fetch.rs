use std::time::{Duration, Instant};
use studycoach_core::{Error, FetchBackend, FetchRequest, FetchResponse, Result};

/// reqwest-backed document downloader.
///
/// Requests that leave `timeout_ms` / `max_bytes` unset use the defaults given to [`HttpFetcher::new`].
/// A body larger than the byte cap is an error, never a silent truncation: a cut-off PDF
/// or zip archive is unreadable anyway.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    default_timeout: Duration,
    default_max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(default_timeout: Duration, default_max_bytes: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("studycoach/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::InternalFault(format!("http client: {e}")))?;
        Ok(Self {
            client,
            default_timeout,
            default_max_bytes,
        })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}

/// `scheme://host/path` only. Query strings can carry credentials (Moodle appends
/// `token=`), so they never reach error messages or logs.
pub fn redacted_url(url: &url::Url) -> String {
    let mut u = url.clone();
    u.set_query(None);
    u.set_fragment(None);
    let _ = u.set_password(None);
    let _ = u.set_username("");
    u.to_string()
}

#[async_trait::async_trait]
impl FetchBackend for HttpFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        let t0 = Instant::now();
        let url = req.parsed_url()?;
        let max_bytes = req.max_bytes.unwrap_or(self.default_max_bytes);

        let shown = redacted_url(&url);
        let resp = self
            .client
            .get(url.clone())
            .timeout(req.timeout().unwrap_or(self.default_timeout))
            .send()
            .await
            .map_err(|e| Error::DownloadFailed(format!("{shown}: {}", e.without_url())))?;

        let final_url = resp.url().to_string();
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::DownloadFailed(format!(
                "HTTP {} from {}",
                status.as_u16(),
                redacted_url(resp.url())
            )));
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        if let Some(len) = resp.content_length() {
            if len > max_bytes {
                return Err(Error::DownloadFailed(format!(
                    "document is {len} bytes, limit is {max_bytes}"
                )));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = resp.bytes_stream();
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk
                .map_err(|e| Error::DownloadFailed(format!("{shown}: {}", e.without_url())))?;
            if (bytes.len() as u64).saturating_add(chunk.len() as u64) > max_bytes {
                return Err(Error::DownloadFailed(format!(
                    "document exceeds the {max_bytes} byte limit"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        tracing::debug!(
            url = %shown,
            status = status.as_u16(),
            bytes = bytes.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "downloaded document"
        );
        Ok(FetchResponse {
            url: req.url.clone(),
            final_url,
            status: status.as_u16(),
            content_type,
            bytes,
        })
    }
}
