//! Moodle web-service client (REST protocol, JSON format).
//!
//! The student's token is passed through on every call and never stored.

use crate::fetch::HttpFetcher;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use studycoach_core::{
    Error, FetchBackend, FetchRequest, FetchResponse, LmsBackend, LmsItem, Result,
};

#[derive(Debug, Deserialize)]
struct SiteInfo {
    userid: u64,
}

#[derive(Debug, Deserialize)]
struct Course {
    id: u64,
    fullname: String,
}

#[derive(Debug, Deserialize)]
struct Section {
    #[serde(default)]
    modules: Vec<CourseModule>,
}

#[derive(Debug, Deserialize)]
struct CourseModule {
    id: u64,
    #[serde(default)]
    contents: Vec<ModuleContent>,
}

#[derive(Debug, Deserialize)]
struct ModuleContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    filename: String,
    fileurl: Option<String>,
}

/// `{"exception": ..., "errorcode": ..., "message": ...}` is how Moodle reports failures,
/// usually with HTTP 200.
#[derive(Debug, Default, Deserialize)]
struct WsException {
    #[serde(default)]
    errorcode: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Clone)]
pub struct MoodleClient {
    base_url: url::Url,
    fetcher: HttpFetcher,
    max_download_bytes: Option<u64>,
}

impl MoodleClient {
    pub fn new(base_url: &str, fetcher: HttpFetcher) -> Result<Self> {
        let mut base_url = url::Url::parse(base_url.trim())
            .map_err(|e| Error::InvalidInput(format!("moodle url {base_url:?}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::InvalidInput(format!(
                "moodle url must be http(s), got {}",
                base_url.scheme()
            )));
        }
        // Moodle may live under a sub-path; joins below must keep it.
        if !base_url.path().ends_with('/') {
            let p = format!("{}/", base_url.path());
            base_url.set_path(&p);
        }
        Ok(Self {
            base_url,
            fetcher,
            max_download_bytes: None,
        })
    }

    pub fn with_max_download_bytes(mut self, max: u64) -> Self {
        self.max_download_bytes = Some(max);
        self
    }

    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<url::Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::InternalFault(format!("moodle url join: {e}")))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        token: &str,
        function: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        if token.trim().is_empty() {
            return Err(Error::InvalidInput("missing moodle token".into()));
        }
        let endpoint = self.url("webservice/rest/server.php")?;
        let resp = self
            .fetcher
            .client()
            .get(endpoint)
            .timeout(self.fetcher.default_timeout())
            .query(&[
                ("wstoken", token),
                ("wsfunction", function),
                ("moodlewsrestformat", "json"),
            ])
            .query(params)
            .send()
            .await
            .map_err(|e| Error::Lms(format!("{function}: {}", e.without_url())))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Lms(format!("{function}: HTTP {}", status.as_u16())));
        }
        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::Lms(format!("{function}: invalid json: {}", e.without_url())))?;

        if value.get("exception").is_some() {
            let ex: WsException = serde_json::from_value(value).unwrap_or_default();
            tracing::debug!(function, errorcode = %ex.errorcode, "moodle exception");
            return Err(Error::Lms(format!(
                "{function}: {} ({})",
                ex.message, ex.errorcode
            )));
        }
        serde_json::from_value(value)
            .map_err(|e| Error::Lms(format!("{function}: unexpected response shape: {e}")))
    }

    /// Rewrite a Moodle file URL so the token authenticates the download.
    ///
    /// Only URLs on the configured Moodle host are accepted, so the token is never sent elsewhere.
    pub fn authorized_file_url(&self, token: &str, file_url: &str) -> Result<url::Url> {
        let mut u = url::Url::parse(file_url.trim())
            .map_err(|e| Error::InvalidInput(format!("file url {file_url:?}: {e}")))?;
        if u.scheme() != self.base_url.scheme()
            || u.host_str() != self.base_url.host_str()
            || u.port_or_known_default() != self.base_url.port_or_known_default()
        {
            return Err(Error::InvalidInput(
                "file url is not on the configured moodle site".into(),
            ));
        }
        // Browser-style pluginfile links need the webservice variant for token auth.
        let path = u.path().to_string();
        if !path.contains("/webservice/pluginfile.php") {
            if let Some(rest) = path.split_once("/pluginfile.php") {
                let p = format!("{}/webservice/pluginfile.php{}", rest.0, rest.1);
                u.set_path(&p);
            }
        }
        let kept: Vec<(String, String)> = u
            .query_pairs()
            .filter(|(k, _)| k != "token")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        u.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair("token", token);
        Ok(u)
    }
}

#[async_trait::async_trait]
impl LmsBackend for MoodleClient {
    async fn courses(&self, token: &str) -> Result<Vec<LmsItem>> {
        let site: SiteInfo = self
            .call(token, "core_webservice_get_site_info", &[])
            .await?;
        let courses: Vec<Course> = self
            .call(
                token,
                "core_enrol_get_users_courses",
                &[("userid", site.userid.to_string())],
            )
            .await?;
        let mut out = Vec::with_capacity(courses.len());
        for c in courses {
            let mut url = self.url("course/view.php")?;
            url.query_pairs_mut().append_pair("id", &c.id.to_string());
            out.push(LmsItem {
                id: c.id,
                name: c.fullname,
                url: url.to_string(),
            });
        }
        Ok(out)
    }

    async fn course_files(&self, token: &str, course_id: u64) -> Result<Vec<LmsItem>> {
        let sections: Vec<Section> = self
            .call(
                token,
                "core_course_get_contents",
                &[("courseid", course_id.to_string())],
            )
            .await?;
        Ok(sections
            .into_iter()
            .flat_map(|s| s.modules)
            .flat_map(|m| {
                let id = m.id;
                m.contents.into_iter().filter_map(move |c| {
                    let url = c.fileurl.filter(|_| c.kind == "file")?;
                    Some(LmsItem {
                        id,
                        name: c.filename,
                        url,
                    })
                })
            })
            .collect())
    }

    async fn download(&self, token: &str, file_url: &str) -> Result<FetchResponse> {
        let url = self.authorized_file_url(token, file_url)?;
        let mut req = FetchRequest::new(url.as_str());
        req.max_bytes = self.max_download_bytes;
        let mut resp = self.fetcher.fetch(&req).await?;
        // Keep the token out of anything that is echoed or logged later.
        resp.url = file_url.to_string();
        if let Ok(mut fu) = url::Url::parse(&resp.final_url) {
            let kept: Vec<(String, String)> = fu
                .query_pairs()
                .filter(|(k, _)| k != "token")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            fu.set_query(None);
            if !kept.is_empty() {
                fu.query_pairs_mut().extend_pairs(kept);
            }
            resp.final_url = fu.to_string();
        }
        Ok(resp)
    }
}
