use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use studycoach::{router, AppState};
use studycoach_core::AnalysisConfig;
use studycoach_local::{HttpFetcher, MoodleClient};

const LECTURE: &str = "Photosynthesis converts light energy into chemical energy inside plant cells. \
Chlorophyll molecules in the chloroplast absorb light energy for photosynthesis. \
The Calvin cycle uses that chemical energy to build glucose from carbon dioxide. \
Plants release oxygen as a byproduct of photosynthesis during daylight hours. \
Stomata regulate carbon dioxide intake and water loss through the leaf surface. \
Glucose produced by photosynthesis fuels cellular respiration in plant cells.";

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn upstream() -> SocketAddr {
    let app = Router::new()
        .route(
            "/lecture.txt",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], LECTURE) }),
        )
        .route(
            "/short.txt",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "Only a line.") }),
        )
        .route(
            "/photo.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png")], vec![0x89u8, b'P', b'N', b'G', 0, 0]) }),
        )
        .route("/missing.pdf", get(|| async { (StatusCode::NOT_FOUND, "gone") }));
    serve(app).await
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(5), 1_000_000).unwrap()
}

async fn start_app(lms: Option<MoodleClient>) -> SocketAddr {
    let mut state = AppState::new(Arc::new(fetcher()), AnalysisConfig::default())
        .with_limits(5_000, 1_000_000);
    if let Some(m) = lms {
        state = state.with_lms(Arc::new(m));
    }
    serve(router(state)).await
}

async fn post_json(url: String, body: Value) -> (u16, Value) {
    let r = reqwest::Client::new().post(url).json(&body).send().await.unwrap();
    let status = r.status().as_u16();
    (status, r.json().await.unwrap())
}

#[tokio::test]
async fn health_reports_version() {
    let app = start_app(None).await;
    let v: Value = reqwest::get(format!("http://{app}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(v["ok"], true);
    assert!(!v["version"].as_str().unwrap_or("").is_empty());
}

#[tokio::test]
async fn process_pdf_keeps_the_legacy_shape() {
    let up = upstream().await;
    let app = start_app(None).await;
    let (status, v) = post_json(
        format!("http://{app}/process_pdf"),
        json!({"url": format!("http://{up}/lecture.txt")}),
    )
    .await;
    assert_eq!(status, 200, "{v}");
    assert_eq!(v["ok"], true);
    let summary = v["summary"].as_str().unwrap();
    assert!(summary.starts_with("Photosynthesis converts light energy"));
    assert!(summary.contains("Reflection:"));
    assert!(!v["quiz"].as_array().unwrap().is_empty());
    for q in v["quiz"].as_array().unwrap() {
        assert!(q["stem"].as_str().unwrap().contains("____"));
        assert!(q["hint"].is_string());
    }
    assert!(v.get("mcq").is_none());
    assert!(v.get("summary_blocks").is_none());
    assert!(v.get("document").is_none());
}

#[tokio::test]
async fn process_url_defaults_to_blocks_and_both_quizzes() {
    let up = upstream().await;
    let app = start_app(None).await;
    let (status, v) = post_json(
        format!("http://{app}/process_url"),
        json!({"url": format!("http://{up}/lecture.txt")}),
    )
    .await;
    assert_eq!(status, 200, "{v}");
    assert_eq!(v["summary_blocks"][0]["title"], "Key ideas #1");
    assert!(v["quiz"].is_array());
    let mcq = v["mcq"].as_array().unwrap();
    assert!(!mcq.is_empty());
    for q in mcq {
        let i = q["answer_index"].as_u64().unwrap() as usize;
        assert!(i < q["choices"].as_array().unwrap().len());
    }
    assert_eq!(v["document"]["format"], "text");
    assert_eq!(v["document"]["file_name"], "lecture.txt");
}

#[tokio::test]
async fn process_url_honours_options_and_overrides() {
    let up = upstream().await;
    let app = start_app(None).await;
    let (status, v) = post_json(
        format!("http://{app}/process_url"),
        json!({
            "url": format!("http://{up}/lecture.txt"),
            "summary": "flat",
            "mcq": false,
            "cloze_questions": 2
        }),
    )
    .await;
    assert_eq!(status, 200, "{v}");
    assert!(v["summary"].is_string());
    assert!(v.get("mcq").is_none());
    assert_eq!(v["quiz"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn failures_map_to_status_and_code() {
    let up = upstream().await;
    let app = start_app(None).await;
    let cases = [
        (format!("http://{up}/missing.pdf"), 400, "download_failed"),
        (format!("http://{up}/short.txt"), 422, "insufficient_content"),
        (format!("http://{up}/photo.png"), 415, "unsupported_format"),
        ("not a url".to_string(), 400, "download_failed"),
        ("".to_string(), 400, "invalid_input"),
    ];
    for (url, want_status, want_code) in cases {
        let (status, v) =
            post_json(format!("http://{app}/process_pdf"), json!({"url": url})).await;
        assert_eq!(status, want_status, "{url}: {v}");
        assert_eq!(v["ok"], false);
        assert_eq!(v["code"], want_code, "{url}: {v}");
        assert!(v["detail"].is_string());
    }
}

fn multipart_body(boundary: &str, field: &str, file_name: &str, content: &str) -> String {
    format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    )
}

#[tokio::test]
async fn upload_accepts_a_file_field_with_query_options() {
    let app = start_app(None).await;
    let boundary = "studycoach-test-boundary";
    let r = reqwest::Client::new()
        .post(format!("http://{app}/process_upload?summary=flat&mcq=true&mcq_questions=2"))
        .header(
            header::CONTENT_TYPE.as_str(),
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(multipart_body(boundary, "file", "notes.txt", LECTURE))
        .send()
        .await
        .unwrap();
    assert_eq!(r.status().as_u16(), 200);
    let v: Value = r.json().await.unwrap();
    assert!(v["summary"].as_str().unwrap().starts_with("Photosynthesis"));
    assert!(v["mcq"].as_array().unwrap().len() <= 2);
    assert_eq!(v["document"]["file_name"], "notes.txt");
}

#[tokio::test]
async fn upload_without_a_file_field_is_rejected() {
    let app = start_app(None).await;
    let boundary = "b0undary";
    let r = reqwest::Client::new()
        .post(format!("http://{app}/process_upload"))
        .header(
            header::CONTENT_TYPE.as_str(),
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(multipart_body(boundary, "document", "notes.txt", LECTURE))
        .send()
        .await
        .unwrap();
    assert_eq!(r.status().as_u16(), 400);
    let v: Value = r.json().await.unwrap();
    assert_eq!(v["code"], "invalid_input");
}

#[tokio::test]
async fn moodle_routes_require_configuration() {
    let app = start_app(None).await;
    let r = reqwest::get(format!("http://{app}/moodle/courses?token=abc"))
        .await
        .unwrap();
    assert_eq!(r.status().as_u16(), 400);
}

async fn mock_moodle() -> SocketAddr {
    async fn rest(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
        if q.get("wstoken").map(String::as_str) != Some("student-token") {
            return Json(json!({
                "exception": "moodle_exception",
                "errorcode": "invalidtoken",
                "message": "Invalid token"
            }));
        }
        match q.get("wsfunction").map(String::as_str) {
            Some("core_webservice_get_site_info") => Json(json!({"userid": 5})),
            Some("core_enrol_get_users_courses") => {
                Json(json!([{"id": 11, "fullname": "Plant Biology", "shortname": "PB1"}]))
            }
            Some("core_course_get_contents") => Json(json!([
                {"id": 1, "modules": [{"id": 300, "contents": [
                    {"type": "file", "filename": "lecture.txt", "fileurl": "http://placeholder/webservice/pluginfile.php/9/lecture.txt"}
                ]}]}
            ])),
            _ => Json(json!({"exception": "x", "errorcode": "unknownfunction", "message": "?"})),
        }
    }
    async fn file(Query(q): Query<HashMap<String, String>>) -> (StatusCode, [(header::HeaderName, &'static str); 1], &'static str) {
        if q.get("token").map(String::as_str) == Some("student-token") {
            (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain")], LECTURE)
        } else {
            (StatusCode::FORBIDDEN, [(header::CONTENT_TYPE, "text/plain")], "denied")
        }
    }
    let app = Router::new()
        .route("/webservice/rest/server.php", get(rest))
        .route("/webservice/pluginfile.php/9/lecture.txt", get(file));
    serve(app).await
}

#[tokio::test]
async fn moodle_proxy_lists_courses_files_and_processes_a_file() {
    let moodle = mock_moodle().await;
    let client = MoodleClient::new(&format!("http://{moodle}"), fetcher()).unwrap();
    let app = start_app(Some(client)).await;

    let courses: Value = reqwest::get(format!("http://{app}/moodle/courses?token=student-token"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(courses[0]["id"], 11);
    assert_eq!(courses[0]["name"], "Plant Biology");

    let files: Value = reqwest::get(format!(
        "http://{app}/moodle/courses/11/files?token=student-token"
    ))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(files[0]["name"], "lecture.txt");

    let file_url = format!("http://{moodle}/pluginfile.php/9/lecture.txt");
    let raw = reqwest::Client::new()
        .get(format!("http://{app}/moodle/file"))
        .query(&[("token", "student-token"), ("url", file_url.as_str())])
        .send()
        .await
        .unwrap();
    assert_eq!(raw.status().as_u16(), 200);
    assert_eq!(
        raw.headers().get(header::CONTENT_TYPE.as_str()).unwrap(),
        "text/plain"
    );
    assert_eq!(raw.text().await.unwrap(), LECTURE);

    let (status, v) = post_json(
        format!("http://{app}/moodle/process"),
        json!({"token": "student-token", "url": file_url, "mcq": false}),
    )
    .await;
    assert_eq!(status, 200, "{v}");
    assert!(v["summary_blocks"].is_array());
    assert!(v.get("mcq").is_none());
}

#[tokio::test]
async fn moodle_errors_surface_as_bad_gateway() {
    let moodle = mock_moodle().await;
    let client = MoodleClient::new(&format!("http://{moodle}"), fetcher()).unwrap();
    let app = start_app(Some(client)).await;
    let r = reqwest::get(format!("http://{app}/moodle/courses?token=wrong"))
        .await
        .unwrap();
    assert_eq!(r.status().as_u16(), 502);
    let v: Value = r.json().await.unwrap();
    assert_eq!(v["code"], "lms_failed");
}

#[tokio::test]
async fn rejected_moodle_download_detail_omits_the_token() {
    let moodle = mock_moodle().await;
    let client = MoodleClient::new(&format!("http://{moodle}"), fetcher()).unwrap();
    let app = start_app(Some(client)).await;
    let file_url = format!("http://{moodle}/pluginfile.php/9/lecture.txt");
    let (status, v) = post_json(
        format!("http://{app}/moodle/process"),
        json!({"token": "stolen-looking-token", "url": file_url}),
    )
    .await;
    assert_eq!(status, 400, "{v}");
    assert_eq!(v["code"], "download_failed");
    let detail = v["detail"].as_str().unwrap();
    assert!(detail.contains("403"), "{detail}");
    assert!(!detail.contains("stolen-looking-token"), "{detail}");
}
