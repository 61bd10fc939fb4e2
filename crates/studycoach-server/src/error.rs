use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use studycoach_core::Error;

/// HTTP face of the core error: a status code plus `{"ok": false, "code", "detail"}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

pub fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::InvalidInput(_) | Error::DownloadFailed(_) => StatusCode::BAD_REQUEST,
        Error::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        Error::ExtractionFailed(_) | Error::InsufficientContent { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        Error::Lms(_) => StatusCode::BAD_GATEWAY,
        Error::InternalFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(code = self.0.code(), error = %self.0, "request failed");
        } else {
            tracing::info!(code = self.0.code(), error = %self.0, "request rejected");
        }
        let body = json!({
            "ok": false,
            "code": self.0.code(),
            "detail": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
