//! studycoach HTTP service: download or receive a lecture document, extract its text,
//! and return a summary plus practice questions.

pub mod error;
pub mod pipeline;
pub mod routes;

pub use error::ApiError;
pub use pipeline::{Document, DocumentMeta, ProcessOptions, ProcessResponse};
pub use routes::{router, AppState};
