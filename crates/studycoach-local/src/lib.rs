//! Local implementations of the studycoach I/O collaborators: an HTTP downloader,
//! format sniffing plus text extractors, and a Moodle web-service client.

pub mod extract;
pub mod fetch;
pub mod moodle;

pub use extract::{detect, extract_document, extract_text, DocumentFormat, ExtractedText};
pub use fetch::HttpFetcher;
pub use moodle::MoodleClient;
