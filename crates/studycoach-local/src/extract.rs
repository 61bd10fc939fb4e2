use quick_xml::events::Event;
use serde::Serialize;
use std::io::{Cursor, Read};
use studycoach_core::{Error, Result};

/// Document kinds the extractors understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Pptx,
    Text,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pptx => "pptx",
            DocumentFormat::Text => "text",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    pub format: DocumentFormat,
    pub text: String,
    pub warnings: Vec<&'static str>,
}

/// Best-effort sniff for PDF bytes (magic header).
pub fn bytes_look_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

/// Local file header of a zip archive; DOCX and PPTX are both zip containers.
pub fn bytes_look_like_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04")
}

fn content_type_lc(ct: Option<&str>) -> String {
    ct.unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

fn extension_lc(name: Option<&str>) -> String {
    let name = name.unwrap_or("");
    let name = name.split(['?', '#']).next().unwrap_or(name);
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && !ext.contains('/') => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

fn open_zip(bytes: &[u8]) -> Result<zip::ZipArchive<Cursor<&[u8]>>> {
    zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::ExtractionFailed(format!("unreadable zip container: {e}")))
}

/// Which Office Open XML document a zip archive holds, judged by its main part.
fn ooxml_kind(bytes: &[u8]) -> Option<DocumentFormat> {
    let zip = open_zip(bytes).ok()?;
    let kind = zip.file_names().find_map(|n| {
        if n == "word/document.xml" {
            Some(DocumentFormat::Docx)
        } else if n == "ppt/presentation.xml" || n.starts_with("ppt/slides/") {
            Some(DocumentFormat::Pptx)
        } else {
            None
        }
    });
    kind
}

/// Decide the document format. Magic bytes win; the declared content type and then the
/// file extension are only consulted when the bytes are not recognisable.
pub fn detect(
    bytes: &[u8],
    content_type: Option<&str>,
    file_name: Option<&str>,
) -> Result<DocumentFormat> {
    if bytes_look_like_pdf(bytes) {
        return Ok(DocumentFormat::Pdf);
    }
    if bytes_look_like_zip(bytes) {
        return ooxml_kind(bytes).ok_or_else(|| {
            Error::UnsupportedFormat("zip archive is neither a .docx nor a .pptx document".into())
        });
    }

    let ct = content_type_lc(content_type);
    match ct.as_str() {
        "application/pdf" => return Ok(DocumentFormat::Pdf),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            return Ok(DocumentFormat::Docx)
        }
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
            return Ok(DocumentFormat::Pptx)
        }
        "text/plain" | "text/markdown" => return Ok(DocumentFormat::Text),
        _ => {}
    }

    let ext = extension_lc(file_name);
    match ext.as_str() {
        "pdf" => Ok(DocumentFormat::Pdf),
        "docx" => Ok(DocumentFormat::Docx),
        "pptx" => Ok(DocumentFormat::Pptx),
        "txt" | "md" => Ok(DocumentFormat::Text),
        _ => {
            let what = if !ct.is_empty() && ct != "application/octet-stream" {
                ct
            } else if !ext.is_empty() {
                format!(".{ext}")
            } else {
                "unrecognised bytes".to_string()
            };
            Err(Error::UnsupportedFormat(format!(
                "{what} (expected pdf, docx, pptx or plain text)"
            )))
        }
    }
}

/// Extract text from a PDF (in-memory).
///
/// Scanned PDFs without a text layer yield an empty string; callers decide whether that is enough.
pub fn pdf_to_text(bytes: &[u8]) -> Result<String> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    let out = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));
    match out {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(Error::ExtractionFailed(format!("pdf: {e}"))),
        Err(_) => Err(Error::ExtractionFailed("pdf: parser aborted on malformed input".into())),
    }
}

/// Visible text of one WordprocessingML or DrawingML part.
///
/// Text runs (`t`) are kept verbatim, paragraphs (`p`) end with a newline, and
/// tab / break elements become whitespace.
fn ooxml_part_text(xml: &[u8]) -> Result<String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text = true;
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) => {
                if in_text {
                    let s = t
                        .unescape()
                        .map_err(|e| Error::ExtractionFailed(format!("xml text: {e}")))?;
                    out.push_str(&s);
                }
            }
            Ok(_) => {}
            Err(e) => {
                return Err(Error::ExtractionFailed(format!(
                    "xml error at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
        }
        buf.clear();
    }
    Ok(out)
}

fn read_entry(zip: &mut zip::ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<Vec<u8>> {
    let mut f = zip
        .by_name(name)
        .map_err(|e| Error::ExtractionFailed(format!("missing {name}: {e}")))?;
    let mut out = Vec::new();
    f.read_to_end(&mut out)
        .map_err(|e| Error::ExtractionFailed(format!("reading {name}: {e}")))?;
    Ok(out)
}

pub fn docx_to_text(bytes: &[u8]) -> Result<String> {
    let mut zip = open_zip(bytes)?;
    let xml = read_entry(&mut zip, "word/document.xml")?;
    ooxml_part_text(&xml)
}

/// `ppt/slides/slide12.xml` -> 12
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Slide text in slide order (slide2 before slide10), slides separated by a blank line.
pub fn pptx_to_text(bytes: &[u8]) -> Result<String> {
    let mut zip = open_zip(bytes)?;
    let mut slides: Vec<(u32, String)> = zip
        .file_names()
        .filter_map(|n| slide_number(n).map(|k| (k, n.to_string())))
        .collect();
    slides.sort();

    let mut parts = Vec::with_capacity(slides.len());
    for (_, name) in &slides {
        let xml = read_entry(&mut zip, name)?;
        parts.push(ooxml_part_text(&xml)?);
    }
    Ok(parts.join("\n\n"))
}

pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<ExtractedText> {
    let mut warnings = Vec::new();
    let text = match format {
        DocumentFormat::Pdf => pdf_to_text(bytes)?,
        DocumentFormat::Docx => docx_to_text(bytes)?,
        DocumentFormat::Pptx => {
            let t = pptx_to_text(bytes)?;
            if t.is_empty() {
                warnings.push("pptx_no_slides");
            }
            t
        }
        DocumentFormat::Text => {
            let t = String::from_utf8_lossy(bytes);
            if t.contains('\u{FFFD}') {
                warnings.push("text_lossy_utf8");
            }
            t.into_owned()
        }
    };
    if text.trim().is_empty() {
        warnings.push(match format {
            DocumentFormat::Pdf => "pdf_no_text_layer",
            _ => "empty_text",
        });
    }
    if !warnings.is_empty() {
        tracing::debug!(format = format.as_str(), ?warnings, "extraction warnings");
    }
    Ok(ExtractedText {
        format,
        text,
        warnings,
    })
}

/// Detect the format and extract its text in one step.
pub fn extract_document(
    bytes: &[u8],
    content_type: Option<&str>,
    file_name: Option<&str>,
) -> Result<ExtractedText> {
    let format = detect(bytes, content_type, file_name)?;
    extract_text(bytes, format)
}
