//! Text extraction: turns an uploaded resume into plain text.
//!
//! Extraction is synchronous and may block on parsing; the ingestor runs it on the
//! blocking pool. The screening core only sees the `TextExtractor` trait.

use thiserror::Error;

use crate::models::document::UploadedFile;

pub mod docx;

/// Extensions advertised to upload clients. Legacy `.doc` is accepted at upload
/// and then fails extraction.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "docx", "doc", "txt", "md"];

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Corrupt document: {0}")]
    Corrupt(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait TextExtractor: Send + Sync {
    fn extract(&self, file: &UploadedFile) -> Result<String, ExtractionError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    Pdf,
    Docx,
    Text,
}

impl DocumentFormat {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" => Some(DocumentFormat::Docx),
            "txt" | "md" | "text" => Some(DocumentFormat::Text),
            _ => None,
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.split(';').next().unwrap_or("").trim();
        match mime {
            "application/pdf" => Some(DocumentFormat::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(DocumentFormat::Docx)
            }
            m if m.starts_with("text/") => Some(DocumentFormat::Text),
            _ => None,
        }
    }
}

/// Default extractor: PDF via `pdf-extract`, DOCX via `zip` + `quick-xml`,
/// plain text as UTF-8.
#[derive(Debug, Default, Clone)]
pub struct FileTextExtractor;

impl FileTextExtractor {
    fn detect(file: &UploadedFile) -> Result<DocumentFormat, ExtractionError> {
        // Extension wins; browsers often send application/octet-stream.
        match file.extension() {
            Some(ext) => DocumentFormat::from_extension(&ext)
                .ok_or(ExtractionError::UnsupportedFormat(format!(".{ext}"))),
            None => DocumentFormat::from_mime(&file.mime_type)
                .ok_or_else(|| ExtractionError::UnsupportedFormat(file.mime_type.clone())),
        }
    }
}

impl TextExtractor for FileTextExtractor {
    fn extract(&self, file: &UploadedFile) -> Result<String, ExtractionError> {
        match Self::detect(file)? {
            DocumentFormat::Pdf => extract_pdf(&file.bytes),
            DocumentFormat::Docx => docx::extract_text(&file.bytes),
            DocumentFormat::Text => decode_text(&file.bytes),
        }
    }
}

/// `pdf-extract` panics on some malformed inputs instead of returning an error.
fn extract_pdf(bytes: &[u8]) -> Result<String, ExtractionError> {
    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes)) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractionError::Corrupt(format!("PDF: {e:?}"))),
        Err(_) => Err(ExtractionError::Corrupt("PDF parser aborted".to_string())),
    }
}

fn decode_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ExtractionError::Corrupt(format!("text is not valid UTF-8: {e}")))
}
