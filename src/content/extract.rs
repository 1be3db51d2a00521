//! Document text extraction dispatch
//!
//! Attachments are routed to an extractor by declared kind first and by
//! filename suffix second. Kinds are compared case-insensitively with
//! parameters such as `; charset=` ignored.

use crate::content::walker::essence;
use crate::content::{docx, pdf};
use crate::error::ContentError;

/// Declared kind of PDF documents
pub const PDF_MIME: &str = "application/pdf";

/// Declared kind of Word (OOXML) documents
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Declared kind of plain text
pub const TEXT_MIME: &str = "text/plain";

/// Document formats with a text extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    /// Pick a format from the declared kind, then from the filename suffix
    pub fn detect(declared_kind: &str, filename: &str) -> Option<Self> {
        Self::from_kind(declared_kind).or_else(|| Self::from_filename(filename))
    }

    fn from_kind(kind: &str) -> Option<Self> {
        let kind = essence(kind);
        if kind.eq_ignore_ascii_case(PDF_MIME) {
            Some(Self::Pdf)
        } else if kind.eq_ignore_ascii_case(DOCX_MIME) {
            Some(Self::Docx)
        } else if kind.eq_ignore_ascii_case(TEXT_MIME) {
            Some(Self::PlainText)
        } else {
            None
        }
    }

    fn from_filename(filename: &str) -> Option<Self> {
        let name = filename.to_ascii_lowercase();
        if name.ends_with(".pdf") {
            Some(Self::Pdf)
        } else if name.ends_with(".docx") {
            Some(Self::Docx)
        } else if name.ends_with(".txt") {
            Some(Self::PlainText)
        } else {
            None
        }
    }
}

/// Whether [`extract_text`] would attempt this attachment
pub fn is_extractable(declared_kind: &str, filename: &str) -> bool {
    DocumentFormat::detect(declared_kind, filename).is_some()
}

/// Extract readable text from an attachment's raw bytes
pub fn extract_text(
    bytes: &[u8],
    declared_kind: &str,
    filename: &str,
) -> Result<String, ContentError> {
    match DocumentFormat::detect(declared_kind, filename) {
        Some(DocumentFormat::Pdf) => pdf::extract_pdf_text(bytes),
        Some(DocumentFormat::Docx) => docx::extract_docx_text(bytes),
        Some(DocumentFormat::PlainText) => extract_plain_text(bytes),
        None => Err(ContentError::UnsupportedFileType {
            mime_type: declared_kind.to_string(),
        }),
    }
}

/// Plain text attachments, decoded lossily
pub fn extract_plain_text(bytes: &[u8]) -> Result<String, ContentError> {
    if bytes.is_empty() {
        return Err(ContentError::EmptyDocument { kind: "text file" });
    }
    Ok(String::from_utf8_lossy(bytes).into_owned())
}
