//! PDF text extraction

use lopdf::Document;

use crate::config::limits::MAX_PDF_PAGES;
use crate::error::ContentError;

/// Extract text from the first pages of a PDF
///
/// Pages that fail to extract are skipped. When the document is longer than
/// the page cap a note naming the total page count is appended.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ContentError> {
    let doc = Document::load_mem(bytes).map_err(|e| ContentError::PdfOpen {
        message: e.to_string(),
    })?;

    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    let total = pages.len();

    let mut chunks = Vec::new();
    for page in pages.iter().take(MAX_PDF_PAGES) {
        match doc.extract_text(&[*page]) {
            Ok(text) if !text.trim().is_empty() => chunks.push(text.trim().to_string()),
            Ok(_) => {}
            Err(e) => tracing::debug!("skipping PDF page {}: {}", page, e),
        }
    }

    if chunks.is_empty() {
        return Err(ContentError::NoTextInPdf);
    }

    let mut text = chunks.join("\n\n");
    if total > MAX_PDF_PAGES {
        text.push_str(&format!(
            "\n\n[Note: PDF has {} pages total, but only the first {} pages were processed]",
            total, MAX_PDF_PAGES
        ));
    }
    Ok(text)
}
