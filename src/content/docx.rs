//! Word (DOCX) text extraction
//!
//! A DOCX file is a ZIP package; the body text lives in `word/document.xml`
//! as WordprocessingML `t` (text run) elements. The package is staged in a
//! uniquely named temporary file that is removed when extraction returns.

use std::io::{Read, Write};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use zip::ZipArchive;

use crate::error::ContentError;

/// Package entry holding the main document body
const DOCUMENT_ENTRY: &str = "word/document.xml";

/// Name prefix of staged packages
const STAGED_PREFIX: &str = "docx_extract_";

/// WordprocessingML main namespace
const WORD_NAMESPACE: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

/// Extract the body text of a DOCX package
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, ContentError> {
    extract_docx_text_in(bytes, &std::env::temp_dir())
}

/// Extract the body text of a DOCX package, staging it in `dir`
pub fn extract_docx_text_in(bytes: &[u8], dir: &Path) -> Result<String, ContentError> {
    let raw = read_document_xml(bytes, dir)?;
    text_from_document_xml(&raw)
}

fn read_document_xml(bytes: &[u8], dir: &Path) -> Result<String, ContentError> {
    let mut staged = tempfile::Builder::new()
        .prefix(STAGED_PREFIX)
        .suffix(".docx")
        .tempfile_in(dir)
        .map_err(ContentError::TempFile)?;
    staged.write_all(bytes).map_err(ContentError::TempFile)?;
    staged.flush().map_err(ContentError::TempFile)?;

    let file = staged.reopen().map_err(ContentError::TempFile)?;
    let mut archive = ZipArchive::new(file).map_err(docx_open)?;
    let mut entry = archive.by_name(DOCUMENT_ENTRY).map_err(docx_open)?;

    let mut raw = Vec::new();
    entry.read_to_end(&mut raw).map_err(docx_open)?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

fn docx_open(e: impl std::fmt::Display) -> ContentError {
    ContentError::DocxOpen {
        message: e.to_string(),
    }
}

/// Reduce raw `document.xml` content to its text runs
///
/// Content that is not XML-shaped, or XML without any text runs, is returned
/// unchanged.
pub fn text_from_document_xml(raw: &str) -> Result<String, ContentError> {
    if raw.trim().is_empty() {
        return Err(ContentError::EmptyDocument { kind: "DOCX" });
    }
    if raw.trim_start().starts_with('<') {
        let stripped = strip_text_runs(raw);
        if !stripped.is_empty() {
            return Ok(stripped);
        }
    }
    Ok(raw.to_string())
}

fn is_text_run(ns: &ResolveResult, local_name: &[u8]) -> bool {
    if local_name != b"t" {
        return false;
    }
    match ns {
        ResolveResult::Bound(Namespace(uri)) => *uri == WORD_NAMESPACE.as_bytes(),
        // Fragments often omit the namespace declaration
        ResolveResult::Unknown(prefix) => prefix.as_slice() == b"w",
        ResolveResult::Unbound => false,
    }
}

fn strip_text_runs(xml: &str) -> String {
    let mut reader = NsReader::from_str(xml);
    let mut runs: Vec<String> = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_resolved_event() {
            Ok((ns, Event::Start(e))) if is_text_run(&ns, e.local_name().as_ref()) => {
                current = Some(String::new());
            }
            Ok((ns, Event::End(e))) if is_text_run(&ns, e.local_name().as_ref()) => {
                if let Some(run) = current.take() {
                    runs.push(run);
                }
            }
            Ok((_, Event::Text(t))) => {
                if let Some(run) = current.as_mut() {
                    match t.unescape() {
                        Ok(text) => run.push_str(&text),
                        Err(_) => run.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Ok((_, Event::CData(c))) => {
                if let Some(run) = current.as_mut() {
                    run.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(
                    "stopping DOCX text scan at byte {}: {}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
        }
    }

    let joined = runs
        .iter()
        .map(|run| run.trim())
        .filter(|run| !run.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}
