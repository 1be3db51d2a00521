//! HTML-to-text normalization
//!
//! Email HTML is converted to Markdown so links, lists and emphasis survive in
//! a form an agent can read. Conversion never fails outward: if the converter
//! errors or produces nothing for non-blank input, the original HTML is kept.

use htmd::HtmlToMarkdown;

/// Tags whose content never belongs in a readable body
const SKIPPED_TAGS: [&str; 3] = ["script", "style", "head"];

/// Convert an HTML body to Markdown, keeping the input on conversion failure
pub fn normalize_html(html: &str) -> String {
    let converter = HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .build();
    normalize_html_with(html, |input| converter.convert(input))
}

/// Same as [`normalize_html`], with the conversion step supplied by the caller
pub fn normalize_html_with<F>(html: &str, convert: F) -> String
where
    F: FnOnce(&str) -> std::io::Result<String>,
{
    match convert(html) {
        Ok(markdown) => {
            let markdown = markdown.trim();
            if markdown.is_empty() && !html.trim().is_empty() {
                tracing::debug!("HTML conversion produced no text, keeping original");
                html.to_string()
            } else {
                markdown.to_string()
            }
        }
        Err(e) => {
            tracing::debug!("HTML conversion failed, keeping original: {}", e);
            html.to_string()
        }
    }
}
