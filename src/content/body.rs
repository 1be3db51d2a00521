//! Email body composition
//!
//! Picks the readable body of a message: the top-level payload first, then
//! the first HTML and plain-text parts below it. HTML wins when both exist.

use crate::content::decode::decode_text;
use crate::content::html::normalize_html;
use crate::content::walker::{find_first_by_kind_pair_in, has_kind};
use crate::gmail::types::Message;

const HTML: &str = "text/html";
const PLAIN: &str = "text/plain";

/// The readable body of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedBody {
    /// HTML body, already converted to Markdown
    Html(String),
    /// Plain text body
    Plain(String),
    /// No usable body
    Empty,
}

impl NormalizedBody {
    /// The display text, empty for [`NormalizedBody::Empty`]
    pub fn into_text(self) -> String {
        match self {
            Self::Html(text) | Self::Plain(text) => text,
            Self::Empty => String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Resolve the body of a message
pub fn resolve_body(message: &Message) -> NormalizedBody {
    let Some(payload) = message.payload.as_ref() else {
        return NormalizedBody::Empty;
    };

    let mut html = None;
    let mut plain = None;

    if let Some(data) = payload.inline_data() {
        match decode_text(data) {
            Ok(text) if text.is_empty() => {}
            Ok(text) if has_kind(payload, HTML) => html = Some(text),
            Ok(text) => plain = Some(text),
            Err(e) => tracing::debug!("message {} has an undecodable payload: {}", message.id, e),
        }
    }

    if html.is_none() || plain.is_none() {
        let (found_html, found_plain) = find_first_by_kind_pair_in(&payload.parts, HTML, PLAIN);
        html = html.or(found_html);
        plain = plain.or(found_plain);
    }

    match (html, plain) {
        (Some(html), _) => NormalizedBody::Html(normalize_html(&html)),
        (None, Some(plain)) => NormalizedBody::Plain(plain),
        (None, None) => NormalizedBody::Empty,
    }
}
