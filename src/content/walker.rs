//! Message part tree traversal
//!
//! Every lookup over a message's MIME tree goes through [`walk`], a
//! depth-first pre-order traversal in document order. The lookups differ only
//! in the visitor they pass.

use serde::{Deserialize, Serialize};

use crate::content::decode::decode_text;
use crate::content::extract::is_extractable;
use crate::gmail::types::MessagePart;

/// Filename reported for attachments that carry none
pub const UNNAMED_ATTACHMENT: &str = "unnamed_attachment";

/// Kind reported for attachments that declare none
pub const GENERIC_KIND: &str = "application/octet-stream";

/// Visitor verdict for a single part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Keep going, descending into this part's children
    Continue,
    /// End the whole traversal
    Stop,
}

/// Summary of one attachment-bearing part
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDescriptor {
    pub attachment_id: String,
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub extractable: bool,
}

impl AttachmentDescriptor {
    fn from_part(part: &MessagePart, attachment_id: &str) -> Self {
        let filename = part.filename().unwrap_or(UNNAMED_ATTACHMENT).to_string();
        let mime_type = part.mime_type().unwrap_or(GENERIC_KIND).to_string();
        let extractable = is_extractable(&mime_type, &filename);

        Self {
            attachment_id: attachment_id.to_string(),
            filename,
            mime_type,
            size: part.size(),
            extractable,
        }
    }
}

/// Walk `root` and its descendants depth-first in document order
pub fn walk<'a, F>(root: &'a MessagePart, mut visitor: F) -> Visit
where
    F: FnMut(&'a MessagePart) -> Visit,
{
    walk_inner(root, &mut visitor)
}

/// Walk each tree of `parts` in order, as if they were siblings under one root
pub fn walk_all<'a, F>(parts: &'a [MessagePart], mut visitor: F) -> Visit
where
    F: FnMut(&'a MessagePart) -> Visit,
{
    for part in parts {
        if walk_inner(part, &mut visitor) == Visit::Stop {
            return Visit::Stop;
        }
    }
    Visit::Continue
}

fn walk_inner<'a, F>(part: &'a MessagePart, visitor: &mut F) -> Visit
where
    F: FnMut(&'a MessagePart) -> Visit,
{
    if visitor(part) == Visit::Stop {
        return Visit::Stop;
    }
    for child in &part.parts {
        if walk_inner(child, visitor) == Visit::Stop {
            return Visit::Stop;
        }
    }
    Visit::Continue
}

/// Whether a part declares `kind`, ignoring case and parameters such as charset
pub fn has_kind(part: &MessagePart, kind: &str) -> bool {
    part.mime_type()
        .map(|m| essence(m).eq_ignore_ascii_case(kind))
        .unwrap_or(false)
}

/// MIME type without parameters
pub fn essence(mime_type: &str) -> &str {
    mime_type.split(';').next().unwrap_or("").trim()
}

/// Decoded inline text of a part, if it has a non-empty payload that decodes
fn inline_text(part: &MessagePart) -> Option<String> {
    let data = part.inline_data()?;
    match decode_text(data) {
        Ok(text) if !text.is_empty() => Some(text),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("skipping undecodable {:?} part: {}", part.mime_type(), e);
            None
        }
    }
}

/// First part (root included) of `kind` whose inline payload decodes
pub fn find_first_by_kind(root: &MessagePart, kind: &str) -> Option<String> {
    let mut found = None;
    walk(root, |part| {
        if has_kind(part, kind) {
            if let Some(text) = inline_text(part) {
                found = Some(text);
                return Visit::Stop;
            }
        }
        Visit::Continue
    });
    found
}

/// First decodable content of each of two kinds, in a single traversal of `root`
pub fn find_first_by_kind_pair(
    root: &MessagePart,
    preferred: &str,
    fallback: &str,
) -> (Option<String>, Option<String>) {
    find_first_by_kind_pair_in(std::slice::from_ref(root), preferred, fallback)
}

/// Like [`find_first_by_kind_pair`], over a sequence of sibling trees
///
/// A slot, once filled, is never overwritten. The traversal ends as soon as
/// both slots are filled.
pub fn find_first_by_kind_pair_in(
    parts: &[MessagePart],
    preferred: &str,
    fallback: &str,
) -> (Option<String>, Option<String>) {
    let mut first = None;
    let mut second = None;

    walk_all(parts, |part| {
        if first.is_none() && has_kind(part, preferred) {
            first = inline_text(part);
        } else if second.is_none() && has_kind(part, fallback) {
            second = inline_text(part);
        }

        if first.is_some() && second.is_some() {
            Visit::Stop
        } else {
            Visit::Continue
        }
    });

    (first, second)
}

/// Every part carrying an attachment reference, in document order
pub fn collect_attachments(root: &MessagePart) -> Vec<AttachmentDescriptor> {
    let mut attachments = Vec::new();
    walk(root, |part| {
        if let Some(id) = part.attachment_id() {
            attachments.push(AttachmentDescriptor::from_part(part, id));
        }
        Visit::Continue
    });
    attachments
}

/// First part whose attachment reference equals `attachment_id`
pub fn find_part_by_attachment_reference<'a>(
    root: &'a MessagePart,
    attachment_id: &str,
) -> Option<&'a MessagePart> {
    let mut found = None;
    walk(root, |part| {
        if part.attachment_id() == Some(attachment_id) {
            found = Some(part);
            Visit::Stop
        } else {
            Visit::Continue
        }
    });
    found
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn sample_tree() -> MessagePart {
        container(
            "multipart/mixed",
            vec![
                container(
                    "multipart/alternative",
                    vec![leaf("text/plain", "plain one"), leaf("text/html", "<p>html one</p>")],
                ),
                attachment("application/pdf", "report.pdf", "att-1", 2048),
                container(
                    "multipart/mixed",
                    vec![
                        leaf("text/plain", "plain two"),
                        attachment("application/octet-stream", "", "att-2", 10),
                    ],
                ),
                attachment("image/png", "logo.png", "att-3", 99),
            ],
        )
    }

    #[test]
    fn test_walk_visits_in_document_order() {
        let tree = sample_tree();
        let mut kinds = Vec::new();
        walk(&tree, |part| {
            kinds.push(part.mime_type().unwrap_or("").to_string());
            Visit::Continue
        });
        assert_eq!(
            kinds,
            vec![
                "multipart/mixed",
                "multipart/alternative",
                "text/plain",
                "text/html",
                "application/pdf",
                "multipart/mixed",
                "text/plain",
                "application/octet-stream",
                "image/png",
            ]
        );
    }

    #[test]
    fn test_walk_stop_ends_traversal() {
        let tree = sample_tree();
        let mut visited = 0;
        let verdict = walk(&tree, |part| {
            visited += 1;
            if has_kind(part, "text/html") {
                Visit::Stop
            } else {
                Visit::Continue
            }
        });
        assert_eq!(verdict, Visit::Stop);
        assert_eq!(visited, 4);
    }

    #[test]
    fn test_find_first_by_kind_includes_root() {
        let root = leaf("text/plain", "only root");
        assert_eq!(find_first_by_kind(&root, "text/plain").as_deref(), Some("only root"));
    }

    #[test]
    fn test_find_first_by_kind_skips_undecodable() {
        let mut broken = leaf("text/plain", "x");
        broken.body.as_mut().unwrap().data = Some("!!!".to_string());
        let tree = container("multipart/mixed", vec![broken, leaf("text/plain", "good")]);
        assert_eq!(find_first_by_kind(&tree, "text/plain").as_deref(), Some("good"));
    }

    #[test]
    fn test_kind_match_ignores_case_and_params() {
        let part = leaf("Text/HTML; charset=UTF-8", "<b>x</b>");
        assert!(has_kind(&part, "text/html"));
    }

    #[test]
    fn test_pair_keeps_first_occurrence() {
        let tree = sample_tree();
        let (plain, html) = find_first_by_kind_pair(&tree, "text/plain", "text/html");
        assert_eq!(plain.as_deref(), Some("plain one"));
        assert_eq!(html.as_deref(), Some("<p>html one</p>"));
    }

    #[test]
    fn test_pair_does_not_overwrite_with_deeper_match() {
        let tree = container(
            "multipart/mixed",
            vec![
                leaf("text/plain", "shallow"),
                container("multipart/mixed", vec![leaf("text/plain", "deep")]),
            ],
        );
        let (plain, html) = find_first_by_kind_pair(&tree, "text/plain", "text/html");
        assert_eq!(plain.as_deref(), Some("shallow"));
        assert!(html.is_none());
    }

    #[test]
    fn test_pair_visits_children_of_non_matching_parts() {
        let tree = container(
            "multipart/related",
            vec![container(
                "multipart/alternative",
                vec![container("multipart/alternative", vec![leaf("text/html", "<i>deep</i>")])],
            )],
        );
        let (plain, html) = find_first_by_kind_pair(&tree, "text/plain", "text/html");
        assert!(plain.is_none());
        assert_eq!(html.as_deref(), Some("<i>deep</i>"));
    }

    #[test]
    fn test_collect_attachments_order_and_defaults() {
        let tree = sample_tree();
        let attachments = collect_attachments(&tree);
        let ids: Vec<_> = attachments.iter().map(|a| a.attachment_id.as_str()).collect();
        assert_eq!(ids, vec!["att-1", "att-2", "att-3"]);

        assert_eq!(attachments[0].filename, "report.pdf");
        assert!(attachments[0].extractable);
        assert_eq!(attachments[0].size, 2048);

        assert_eq!(attachments[1].filename, UNNAMED_ATTACHMENT);
        assert!(!attachments[1].extractable);

        assert_eq!(attachments[2].mime_type, "image/png");
        assert!(!attachments[2].extractable);
    }

    #[test]
    fn test_collect_attachments_is_deterministic() {
        let tree = sample_tree();
        assert_eq!(collect_attachments(&tree), collect_attachments(&tree));
    }

    #[test]
    fn test_collect_attachments_ignores_kind() {
        let tree = container("multipart/mixed", vec![attachment("text/plain", "notes.txt", "a", 1)]);
        assert_eq!(collect_attachments(&tree).len(), 1);
    }

    #[test]
    fn test_empty_leaf_is_noop() {
        let tree = MessagePart::default();
        assert!(collect_attachments(&tree).is_empty());
        assert!(find_first_by_kind(&tree, "text/plain").is_none());
        assert_eq!(find_first_by_kind_pair(&tree, "text/plain", "text/html"), (None, None));
    }

    #[test]
    fn test_find_part_by_attachment_reference() {
        let tree = sample_tree();
        let part = find_part_by_attachment_reference(&tree, "att-2").unwrap();
        assert_eq!(part.mime_type(), Some("application/octet-stream"));
        assert!(find_part_by_attachment_reference(&tree, "missing").is_none());
    }

    #[test]
    fn test_descriptor_serialization_omits_false_extractable() {
        let tree = sample_tree();
        let attachments = collect_attachments(&tree);
        let pdf = serde_json::to_value(&attachments[0]).unwrap();
        assert_eq!(pdf["attachmentId"], "att-1");
        assert_eq!(pdf["extractable"], true);
        let png = serde_json::to_value(&attachments[2]).unwrap();
        assert!(png.get("extractable").is_none());
    }
}
