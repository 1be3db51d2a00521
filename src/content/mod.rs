//! Message content processing
//!
//! Decoding of Gmail payloads, traversal of the MIME part tree, body
//! selection and text extraction from attachments.

pub mod body;
pub mod decode;
pub mod docx;
pub mod extract;
pub mod html;
pub mod pdf;
pub mod walker;

pub use body::{resolve_body, NormalizedBody};
pub use decode::{decode, decode_text, encode_url_safe};
pub use extract::{extract_text, is_extractable, DocumentFormat};
pub use html::normalize_html;
pub use walker::{
    collect_attachments, find_first_by_kind, find_first_by_kind_pair,
    find_part_by_attachment_reference, walk, AttachmentDescriptor, Visit,
};
