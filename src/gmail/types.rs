//! Gmail API type definitions
//!
//! These types mirror the Gmail API responses and are used for serialization/deserialization.

use serde::{Deserialize, Serialize};

/// A Gmail message part (MIME part)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    /// Part ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,

    /// MIME type of this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Filename for attachments (Gmail sends an empty string otherwise)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Headers for this part
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,

    /// Body of this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<MessagePartBody>,

    /// Nested parts (for multipart messages)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

impl MessagePart {
    /// Declared content type, if any
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref().filter(|m| !m.is_empty())
    }

    /// Attachment filename, treating Gmail's empty string as absent
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref().filter(|f| !f.is_empty())
    }

    /// Inline encoded payload
    pub fn inline_data(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
    }

    /// Out-of-band attachment reference
    pub fn attachment_id(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.attachment_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Declared payload size in bytes
    pub fn size(&self) -> i64 {
        self.body.as_ref().map(|b| b.size).unwrap_or(0)
    }

    /// Find header value by name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }
}

/// Header in a message part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Header {
    /// Header name
    pub name: String,

    /// Header value
    pub value: String,
}

/// Body of a message part
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessagePartBody {
    /// Attachment ID (if this is an attachment)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,

    /// Size in bytes
    #[serde(default)]
    pub size: i64,

    /// Base64url-encoded data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A Gmail message
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message ID
    #[serde(default)]
    pub id: String,

    /// Thread ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Label IDs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,

    /// Snippet (preview text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    /// Message payload (MIME structure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,

    /// Size estimate in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_estimate: Option<i64>,

    /// Internal date (epoch millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_date: Option<String>,
}

impl Message {
    /// Top-level header value by name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.payload.as_ref().and_then(|p| p.header(name))
    }
}

/// List of messages response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    /// Messages in this page
    #[serde(default)]
    pub messages: Vec<MessageRef>,

    /// Next page token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,

    /// Result size estimate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_size_estimate: Option<u32>,
}

/// Reference to a message (id and thread_id only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    /// Message ID
    pub id: String,

    /// Thread ID
    #[serde(default)]
    pub thread_id: String,
}

/// A Gmail thread with its messages
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    /// Thread ID
    pub id: String,

    /// Snippet of the latest message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,

    /// Messages in chronological order
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// List of threads response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ThreadList {
    /// Threads in this page
    #[serde(default)]
    pub threads: Vec<ThreadRef>,

    /// Next page token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Reference to a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRef {
    /// Thread ID
    pub id: String,

    /// Snippet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Gmail draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    /// Draft ID
    pub id: String,

    /// The message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

/// List of drafts response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DraftList {
    /// Drafts in this page
    #[serde(default)]
    pub drafts: Vec<DraftRef>,

    /// Next page token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Reference to a draft as returned by `drafts.list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRef {
    /// Draft ID
    pub id: String,

    /// Message reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageRef>,
}

/// Raw message payload for draft creation and update
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    /// Raw RFC 5322 message (base64url encoded)
    pub raw: String,

    /// Thread ID (for replies)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Request body for `drafts.create` and `drafts.update`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRequest {
    /// Draft ID (update only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The message
    pub message: RawMessage,
}

/// Attachment data response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentData {
    /// Size in bytes
    #[serde(default)]
    pub size: i64,

    /// Base64url-encoded data
    pub data: String,
}

/// Gmail user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Primary address of the authenticated user
    pub email_address: String,

    /// Total messages in the mailbox
    #[serde(default)]
    pub messages_total: i64,

    /// Total threads in the mailbox
    #[serde(default)]
    pub threads_total: i64,
}
