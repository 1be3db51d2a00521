//! Gmail API client
//!
//! REST calls against the Gmail API plus the thread, body and attachment
//! operations exposed as tools.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::gmail::{API_BASE_URL, USER_ID};
use crate::config::limits::{DEFAULT_MAX_RESULTS, MAX_BODY_CHARS};
use crate::content::body::resolve_body;
use crate::content::decode::decode;
use crate::content::extract::extract_text;
use crate::content::walker::{
    collect_attachments, find_part_by_attachment_reference, AttachmentDescriptor, GENERIC_KIND,
};
use crate::error::{GmailApiError, GmailMcpError, Result};
use crate::gmail::auth::Authenticator;
use crate::gmail::drafts::{
    parse_recipients, reply_subject, DraftAction, DraftContent, DraftManager, DraftOutcome,
    DraftSummary, ReplyHeaders,
};
use crate::gmail::types::*;

/// Marker appended to bodies cut at the size limit
pub const TRUNCATION_NOTE: &str = "\n\n[Content truncated - email is longer than 8000 characters]";

/// Gmail API client
pub struct GmailClient {
    /// HTTP client
    http_client: reqwest::Client,

    /// OAuth authenticator
    authenticator: Arc<Authenticator>,
}

impl GmailClient {
    /// Create a new Gmail client
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            authenticator,
        }
    }

    /// The authenticator backing this client
    pub fn authenticator(&self) -> &Arc<Authenticator> {
        &self.authenticator
    }

    /// Get a valid access token
    async fn access_token(&self) -> Result<String> {
        self.authenticator.get_access_token().await
    }

    /// Base URL for the authenticated user
    fn user_url() -> String {
        format!("{}/users/{}", API_BASE_URL, USER_ID)
    }

    /// GET a JSON resource, mapping 404 through `not_found`
    async fn get_json<T, F>(&self, url: &str, what: &str, not_found: F) -> Result<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> GmailApiError,
    {
        let token = self.access_token().await?;

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else if response.status().as_u16() == 404 {
            Err(GmailMcpError::Gmail(not_found()))
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
                message: format!("Failed to {} ({}): {}", what, status, text),
            }))
        }
    }

    // ==================== Authentication ====================

    /// Make sure a working token is available
    ///
    /// A cached token is validated with a profile request; if it is missing
    /// or rejected, the interactive consent flow runs.
    pub async fn ensure_authenticated(&self) -> Result<Profile> {
        if self.authenticator.is_authenticated().await {
            match self.get_profile().await {
                Ok(profile) => return Ok(profile),
                Err(e) => {
                    tracing::warn!("Cached token is invalid, re-authorizing: {}", e);
                    self.authenticator.clear_token().await?;
                }
            }
        }

        self.authenticator.authenticate_interactive().await?;
        self.get_profile().await
    }

    // ==================== REST Operations ====================

    /// Get the authenticated user's profile
    pub async fn get_profile(&self) -> Result<Profile> {
        let url = format!("{}/profile", Self::user_url());
        self.get_json(&url, "get profile", || GmailApiError::RequestFailed {
            message: "Profile not found".to_string(),
        })
        .await
    }

    /// List threads matching a search query
    pub async fn list_threads(&self, query: &str, max_results: u32) -> Result<ThreadList> {
        let url = format!(
            "{}/threads?q={}&maxResults={}",
            Self::user_url(),
            urlencoding::encode(query),
            max_results
        );
        self.get_json(&url, "search threads", || GmailApiError::RequestFailed {
            message: "Thread listing not available".to_string(),
        })
        .await
    }

    /// Get a thread with all of its messages
    pub async fn get_thread(&self, thread_id: &str) -> Result<Thread> {
        let url = format!("{}/threads/{}?format=full", Self::user_url(), thread_id);
        self.get_json(&url, "get thread", || GmailApiError::ThreadNotFound {
            thread_id: thread_id.to_string(),
        })
        .await
    }

    /// List messages matching a search query
    pub async fn list_messages(&self, query: &str, max_results: u32) -> Result<MessageList> {
        let url = format!(
            "{}/messages?q={}&maxResults={}",
            Self::user_url(),
            urlencoding::encode(query),
            max_results
        );
        self.get_json(&url, "list messages", || GmailApiError::RequestFailed {
            message: "Message listing not available".to_string(),
        })
        .await
    }

    /// Get a message by ID
    pub async fn get_message(&self, message_id: &str) -> Result<Message> {
        let url = format!("{}/messages/{}?format=full", Self::user_url(), message_id);
        self.get_json(&url, "get message", || GmailApiError::MessageNotFound {
            message_id: message_id.to_string(),
        })
        .await
    }

    /// Download and decode an attachment
    pub async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/messages/{}/attachments/{}",
            Self::user_url(),
            message_id,
            attachment_id
        );
        let attachment: AttachmentData = self
            .get_json(&url, "get attachment", || GmailApiError::AttachmentNotFound {
                attachment_id: attachment_id.to_string(),
            })
            .await?;
        Ok(decode(&attachment.data)?)
    }

    // ==================== Threads ====================

    /// Search threads and summarize each one
    ///
    /// Threads that fail to load are skipped.
    pub async fn search_threads(
        &self,
        query: &str,
        max_results: Option<u32>,
    ) -> Result<Vec<ThreadSummary>> {
        let max = max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let list = self.list_threads(query, max).await?;
        let drafts = self.draft_summaries().await;

        let mut results = Vec::new();
        for thread_ref in list.threads {
            let thread = match self.get_thread(&thread_ref.id).await {
                Ok(thread) => thread,
                Err(e) => {
                    tracing::warn!("Failed to get thread {}: {}", thread_ref.id, e);
                    continue;
                }
            };
            results.extend(ThreadSummary::from_thread(&thread, &drafts));
        }

        Ok(results)
    }

    /// Full first-message bodies for a set of threads
    ///
    /// Threads that fail to load are skipped.
    pub async fn fetch_email_bodies(&self, thread_ids: &[String]) -> Result<Vec<ThreadBody>> {
        let drafts = self.draft_summaries().await;

        let mut results = Vec::new();
        for thread_id in thread_ids {
            let thread = match self.get_thread(thread_id).await {
                Ok(thread) => thread,
                Err(e) => {
                    tracing::warn!("Failed to get thread {}: {}", thread_id, e);
                    continue;
                }
            };
            results.extend(ThreadBody::from_thread(thread_id, &thread, &drafts));
        }

        Ok(results)
    }

    /// Draft summaries, or none if drafts cannot be listed
    async fn draft_summaries(&self) -> Vec<DraftSummary> {
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Failed to get drafts: {}", e);
                return Vec::new();
            }
        };
        let manager = DraftManager::new(&self.http_client, &token);
        manager.summaries().await.unwrap_or_else(|e| {
            tracing::warn!("Failed to get drafts: {}", e);
            Vec::new()
        })
    }

    // ==================== Drafts ====================

    /// Create a draft, or overwrite the thread's existing draft
    pub async fn create_draft(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        thread_id: Option<&str>,
    ) -> Result<DraftOutcome> {
        let recipients = parse_recipients(to)?;
        let token = self.access_token().await?;
        let manager = DraftManager::new(&self.http_client, &token);

        let Some(thread_id) = thread_id.filter(|t| !t.is_empty()) else {
            let content = DraftContent {
                to: recipients,
                subject: subject.to_string(),
                body: body.to_string(),
                reply: None,
            };
            let draft = manager.create(content.to_raw_message(None)?).await?;
            return Ok(DraftOutcome::new(draft.id, DraftAction::Created, to, subject));
        };

        let subject = reply_subject(subject);
        let reply = match self.get_thread(thread_id).await {
            Ok(thread) => ReplyHeaders::for_thread(&thread),
            Err(e) => {
                tracing::warn!("Failed to get thread {} for reply headers: {}", thread_id, e);
                None
            }
        };

        let content = DraftContent {
            to: recipients,
            subject: subject.clone(),
            body: body.to_string(),
            reply,
        };
        let message = content.to_raw_message(Some(thread_id))?;

        let existing = manager.thread_drafts(thread_id).await.unwrap_or_else(|e| {
            tracing::warn!("Failed to get drafts for thread {}: {}", thread_id, e);
            Vec::new()
        });

        match existing.first() {
            Some(draft) => {
                let updated = manager.update(&draft.draft_id, message).await?;
                Ok(DraftOutcome::new(updated.id, DraftAction::Updated, to, &subject))
            }
            None => {
                let created = manager.create(message).await?;
                Ok(DraftOutcome::new(created.id, DraftAction::Created, to, &subject))
            }
        }
    }

    // ==================== Attachments ====================

    /// Extract the text of the first attachment named `filename`
    pub async fn extract_attachment_by_filename(
        &self,
        message_id: &str,
        filename: &str,
    ) -> Result<ExtractedAttachment> {
        let message = self.get_message(message_id).await?;
        let payload = message.payload.unwrap_or_default();
        let attachments = collect_attachments(&payload);
        let descriptor = select_by_filename(&attachments, filename)?;

        let bytes = self
            .get_attachment(message_id, &descriptor.attachment_id)
            .await?;
        let text = extract_text(&bytes, &descriptor.mime_type, &descriptor.filename)?;

        Ok(ExtractedAttachment::new(
            message_id,
            &descriptor.attachment_id,
            filename,
            &descriptor.mime_type,
            text,
        ))
    }

    /// Extract the text of the attachment with the given reference
    pub async fn extract_attachment_by_id(
        &self,
        message_id: &str,
        attachment_id: &str,
    ) -> Result<ExtractedAttachment> {
        let message = self.get_message(message_id).await?;
        let payload = message.payload.unwrap_or_default();

        let part = find_part_by_attachment_reference(&payload, attachment_id).ok_or_else(|| {
            GmailMcpError::Gmail(GmailApiError::AttachmentNotFound {
                attachment_id: attachment_id.to_string(),
            })
        })?;
        let mime_type = part.mime_type().unwrap_or(GENERIC_KIND).to_string();
        let filename = part.filename().unwrap_or_default().to_string();

        let bytes = self.get_attachment(message_id, attachment_id).await?;
        let text = extract_text(&bytes, &mime_type, &filename)?;

        Ok(ExtractedAttachment::new(
            message_id,
            attachment_id,
            &filename,
            &mime_type,
            text,
        ))
    }
}

/// First attachment whose filename matches exactly
pub fn select_by_filename<'a>(
    attachments: &'a [AttachmentDescriptor],
    filename: &str,
) -> Result<&'a AttachmentDescriptor> {
    attachments
        .iter()
        .find(|a| a.filename == filename)
        .ok_or_else(|| {
            GmailMcpError::Gmail(GmailApiError::AttachmentFilenameNotFound {
                filename: filename.to_string(),
                available: attachments.iter().map(|a| a.filename.clone()).collect(),
            })
        })
}

/// Cut `text` to `max_chars` characters, appending the truncation note
pub fn truncate_body(text: String, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_NOTE),
        None => text,
    }
}

/// An attachment listed with the message that carries it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadAttachment {
    #[serde(flatten)]
    pub attachment: AttachmentDescriptor,
    pub message_id: String,
}

/// Attachments of every message in a thread, in message order
pub fn thread_attachments(thread: &Thread) -> Vec<ThreadAttachment> {
    thread
        .messages
        .iter()
        .flat_map(|message| {
            message
                .payload
                .as_ref()
                .map(collect_attachments)
                .unwrap_or_default()
                .into_iter()
                .map(|attachment| ThreadAttachment {
                    attachment,
                    message_id: message.id.clone(),
                })
        })
        .collect()
}

fn drafts_for(thread_id: &str, drafts: &[DraftSummary]) -> Vec<DraftSummary> {
    drafts
        .iter()
        .filter(|d| d.thread_id == thread_id)
        .cloned()
        .collect()
}

/// Search result for one thread
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub thread_id: String,
    pub subject: String,
    pub from: String,
    pub snippet: String,
    pub message_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<ThreadAttachment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drafts: Vec<DraftSummary>,
}

impl ThreadSummary {
    /// Summarize a loaded thread; empty threads yield `None`
    pub fn from_thread(thread: &Thread, drafts: &[DraftSummary]) -> Option<Self> {
        let first = thread.messages.first()?;
        Some(Self {
            thread_id: thread.id.clone(),
            subject: first.header("Subject").unwrap_or_default().to_string(),
            from: first.header("From").unwrap_or_default().to_string(),
            snippet: first.snippet.clone().unwrap_or_default(),
            message_count: thread.messages.len(),
            attachments: thread_attachments(thread),
            drafts: drafts_for(&thread.id, drafts),
        })
    }
}

/// Body fetch result for one thread
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadBody {
    pub thread_id: String,
    pub subject: String,
    pub from: String,
    pub full_body: String,
    pub message_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<ThreadAttachment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub drafts: Vec<DraftSummary>,
}

impl ThreadBody {
    /// Body of the first message of a loaded thread; empty threads yield `None`
    pub fn from_thread(thread_id: &str, thread: &Thread, drafts: &[DraftSummary]) -> Option<Self> {
        let first = thread.messages.first()?;
        let full_body = truncate_body(resolve_body(first).into_text(), MAX_BODY_CHARS);

        Some(Self {
            thread_id: thread_id.to_string(),
            subject: first.header("Subject").unwrap_or_default().to_string(),
            from: first.header("From").unwrap_or_default().to_string(),
            full_body,
            message_count: thread.messages.len(),
            attachments: thread_attachments(thread),
            drafts: drafts_for(thread_id, drafts),
        })
    }
}

/// Text extracted from one attachment
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedAttachment {
    pub message_id: String,
    pub attachment_id: String,
    pub filename: String,
    pub mime_type: String,
    pub text_content: String,
    pub extracted_at: String,
}

impl ExtractedAttachment {
    fn new(
        message_id: &str,
        attachment_id: &str,
        filename: &str,
        mime_type: &str,
        text_content: String,
    ) -> Self {
        Self {
            message_id: message_id.to_string(),
            attachment_id: attachment_id.to_string(),
            filename: filename.to_string(),
            mime_type: mime_type.to_string(),
            text_content,
            extracted_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        }
    }
}
