//! Draft management for Gmail
//!
//! Drafts are composed as raw RFC 5322 messages. A thread holds at most one
//! draft managed by this server: writing a reply to a thread that already has
//! a draft overwrites it.

use mail_builder::headers::address::Address;
use mail_builder::headers::raw::Raw;
use mail_builder::MessageBuilder;
use serde::Serialize;

use crate::config::gmail::{API_BASE_URL, USER_ID};
use crate::config::limits::DRAFT_SNIPPET_CHARS;
use crate::content::body::resolve_body;
use crate::content::decode::encode_url_safe;
use crate::error::{GmailApiError, GmailMcpError, Result, ValidationError};
use crate::gmail::types::{Draft, DraftList, DraftRequest, RawMessage, Thread};

/// One recipient of a draft
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub name: Option<String>,
    pub email: String,
}

/// Parse a comma-separated recipient list, accepting `Name <addr>` entries
pub fn parse_recipients(to: &str) -> Result<Vec<Recipient>> {
    let mut recipients = Vec::new();

    for entry in to.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, email) = match (entry.rfind('<'), entry.ends_with('>')) {
            (Some(open), true) => {
                let name = entry[..open].trim().trim_matches('"').trim();
                let email = entry[open + 1..entry.len() - 1].trim();
                ((!name.is_empty()).then(|| name.to_string()), email)
            }
            _ => (None, entry),
        };

        if !validator::validate_email(email) {
            return Err(GmailMcpError::Validation(ValidationError::InvalidEmail {
                email: email.to_string(),
            }));
        }

        recipients.push(Recipient {
            name,
            email: email.to_string(),
        });
    }

    if recipients.is_empty() {
        return Err(GmailMcpError::Validation(ValidationError::InvalidParameter {
            name: "to".to_string(),
            message: "at least one recipient is required".to_string(),
        }));
    }

    Ok(recipients)
}

/// Prefix a reply subject with `Re: ` unless it already has one
pub fn reply_subject(subject: &str) -> String {
    let already_reply = subject
        .get(..3)
        .map(|prefix| prefix.eq_ignore_ascii_case("re:"))
        .unwrap_or(false);
    if already_reply {
        subject.to_string()
    } else {
        format!("Re: {}", subject)
    }
}

/// Threading headers for a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyHeaders {
    pub in_reply_to: String,
    pub references: String,
}

impl ReplyHeaders {
    /// Headers answering the last message of `thread`
    pub fn for_thread(thread: &Thread) -> Option<Self> {
        let last = thread.messages.last()?;
        let message_id = last.header("Message-ID").filter(|id| !id.is_empty())?;

        let references = match last.header("References").filter(|r| !r.trim().is_empty()) {
            Some(previous) => format!("{} {}", previous.trim(), message_id),
            None => message_id.to_string(),
        };

        Some(Self {
            in_reply_to: message_id.to_string(),
            references,
        })
    }
}

/// Content of a draft before encoding
#[derive(Debug, Clone)]
pub struct DraftContent {
    pub to: Vec<Recipient>,
    pub subject: String,
    pub body: String,
    pub reply: Option<ReplyHeaders>,
}

impl DraftContent {
    /// Render the RFC 5322 message
    pub fn to_rfc5322(&self) -> Result<Vec<u8>> {
        let recipients = self
            .to
            .iter()
            .map(|r| match &r.name {
                Some(name) => Address::new_address(Some(name.as_str()), r.email.as_str()),
                None => Address::new_address(None::<&str>, r.email.as_str()),
            })
            .collect::<Vec<_>>();

        let mut builder = MessageBuilder::new()
            .to(Address::new_list(recipients))
            .subject(self.subject.as_str())
            .text_body(self.body.as_str());

        if let Some(reply) = &self.reply {
            builder = builder
                .header("In-Reply-To", Raw::new(reply.in_reply_to.as_str()))
                .header("References", Raw::new(reply.references.as_str()));
        }

        Ok(builder.write_to_vec()?)
    }

    /// Encode as a Gmail raw message attached to `thread_id`
    pub fn to_raw_message(&self, thread_id: Option<&str>) -> Result<RawMessage> {
        Ok(RawMessage {
            raw: encode_url_safe(&self.to_rfc5322()?),
            thread_id: thread_id.map(str::to_string),
        })
    }
}

/// Whether a draft was created or an existing one overwritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftAction {
    Created,
    Updated,
}

/// Result of `create_draft`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOutcome {
    pub draft_id: String,
    pub message: String,
    pub action: DraftAction,
    pub to: String,
    pub subject: String,
}

impl DraftOutcome {
    pub fn new(draft_id: String, action: DraftAction, to: &str, subject: &str) -> Self {
        let message = match action {
            DraftAction::Created => "Draft created successfully",
            DraftAction::Updated => "Draft updated successfully (existing draft was overwritten)",
        };
        Self {
            draft_id,
            message: message.to_string(),
            action,
            to: to.to_string(),
            subject: subject.to_string(),
        }
    }
}

/// A draft as listed alongside its thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSummary {
    pub draft_id: String,
    pub thread_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl DraftSummary {
    /// Summarize a fully fetched draft; drafts without a message yield `None`
    pub fn from_draft(draft: &Draft) -> Option<Self> {
        let message = draft.message.as_ref()?;
        let thread_id = message.thread_id.clone().unwrap_or_default();

        let body = resolve_body(message).into_text();
        let snippet = (!body.is_empty()).then(|| truncate_with_ellipsis(&body, DRAFT_SNIPPET_CHARS));

        Some(Self {
            draft_id: draft.id.clone(),
            thread_id,
            subject: message.header("Subject").map(str::to_string),
            snippet,
        })
    }
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Draft manager for Gmail operations
pub struct DraftManager<'a> {
    client: &'a reqwest::Client,
    access_token: &'a str,
}

impl<'a> DraftManager<'a> {
    /// Create a new draft manager
    pub fn new(client: &'a reqwest::Client, access_token: &'a str) -> Self {
        Self {
            client,
            access_token,
        }
    }

    /// Base URL for drafts API
    fn base_url() -> String {
        format!("{}/users/{}/drafts", API_BASE_URL, USER_ID)
    }

    /// List every draft reference, following pagination
    pub async fn list(&self) -> Result<DraftList> {
        let mut all = DraftList::default();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(Self::base_url())
                .bearer_auth(self.access_token);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                return Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
                    message: format!("Failed to list drafts ({}): {}", status, text),
                }));
            }

            let page: DraftList = response.json().await?;
            all.drafts.extend(page.drafts);

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(all)
    }

    /// Get a draft with its full message
    pub async fn get(&self, draft_id: &str) -> Result<Draft> {
        let url = format!("{}/{}?format=full", Self::base_url(), draft_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.access_token)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
                message: format!("Failed to get draft {} ({}): {}", draft_id, status, text),
            }))
        }
    }

    /// Create a new draft
    pub async fn create(&self, message: RawMessage) -> Result<Draft> {
        let request = DraftRequest { id: None, message };

        let response = self
            .client
            .post(Self::base_url())
            .bearer_auth(self.access_token)
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
                message: format!("Failed to create draft ({}): {}", status, text),
            }))
        }
    }

    /// Replace the message of an existing draft
    pub async fn update(&self, draft_id: &str, message: RawMessage) -> Result<Draft> {
        let url = format!("{}/{}", Self::base_url(), draft_id);
        let request = DraftRequest {
            id: Some(draft_id.to_string()),
            message,
        };

        let response = self
            .client
            .put(&url)
            .bearer_auth(self.access_token)
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            Err(GmailMcpError::Gmail(GmailApiError::RequestFailed {
                message: format!("Failed to update existing draft ({}): {}", status, text),
            }))
        }
    }

    /// Summaries of every accessible draft
    ///
    /// Drafts that cannot be fetched are skipped.
    pub async fn summaries(&self) -> Result<Vec<DraftSummary>> {
        let list = self.list().await?;
        let mut summaries = Vec::new();

        for draft_ref in list.drafts {
            match self.get(&draft_ref.id).await {
                Ok(draft) => summaries.extend(DraftSummary::from_draft(&draft)),
                Err(e) => tracing::debug!("Skipping draft {}: {}", draft_ref.id, e),
            }
        }

        Ok(summaries)
    }

    /// Drafts belonging to `thread_id`
    pub async fn thread_drafts(&self, thread_id: &str) -> Result<Vec<DraftSummary>> {
        Ok(self
            .summaries()
            .await?
            .into_iter()
            .filter(|d| d.thread_id == thread_id)
            .collect())
    }
}
