//! Personal email style guide
//!
//! The guide is a Markdown file generated once from the user's sent mail and
//! served afterwards from disk. Users may also write it by hand.

use std::path::{Path, PathBuf};

use crate::config::limits::{STYLE_MAX_SAMPLES, STYLE_MIN_BODY_CHARS, STYLE_SENT_SCAN};
use crate::config::Config;
use crate::content::body::resolve_body;
use crate::error::{GmailMcpError, Result, StyleGuideError};
use crate::gmail::client::GmailClient;
use crate::style::completion::CompletionClient;

/// Address used in the prompt when the profile cannot be fetched
const UNKNOWN_ADDRESS: &str = "unknown@example.com";

/// One sent email used as a writing sample
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSample {
    pub subject: Option<String>,
    pub to: Option<String>,
    pub body: String,
}

/// Render samples as numbered blocks separated by `---`
pub fn format_samples(samples: &[SentSample]) -> String {
    samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let mut block = format!("Email {}:\n", i + 1);
            if let Some(subject) = &sample.subject {
                block.push_str(&format!("Subject: {}\n", subject));
            }
            if let Some(to) = &sample.to {
                block.push_str(&format!("To: {}\n", to));
            }
            block.push_str(&format!("Body: {}", sample.body));
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

/// Prompt asking for a style guide describing `email`'s writing
pub fn build_prompt(email: &str, samples: &[SentSample]) -> String {
    format!(
        r##"Analyze these {count} emails from {email} to create a concise, specific email style guide.

EMAILS:
{samples}

Create a markdown guide with:

1. **USER BACKGROUND**: Infer their role, industry, expertise from email content/recipients
2. **WRITING PATTERNS**: Specific words/phrases they actually use (not generic advice)
3. **STRUCTURE**: How they organize emails (greeting→body→closing patterns)
4. **TONE**: Their actual communication style with examples
5. **SIGNATURE ELEMENTS**: Unique characteristics that make emails sound like them

Be specific and actionable. Avoid generic advice. Focus on what makes THIS person's emails distinctive.

Start with "# Personal Email Style Guide for {email}""##,
        count = samples.len(),
        email = email,
        samples = format_samples(samples),
    )
}

/// Owner of the style guide file
pub struct StyleGuideStore {
    path: PathBuf,
    api_key: Option<String>,
    completion: CompletionClient,
}

impl StyleGuideStore {
    pub fn new(config: &Config) -> Self {
        Self {
            path: config.style_guide_path.clone(),
            api_key: config.completion.api_key.clone(),
            completion: CompletionClient::new(config.completion.clone()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Whether the guide can be generated
    pub fn can_generate(&self) -> bool {
        self.api_key.is_some()
    }

    /// Read the guide from disk
    pub async fn read(&self) -> Result<String> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }

    /// Generate the guide from sent mail and write it to disk
    pub async fn generate(&self, gmail: &GmailClient) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| self.missing_key())?;

        tracing::info!("Generating personal email style guide from sent emails");
        let email = match gmail.get_profile().await {
            Ok(profile) => profile.email_address,
            Err(e) => {
                tracing::warn!("Could not fetch user profile: {}", e);
                UNKNOWN_ADDRESS.to_string()
            }
        };

        let samples = collect_samples(gmail).await?;
        if samples.is_empty() {
            return Err(GmailMcpError::StyleGuide(StyleGuideError::NoSentMail));
        }

        tracing::info!("Analyzing {} sent emails", samples.len());
        let guide = self
            .completion
            .complete(api_key, &build_prompt(&email, &samples))
            .await?;

        tokio::fs::write(&self.path, &guide).await?;
        tracing::info!("Wrote personal email style guide to {}", self.path.display());

        Ok(guide)
    }

    /// Generate the guide unless it already exists
    pub async fn ensure_exists(&self, gmail: &GmailClient) -> Result<()> {
        if self.exists() {
            return Ok(());
        }
        if !self.can_generate() {
            return Err(self.missing_key());
        }

        tracing::info!("Style guide not found, generating it from your sent emails");
        self.generate(gmail).await.map(|_| ())
    }

    /// Guide contents, generating the file first when needed
    pub async fn read_or_generate(&self, gmail: &GmailClient) -> Result<String> {
        if self.exists() {
            return self.read().await;
        }
        if !self.can_generate() {
            return Err(self.missing_key());
        }
        self.generate(gmail).await
    }

    fn missing_key(&self) -> GmailMcpError {
        GmailMcpError::StyleGuide(StyleGuideError::MissingApiKey {
            path: self.path.display().to_string(),
        })
    }
}

/// Substantial bodies from recent sent mail
async fn collect_samples(gmail: &GmailClient) -> Result<Vec<SentSample>> {
    let sent = gmail.list_messages("in:sent", STYLE_SENT_SCAN).await?;

    let mut samples = Vec::new();
    for message_ref in sent.messages {
        let message = match gmail.get_message(&message_ref.id).await {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Skipping sent message {}: {}", message_ref.id, e);
                continue;
            }
        };

        let body = resolve_body(&message).into_text();
        if body.chars().count() > STYLE_MIN_BODY_CHARS {
            samples.push(SentSample {
                subject: message.header("Subject").map(str::to_string),
                to: message.header("To").map(str::to_string),
                body,
            });
        }

        if samples.len() >= STYLE_MAX_SAMPLES {
            break;
        }
    }

    Ok(samples)
}
