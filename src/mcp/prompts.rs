//! MCP prompts
//!
//! Administrative prompts. Both report their outcome as a single user
//! message; failures are described in the text rather than returned as
//! protocol errors.

use std::sync::Arc;

use crate::context::AppContext;
use crate::error::{McpError, Result};
use crate::mcp::resources::STYLE_GUIDE_URI;
use crate::mcp::types::{GetPromptResult, Prompt, PromptMessage};

pub const GENERATE_EMAIL_TONE: &str = "generate-email-tone";
pub const SERVER_STATUS: &str = "server-status";

/// Prompt handler
pub struct PromptHandler {
    context: Arc<AppContext>,
}

impl PromptHandler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    pub fn list_prompts(&self) -> Vec<Prompt> {
        vec![
            Prompt {
                name: GENERATE_EMAIL_TONE.to_string(),
                description: Some(
                    "Generate email tone personalization by analyzing your sent emails"
                        .to_string(),
                ),
                arguments: Vec::new(),
            },
            Prompt {
                name: SERVER_STATUS.to_string(),
                description: Some("Show Gmail MCP server status and file locations".to_string()),
                arguments: Vec::new(),
            },
        ]
    }

    pub async fn get_prompt(&self, name: &str) -> Result<GetPromptResult> {
        let text = match name {
            GENERATE_EMAIL_TONE => self.generate_email_tone().await,
            SERVER_STATUS => self.server_status(),
            _ => {
                return Err(McpError::UnknownPrompt {
                    name: name.to_string(),
                }
                .into())
            }
        };

        Ok(GetPromptResult {
            description: None,
            messages: vec![PromptMessage::user(text)],
        })
    }

    async fn generate_email_tone(&self) -> String {
        let style_guide = &self.context.style_guide;
        if !style_guide.can_generate() {
            return "❌ Cannot generate tone: OPENAI_API_KEY environment variable not set"
                .to_string();
        }

        match style_guide.generate(&self.context.gmail).await {
            Ok(_) => format!(
                "✅ Successfully generated personal email style guide at: {}\n\nYou can now use the {} resource for personalized email writing.",
                style_guide.path().display(),
                STYLE_GUIDE_URI
            ),
            Err(e) => {
                tracing::error!("Style guide generation failed: {}", e);
                format!("❌ Failed to generate tone: {}", e)
            }
        }
    }

    fn server_status(&self) -> String {
        let config = &self.context.config;
        format!(
            "📊 **Gmail MCP Server Status**\n\n\
             📁 **App Data Directory:** {}\n\n\
             🔑 **Token File:** {}\n   Status: {}\n\n\
             📝 **Style Guide File:** {}\n   Status: {}\n\n\
             🛠️ **Available Commands:**\n\
             - Use /{} to create email tone personalization\n\
             - Use tools: search_threads (includes drafts), create_draft (create/update), extract_attachment_by_filename, fetch_email_bodies\n\
             - Use resource: {}",
            config.app_dir.display(),
            config.token_path.display(),
            presence(config.token_exists()),
            config.style_guide_path.display(),
            presence(config.style_guide_exists()),
            GENERATE_EMAIL_TONE,
            STYLE_GUIDE_URI,
        )
    }
}

fn presence(found: bool) -> &'static str {
    if found {
        "✅ Found"
    } else {
        "❌ Not found"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::mcp::types::Content;

    async fn handler(dir: &std::path::Path) -> PromptHandler {
        let mut config = Config::with_app_dir(dir).unwrap();
        config.completion.api_key = None;
        PromptHandler::new(Arc::new(AppContext::new(config).await.unwrap()))
    }

    fn text(result: &GetPromptResult) -> &str {
        match &result.messages[0].content {
            Content::Text { text } => text,
            _ => panic!("expected text content"),
        }
    }

    #[tokio::test]
    async fn test_server_status_reports_files() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(dir.path()).await;
        std::fs::write(dir.path().join("personal-email-style-guide.md"), "# Guide").unwrap();

        let result = handler.get_prompt(SERVER_STATUS).await.unwrap();
        let status = text(&result);
        assert!(status.contains("Gmail MCP Server Status"));
        assert!(status.contains(&dir.path().display().to_string()));
        assert!(status.contains("token.json\n   Status: ❌ Not found"));
        assert!(status.contains("personal-email-style-guide.md\n   Status: ✅ Found"));
        assert_eq!(result.messages[0].role, "user");
    }

    #[tokio::test]
    async fn test_generate_without_key() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(dir.path()).await;
        let result = handler.get_prompt(GENERATE_EMAIL_TONE).await.unwrap();
        assert!(text(&result).contains("OPENAI_API_KEY environment variable not set"));
    }

    #[tokio::test]
    async fn test_unknown_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(dir.path()).await;
        assert!(handler.get_prompt("nope").await.is_err());
        assert_eq!(handler.list_prompts().len(), 2);
    }
}
