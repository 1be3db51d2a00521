//! MCP resources
//!
//! The only resource is the personal email style guide.

use std::sync::Arc;

use crate::context::AppContext;
use crate::error::{McpError, Result};
use crate::mcp::types::{ReadResourceResult, Resource, ResourceContent};

pub const STYLE_GUIDE_URI: &str = "file://personal-email-style-guide";
const MARKDOWN_MIME: &str = "text/markdown";

/// Resource handler
pub struct ResourceHandler {
    context: Arc<AppContext>,
}

impl ResourceHandler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    pub fn list_resources(&self) -> Vec<Resource> {
        vec![Resource {
            uri: STYLE_GUIDE_URI.to_string(),
            name: "Personal Email Style Guide".to_string(),
            description: Some(
                "Instructions on how to write emails in the user's personal style and tone"
                    .to_string(),
            ),
            mime_type: Some(MARKDOWN_MIME.to_string()),
        }]
    }

    /// Read a resource, generating the style guide on first access
    pub async fn read_resource(&self, uri: &str) -> Result<ReadResourceResult> {
        if uri != STYLE_GUIDE_URI {
            return Err(McpError::UnknownResource {
                uri: uri.to_string(),
            }
            .into());
        }

        let text = self
            .context
            .style_guide
            .read_or_generate(&self.context.gmail)
            .await?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContent {
                uri: STYLE_GUIDE_URI.to_string(),
                mime_type: Some(MARKDOWN_MIME.to_string()),
                text: Some(text),
            }],
        })
    }
}
