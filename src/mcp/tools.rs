//! MCP Tool definitions and handlers
//!
//! Defines all available tools and their implementations. Input schemas are
//! derived from the argument types, and argument constraints are checked
//! before any Gmail request is made.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use validator::Validate;

use crate::config::limits::MAX_THREAD_IDS;
use crate::context::AppContext;
use crate::mcp::types::{CallToolResult, Tool};

const SEARCH_THREADS_DESCRIPTION: &str = r#"Search Gmail threads using Gmail's query syntax. Each result includes the thread's subject, sender, snippet, message count, attachments (with the message ID that carries them) and any existing drafts.

COMMON OPERATORS:
  from:amy@example.com           - Emails from a sender
  to:me                          - Emails sent to a recipient
  subject:"quarterly review"     - Subject text
  after:2025/06/01               - After a date
  before:2025/06/07              - Before a date
  older_than:7d / newer_than:2m  - Relative age (d/m/y)
  has:attachment                 - Has any attachment
  filename:pdf                   - Has a PDF attachment
  label:important                - Has a label
  is:unread / is:starred         - Message state
  in:sent / in:anywhere          - Folder
  "exact phrase"                 - Exact phrase
  from:amy OR from:bob           - Either condition
  dinner -movie                  - Exclude a term
  larger:10M / smaller:1M        - Size

EXAMPLE QUERIES:
  "is:unread"
  "has:attachment filename:pdf"
  "from:boss@company.com is:unread"
  "(urgent OR important) newer_than:1d""#;

/// Arguments of `search_threads`
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct SearchThreadsArgs {
    /// Gmail search query (e.g. 'from:example@gmail.com', 'subject:meeting', 'is:unread')
    #[validate(length(min = 1))]
    pub query: String,

    /// Maximum number of threads to return (default: 10)
    #[validate(range(min = 1, max = 500))]
    pub max_results: Option<u32>,
}

/// Arguments of `create_draft`
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct CreateDraftArgs {
    /// Recipient email address; several may be separated by commas
    #[validate(length(min = 1))]
    pub to: String,

    /// Email subject line
    pub subject: String,

    /// Email body content
    pub body: String,

    /// Thread ID if this is a reply. If a draft already exists for the
    /// thread, it is updated instead of creating a new one.
    pub thread_id: Option<String>,
}

/// Arguments of `extract_attachment_by_filename`
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct ExtractByFilenameArgs {
    /// The Gmail message ID containing the attachment (from search_threads results)
    #[validate(length(min = 1))]
    pub message_id: String,

    /// The filename of the attachment to extract (e.g. 'document.pdf', 'CV.docx')
    #[validate(length(min = 1))]
    pub filename: String,
}

/// Arguments of `extract_attachment_by_id`
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct ExtractByIdArgs {
    /// The Gmail message ID containing the attachment
    #[validate(length(min = 1))]
    pub message_id: String,

    /// The attachment ID (from search_threads results)
    #[validate(length(min = 1))]
    pub attachment_id: String,
}

/// Arguments of `fetch_email_bodies`
#[derive(Debug, Deserialize, JsonSchema, Validate)]
pub struct FetchEmailBodiesArgs {
    /// A comma-separated list of thread IDs (e.g. 'id1,id2,id3'), at most 20
    #[validate(custom = "validate_thread_ids")]
    pub thread_ids: String,
}

impl FetchEmailBodiesArgs {
    /// Trimmed, non-empty thread IDs
    pub fn ids(&self) -> Vec<String> {
        split_thread_ids(&self.thread_ids)
    }
}

/// Split a comma-separated ID list, dropping blanks
pub fn split_thread_ids(ids: &str) -> Vec<String> {
    ids.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_thread_ids(ids: &str) -> Result<(), validator::ValidationError> {
    let count = split_thread_ids(ids).len();
    if count == 0 {
        let mut err = validator::ValidationError::new("thread_ids");
        err.message = Some("At least one thread_id must be provided".into());
        return Err(err);
    }
    if count > MAX_THREAD_IDS {
        let mut err = validator::ValidationError::new("thread_ids");
        err.message = Some(format!("Maximum {} thread_ids allowed per request", MAX_THREAD_IDS).into());
        return Err(err);
    }
    Ok(())
}

/// Tool handler
pub struct ToolHandler {
    context: Arc<AppContext>,
}

impl ToolHandler {
    /// Create a new tool handler
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// List all available tools
    pub fn list_tools(&self) -> Vec<Tool> {
        vec![
            tool_def(
                "search_threads",
                SEARCH_THREADS_DESCRIPTION,
                schema::<SearchThreadsArgs>(),
            ),
            tool_def(
                "create_draft",
                "Create a Gmail draft or update the existing draft of a thread. When thread_id is provided, an existing draft in that thread is overwritten, so a draft can be revised repeatedly. Before writing any email, read the file://personal-email-style-guide resource (or call get_personal_email_style_guide) to match the user's writing style.",
                schema::<CreateDraftArgs>(),
            ),
            tool_def(
                "get_personal_email_style_guide",
                "Get the user's personal email writing style guide. Call this before drafting any email to match the user's writing style and tone.",
                json!({"type": "object", "properties": {}}),
            ),
            tool_def(
                "extract_attachment_by_filename",
                "Extract text content from an email attachment (PDF, DOCX or plain text) by filename. Use search_threads first to find messages with attachments.",
                schema::<ExtractByFilenameArgs>(),
            ),
            tool_def(
                "extract_attachment_by_id",
                "Extract text content from an email attachment by attachment ID. Prefer extract_attachment_by_filename; attachment IDs can change between requests.",
                schema::<ExtractByIdArgs>(),
            ),
            tool_def(
                "fetch_email_bodies",
                "Fetch full email bodies for specific threads after browsing with snippets. Bodies longer than 8000 characters are truncated.",
                schema::<FetchEmailBodiesArgs>(),
            ),
        ]
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, args: Value) -> CallToolResult {
        tracing::debug!("Calling tool {}", name);
        match name {
            "search_threads" => self.handle_search_threads(args).await,
            "create_draft" => self.handle_create_draft(args).await,
            "get_personal_email_style_guide" => self.handle_get_style_guide().await,
            "extract_attachment_by_filename" => self.handle_extract_by_filename(args).await,
            "extract_attachment_by_id" => self.handle_extract_by_id(args).await,
            "fetch_email_bodies" => self.handle_fetch_email_bodies(args).await,
            _ => CallToolResult::error(format!("Unknown tool: {}", name)),
        }
    }

    // ==================== Tool Handlers ====================

    async fn handle_search_threads(&self, args: Value) -> CallToolResult {
        let args: SearchThreadsArgs = match parse_args(args) {
            Ok(a) => a,
            Err(result) => return result,
        };

        match self
            .context
            .gmail
            .search_threads(&args.query, args.max_results)
            .await
        {
            Ok(threads) => CallToolResult::json(&threads),
            Err(e) => CallToolResult::error(format!("Failed to search threads: {}", e)),
        }
    }

    async fn handle_create_draft(&self, args: Value) -> CallToolResult {
        let args: CreateDraftArgs = match parse_args(args) {
            Ok(a) => a,
            Err(result) => return result,
        };

        match self
            .context
            .gmail
            .create_draft(&args.to, &args.subject, &args.body, args.thread_id.as_deref())
            .await
        {
            Ok(outcome) => {
                tracing::info!("Draft {} {:?}", outcome.draft_id, outcome.action);
                CallToolResult::json(&outcome)
            }
            Err(e) => CallToolResult::error(format!("Failed to create draft: {}", e)),
        }
    }

    async fn handle_get_style_guide(&self) -> CallToolResult {
        match self
            .context
            .style_guide
            .read_or_generate(&self.context.gmail)
            .await
        {
            Ok(guide) => CallToolResult::text(guide),
            Err(e) => CallToolResult::error(e.to_string()),
        }
    }

    async fn handle_extract_by_filename(&self, args: Value) -> CallToolResult {
        let args: ExtractByFilenameArgs = match parse_args(args) {
            Ok(a) => a,
            Err(result) => return result,
        };

        match self
            .context
            .gmail
            .extract_attachment_by_filename(&args.message_id, &args.filename)
            .await
        {
            Ok(extracted) => CallToolResult::json(&extracted),
            Err(e) => CallToolResult::error(format!("Failed to extract attachment: {}", e)),
        }
    }

    async fn handle_extract_by_id(&self, args: Value) -> CallToolResult {
        let args: ExtractByIdArgs = match parse_args(args) {
            Ok(a) => a,
            Err(result) => return result,
        };

        match self
            .context
            .gmail
            .extract_attachment_by_id(&args.message_id, &args.attachment_id)
            .await
        {
            Ok(extracted) => CallToolResult::json(&extracted),
            Err(e) => CallToolResult::error(format!("Failed to extract attachment: {}", e)),
        }
    }

    async fn handle_fetch_email_bodies(&self, args: Value) -> CallToolResult {
        let args: FetchEmailBodiesArgs = match parse_args(args) {
            Ok(a) => a,
            Err(result) => return result,
        };

        match self.context.gmail.fetch_email_bodies(&args.ids()).await {
            Ok(bodies) => CallToolResult::json(&bodies),
            Err(e) => CallToolResult::error(format!("Failed to fetch email bodies: {}", e)),
        }
    }
}

/// Deserialize and validate tool arguments
fn parse_args<T>(args: Value) -> std::result::Result<T, CallToolResult>
where
    T: DeserializeOwned + Validate,
{
    let args = if args.is_null() { json!({}) } else { args };

    let args: T = serde_json::from_value(args)
        .map_err(|e| CallToolResult::error(format!("Invalid arguments: {}", e)))?;
    args.validate()
        .map_err(|e| CallToolResult::error(format!("Invalid arguments: {}", e)))?;
    Ok(args)
}

fn tool_def(name: &str, description: &str, input_schema: Value) -> Tool {
    Tool {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
    }
}

/// JSON schema of an argument type, without the meta-schema header
fn schema<T: JsonSchema>() -> Value {
    let mut schema = serde_json::to_value(schemars::schema_for!(T))
        .unwrap_or_else(|_| json!({"type": "object"}));
    if let Value::Object(map) = &mut schema {
        map.remove("$schema");
        map.remove("title");
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_thread_ids() {
        assert_eq!(split_thread_ids(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(split_thread_ids(" , ").is_empty());
    }

    #[test]
    fn test_thread_ids_bounds() {
        let ok: FetchEmailBodiesArgs = parse_args(json!({"thread_ids": "t1,t2"})).unwrap();
        assert_eq!(ok.ids(), vec!["t1", "t2"]);

        let empty = parse_args::<FetchEmailBodiesArgs>(json!({"thread_ids": " "})).unwrap_err();
        assert!(empty.is_error);
        assert!(empty.first_text().unwrap().contains("At least one thread_id"));

        let many = (0..21).map(|i| format!("t{i}")).collect::<Vec<_>>().join(",");
        let err = parse_args::<FetchEmailBodiesArgs>(json!({ "thread_ids": many })).unwrap_err();
        assert!(err.first_text().unwrap().contains("Maximum 20"));
    }

    #[test]
    fn test_missing_required_argument() {
        let err = parse_args::<SearchThreadsArgs>(json!({"max_results": 5})).unwrap_err();
        assert!(err.is_error);
        assert!(err.first_text().unwrap().starts_with("Invalid arguments"));

        let err = parse_args::<SearchThreadsArgs>(Value::Null).unwrap_err();
        assert!(err.is_error);
    }

    #[test]
    fn test_range_validation() {
        let err = parse_args::<SearchThreadsArgs>(json!({"query": "is:unread", "max_results": 0}))
            .unwrap_err();
        assert!(err.is_error);
        let ok: SearchThreadsArgs =
            parse_args(json!({"query": "is:unread", "max_results": 25})).unwrap();
        assert_eq!(ok.max_results, Some(25));
    }

    #[test]
    fn test_schema_lists_required_fields() {
        let schema = schema::<ExtractByFilenameArgs>();
        assert_eq!(schema["type"], "object");
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"message_id"));
        assert!(required.contains(&"filename"));
        assert!(schema.get("$schema").is_none());
    }

    #[test]
    fn test_optional_fields_not_required() {
        let schema = schema::<CreateDraftArgs>();
        let required = schema["required"].as_array().unwrap();
        assert!(!required.iter().any(|v| v == "thread_id"));
        assert!(schema["properties"]["thread_id"].is_object());
    }
}
