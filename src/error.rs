//! Error types for the Gmail MCP Server
//!
//! This module defines the error hierarchy for all operations in the server.

use thiserror::Error;

/// Main error type for the Gmail MCP Server
#[derive(Error, Debug)]
pub enum GmailMcpError {
    /// OAuth authentication errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Gmail API errors
    #[error("Gmail API error: {0}")]
    Gmail(#[from] GmailApiError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// Body decoding and attachment extraction errors
    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    /// Style guide generation errors
    #[error("Style guide error: {0}")]
    StyleGuide(#[from] StyleGuideError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// OAuth authentication errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token file not found: {path}")]
    TokenNotFound { path: String },

    #[error("Failed to refresh access token: {message}")]
    TokenRefreshFailed { message: String },

    #[error("OAuth callback error: {message}")]
    CallbackError { message: String },

    #[error("No authorization code provided")]
    NoAuthCode,

    #[error("Authorization timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("Token exchange failed: {message}")]
    TokenExchangeFailed { message: String },
}

/// Gmail API errors
#[derive(Error, Debug)]
pub enum GmailApiError {
    #[error("Message not found: {message_id}")]
    MessageNotFound { message_id: String },

    #[error("Thread not found: {thread_id}")]
    ThreadNotFound { thread_id: String },

    #[error("Attachment not found: {attachment_id}")]
    AttachmentNotFound { attachment_id: String },

    #[error("Attachment with filename '{filename}' not found. Available files: {available:?}")]
    AttachmentFilenameNotFound {
        filename: String,
        available: Vec<String>,
    },

    #[error("API request failed: {message}")]
    RequestFailed { message: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config directory not found: {path}")]
    DirNotFound { path: String },

    #[error("Failed to create config directory: {path}")]
    DirCreationFailed { path: String },

    #[error("Missing required environment variable: {var}")]
    MissingEnvVar { var: String },
}

/// Validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid email address: {email}")]
    InvalidEmail { email: String },

    #[error("Invalid parameter: {name} - {message}")]
    InvalidParameter { name: String, message: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Unknown resource: {uri}")]
    UnknownResource { uri: String },

    #[error("Unknown prompt: {name}")]
    UnknownPrompt { name: String },

    #[error("Invalid params: {message}")]
    InvalidParams { message: String },
}

/// Body decoding and document text extraction errors
///
/// These are returned as values so a caller working through several
/// attachments can report each failure without aborting the batch.
#[derive(Error, Debug)]
pub enum ContentError {
    #[error("content is neither URL-safe nor standard base64: {reason}")]
    Decode { reason: String },

    #[error("unsupported file type: {mime_type}")]
    UnsupportedFileType { mime_type: String },

    #[error("failed to open PDF: {message}")]
    PdfOpen { message: String },

    #[error("no text could be extracted from PDF")]
    NoTextInPdf,

    #[error("could not open DOCX package: {message}")]
    DocxOpen { message: String },

    #[error("no text could be extracted from {kind}")]
    EmptyDocument { kind: &'static str },

    #[error("failed to stage temporary file: {0}")]
    TempFile(#[source] std::io::Error),
}

/// Style guide generation errors
#[derive(Error, Debug)]
pub enum StyleGuideError {
    #[error("personal email style guide not found at {path} and OPENAI_API_KEY is not set. Set OPENAI_API_KEY for auto-generation or create the file manually")]
    MissingApiKey { path: String },

    #[error("no sent emails found to analyze")]
    NoSentMail,

    #[error("completion request failed: {message}")]
    CompletionFailed { message: String },

    #[error("completion response contained no choices")]
    EmptyCompletion,
}

/// Result type alias for Gmail MCP operations
pub type Result<T> = std::result::Result<T, GmailMcpError>;
