//! Gmail MCP Server Library
//!
//! A Model Context Protocol (MCP) server for Gmail. Searches threads, reads
//! bodies, extracts text from PDF, DOCX and plain-text attachments, and
//! drafts replies in the user's personal writing style.

pub mod config;
pub mod content;
pub mod context;
pub mod error;
pub mod gmail;
pub mod mcp;
pub mod style;

pub use config::Config;
pub use context::AppContext;
pub use error::{GmailMcpError, Result};
