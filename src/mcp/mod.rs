//! MCP (Model Context Protocol) module
//!
//! Implements the MCP server protocol for tools, resources and prompts over
//! stdio or HTTP.

pub mod http;
pub mod prompts;
pub mod resources;
pub mod server;
pub mod tools;
pub mod types;

pub use server::McpServer;
