//! Gmail API module
//!
//! Contains types, authentication, drafts and the client for the Gmail API.

pub mod auth;
pub mod client;
pub mod drafts;
pub mod types;
