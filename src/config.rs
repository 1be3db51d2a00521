//! Configuration management for the Gmail MCP Server
//!
//! Handles paths, environment variables, and configuration loading.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, GmailMcpError, Result};

/// Name of the cached OAuth token file inside the app directory
pub const TOKEN_FILE: &str = "token.json";

/// Name of the generated style guide inside the app directory
pub const STYLE_GUIDE_FILE: &str = "personal-email-style-guide.md";

/// Configuration for the Gmail MCP Server
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the token and the style guide
    pub app_dir: PathBuf,

    /// Path to stored OAuth token (access/refresh tokens)
    pub token_path: PathBuf,

    /// Path to the generated personal email style guide
    pub style_guide_path: PathBuf,

    /// OAuth client ID (`GMAIL_CLIENT_ID`)
    pub client_id: Option<String>,

    /// OAuth client secret (`GMAIL_CLIENT_SECRET`)
    pub client_secret: Option<String>,

    /// OAuth callback port
    pub oauth_callback_port: u16,

    /// Gmail API scopes
    pub scopes: Vec<String>,

    /// Completion API settings for style guide generation
    pub completion: CompletionConfig,
}

/// Settings for the chat completion API
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// API key (`OPENAI_API_KEY`); generation is disabled without one
    pub api_key: Option<String>,

    /// Model name
    pub model: String,

    /// API base URL
    pub base_url: String,

    /// Sampling temperature
    pub temperature: f32,
}

impl Config {
    /// Create a new configuration from the environment with default paths
    pub fn new() -> Result<Self> {
        let app_dir = match non_empty_env("AUTO_GMAIL_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => Self::default_app_dir()?,
        };
        Self::with_app_dir(app_dir)
    }

    /// Create a configuration rooted at a specific app directory
    pub fn with_app_dir(app_dir: impl Into<PathBuf>) -> Result<Self> {
        let app_dir = app_dir.into();

        if !app_dir.exists() {
            std::fs::create_dir_all(&app_dir).map_err(|_| {
                GmailMcpError::Config(ConfigError::DirCreationFailed {
                    path: app_dir.display().to_string(),
                })
            })?;
        }

        let oauth_callback_port = non_empty_env("GMAIL_OAUTH_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        Ok(Self {
            token_path: app_dir.join(TOKEN_FILE),
            style_guide_path: app_dir.join(STYLE_GUIDE_FILE),
            app_dir,
            client_id: non_empty_env("GMAIL_CLIENT_ID"),
            client_secret: non_empty_env("GMAIL_CLIENT_SECRET"),
            oauth_callback_port,
            scopes: vec![
                "https://www.googleapis.com/auth/gmail.readonly".to_string(),
                "https://www.googleapis.com/auth/gmail.compose".to_string(),
            ],
            completion: CompletionConfig {
                api_key: non_empty_env("OPENAI_API_KEY"),
                model: non_empty_env("OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
                base_url: non_empty_env("OPENAI_BASE_URL")
                    .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
                temperature: 0.3,
            },
        })
    }

    /// `~/.auto-gmail` on Unix-likes, `%APPDATA%\auto-gmail` on Windows
    fn default_app_dir() -> Result<PathBuf> {
        let base = if cfg!(windows) {
            dirs::data_dir().map(|d| d.join("auto-gmail"))
        } else {
            dirs::home_dir().map(|d| d.join(".auto-gmail"))
        };

        base.ok_or_else(|| {
            GmailMcpError::Config(ConfigError::DirNotFound {
                path: "~".to_string(),
            })
        })
    }

    /// OAuth client ID, or an error naming the missing variable
    pub fn require_client_id(&self) -> Result<&str> {
        require(self.client_id.as_deref(), "GMAIL_CLIENT_ID")
    }

    /// OAuth client secret, or an error naming the missing variable
    pub fn require_client_secret(&self) -> Result<&str> {
        require(self.client_secret.as_deref(), "GMAIL_CLIENT_SECRET")
    }

    /// Redirect URI registered for the local callback server
    pub fn oauth_callback_url(&self) -> String {
        format!("http://localhost:{}", self.oauth_callback_port)
    }

    /// Check if a cached token exists
    pub fn token_exists(&self) -> bool {
        self.token_path.exists()
    }

    /// Check if the style guide has been generated
    pub fn style_guide_exists(&self) -> bool {
        self.style_guide_path.exists()
    }

    /// Path of a file inside the app directory
    pub fn app_file(&self, name: impl AsRef<Path>) -> PathBuf {
        self.app_dir.join(name)
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn require<'a>(value: Option<&'a str>, var: &str) -> Result<&'a str> {
    value.ok_or_else(|| {
        GmailMcpError::Config(ConfigError::MissingEnvVar {
            var: var.to_string(),
        })
    })
}

/// Gmail API constants
pub mod gmail {
    /// Base URL for Gmail API
    pub const API_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

    /// User ID for the authenticated user
    pub const USER_ID: &str = "me";

    /// Google OAuth endpoints
    pub const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
    pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
}

/// Limits applied by the tools
pub mod limits {
    /// Pages processed per PDF attachment
    pub const MAX_PDF_PAGES: usize = 50;

    /// Characters of body text returned per thread by `fetch_email_bodies`
    pub const MAX_BODY_CHARS: usize = 8000;

    /// Thread IDs accepted per `fetch_email_bodies` call
    pub const MAX_THREAD_IDS: usize = 20;

    /// Characters of draft body shown as a snippet
    pub const DRAFT_SNIPPET_CHARS: usize = 200;

    /// Default `search_threads` page size
    pub const DEFAULT_MAX_RESULTS: u32 = 10;

    /// Sent messages scanned for the style guide
    pub const STYLE_SENT_SCAN: u32 = 50;

    /// Samples fed into the style guide prompt
    pub const STYLE_MAX_SAMPLES: usize = 25;

    /// Minimum body length for a sent message to count as a sample
    pub const STYLE_MIN_BODY_CHARS: usize = 50;
}
