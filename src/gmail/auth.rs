//! OAuth authentication for the Gmail API
//!
//! Handles the OAuth 2.0 flow for an installed application:
//! - Client credentials from the environment
//! - Interactive browser consent with a local callback server
//! - Token storage and refresh

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::gmail::{AUTH_URI, TOKEN_URI};
use crate::config::Config;
use crate::error::{AuthError, GmailMcpError, Result};

/// How long the interactive flow waits for the browser callback
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Refresh tokens that expire within this many seconds
const REFRESH_MARGIN_SECS: i64 = 300;

/// Cached OAuth token, as stored in `token.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    /// Access token
    pub access_token: String,

    /// Refresh token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Expiry timestamp (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,

    /// Granted scopes
    #[serde(default)]
    pub scope: String,
}

impl StoredToken {
    /// Whether the access token expires within the refresh margin of `now`
    pub fn is_expiring(&self, now: i64) -> bool {
        self.expiry_date
            .map(|expiry| expiry - now < REFRESH_MARGIN_SECS)
            .unwrap_or(false)
    }

    fn from_response(response: TokenResponse, previous_refresh: Option<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(previous_refresh),
            token_type: response.token_type,
            expiry_date: response.expires_in.map(|secs| now + secs),
            scope: response.scope,
        }
    }
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Token response from the OAuth token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    token_type: String,
    expires_in: Option<i64>,
    #[serde(default)]
    scope: String,
}

/// OAuth authenticator
pub struct Authenticator {
    /// Configuration
    config: Config,

    /// HTTP client
    http_client: reqwest::Client,

    /// Current token, if one has been loaded or obtained
    token: Arc<RwLock<Option<StoredToken>>>,
}

impl Authenticator {
    /// Create an authenticator, loading a cached token if one exists
    pub async fn new(config: Config) -> Result<Self> {
        let auth = Self {
            config,
            http_client: reqwest::Client::new(),
            token: Arc::new(RwLock::new(None)),
        };

        if auth.config.token_exists() {
            match auth.load_token().await {
                Ok(token) => *auth.token.write().await = Some(token),
                Err(e) => tracing::warn!("Ignoring unreadable token file: {}", e),
            }
        }

        Ok(auth)
    }

    /// Configuration this authenticator was built from
    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn load_token(&self) -> Result<StoredToken> {
        let content = tokio::fs::read_to_string(&self.config.token_path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn save_token(&self, token: &StoredToken) -> Result<()> {
        let content = serde_json::to_string_pretty(token)?;
        tokio::fs::write(&self.config.token_path, content).await?;
        Ok(())
    }

    /// Forget the cached token, in memory and on disk
    pub async fn clear_token(&self) -> Result<()> {
        *self.token.write().await = None;
        if self.config.token_exists() {
            tokio::fs::remove_file(&self.config.token_path).await?;
        }
        Ok(())
    }

    /// Check if a token is available
    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Get a valid access token, refreshing if necessary
    pub async fn get_access_token(&self) -> Result<String> {
        let token = self.token.read().await.clone();

        match token {
            Some(token) if token.is_expiring(chrono::Utc::now().timestamp()) => {
                self.refresh(token.refresh_token).await
            }
            Some(token) => Ok(token.access_token),
            None => Err(GmailMcpError::Auth(AuthError::TokenNotFound {
                path: self.config.token_path.display().to_string(),
            })),
        }
    }

    async fn refresh(&self, refresh_token: Option<String>) -> Result<String> {
        let refresh_token = refresh_token.ok_or_else(|| {
            GmailMcpError::Auth(AuthError::TokenRefreshFailed {
                message: "No refresh token available".to_string(),
            })
        })?;

        let params = [
            ("client_id", self.config.require_client_id()?),
            ("client_secret", self.config.require_client_secret()?),
            ("refresh_token", refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(TOKEN_URI)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Auth(AuthError::TokenRefreshFailed {
                message: text,
            }));
        }

        let token = StoredToken::from_response(response.json().await?, Some(refresh_token));
        self.save_token(&token).await?;
        tracing::debug!("Access token refreshed");

        let access_token = token.access_token.clone();
        *self.token.write().await = Some(token);
        Ok(access_token)
    }

    /// Build the consent URL the user opens in a browser
    pub fn authorization_url(&self) -> Result<String> {
        let scopes = self.config.scopes.join(" ");
        Ok(format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            AUTH_URI,
            urlencoding::encode(self.config.require_client_id()?),
            urlencoding::encode(&self.config.oauth_callback_url()),
            urlencoding::encode(&scopes)
        ))
    }

    /// Exchange an authorization code for a token and store it
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken> {
        let redirect_uri = self.config.oauth_callback_url();
        let params = [
            ("client_id", self.config.require_client_id()?),
            ("client_secret", self.config.require_client_secret()?),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(TOKEN_URI)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GmailMcpError::Auth(AuthError::TokenExchangeFailed {
                message: text,
            }));
        }

        let token = StoredToken::from_response(response.json().await?, None);
        self.save_token(&token).await?;
        *self.token.write().await = Some(token.clone());

        Ok(token)
    }

    /// Run the interactive consent flow with a local callback server
    pub async fn authenticate_interactive(&self) -> Result<()> {
        use axum::{extract::Query, response::Html, routing::get, Router};
        use tokio::sync::oneshot;

        let auth_url = self.authorization_url()?;
        eprintln!("\nPlease visit this URL to authorize this application:");
        eprintln!("{}\n", auth_url);

        if let Err(e) = open::that(&auth_url) {
            eprintln!("Could not open browser automatically: {}", e);
            eprintln!("Please open the URL manually.");
        }

        let (tx, rx) = oneshot::channel::<std::result::Result<String, String>>();
        let tx = Arc::new(std::sync::Mutex::new(Some(tx)));

        let callback_handler = move |Query(params): Query<HashMap<String, String>>| async move {
            let outcome = match (params.get("code"), params.get("error")) {
                (Some(code), _) if !code.is_empty() => Ok(code.clone()),
                (_, Some(error)) => Err(error.clone()),
                _ => Err("no code in callback".to_string()),
            };
            let page = if outcome.is_ok() {
                "<html><body><h1>Authorization successful!</h1><p>You can close this window and return to the terminal.</p></body></html>"
            } else {
                "<html><body><h1>Authorization failed</h1><p>No authorization code received.</p></body></html>"
            };
            if let Ok(mut slot) = tx.lock() {
                if let Some(tx) = slot.take() {
                    let _ = tx.send(outcome);
                }
            }
            Html(page)
        };

        let app = Router::new().route("/", get(callback_handler));

        let addr = std::net::SocketAddr::from(([127, 0, 0, 1], self.config.oauth_callback_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;

        eprintln!(
            "Waiting for authorization callback on port {}...",
            self.config.oauth_callback_port
        );

        let server = axum::serve(listener, app);

        let code = tokio::select! {
            result = server => {
                return Err(GmailMcpError::Auth(AuthError::CallbackError {
                    message: match result {
                        Ok(()) => "callback server stopped".to_string(),
                        Err(e) => e.to_string(),
                    },
                }));
            }
            received = tokio::time::timeout(CALLBACK_TIMEOUT, rx) => match received {
                Err(_) => {
                    return Err(GmailMcpError::Auth(AuthError::Timeout {
                        secs: CALLBACK_TIMEOUT.as_secs(),
                    }));
                }
                Ok(Err(_)) => return Err(GmailMcpError::Auth(AuthError::NoAuthCode)),
                Ok(Ok(Err(message))) => {
                    return Err(GmailMcpError::Auth(AuthError::CallbackError { message }));
                }
                Ok(Ok(Ok(code))) => code,
            },
        };

        eprintln!("Received authorization code, exchanging for token...");
        self.exchange_code(&code).await?;
        eprintln!("Authorization completed successfully!");

        Ok(())
    }
}
