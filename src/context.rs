//! Application context
//!
//! Everything a request handler needs, built once at startup and shared by
//! reference. There is no process-wide mutable state.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::gmail::auth::Authenticator;
use crate::gmail::client::GmailClient;
use crate::style::StyleGuideStore;

/// Shared state of a running server
pub struct AppContext {
    /// Paths, credentials and limits
    pub config: Config,

    /// Gmail API client
    pub gmail: Arc<GmailClient>,

    /// Personal email style guide
    pub style_guide: StyleGuideStore,
}

impl AppContext {
    /// Build the context without contacting any service
    pub async fn new(config: Config) -> Result<Self> {
        let authenticator = Arc::new(Authenticator::new(config.clone()).await?);
        let gmail = Arc::new(GmailClient::new(authenticator));
        let style_guide = StyleGuideStore::new(&config);

        Ok(Self {
            config,
            gmail,
            style_guide,
        })
    }

    /// Build the context and make sure Gmail access works
    pub async fn connect(config: Config) -> Result<Self> {
        let context = Self::new(config).await?;
        let profile = context.gmail.ensure_authenticated().await?;
        tracing::info!("Authenticated with Gmail as {}", profile.email_address);
        Ok(context)
    }
}
