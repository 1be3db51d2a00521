//! Gmail MCP Server
//!
//! Runs the MCP server over stdio (default) or HTTP, or performs one-off
//! maintenance commands.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use auto_gmail_mcp::config::Config;
use auto_gmail_mcp::context::AppContext;
use auto_gmail_mcp::gmail::auth::Authenticator;
use auto_gmail_mcp::mcp::http::{self, DEFAULT_HTTP_PORT};
use auto_gmail_mcp::mcp::McpServer;

/// Gmail MCP Server
#[derive(Parser)]
#[command(name = "gmail-mcp-server")]
#[command(author, version, about = "Gmail MCP Server - A Model Context Protocol server for Gmail")]
struct Cli {
    /// Serve over HTTP instead of stdio
    #[arg(long)]
    http: bool,

    /// HTTP port
    #[arg(long, default_value_t = DEFAULT_HTTP_PORT)]
    port: u16,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate with Gmail and store the token
    Auth,

    /// Regenerate the personal email style guide from sent mail
    StyleGuide,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::new().context("failed to load configuration")?;
    tracing::info!("App data directory: {}", config.app_dir.display());

    match cli.command {
        Some(Commands::Auth) => {
            let authenticator = Authenticator::new(config).await?;
            authenticator
                .authenticate_interactive()
                .await
                .context("authentication failed")?;
            tracing::info!("Authentication completed successfully");
        }
        Some(Commands::StyleGuide) => {
            let context = AppContext::connect(config)
                .await
                .context("Gmail authentication failed")?;
            context
                .style_guide
                .generate(&context.gmail)
                .await
                .context("failed to generate style guide")?;
            tracing::info!(
                "Style guide written to {}",
                context.style_guide.path().display()
            );
        }
        None => run_server(config, cli.http, cli.port).await?,
    }

    Ok(())
}

async fn run_server(config: Config, use_http: bool, port: u16) -> anyhow::Result<()> {
    let context = AppContext::connect(config)
        .await
        .context("Gmail authentication failed")?;

    if let Err(e) = context.style_guide.ensure_exists(&context.gmail).await {
        tracing::warn!("Personal email style guide unavailable: {}", e);
    }

    let server = Arc::new(McpServer::new(Arc::new(context)));

    if use_http {
        tracing::info!("Starting Gmail MCP Server in HTTP mode on port {}", port);
        http::serve(server, port).await?;
    } else {
        tracing::info!("Starting Gmail MCP Server in stdio mode");
        server.run_stdio().await?;
    }

    Ok(())
}
