//! HTTP transport
//!
//! Serves an info page, a health check and JSON-RPC over `POST /mcp`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::error::Result;
use crate::mcp::server::{McpServer, SERVER_NAME, SERVER_VERSION};

pub const DEFAULT_HTTP_PORT: u16 = 8080;

const CORS_HEADERS: [(HeaderName, &str); 3] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, GET, OPTIONS"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
];

#[derive(Clone)]
struct HttpState {
    server: Arc<McpServer>,
    port: u16,
}

/// Build the router
pub fn router(server: Arc<McpServer>, port: u16) -> Router {
    Router::new()
        .route("/", get(info_page))
        .route("/health", get(health))
        .route(
            "/mcp",
            get(mcp_info).post(mcp_request).options(mcp_preflight),
        )
        .with_state(HttpState { server, port })
}

/// Serve until the process is stopped
pub async fn serve(server: Arc<McpServer>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("HTTP server listening on http://localhost:{}", port);
    tracing::info!("Health check: http://localhost:{}/health", port);

    axum::serve(listener, router(server, port)).await?;
    Ok(())
}

async fn info_page(State(state): State<HttpState>) -> Html<String> {
    let tools = state
        .server
        .tool_names()
        .into_iter()
        .map(|name| format!("<li>{}</li>", name))
        .collect::<Vec<_>>()
        .join("\n");

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{name}</title></head>
<body>
<h1>📧 {name}</h1>
<p><strong>Status:</strong> Running in HTTP mode on port {port}</p>
<p><strong>Client configuration:</strong></p>
<pre>
{{
  "mcpServers": {{
    "gmail-http": {{
      "url": "http://localhost:{port}/mcp"
    }}
  }}
}}
</pre>
<h2>Available Tools:</h2>
<ul>
{tools}
</ul>
</body>
</html>"#,
        name = SERVER_NAME,
        port = state.port,
        tools = tools,
    ))
}

async fn health(State(state): State<HttpState>) -> Response {
    let authenticated = state
        .server
        .context()
        .gmail
        .authenticator()
        .is_authenticated()
        .await;

    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Json(json!({
            "status": "healthy",
            "server": SERVER_NAME,
            "version": SERVER_VERSION,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "gmail_authenticated": authenticated,
        })),
    )
        .into_response()
}

async fn mcp_info() -> Response {
    (
        CORS_HEADERS,
        Json(json!({
            "message": format!("{} HTTP endpoint", SERVER_NAME),
            "note": "POST JSON-RPC 2.0 requests to this endpoint",
        })),
    )
        .into_response()
}

async fn mcp_preflight() -> Response {
    (StatusCode::OK, CORS_HEADERS).into_response()
}

async fn mcp_request(State(state): State<HttpState>, body: String) -> Response {
    match state.server.handle_message(&body).await {
        Ok(Some(response)) => (CORS_HEADERS, Json(response)).into_response(),
        Ok(None) => (StatusCode::ACCEPTED, CORS_HEADERS).into_response(),
        Err(e) => {
            tracing::error!("Error handling HTTP message: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, CORS_HEADERS, e.to_string()).into_response()
        }
    }
}
