//! Integration tests for Gmail MCP Server
//!
//! These tests exercise the content pipeline and the MCP protocol handling
//! end to end. No Gmail or completion API calls are made: the server is
//! built over a temporary app directory without a token.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use auto_gmail_mcp::config::Config;
use auto_gmail_mcp::context::AppContext;
use auto_gmail_mcp::mcp::McpServer;

/// Helper to create a JSON-RPC request
fn make_request(id: i64, method: &str, params: Option<Value>) -> String {
    let mut request = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
    });
    if let Some(p) = params {
        request["params"] = p;
    }
    request.to_string()
}

async fn make_server(dir: &Path) -> McpServer {
    let mut config = Config::with_app_dir(dir).expect("app dir");
    config.completion.api_key = None;
    let context = AppContext::new(config).await.expect("context");
    McpServer::new(Arc::new(context))
}

/// Send one request and return the response as JSON
async fn call(server: &McpServer, request: String) -> Value {
    let response = server
        .handle_message(&request)
        .await
        .expect("handled")
        .expect("response expected");
    serde_json::to_value(response).expect("serializable")
}

mod content_pipeline_tests {
    use std::io::{Cursor, Write};

    use auto_gmail_mcp::content::{
        collect_attachments, decode_text, encode_url_safe, extract_text,
        find_part_by_attachment_reference, resolve_body, NormalizedBody,
    };
    use auto_gmail_mcp::error::ContentError;
    use auto_gmail_mcp::gmail::client::select_by_filename;
    use auto_gmail_mcp::gmail::types::Message;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde_json::json;

    fn docx(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in [
            ("[Content_Types].xml", "<Types/>"),
            ("word/document.xml", document_xml),
        ] {
            writer
                .start_file(name, zip::write::FileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    /// A message shaped like a Gmail `format=full` response
    fn gmail_message() -> Message {
        serde_json::from_value(json!({
            "id": "18c2f",
            "threadId": "18c2e",
            "snippet": "Please review",
            "payload": {
                "mimeType": "multipart/mixed",
                "filename": "",
                "headers": [
                    {"name": "Subject", "value": "Contract"},
                    {"name": "From", "value": "Dana <dana@example.com>"}
                ],
                "body": {"size": 0},
                "parts": [
                    {
                        "mimeType": "multipart/alternative",
                        "filename": "",
                        "body": {"size": 0},
                        "parts": [
                            {
                                "mimeType": "text/plain",
                                "filename": "",
                                "body": {"size": 13, "data": encode_url_safe(b"Please review")}
                            },
                            {
                                "mimeType": "text/html",
                                "filename": "",
                                "body": {"size": 28, "data": encode_url_safe(b"<p>Please <b>review</b></p>")}
                            }
                        ]
                    },
                    {
                        "mimeType": "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                        "filename": "contract.docx",
                        "body": {"attachmentId": "ANGjdJ-1", "size": 4096}
                    },
                    {
                        "mimeType": "image/png",
                        "filename": "logo.png",
                        "body": {"attachmentId": "ANGjdJ-2", "size": 512}
                    }
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_html_body_is_preferred_and_normalized() {
        let message = gmail_message();
        match resolve_body(&message) {
            NormalizedBody::Html(text) => {
                assert!(text.contains("review"));
                assert!(!text.contains("<p>"));
            }
            other => panic!("expected html body, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_only_message() {
        let message: Message = serde_json::from_value(json!({
            "id": "m",
            "payload": {
                "mimeType": "text/plain",
                "body": {"size": 5, "data": STANDARD.encode("hi+/?")}
            }
        }))
        .unwrap();
        assert_eq!(resolve_body(&message), NormalizedBody::Plain("hi+/?".to_string()));
    }

    #[test]
    fn test_message_without_payload_is_empty() {
        let message: Message = serde_json::from_value(json!({"id": "m"})).unwrap();
        assert!(resolve_body(&message).is_empty());
        assert_eq!(resolve_body(&message).into_text(), "");
    }

    #[test]
    fn test_attachment_listing_and_lookup() {
        let message = gmail_message();
        let payload = message.payload.as_ref().unwrap();

        let attachments = collect_attachments(payload);
        let names: Vec<&str> = attachments.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["contract.docx", "logo.png"]);
        assert!(attachments[0].extractable);
        assert!(!attachments[1].extractable);

        let selected = select_by_filename(&attachments, "contract.docx").unwrap();
        assert_eq!(selected.attachment_id, "ANGjdJ-1");

        let err = select_by_filename(&attachments, "missing.pdf").unwrap_err();
        let message_text = err.to_string();
        assert!(message_text.contains("contract.docx"));
        assert!(message_text.contains("logo.png"));

        let part = find_part_by_attachment_reference(payload, "ANGjdJ-2").unwrap();
        assert_eq!(part.filename.as_deref(), Some("logo.png"));
        assert!(find_part_by_attachment_reference(payload, "ANGjdJ-9").is_none());
    }

    #[test]
    fn test_docx_attachment_text() {
        let bytes = docx(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:body><w:p><w:r><w:t>Term: 12 months</w:t></w:r></w:p><w:p><w:r><w:t>Fee: $400</w:t></w:r></w:p></w:body>
</w:document>"#,
        );
        let text = extract_text(
            &bytes,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            "contract.docx",
        )
        .unwrap();
        assert!(text.contains("Term: 12 months"));
        assert!(text.contains("Fee: $400"));
    }

    #[test]
    fn test_docx_detected_by_extension() {
        let bytes = docx(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>CV</w:t></w:r></w:p></w:body></w:document>"#,
        );
        let text = extract_text(&bytes, "application/octet-stream", "CV.DOCX").unwrap();
        assert_eq!(text.trim(), "CV");
    }

    #[test]
    fn test_plain_text_attachment() {
        let text = extract_text(b"line one\nline two", "text/plain", "notes.txt").unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn test_unsupported_attachment() {
        let err = extract_text(&[0x89, 0x50, 0x4e, 0x47], "image/png", "logo.png").unwrap_err();
        assert!(matches!(err, ContentError::UnsupportedFileType { .. }));
    }

    #[test]
    fn test_corrupt_pdf_is_an_error() {
        let err = extract_text(b"%PDF-garbage", "application/pdf", "broken.pdf").unwrap_err();
        assert!(matches!(
            err,
            ContentError::PdfOpen { .. } | ContentError::NoTextInPdf
        ));
    }

    #[test]
    fn test_both_base64_alphabets_decode() {
        let bytes = "subject?>>".as_bytes();
        let url_safe = encode_url_safe(bytes);
        let standard = STANDARD.encode(bytes);
        assert_ne!(url_safe, standard);
        assert_eq!(decode_text(&url_safe).unwrap(), "subject?>>");
        assert_eq!(decode_text(&standard).unwrap(), "subject?>>");
    }
}

mod mcp_protocol_tests {
    use super::*;

    #[tokio::test]
    async fn test_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path()).await;

        let response = call(
            &server,
            make_request(
                1,
                "initialize",
                Some(json!({
                    "protocolVersion": "2024-11-05",
                    "clientInfo": {"name": "test-client", "version": "1.0.0"},
                    "capabilities": {}
                })),
            ),
        )
        .await;

        assert_eq!(response["jsonrpc"], "2.0");
        assert_eq!(response["id"], 1);
        assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(response["result"]["serverInfo"]["name"], "Gmail MCP Server");
    }

    #[tokio::test]
    async fn test_tools_list() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path()).await;

        let response = call(&server, make_request(2, "tools/list", None)).await;
        let tools = response["result"]["tools"].as_array().unwrap();
        let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();

        for expected in [
            "search_threads",
            "create_draft",
            "get_personal_email_style_guide",
            "extract_attachment_by_filename",
            "extract_attachment_by_id",
            "fetch_email_bodies",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
        for tool in tools {
            assert_eq!(tool["inputSchema"]["type"], "object");
        }
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path()).await;

        let response = call(&server, make_request(3, "bogus/method", None)).await;
        assert_eq!(response["error"]["code"], -32601);
        assert!(response.get("result").is_none());
    }

    #[tokio::test]
    async fn test_ping() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path()).await;

        let response = call(&server, make_request(4, "ping", None)).await;
        assert_eq!(response["result"], json!({}));
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path()).await;

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .unwrap();
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_tool_failure_is_a_result() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path()).await;

        let response = call(
            &server,
            make_request(
                5,
                "tools/call",
                Some(json!({"name": "search_threads", "arguments": {"query": "is:unread"}})),
            ),
        )
        .await;

        assert!(response.get("error").is_none());
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Failed to search threads"));
    }

    #[tokio::test]
    async fn test_tool_argument_validation() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path()).await;

        let ids = (0..25).map(|i| format!("t{i}")).collect::<Vec<_>>().join(",");
        let response = call(
            &server,
            make_request(
                6,
                "tools/call",
                Some(json!({"name": "fetch_email_bodies", "arguments": {"thread_ids": ids}})),
            ),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Maximum 20 thread_ids"));

        let response = call(
            &server,
            make_request(
                7,
                "tools/call",
                Some(json!({"name": "create_draft", "arguments": {"to": "a@example.com"}})),
            ),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path()).await;

        let response = call(
            &server,
            make_request(8, "tools/call", Some(json!({"name": "send_email"}))),
        )
        .await;
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(
            response["result"]["content"][0]["text"],
            "Unknown tool: send_email"
        );
    }

    #[tokio::test]
    async fn test_style_guide_tool_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("personal-email-style-guide.md"),
            "# Personal Email Style Guide for me@example.com\n\nKeep it short.",
        )
        .unwrap();
        let server = make_server(dir.path()).await;

        let response = call(
            &server,
            make_request(
                9,
                "tools/call",
                Some(json!({"name": "get_personal_email_style_guide", "arguments": {}})),
            ),
        )
        .await;
        assert!(response["result"].get("isError").is_none());
        assert!(response["result"]["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Keep it short."));
    }

    #[tokio::test]
    async fn test_resources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("personal-email-style-guide.md"), "# Guide").unwrap();
        let server = make_server(dir.path()).await;

        let response = call(&server, make_request(10, "resources/list", None)).await;
        let resources = response["result"]["resources"].as_array().unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0]["uri"], "file://personal-email-style-guide");
        assert_eq!(resources[0]["mimeType"], "text/markdown");

        let response = call(
            &server,
            make_request(
                11,
                "resources/read",
                Some(json!({"uri": "file://personal-email-style-guide"})),
            ),
        )
        .await;
        assert_eq!(response["result"]["contents"][0]["text"], "# Guide");

        let response = call(
            &server,
            make_request(12, "resources/read", Some(json!({"uri": "file://other"}))),
        )
        .await;
        assert_eq!(response["error"]["code"], -32602);
    }

    #[tokio::test]
    async fn test_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let server = make_server(dir.path()).await;

        let response = call(&server, make_request(13, "prompts/list", None)).await;
        let names: Vec<&str> = response["result"]["prompts"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p["name"].as_str())
            .collect();
        assert_eq!(names, vec!["generate-email-tone", "server-status"]);

        let response = call(
            &server,
            make_request(14, "prompts/get", Some(json!({"name": "server-status"}))),
        )
        .await;
        let message = &response["result"]["messages"][0];
        assert_eq!(message["role"], "user");
        assert!(message["content"]["text"]
            .as_str()
            .unwrap()
            .contains("Token File"));
    }
}

mod http_transport_tests {
    use super::*;

    use auto_gmail_mcp::mcp::http::router;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use tower::ServiceExt;

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(Arc::new(make_server(dir.path()).await), 8080);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            "*"
        );

        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["server"], "Gmail MCP Server");
        assert_eq!(body["gmail_authenticated"], false);
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_mcp_preflight() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(Arc::new(make_server(dir.path()).await), 8080);

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/mcp")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["access-control-allow-methods"],
            "POST, GET, OPTIONS"
        );
        assert_eq!(
            response.headers()["access-control-allow-headers"],
            "Content-Type"
        );
    }

    #[tokio::test]
    async fn test_mcp_post_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(Arc::new(make_server(dir.path()).await), 8080);

        let response = app
            .oneshot(
                Request::post("/mcp")
                    .header("content-type", "application/json")
                    .body(Body::from(make_request(1, "tools/list", None)))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_info_page_lists_tools() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(Arc::new(make_server(dir.path()).await), 9123);

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("port 9123"));
        assert!(html.contains("<li>fetch_email_bodies</li>"));
    }
}
