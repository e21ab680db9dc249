//! HTTP error handling against a local server
//!
//! Each test serves one canned response on a loopback port and checks how
//! `OpenAiProvider::chat` classifies it.

use reactant_provider::{ChatParams, Message, OpenAiProvider, Provider, ProviderError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve a single response, reading the whole request first
async fn serve_once(status_line: &str, content_type: &str, body: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        content_type,
        body.len(),
        body
    );

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if request_complete(&request) {
                break;
            }
        }
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });

    format!("http://{}/v1", addr)
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    request.len() >= header_end + 4 + content_length
}

fn params() -> ChatParams {
    ChatParams {
        messages: vec![Message::user("What is the weather in Paris?")],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_gateway_html_503_is_transient_api_error() {
    let base = serve_once(
        "503 Service Unavailable",
        "text/html",
        "<html>upstream down</html>",
    )
    .await;
    let provider = OpenAiProvider::new("sk-test", Some(base), Some("local".to_string()));

    let err = provider.chat(params()).await.unwrap_err();
    match &err {
        ProviderError::Api { status, message } => {
            assert_eq!(*status, 503);
            assert!(message.contains("upstream down"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_html_404_keeps_status() {
    let base = serve_once("404 Not Found", "text/html", "<h1>Not Found</h1>").await;
    let provider = OpenAiProvider::new("sk-test", Some(base), None);

    let err = provider.chat(params()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Api { status: 404, .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_json_error_body_message_extracted() {
    let base = serve_once(
        "400 Bad Request",
        "application/json",
        r#"{"error": {"message": "model `nope` does not exist"}}"#,
    )
    .await;
    let provider = OpenAiProvider::new("sk-test", Some(base), None);

    let err = provider.chat(params()).await.unwrap_err();
    assert_eq!(err.to_string(), "API error (400): model `nope` does not exist");
}

#[tokio::test]
async fn test_rate_limit_status() {
    let base = serve_once("429 Too Many Requests", "text/plain", "slow down").await;
    let provider = OpenAiProvider::new("sk-test", Some(base), None);

    let err = provider.chat(params()).await.unwrap_err();
    assert!(matches!(err, ProviderError::RateLimited));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_success_body_parsed() {
    let base = serve_once(
        "200 OK",
        "application/json",
        r#"{"choices": [{"message": {"role": "assistant", "content": "Thought: ok\nAction: Finish[sunny]"}, "finish_reason": "stop"}]}"#,
    )
    .await;
    let provider = OpenAiProvider::new("sk-test", Some(base), None);

    let text = provider.generate(params()).await.unwrap();
    assert_eq!(text, "Thought: ok\nAction: Finish[sunny]");
}
