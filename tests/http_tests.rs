//! Tests for the reqwest backend against an in-process HTTP server, plus
//! end-to-end dispatches through a real `ChatSession`.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use textbook_assistant::backend::ChatRequest;
use textbook_assistant::session::UNREACHABLE_TEXT;
use textbook_assistant::{
    AssistantConfig, AssistantError, ChatBackend, ChatContext, ChatSession, ConnectionStatus,
    HttpBackend, PendingSelection,
};

// ---------------------------------------------------------------------------
// Mock server
// ---------------------------------------------------------------------------

/// Serve every connection with the same canned response. Returns the base URL
/// and a log of raw requests received.
async fn mock_server(status: u16, body: &'static str) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let log_clone = Arc::clone(&log);

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let log = Arc::clone(&log_clone);
            tokio::spawn(async move {
                let raw = read_request(&mut stream).await;
                log.lock().unwrap().push(raw);
                let response = format!(
                    "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), log)
}

/// Read one request: head plus `Content-Length` bytes of body.
async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

/// A base URL nothing is listening on.
async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn backend_for(url: &str) -> HttpBackend {
    let cfg = AssistantConfig::default().with_api_url(url).expect("valid url");
    HttpBackend::new(&cfg)
}

fn request(query: &str, selected: Option<&str>) -> ChatRequest {
    ChatRequest {
        query: query.to_string(),
        selected_text: selected.map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_health_ok() {
    let (url, log) = mock_server(200, r#"{"status":"ok"}"#).await;
    backend_for(&url).health().await.expect("healthy");
    let raw = log.lock().unwrap()[0].clone();
    assert!(raw.starts_with("GET /health HTTP/1.1"));
}

#[tokio::test]
async fn test_health_non_2xx_is_http_error() {
    let (url, _) = mock_server(503, "{}").await;
    let err = backend_for(&url).health().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn test_health_unreachable_is_network_error() {
    let err = backend_for(&dead_url().await).health().await.unwrap_err();
    assert!(err.is_network());
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_chat_posts_json_and_parses_reply() {
    let (url, log) = mock_server(
        200,
        r#"{"response":"A neuron computes a weighted sum.","source_documents":[{"title":"Neurons","url":"/docs/neurons","excerpt":"..."}]}"#,
    )
    .await;

    let reply = backend_for(&url)
        .chat(&request("what is a neuron?", Some("perceptron")))
        .await
        .expect("reply");
    assert_eq!(reply.answer, "A neuron computes a weighted sum.");
    assert_eq!(reply.sources[0].url, "/docs/neurons");

    let raw = log.lock().unwrap()[0].clone();
    assert!(raw.starts_with("POST /chat HTTP/1.1"));
    assert!(raw.to_ascii_lowercase().contains("content-type: application/json"));
    assert!(raw.contains(r#""query":"what is a neuron?""#));
    assert!(raw.contains(r#""selected_text":"perceptron""#));
}

#[tokio::test]
async fn test_chat_null_selection_on_wire() {
    let (url, log) = mock_server(200, r#"{"response":"ok"}"#).await;
    backend_for(&url).chat(&request("hi", None)).await.expect("reply");
    assert!(log.lock().unwrap()[0].contains(r#""selected_text":null"#));
}

#[tokio::test]
async fn test_chat_404_is_http_error() {
    let (url, _) = mock_server(404, r#"{"detail":"Not Found"}"#).await;
    let err = backend_for(&url).chat(&request("hi", None)).await.unwrap_err();
    assert!(matches!(err, AssistantError::Http { status: 404, .. }));
}

#[tokio::test]
async fn test_chat_missing_answer_is_malformed() {
    let (url, _) = mock_server(200, r#"{"message":"Welcome"}"#).await;
    let err = backend_for(&url).chat(&request("hi", None)).await.unwrap_err();
    assert!(matches!(err, AssistantError::Malformed { .. }));
}

// ---------------------------------------------------------------------------
// End to end through ChatSession
// ---------------------------------------------------------------------------

fn session_for(url: &str) -> ChatSession<HttpBackend> {
    ChatSession::new(ChatContext::new(Arc::new(backend_for(url)), PendingSelection::new()))
}

#[tokio::test]
async fn test_session_network_failure_message() {
    let session = session_for(&dead_url().await);
    assert_eq!(session.mount().await, ConnectionStatus::Disconnected);

    session.set_input("hello?");
    session.send().await;

    let msgs = session.messages();
    assert_eq!(msgs.len(), 2);
    assert!(msgs[1].is_error());
    assert_eq!(msgs[1].text(), UNREACHABLE_TEXT);
}

#[tokio::test]
async fn test_session_http_500_message() {
    let (url, _) = mock_server(500, r#"{"detail":"boom"}"#).await;
    let session = session_for(&url);
    assert_eq!(session.mount().await, ConnectionStatus::Disconnected);

    session.set_input("hello?");
    session.send().await;

    let msgs = session.messages();
    assert_eq!(msgs.len(), 2);
    assert!(msgs[1].is_error());
    assert!(msgs[1].text().contains("500"));
}

#[tokio::test]
async fn test_session_success_round_trip() {
    let (url, _) = mock_server(200, r#"{"response":"Backprop applies the **chain rule**."}"#).await;
    let session = session_for(&url);
    assert_eq!(session.mount().await, ConnectionStatus::Connected);

    session.set_input("How does backpropagation work?");
    session.send().await;

    let msgs = session.messages();
    assert_eq!(msgs[1].text(), "Backprop applies the **chain rule**.");
    assert!(!msgs[1].is_error());
}
