//! Dashboard HTTP server with the route guard in front of every page.
//!
//! Pages are placeholders; sessions are issued by the external auth service
//! and only their cookie is observed here.

use colored::*;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};

use crate::config::AssistantConfig;
use crate::error::AssistantError;
use crate::guard::{GuardDecision, RouteGuard};

/// Largest request head accepted.
const MAX_HEAD_BYTES: usize = 8192;
const MAX_HEADERS: usize = 32;

/// A fully-buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub reason: &'static str,
    pub content_type: &'static str,
    pub location: Option<String>,
    pub body: String,
}

impl Response {
    fn html(status: u16, reason: &'static str, body: String) -> Self {
        Self {
            status,
            reason,
            content_type: "text/html; charset=utf-8",
            location: None,
            body,
        }
    }

    fn json<T: Serialize>(value: &T) -> Self {
        Self {
            status: 200,
            reason: "OK",
            content_type: "application/json",
            location: None,
            body: serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string()),
        }
    }

    fn redirect(location: &str) -> Self {
        Self {
            status: 307,
            reason: "Temporary Redirect",
            content_type: "text/plain; charset=utf-8",
            location: Some(location.to_string()),
            body: String::new(),
        }
    }

    /// Serialize status line, headers and body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
            self.status,
            self.reason,
            self.content_type,
            self.body.len(),
        );
        if let Some(loc) = &self.location {
            head.push_str(&format!("Location: {loc}\r\n"));
        }
        head.push_str("\r\n");
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{title} · AI Textbook</title></head>\n<body>\n<nav><a href=\"/dashboard\">Dashboard</a> <a href=\"/chat\">Chat</a> <a href=\"/history\">History</a></nav>\n<main><h1>{title}</h1>\n{body}</main>\n</body>\n</html>"
    )
}

/// Apply the guard, then dispatch to a page.
pub fn route(guard: &RouteGuard, method: &str, target: &str, cookie: Option<&str>) -> Response {
    let path = target.split('?').next().unwrap_or("/");

    match guard.decide(path, cookie) {
        GuardDecision::Allow => {}
        decision => {
            let location = decision.location().unwrap_or("/");
            debug!(path, location, "guard redirect");
            return Response::redirect(location);
        }
    }

    if method != "GET" && method != "HEAD" {
        return Response::html(405, "Method Not Allowed", page("Method not allowed", ""));
    }

    match path {
        "/" => Response::html(200, "OK", page("AI Textbook", "<p>Learn deep learning with an AI study assistant.</p>")),
        "/api/health" => Response::json(&Health { status: "ok" }),
        "/login" => Response::html(200, "OK", page("Sign in", "<p>Sign in with your textbook account.</p>")),
        "/signup" => Response::html(200, "OK", page("Create account", "<p>Create an account to save your progress.</p>")),
        "/dashboard" => Response::html(200, "OK", page("Dashboard", "<p>Welcome back.</p>")),
        "/chat" => Response::html(200, "OK", page("AI Learning Assistant", "<p>Ask me anything about deep learning, neural networks, or AI concepts from the textbook.</p>")),
        "/history" => Response::html(200, "OK", page("Chat History", "<p>No conversations yet.</p>")),
        _ => Response::html(404, "Not Found", page("Not found", "")),
    }
}

/// Bind `127.0.0.1:port` and serve until the process exits.
pub async fn serve(config: &AssistantConfig, port: u16) -> Result<(), AssistantError> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    eprintln!(
        "{}",
        format!("  Dashboard running at http://localhost:{}", port).bright_green()
    );
    eprintln!("{}", "  Press Ctrl+C to stop.".bright_blue());

    run(listener, RouteGuard::new(config.guard.clone())).await
}

/// Accept loop over an already-bound listener.
pub async fn run(listener: TcpListener, guard: RouteGuard) -> Result<(), AssistantError> {
    loop {
        let (stream, addr) = listener.accept().await?;
        let guard = guard.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, &guard).await {
                warn!(peer = %addr, error = %e, "connection error");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, guard: &RouteGuard) -> Result<(), AssistantError> {
    let mut buf = vec![0u8; MAX_HEAD_BYTES];
    let mut filled = 0;

    loop {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            return Ok(());
        }
        filled += n;

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        match req.parse(&buf[..filled]) {
            Ok(httparse::Status::Complete(_)) => {
                let method = req.method.unwrap_or("GET");
                let target = req.path.unwrap_or("/");
                let cookie = req
                    .headers
                    .iter()
                    .find(|h| h.name.eq_ignore_ascii_case("cookie"))
                    .and_then(|h| std::str::from_utf8(h.value).ok());
                let mut response = route(guard, method, target, cookie);
                if method == "HEAD" {
                    response.body.clear();
                }
                stream.write_all(&response.to_bytes()).await?;
                return Ok(());
            }
            Ok(httparse::Status::Partial) if filled < buf.len() => continue,
            Ok(httparse::Status::Partial) => {
                let resp = Response::html(431, "Request Header Fields Too Large", String::new());
                stream.write_all(&resp.to_bytes()).await?;
                return Ok(());
            }
            Err(e) => {
                debug!(error = %e, "unparseable request");
                let resp = Response::html(400, "Bad Request", String::new());
                stream.write_all(&resp.to_bytes()).await?;
                return Ok(());
            }
        }
    }
}
