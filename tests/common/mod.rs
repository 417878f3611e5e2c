//! Raw TCP mock of an OpenAI-compatible proxy.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fallback_probe::config::ProbeConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the mock received.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub head: String,
    pub body: String,
}

impl CapturedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }

    /// Content of the first message, e.g. "Count to 7".
    pub fn prompt(&self) -> String {
        self.json()["messages"][0]["content"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Sequence number parsed from a "Count to N" prompt.
    pub fn seq(&self) -> usize {
        self.prompt()
            .rsplit(' ')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap()
    }
}

pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn ok(body: String) -> Self {
        Self {
            status: 200,
            body,
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// In-flight bookkeeping shared with the test.
#[derive(Default)]
pub struct Stats {
    pub served: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

pub fn completion_body(id: &str, model: &str, content: &str) -> String {
    serde_json::json!({
        "id": id,
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
    })
    .to_string()
}

pub fn config_for(port: u16) -> ProbeConfig {
    ProbeConfig {
        base_url: format!("http://127.0.0.1:{port}"),
        ..Default::default()
    }
}

/// Bind a TCP listener on localhost and return (listener, port).
pub async fn mock_listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

/// Serve every connection with `handler` until the test ends.
/// The handler sees the request's arrival index (0-based) and the request.
pub async fn spawn_server<F>(handler: F) -> (u16, Arc<Stats>)
where
    F: Fn(usize, &CapturedRequest) -> Reply + Send + Sync + 'static,
{
    let (listener, port) = mock_listener().await;
    let handler = Arc::new(handler);
    let stats = Arc::new(Stats::default());
    let server_stats = stats.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let handler = handler.clone();
            let stats = server_stats.clone();
            tokio::spawn(async move {
                let Some(req) = read_request(&mut socket).await else {
                    return;
                };
                let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                stats.peak.fetch_max(now, Ordering::SeqCst);
                let index = stats.served.fetch_add(1, Ordering::SeqCst);

                let reply = handler(index, &req);
                if !reply.delay.is_zero() {
                    tokio::time::sleep(reply.delay).await;
                }
                stats.in_flight.fetch_sub(1, Ordering::SeqCst);
                write_response(&mut socket, reply.status, &reply.body).await;
            });
        }
    });

    (port, stats)
}

/// Accept exactly one connection, reply, and hand back what was received.
pub async fn serve_once(
    listener: TcpListener,
    status: u16,
    body: String,
) -> tokio::task::JoinHandle<CapturedRequest> {
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let req = read_request(&mut socket).await.unwrap();
        write_response(&mut socket, status, &body).await;
        req
    })
}

pub async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.trim().eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();
    Some(CapturedRequest { head, body })
}

pub async fn write_response(socket: &mut TcpStream, status: u16, body: &str) {
    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        403 => "Forbidden",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}
