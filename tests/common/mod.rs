#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

const READ_DEADLINE: Duration = Duration::from_secs(6);
const MAX_HEADER_BYTES: usize = 64 * 1024;

pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub query: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is json")
    }

    /// `METHOD /path`, handy for asserting the call sequence.
    pub fn line(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Mock graph endpoint answering one scripted response per connection, in order.
pub struct MockGraph {
    pub base_url: String,
    requests: mpsc::UnboundedReceiver<CapturedRequest>,
}

impl MockGraph {
    pub async fn start(responses: Vec<String>) -> Self {
        Self::start_with(|_| responses).await
    }

    /// Like [`MockGraph::start`], for scripts that embed the server's own URL.
    pub async fn start_with(script: impl FnOnce(&str) -> Vec<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let base_url = format!("http://{addr}");
        let responses = script(&base_url);
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            for response in responses {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let req = read_request(&mut stream).await;
                let _ = tx.send(req);
                let _ = stream.write_all(close_after(&response).as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            base_url,
            requests: rx,
        }
    }

    /// Every request received so far.
    pub fn requests(&mut self) -> Vec<CapturedRequest> {
        let mut requests = Vec::new();
        while let Ok(req) = self.requests.try_recv() {
            requests.push(req);
        }
        requests
    }
}

fn close_after(response: &str) -> String {
    match response.split_once("\r\n") {
        Some((status, rest)) => format!("{status}\r\nConnection: close\r\n{rest}"),
        None => response.to_string(),
    }
}

pub fn response_with_body(status: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!("HTTP/1.1 {status}\r\n");
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str(&format!("Content-Length: {}\r\n\r\n{}", body.len(), body));
    response
}

pub fn json_response(status: &str, body: serde_json::Value) -> String {
    response_with_body(
        status,
        &[("Content-Type", "application/json")],
        &body.to_string(),
    )
}

pub fn empty_response(status: &str) -> String {
    format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\n\r\n")
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> CapturedRequest {
    timeout(READ_DEADLINE, read_request_inner(stream))
        .await
        .expect("timed out reading request")
}

async fn read_request_inner(stream: &mut tokio::net::TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        assert!(buf.len() < MAX_HEADER_BYTES, "request headers too large");
        let read = stream.read(&mut chunk).await.expect("read request");
        assert!(read > 0, "connection closed before request headers ended");
        buf.extend_from_slice(&chunk[..read]);
    };

    let header_str = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = header_str.split("\r\n");
    let mut request_line = lines.next().unwrap_or("").split_whitespace();
    let method = request_line.next().unwrap_or("").to_string();
    let target = request_line.next().unwrap_or("");
    let (path, query_str) = target.split_once('?').unwrap_or((target, ""));
    let path = path.to_string();
    let query: HashMap<String, String> = url::form_urlencoded::parse(query_str.as_bytes())
        .into_owned()
        .collect();

    let headers: Vec<(String, String)> = lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(':'))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect();
    let content_length = headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, value)| value.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let read = stream.read(&mut chunk).await.expect("read request body");
        assert!(read > 0, "connection closed before request body ended");
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    CapturedRequest {
        method,
        path,
        headers,
        query,
        body,
    }
}
