#![allow(dead_code)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

/// Minimal HTTP/1.1 server answering every request with the same response.
pub struct StubServer {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start(status: u16, body: &str) -> Self {
        Self::start_delayed(status, body, None).await
    }

    pub async fn start_delayed(status: u16, body: &str, delay: Option<Duration>) -> Self {
        let response = format!(
            "HTTP/1.1 {status} Stub\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{body}",
            body.len()
        );
        Self::spawn(response, delay).await
    }

    /// Writes `response` verbatim and closes, even if it is not valid HTTP.
    pub async fn start_raw(response: &str) -> Self {
        Self::spawn(response.to_string(), None).await
    }

    async fn spawn(response: String, delay: Option<Duration>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let requests = Arc::new(Mutex::new(Vec::new()));

        let log = requests.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else { break };
                let request = read_request(&mut socket).await;
                log.lock().unwrap().push(request);

                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }

                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self { base_url: format!("http://{addr}"), requests, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Address nothing listens on, for connection-refused cases.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("ephemeral address");
    drop(listener);
    format!("http://{addr}/data/2.5/weather")
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        if let Some(pos) = find_head_end(&buf) {
            break pos;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).into_owned(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = head_end + 4;
    while buf.len() < body_start + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

pub const TOKYO_BODY: &str = r#"{
    "name": "Tokyo",
    "sys": {"country": "JP"},
    "main": {"temp": 15.2, "feels_like": 14.6, "humidity": 60, "pressure": 1013},
    "weather": [{"description": "clear sky"}],
    "wind": {"speed": 3.6},
    "visibility": 10000
}"#;

pub const PARIS_BODY: &str = r#"{
    "name": "Paris",
    "sys": {"country": "FR"},
    "main": {"temp": 9.8, "feels_like": 7.1, "humidity": 81, "pressure": 1009},
    "weather": [{"description": "light rain"}],
    "wind": {"speed": 5.1},
    "visibility": 8000
}"#;

pub fn chat_completion(content: &str) -> String {
    serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
    .to_string()
}
