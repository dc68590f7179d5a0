//! In-process HTTP/1.1 server with canned responses
//!
//! Each accepted connection gets the next scripted response (the last one
//! repeats) and is then closed. Request heads are recorded for assertions.
//! A response can be held back, cut short of its declared length, or left
//! open after the body to emulate a stalled upstream.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
    /// Content-Length to announce instead of the real body length
    pub declared_len: Option<usize>,
    /// Keep the connection open this long after writing the body
    pub hold_open: Option<Duration>,
}

impl Canned {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: None,
            declared_len: None,
            hold_open: None,
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    /// Hold the response back for `delay`
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Announce `len` bytes but send only the body
    pub fn truncated(mut self, len: usize) -> Self {
        self.declared_len = Some(len);
        self
    }

    /// Leave the connection open for `hold` after the body
    pub fn hold_open(mut self, hold: Duration) -> Self {
        self.hold_open = Some(hold);
        self
    }
}

/// Client that talks to the loopback server directly, ignoring proxy env vars
pub fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

pub struct CannedServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl CannedServer {
    pub async fn start(script: Vec<Canned>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(Mutex::new(VecDeque::from(script)));

        let handle = tokio::spawn({
            let requests = requests.clone();
            async move {
                let mut last: Option<Canned> = None;
                while let Ok((stream, _)) = listener.accept().await {
                    let canned = {
                        let mut script = script.lock().unwrap();
                        if let Some(next) = script.pop_front() {
                            last = Some(next);
                        }
                        last.clone().expect("script must not be empty")
                    };
                    tokio::spawn(serve(stream, canned, requests.clone()));
                }
            }
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    /// `http://127.0.0.1:port` followed by `path`
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Recorded request heads, oldest first
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for CannedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(mut stream: TcpStream, canned: Canned, requests: Arc<Mutex<Vec<String>>>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    requests
        .lock()
        .unwrap()
        .push(String::from_utf8_lossy(&buf).into_owned());

    if let Some(delay) = canned.delay {
        tokio::time::sleep(delay).await;
    }

    let response = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        canned.status,
        canned.declared_len.unwrap_or(canned.body.len()),
        canned.body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.flush().await;

    if let Some(hold) = canned.hold_open {
        tokio::time::sleep(hold).await;
    }
    let _ = stream.shutdown().await;
}
