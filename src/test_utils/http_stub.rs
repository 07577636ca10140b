//! Minimal in-process HTTP/1.1 server for exercising network code.
//!
//! Each route maps an exact request path to a canned response. Unknown paths
//! get a 404. Every connection is closed after one response.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

type Routes = Arc<Mutex<HashMap<String, StubResponse>>>;

/// A canned response.
#[derive(Debug, Clone)]
pub struct StubResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    content_length: bool,
    /// Body piece size and the pause before each following piece.
    pacing: Option<(usize, Duration)>,
}

impl StubResponse {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            content_length: true,
            pacing: None,
        }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::status(200).with_body(body)
    }

    pub fn json(body: &str) -> Self {
        Self::ok(body).with_header("Content-Type", "application/json")
    }

    pub fn redirect(location: &str) -> Self {
        Self::status(302).with_header("Location", location)
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Sends the body in `piece`-byte writes separated by `pause`.
    pub fn paced(mut self, piece: usize, pause: Duration) -> Self {
        self.pacing = Some((piece.max(1), pause));
        self
    }

    /// Omits `Content-Length`; the body is delimited by connection close.
    pub fn without_content_length(mut self) -> Self {
        self.content_length = false;
        self
    }
}

/// A running stub server. Stops when dropped.
pub struct StubServer {
    addr: SocketAddr,
    routes: Routes,
    hits: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    /// Binds an ephemeral loopback port and starts serving `routes`.
    pub async fn start<P: Into<String>>(routes: impl IntoIterator<Item = (P, StubResponse)>) -> Self {
        let routes: Routes = Arc::new(Mutex::new(routes.into_iter().map(|(p, r)| (p.into(), r)).collect()));
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub server");
        let addr = listener.local_addr().expect("stub server address");
        let hits = Arc::new(Mutex::new(Vec::new()));

        let accept_routes = Arc::clone(&routes);
        let accept_hits = Arc::clone(&hits);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = Arc::clone(&accept_routes);
                let hits = Arc::clone(&accept_hits);
                tokio::spawn(async move {
                    let _ = serve(stream, &routes, &hits).await;
                });
            }
        });

        Self {
            addr,
            routes,
            hits,
            handle,
        }
    }

    /// Adds or replaces the response for `path`.
    pub fn route(&self, path: impl Into<String>, response: StubResponse) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(path.into(), response);
        }
    }

    /// Base URL, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Paths requested so far, in arrival order.
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    mut stream: TcpStream,
    routes: &Mutex<HashMap<String, StubResponse>>,
    hits: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }

    let head = String::from_utf8_lossy(&request);
    let target = head.lines().next().and_then(|line| line.split_whitespace().nth(1)).unwrap_or("/");
    let path = target.split('?').next().unwrap_or(target).to_string();
    if let Ok(mut hits) = hits.lock() {
        hits.push(path.clone());
    }

    let response = routes
        .lock()
        .ok()
        .and_then(|routes| routes.get(&path).cloned())
        .unwrap_or_else(|| StubResponse::status(404));
    let reason = reqwest::StatusCode::from_u16(response.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");

    let mut head = format!("HTTP/1.1 {} {}\r\nConnection: close\r\n", response.status, reason);
    for (name, value) in &response.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    if response.content_length {
        head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes()).await?;
    match response.pacing {
        Some((piece, pause)) => {
            for (i, part) in response.body.chunks(piece).enumerate() {
                if i > 0 {
                    tokio::time::sleep(pause).await;
                }
                stream.write_all(part).await?;
                stream.flush().await?;
            }
        }
        None => stream.write_all(&response.body).await?,
    }
    stream.shutdown().await
}
