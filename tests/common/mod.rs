//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    response::Response,
    Router,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use proxyutil::http::{HttpServer, RequestRecord, TelemetrySink};
use proxyutil::routing::{parse_one, RoutingTable};
use proxyutil::ProxyConfig;

/// Collects telemetry records in memory.
#[derive(Default)]
pub struct MemorySink(Mutex<Vec<RequestRecord>>);

impl TelemetrySink for MemorySink {
    fn emit(&self, record: &RequestRecord) {
        self.0.lock().unwrap().push(record.clone());
    }
}

impl MemorySink {
    pub fn records(&self) -> Vec<RequestRecord> {
        self.0.lock().unwrap().clone()
    }

    /// Wait until at least `n` records arrive, then allow stragglers to show up.
    pub async fn wait_for(&self, n: usize) -> Vec<RequestRecord> {
        for _ in 0..200 {
            if self.0.lock().unwrap().len() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.records()
    }
}

/// Echo what the upstream received: name, method and target in the body,
/// selected request headers as `x-seen-*` response headers.
async fn echo(State(name): State<&'static str>, request: Request) -> Response {
    let seen = |header: &str| {
        request
            .headers()
            .get(header)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("x-seen-forwarded-for", seen("x-forwarded-for"))
        .header("x-seen-via", seen("via"))
        .header("x-seen-host", seen("host"))
        .header("x-seen-request-id", seen("x-request-id"))
        .header("x-seen-custom-hop", seen("x-custom-hop"))
        .body(Body::from(format!("{} {} {}", name, request.method(), request.uri())))
        .unwrap()
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Start an upstream that echoes the request it received.
pub async fn start_echo_upstream(name: &'static str) -> SocketAddr {
    serve(Router::new().fallback(echo).with_state(name)).await
}

/// Start an upstream that streams the request body straight back.
pub async fn start_mirror_upstream() -> SocketAddr {
    serve(Router::new().fallback(|request: Request| async move {
        Response::new(request.into_body())
    }))
    .await
}

/// Start an upstream that answers after `delay`.
pub async fn start_slow_upstream(delay: Duration) -> SocketAddr {
    serve(Router::new().fallback(move || async move {
        tokio::time::sleep(delay).await;
        "finally"
    }))
    .await
}

/// Start an upstream that promises more body than it sends, then hangs up.
pub async fn start_truncating_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let _ = socket
                            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\npartial")
                            .await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start an upstream that reads requests and never answers.
///
/// Sends the moment each connection is closed by the proxy.
pub async fn start_silent_upstream() -> (SocketAddr, mpsc::UnboundedReceiver<Instant>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (closed_tx, closed_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let closed_tx = closed_tx.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(_) => continue,
                    }
                }
                let _ = closed_tx.send(Instant::now());
            });
        }
    });

    (addr, closed_rx)
}

/// An address nothing is listening on.
pub fn refused_address() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Start the proxy with the given descriptors and sink.
pub async fn start_proxy(descriptors: &[String], sink: Arc<MemorySink>) -> SocketAddr {
    let table = RoutingTable::build(descriptors.iter().map(|d| parse_one(d).unwrap()));
    let server = HttpServer::with_sink(&ProxyConfig::default(), table, sink);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    addr
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
