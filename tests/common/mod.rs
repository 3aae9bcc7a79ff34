//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use webhook_guard::config::GuardConfig;
use webhook_guard::http::HttpServer;
use webhook_guard::lifecycle::Shutdown;
use webhook_guard::verification;

/// Build a provider metadata body publishing the given hook ranges.
#[allow(dead_code)]
pub fn hooks_body(ranges: &[&str]) -> String {
    let entries: Vec<String> = ranges.iter().map(|r| format!("{:?}", r)).collect();
    format!("{{\"hooks\": [{}]}}", entries.join(", "))
}

/// A valid provider webhook payload.
#[allow(dead_code)]
pub fn webhook_payload() -> String {
    r#"{
        "repository": {
            "name": "hello-world",
            "full_name": "octocat/hello-world",
            "git_url": "git://github.com/octocat/hello-world.git",
            "clone_url": "https://github.com/octocat/hello-world.git"
        }
    }"#
    .to_string()
}

/// Start a mock metadata endpoint returning a fixed JSON body.
#[allow(dead_code)]
pub async fn start_mock_meta(addr: SocketAddr, body: String) {
    start_programmable_meta(addr, move || {
        let body = body.clone();
        async move { (200, body) }
    })
    .await;
}

/// Start a programmable mock metadata endpoint.
#[allow(dead_code)]
pub async fn start_programmable_meta<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        // Drain the request head before answering.
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a mock downstream that captures every raw request it receives and
/// answers 200.
#[allow(dead_code)]
pub async fn start_capture_downstream(
    addr: SocketAddr,
    captured: mpsc::UnboundedSender<String>,
) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let captured = captured.clone();
                    tokio::spawn(async move {
                        let request = read_http_request(&mut socket).await;
                        let _ = captured.send(request);

                        let body = "relayed";
                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Read one HTTP/1.1 request (head plus Content-Length body) as a string.
#[allow(dead_code)]
async fn read_http_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        data.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&data);
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    if name.eq_ignore_ascii_case("content-length") {
                        value.trim().parse::<usize>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(0);

            if data.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }

    String::from_utf8_lossy(&data).into_owned()
}

/// Bootstrap the trust snapshot and start a guard server. Returns the
/// shutdown coordinator so tests can stop it.
#[allow(dead_code)]
pub async fn start_guard(addr: SocketAddr, config: GuardConfig) -> Shutdown {
    let trust = verification::bootstrap(&config.trust)
        .await
        .expect("bootstrap fetch must succeed");
    let server = HttpServer::new(config, trust).expect("server construction must succeed");
    let listener = TcpListener::bind(addr).await.unwrap();

    let shutdown = Shutdown::new();
    let handle = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, &handle).await;
    });

    // Give the server a moment to start accepting.
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown
}

/// Default test configuration pointing at local mock endpoints.
#[allow(dead_code)]
pub fn guard_config(meta_addr: SocketAddr, downstream_addr: SocketAddr) -> GuardConfig {
    let mut config = GuardConfig::default();
    config.trust.meta_url = format!("http://{}/meta", meta_addr);
    config.trust.fetch_timeout_secs = 2;
    config.forward.proxy_url = format!("http://{}", downstream_addr);
    config
}
