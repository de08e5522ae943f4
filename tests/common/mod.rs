//! Shared utilities for integration testing.

use std::net::SocketAddr;

use soulgrid::{Database, HttpServer, ServerConfig, Shutdown};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// A running server bound to an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    _dir: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a server with `config`. Forwarded headers are trusted so tests can
/// impersonate distinct clients from the loopback peer.
pub async fn start_server(mut config: ServerConfig) -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    config.listener.trust_forwarded = true;
    config.database.path = dir.path().join("test.db").to_string_lossy().into_owned();

    let db = Database::open(dir.path().join("test.db").as_path()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, db);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer {
        addr,
        shutdown,
        _dir: dir,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Register a `width` x `height` grid as `owner`.
#[allow(dead_code)]
pub async fn register_grid(
    server: &TestServer,
    owner: &str,
    width: i64,
    height: i64,
) -> reqwest::Response {
    let pixels: Vec<serde_json::Value> = (0..height)
        .flat_map(|y| (0..width).map(move |x| serde_json::json!({ "x": x, "y": y })))
        .collect();
    client()
        .post(server.url("/api/pixels/register"))
        .header("x-forwarded-for", owner)
        .json(&serde_json::json!({ "pixels": pixels }))
        .send()
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn paint(
    server: &TestServer,
    who: &str,
    x: i64,
    y: i64,
    color: &str,
) -> reqwest::Response {
    client()
        .post(server.url("/api/pixels/paint"))
        .header("x-forwarded-for", who)
        .json(&serde_json::json!({ "x": x, "y": y, "color": color }))
        .send()
        .await
        .unwrap()
}
