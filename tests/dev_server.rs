use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use assetdag::config::ServerSection;
use assetdag::errors::{AssetdagError, Result};
use assetdag::server::{DevServer, LiveReload, CLIENT_PATH, EVENTS_PATH};
use assetdag::shutdown::{self, ShutdownTrigger};
use assetdag_test_utils::{init_tracing, wait_until, with_timeout};

struct Running {
    addr: SocketAddr,
    reload: LiveReload,
    trigger: ShutdownTrigger,
    handle: JoinHandle<Result<()>>,
}

impl Running {
    async fn stop(self) {
        self.trigger.trigger();
        with_timeout(self.handle).await.unwrap().unwrap();
    }
}

fn loopback(port: u16) -> ServerSection {
    ServerSection {
        host: "127.0.0.1".to_string(),
        port,
        root: ".".to_string(),
    }
}

async fn start(root: &Path) -> Running {
    let reload = LiveReload::new();
    let server = DevServer::bind(&loopback(0), root, reload.clone())
        .await
        .unwrap()
        .with_keepalive(Duration::from_secs(60));
    let addr = server.local_addr().unwrap();
    let (trigger, stop) = shutdown::channel();
    let handle = tokio::spawn(server.serve(stop));
    Running {
        addr,
        reload,
        trigger,
        handle,
    }
}

async fn request(addr: SocketAddr, method: &str, target: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let req = format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    with_timeout(stream.read_to_end(&mut response)).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

fn site() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("index.html"),
        "<html><body><h1>Hi</h1></body></html>",
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("css")).unwrap();
    std::fs::write(dir.path().join("css/style.css"), "body{}").unwrap();
    dir
}

#[tokio::test]
async fn html_pages_get_the_reload_client_injected() {
    init_tracing();
    let dir = site();
    let server = start(dir.path()).await;

    let response = request(server.addr, "GET", "/").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Type: text/html"));
    assert!(response.contains("Cache-Control: no-store"));
    let script = format!("<script src=\"{CLIENT_PATH}\"></script></body>");
    assert!(response.contains(&script), "{response}");

    server.stop().await;
}

#[tokio::test]
async fn static_files_are_served_verbatim() {
    init_tracing();
    let dir = site();
    let server = start(dir.path()).await;

    let response = request(server.addr, "GET", "/css/style.css?v=2").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("Content-Type: text/css"));
    assert!(response.ends_with("\r\n\r\nbody{}"));

    let head = request(server.addr, "HEAD", "/css/style.css").await;
    assert!(head.contains("Content-Length: 6\r\n"));
    assert!(head.ends_with("\r\n\r\n"));

    server.stop().await;
}

#[tokio::test]
async fn missing_forbidden_and_unsupported_requests() {
    init_tracing();
    let dir = site();
    let server = start(dir.path()).await;

    let missing = request(server.addr, "GET", "/nope.html").await;
    assert!(missing.starts_with("HTTP/1.1 404 Not Found\r\n"));

    let escape = request(server.addr, "GET", "/../etc/passwd").await;
    assert!(escape.starts_with("HTTP/1.1 403 Forbidden\r\n"));

    let encoded = request(server.addr, "GET", "/%2e%2e/etc/passwd").await;
    assert!(encoded.starts_with("HTTP/1.1 403 Forbidden\r\n"));

    let post = request(server.addr, "POST", "/").await;
    assert!(post.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    assert!(post.contains("Allow: GET, HEAD\r\n"));

    server.stop().await;
}

#[tokio::test]
async fn client_script_is_served() {
    init_tracing();
    let dir = site();
    let server = start(dir.path()).await;

    let response = request(server.addr, "GET", CLIENT_PATH).await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("text/javascript"));
    assert!(response.contains("EventSource"));

    server.stop().await;
}

async fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut seen = Vec::new();
    let mut buf = [0u8; 1024];
    with_timeout(async {
        while !String::from_utf8_lossy(&seen).contains(needle) {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "stream closed before {needle:?}");
            seen.extend_from_slice(&buf[..n]);
        }
    })
    .await;
    String::from_utf8_lossy(&seen).into_owned()
}

#[tokio::test]
async fn event_stream_delivers_reload_and_css_notices() {
    init_tracing();
    let dir = site();
    let server = start(dir.path()).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    let req = format!("GET {EVENTS_PATH} HTTP/1.1\r\nAccept: text/event-stream\r\n\r\n");
    stream.write_all(req.as_bytes()).await.unwrap();

    let head = read_until(&mut stream, "retry: 1000\n\n").await;
    assert!(head.contains("Content-Type: text/event-stream"));
    wait_until(|| server.reload.client_count() > 0).await;

    server.reload.reload();
    read_until(&mut stream, "event: reload\ndata: reload\n\n").await;

    server.reload.notify_css(vec!["css/style.css".to_string()]);
    read_until(&mut stream, "event: css\ndata: css/style.css\n\n").await;

    server.stop().await;
    // The stream ends once the session shuts down.
    let mut rest = Vec::new();
    with_timeout(stream.read_to_end(&mut rest)).await.unwrap();
}

#[tokio::test]
async fn occupied_port_is_port_in_use() {
    init_tracing();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let err = DevServer::bind(&loopback(port), ".", LiveReload::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AssetdagError::PortInUse(p) if p == port));
}

#[tokio::test]
async fn shutdown_stops_accepting_connections() {
    init_tracing();
    let dir = site();
    let server = start(dir.path()).await;
    let addr = server.addr;
    server.stop().await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(TcpStream::connect(addr).await.is_err());
}
