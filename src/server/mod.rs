// src/server/mod.rs

//! Development server: static files plus the live-reload event stream.

use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::model::ServerSection;
use crate::errors::{AssetdagError, Result};
use crate::shutdown::Shutdown;

pub mod events;
pub mod http;
pub mod livereload;

pub use livereload::{inject_client, LiveReload, CLIENT_PATH, CLIENT_SCRIPT, EVENTS_PATH};

use http::{
    content_type, is_html, read_request, resolve_target, write_response, write_text, Rejection,
};

/// A bound, not yet serving, dev server.
#[derive(Debug)]
pub struct DevServer {
    listener: TcpListener,
    root: PathBuf,
    reload: LiveReload,
    keepalive: Duration,
}

impl DevServer {
    /// Bind `host:port`. A port held by another process is
    /// [`AssetdagError::PortInUse`].
    pub async fn bind(
        section: &ServerSection,
        root: impl Into<PathBuf>,
        reload: LiveReload,
    ) -> Result<Self> {
        let addr = (section.host.as_str(), section.port);
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            if e.kind() == io::ErrorKind::AddrInUse {
                AssetdagError::PortInUse(section.port)
            } else {
                AssetdagError::IoError(e)
            }
        })?;

        let server = Self {
            listener,
            root: root.into(),
            reload,
            keepalive: Duration::from_secs(15),
        };
        info!(addr = %server.local_addr()?, root = ?server.root, "dev server listening");
        Ok(server)
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn reload(&self) -> &LiveReload {
        &self.reload
    }

    /// Accept connections until `shutdown` fires. Each connection is served
    /// on its own task.
    pub async fn serve(self, mut shutdown: Shutdown) -> Result<()> {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.wait() => break,
                accepted = self.listener.accept() => accepted,
            };
            let (stream, peer) = match accepted {
                Ok(pair) => pair,
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    continue;
                }
            };

            let root = self.root.clone();
            let reload = self.reload.clone();
            let shutdown = shutdown.clone();
            let keepalive = self.keepalive;
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, &root, &reload, shutdown, keepalive).await {
                    debug!(%peer, error = %err, "connection ended with error");
                }
            });
        }
        info!("dev server stopped");
        Ok(())
    }
}

async fn handle_connection<S>(
    stream: S,
    root: &Path,
    reload: &LiveReload,
    shutdown: Shutdown,
    keepalive: Duration,
) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut stream = BufReader::new(stream);
    let Some(request) = read_request(&mut stream).await? else {
        return Ok(());
    };
    debug!(method = %request.method, target = %request.target, "request");

    let head_only = request.is_head();
    if request.method != "GET" && !head_only {
        return write_text(&mut stream, "405 Method Not Allowed", false).await;
    }

    match request.path() {
        EVENTS_PATH if !head_only => {
            events::stream_events(&mut stream, reload, shutdown, keepalive).await
        }
        CLIENT_PATH => {
            write_response(
                &mut stream,
                "200 OK",
                "text/javascript; charset=utf-8",
                CLIENT_SCRIPT.as_bytes(),
                head_only,
            )
            .await
        }
        path => serve_file(&mut stream, root, path, head_only).await,
    }
}

async fn serve_file<W>(writer: &mut W, root: &Path, url_path: &str, head_only: bool) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let file = match resolve_target(root, url_path).await {
        Ok(file) => file,
        Err(Rejection::Forbidden) => {
            warn!(path = %url_path, "refused path outside the server root");
            return write_text(writer, "403 Forbidden", head_only).await;
        }
        Err(Rejection::NotFound) => return write_text(writer, "404 Not Found", head_only).await,
    };

    let body = match tokio::fs::read(&file).await {
        Ok(body) => body,
        Err(err) => {
            warn!(file = ?file, error = %err, "failed to read file");
            return write_text(writer, "500 Internal Server Error", head_only).await;
        }
    };

    if is_html(&file) {
        let html = inject_client(&String::from_utf8_lossy(&body));
        return write_response(writer, "200 OK", content_type(&file), html.as_bytes(), head_only)
            .await;
    }
    write_response(writer, "200 OK", content_type(&file), &body, head_only).await
}
