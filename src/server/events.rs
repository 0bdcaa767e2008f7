// src/server/events.rs

//! Server-Sent-Events stream carrying live-reload notices.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::server::livereload::LiveReload;
use crate::shutdown::Shutdown;
use crate::types::ReloadNotice;

/// How long the browser waits before reconnecting after the stream drops.
const RETRY_MS: u64 = 1000;

pub async fn write_events_stream_headers<W>(writer: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    // No Content-Length: the stream is long-lived.
    let headers = concat!(
        "HTTP/1.1 200 OK\r\n",
        "Content-Type: text/event-stream; charset=utf-8\r\n",
        "Cache-Control: no-store\r\n",
        "X-Content-Type-Options: nosniff\r\n",
        "Connection: keep-alive\r\n",
        "\r\n"
    );
    writer.write_all(headers.as_bytes()).await?;
    writer
        .write_all(format!("retry: {RETRY_MS}\n\n").as_bytes())
        .await?;
    writer.flush().await
}

/// Render one notice as an SSE frame. Lines use LF, not CRLF.
pub fn format_sse_event(notice: &ReloadNotice) -> String {
    let mut frame = format!("event: {}\n", notice.event_name());
    match notice {
        ReloadNotice::Reload => frame.push_str("data: reload\n"),
        ReloadNotice::Css(paths) => {
            for path in paths {
                frame.push_str("data: ");
                frame.push_str(path);
                frame.push('\n');
            }
        }
    }
    frame.push('\n');
    frame
}

/// Stream notices to one client until it disconnects or the session shuts
/// down. Comment lines are sent every `keepalive` so idle proxies and
/// browsers keep the connection open.
pub async fn stream_events<W>(
    writer: &mut W,
    hub: &LiveReload,
    mut shutdown: Shutdown,
    keepalive: Duration,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut rx = hub.subscribe();
    write_events_stream_headers(writer).await?;
    debug!(clients = hub.client_count(), "live-reload client connected");

    let mut ticker = tokio::time::interval(keepalive);
    ticker.tick().await;

    loop {
        let frame = tokio::select! {
            _ = shutdown.wait() => break,
            _ = ticker.tick() => ": keepalive\n\n".to_string(),
            received = rx.recv() => match received {
                Ok(notice) => format_sse_event(&notice),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "live-reload client lagged; forcing full reload");
                    format_sse_event(&ReloadNotice::Reload)
                }
                Err(RecvError::Closed) => break,
            },
        };
        writer.write_all(frame.as_bytes()).await?;
        writer.flush().await?;
    }

    debug!("live-reload stream closed");
    Ok(())
}
