// src/server/http.rs

//! Just enough HTTP/1.1 for a local static server: one request per
//! connection, no request bodies, `Connection: close` on every response.

use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const MAX_HEAD_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    /// Request target as sent, including any query string.
    pub target: String,
}

impl HttpRequest {
    /// Target without query string or fragment.
    pub fn path(&self) -> &str {
        let end = self.target.find(['?', '#']).unwrap_or(self.target.len());
        &self.target[..end]
    }

    pub fn is_head(&self) -> bool {
        self.method == "HEAD"
    }
}

/// Read the request line and headers. `Ok(None)` if the peer closed the
/// connection before sending anything useful.
pub async fn read_request<R>(reader: &mut R) -> io::Result<Option<HttpRequest>>
where
    R: AsyncBufRead + Unpin,
{
    // Every read goes through the limit, so an endless line cannot grow
    // the buffer past it.
    let mut head = (&mut *reader).take(MAX_HEAD_BYTES as u64);
    let mut request_line = String::new();
    if head.read_line(&mut request_line).await? == 0 {
        return Ok(None);
    }

    // Drain headers; none of them change how a request is served. Running
    // into the limit before the blank line means the head is too large.
    let mut line = request_line.clone();
    while line != "\r\n" && line != "\n" {
        if line.ends_with('\n') {
            line.clear();
            head.read_line(&mut line).await?;
            if !line.is_empty() {
                continue;
            }
        }
        if head.limit() == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "request head too large",
            ));
        }
        // Peer closed mid-head.
        break;
    }

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Ok(None);
    };
    Ok(Some(HttpRequest {
        method: method.to_ascii_uppercase(),
        target: target.to_string(),
    }))
}

pub async fn write_response<W>(
    writer: &mut W,
    status: &str,
    content_type: &str,
    body: &[u8],
    head_only: bool,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut headers = String::new();
    headers.push_str("HTTP/1.1 ");
    headers.push_str(status);
    headers.push_str("\r\n");
    headers.push_str("Content-Type: ");
    headers.push_str(content_type);
    headers.push_str("\r\n");
    headers.push_str("Cache-Control: no-store\r\n");
    headers.push_str("X-Content-Type-Options: nosniff\r\n");
    if status.starts_with("405") {
        headers.push_str("Allow: GET, HEAD\r\n");
    }
    headers.push_str("Connection: close\r\n");
    headers.push_str("Content-Length: ");
    headers.push_str(&body.len().to_string());
    headers.push_str("\r\n\r\n");

    writer.write_all(headers.as_bytes()).await?;
    if !head_only {
        writer.write_all(body).await?;
    }
    writer.flush().await
}

pub async fn write_text<W>(writer: &mut W, status: &str, head_only: bool) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = format!("{status}\n");
    write_response(
        writer,
        status,
        "text/plain; charset=utf-8",
        body.as_bytes(),
        head_only,
    )
    .await
}

pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

pub fn is_html(path: &Path) -> bool {
    content_type(path).starts_with("text/html")
}

/// Why a request target could not be mapped onto a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Forbidden,
    NotFound,
}

/// Decode `%XX` escapes; malformed escapes are kept literally.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Map a URL path onto a file below `root`.
///
/// `..` segments are refused outright; symlinks that lead outside the root
/// are refused after canonicalization. Directories map to `index.html`.
pub async fn resolve_target(root: &Path, url_path: &str) -> Result<PathBuf, Rejection> {
    let decoded = percent_decode(url_path);
    let mut rel = PathBuf::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err(Rejection::Forbidden),
            s if s.contains('\\') || s.contains('\0') => return Err(Rejection::Forbidden),
            s => rel.push(s),
        }
    }
    if rel.components().any(|c| !matches!(c, Component::Normal(_))) {
        return Err(Rejection::Forbidden);
    }

    let mut candidate = root.join(&rel);
    let is_dir = tokio::fs::metadata(&candidate)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);
    if is_dir || decoded.ends_with('/') {
        candidate.push("index.html");
    }

    let canonical = tokio::fs::canonicalize(&candidate)
        .await
        .map_err(|_| Rejection::NotFound)?;
    let canonical_root = tokio::fs::canonicalize(root)
        .await
        .map_err(|_| Rejection::NotFound)?;
    if !canonical.starts_with(&canonical_root) {
        return Err(Rejection::Forbidden);
    }
    if !tokio::fs::metadata(&canonical)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
    {
        return Err(Rejection::NotFound);
    }
    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn parses_request_line_and_skips_headers() {
        let raw = b"get /css/a.css?v=1 HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let mut reader = BufReader::new(&raw[..]);
        let req = read_request(&mut reader).await.unwrap().unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path(), "/css/a.css");
    }

    #[tokio::test]
    async fn endless_request_line_is_cut_off_at_the_head_limit() {
        let mut reader = BufReader::new(tokio::io::repeat(b'a'));
        let read = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            read_request(&mut reader),
        )
        .await
        .unwrap();
        assert_eq!(read.unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn oversized_headers_are_rejected() {
        let mut raw = b"GET / HTTP/1.1\r\n".to_vec();
        for i in 0..1000 {
            raw.extend_from_slice(format!("X-Filler-{i}: yes\r\n").as_bytes());
        }
        raw.extend_from_slice(b"\r\n");
        let mut reader = BufReader::new(&raw[..]);
        let err = read_request(&mut reader).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn truncated_head_still_yields_the_request() {
        let raw = b"HEAD /index.html HTTP/1.1\r\nHost: x";
        let mut reader = BufReader::new(&raw[..]);
        let req = read_request(&mut reader).await.unwrap().unwrap();
        assert!(req.is_head());
        assert_eq!(req.path(), "/index.html");
    }

    #[test]
    fn decodes_escapes_and_keeps_malformed_ones() {
        assert_eq!(percent_decode("/a%20b.html"), "/a b.html");
        assert_eq!(percent_decode("/%2e%2e/x"), "/../x");
        assert_eq!(percent_decode("/100%"), "/100%");
        assert_eq!(percent_decode("/%zz"), "/%zz");
    }

    #[tokio::test]
    async fn encoded_traversal_is_forbidden() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_target(dir.path(), "/%2e%2e/etc/passwd").await,
            Err(Rejection::Forbidden)
        );
        assert_eq!(
            resolve_target(dir.path(), "/missing.html").await,
            Err(Rejection::NotFound)
        );
    }

    #[tokio::test]
    async fn root_maps_to_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        let path = resolve_target(dir.path(), "/").await.unwrap();
        assert!(path.ends_with("index.html"));
    }
}
