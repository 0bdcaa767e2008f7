// src/server/livereload.rs

//! Live-reload notification hub and its browser-side client.
//!
//! The hub is a `tokio::sync::broadcast` channel: the watch reactor and the
//! asset tasks publish [`ReloadNotice`]s; every connected browser holds a
//! receiver behind a Server-Sent-Events response.

use std::sync::LazyLock;

use regex::Regex;
use tokio::sync::broadcast;
use tracing::debug;

use crate::types::ReloadNotice;

/// Path of the SSE endpoint.
pub const EVENTS_PATH: &str = "/__assetdag/events";

/// Path the client script is served from.
pub const CLIENT_PATH: &str = "/__assetdag/client.js";

/// Browser-side client: reload on `reload`, cache-bust stylesheets on `css`.
pub const CLIENT_SCRIPT: &str = r#"(function () {
  if (!window.EventSource) { return; }
  var source = new EventSource("/__assetdag/events");
  source.addEventListener("reload", function () { window.location.reload(); });
  source.addEventListener("css", function () {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    for (var i = 0; i < links.length; i++) {
      var href = links[i].href.replace(/[?&]__assetdag=\d+/, "");
      links[i].href = href + (href.indexOf("?") < 0 ? "?" : "&") + "__assetdag=" + Date.now();
    }
  });
})();
"#;

static BODY_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body\s*>").expect("static regex"));

/// Insert the client `<script>` before the last `</body>`, or append it when
/// the document has none.
pub fn inject_client(html: &str) -> String {
    let tag = format!("<script src=\"{CLIENT_PATH}\"></script>");
    match BODY_CLOSE.find_iter(html).last() {
        Some(m) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..m.start()]);
            out.push_str(&tag);
            out.push_str(&html[m.start()..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

/// Publishing side of the live-reload channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<ReloadNotice>,
}

impl Default for LiveReload {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self { tx }
    }

    /// Ask every connected client to reload the page.
    pub fn reload(&self) {
        self.publish(ReloadNotice::Reload);
    }

    /// Ask every connected client to re-fetch stylesheets.
    pub fn notify_css(&self, paths: Vec<String>) {
        if paths.is_empty() {
            return;
        }
        self.publish(ReloadNotice::Css(paths));
    }

    fn publish(&self, notice: ReloadNotice) {
        // No connected clients is fine: there is simply nobody to tell.
        match self.tx.send(notice) {
            Ok(clients) => debug!(clients, "published live-reload notice"),
            Err(err) => debug!(notice = ?err.0, "no live-reload clients connected"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadNotice> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_goes_before_closing_body_case_insensitively() {
        let html = "<html><BODY>hi</BODY></html>";
        let out = inject_client(html);
        assert_eq!(
            out,
            "<html><BODY>hi<script src=\"/__assetdag/client.js\"></script></BODY></html>"
        );
    }

    #[test]
    fn script_is_appended_without_body() {
        let out = inject_client("<p>fragment</p>");
        assert!(out.ends_with("<script src=\"/__assetdag/client.js\"></script>"));
    }

    #[tokio::test]
    async fn subscribers_receive_notices_and_publishing_alone_is_fine() {
        let hub = LiveReload::new();
        hub.reload();

        let mut rx = hub.subscribe();
        hub.notify_css(vec!["css/style.css".to_string()]);
        hub.notify_css(Vec::new());
        hub.reload();

        assert_eq!(
            rx.recv().await.unwrap(),
            ReloadNotice::Css(vec!["css/style.css".to_string()])
        );
        assert_eq!(rx.recv().await.unwrap(), ReloadNotice::Reload);
    }
}
