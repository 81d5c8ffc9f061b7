// src/server/reload.rs

//! Reload notifications pushed to browser clients.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::report::Reporter;
use crate::transform::{Transform, TransformError, WriteReport};

/// WebSocket endpoint clients connect to.
pub const LIVERELOAD_PATH: &str = "/__assetdag/livereload";
/// Script injected into served HTML pages.
pub const CLIENT_PATH: &str = "/__assetdag/client.js";

/// Messages sent over the live-reload socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ReloadMessage {
    Connected,
    /// A transform finished writing; the page should reload.
    Reload { task: String, timestamp: u64 },
    /// A transform failed; shown in the browser console.
    Error { task: String, message: String },
}

/// Broadcasts reload messages to every connected client.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    /// Send to all current subscribers; returns how many received it.
    pub fn broadcast(&self, message: ReloadMessage) -> usize {
        self.tx.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Reporter for ReloadHub {
    fn transform_succeeded(&self, transform: &Transform, _report: &WriteReport) {
        if !transform.side_effects().notifies_reload {
            return;
        }
        let clients = self.broadcast(ReloadMessage::Reload {
            task: transform.name().to_string(),
            timestamp: now_millis(),
        });
        debug!(transform = %transform.name(), clients, "broadcast reload");
    }

    fn transform_failed(&self, error: &TransformError) {
        self.broadcast(ReloadMessage::Error {
            task: error.name.clone(),
            message: error.cause.clone(),
        });
    }
}

/// Insert the client `<script>` before the last `</body>`, or append it when
/// the document has none.
pub fn inject_reload_client(html: &str) -> String {
    let tag = format!("<script src=\"{CLIENT_PATH}\"></script>");
    match html.to_ascii_lowercase().rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..idx]);
            out.push_str(&tag);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{tag}"),
    }
}

pub const CLIENT_JS: &str = r#"// assetdag live reload
(function () {
  if (typeof window === 'undefined' || !window.WebSocket) return;

  var protocol = window.location.protocol === 'https:' ? 'wss:' : 'ws:';
  var url = protocol + '//' + window.location.host + '/__assetdag/livereload';

  function connect() {
    var ws = new WebSocket(url);

    ws.onmessage = function (event) {
      var message = JSON.parse(event.data);
      switch (message.type) {
        case 'reload':
          window.location.reload();
          break;
        case 'error':
          console.error('[assetdag] ' + message.task + ': ' + message.message);
          break;
      }
    };

    ws.onclose = function () {
      setTimeout(connect, 1000);
    };
  }

  connect();
})();
"#;
