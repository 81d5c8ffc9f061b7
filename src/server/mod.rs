// src/server/mod.rs

//! Development server: static files from the destination root plus a
//! live-reload WebSocket.

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Request, State, WebSocketUpgrade};
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub mod reload;

pub use reload::{inject_reload_client, ReloadHub, ReloadMessage, CLIENT_PATH, LIVERELOAD_PATH};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served at `/` (the destination root).
    pub root_dir: PathBuf,
}

#[derive(Clone)]
struct ServerState {
    root: PathBuf,
    files: ServeDir,
    hub: ReloadHub,
}

/// Build the router serving `root` with live reload from `hub`.
pub fn router(root: impl Into<PathBuf>, hub: ReloadHub) -> Router {
    let root = root.into();
    let state = ServerState {
        files: ServeDir::new(&root),
        root,
        hub,
    };

    Router::new()
        .route(LIVERELOAD_PATH, get(livereload_handler))
        .route(CLIENT_PATH, get(client_script))
        .fallback(serve_asset)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// A dev server whose listener is already bound.
#[derive(Debug)]
pub struct DevServer {
    listener: TcpListener,
    app: Router,
}

impl DevServer {
    /// Bind the listening socket. A bind failure is returned here so the
    /// caller can abort before starting anything else.
    pub async fn bind(config: &ServerConfig, hub: ReloadHub) -> Result<Self> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .with_context(|| format!("binding dev server to {}:{}", config.host, config.port))?;

        Ok(Self {
            listener,
            app: router(&config.root_dir, hub),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.local_addr()?;
        info!("dev server running on http://{}", addr);

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .context("dev server failed")?;
        Ok(())
    }
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        reload::CLIENT_JS,
    )
}

async fn livereload_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    ws.on_upgrade(|socket| livereload_socket(socket, state.hub))
}

async fn livereload_socket(socket: WebSocket, hub: ReloadHub) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = hub.subscribe();
    debug!(clients = hub.subscriber_count(), "live-reload client connected");

    let send_task = tokio::spawn(async move {
        let mut next = Some(ReloadMessage::Connected);
        loop {
            let msg = match next.take() {
                Some(msg) => msg,
                None => match rx.recv().await {
                    Ok(msg) => msg,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "live-reload client lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };
            let Ok(json) = serde_json::to_string(&msg) else {
                continue;
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    debug!("live-reload client disconnected");
}

/// HTML pages get the reload client injected; everything else is served
/// as-is by `ServeDir`.
async fn serve_asset(State(state): State<ServerState>, req: Request) -> Response {
    if let Some(page) = html_target(&state.root, req.uri().path()) {
        match tokio::fs::read_to_string(&page).await {
            Ok(html) => return Html(inject_reload_client(&html)).into_response(),
            Err(err) => debug!(path = ?page, error = %err, "html read failed; serving raw"),
        }
    }

    match state.files.oneshot(req).await {
        Ok(resp) => resp.into_response(),
        Err(never) => match never {},
    }
}

fn html_target(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let rel = uri_path.trim_start_matches('/');
    if rel.split('/').any(|seg| seg == "..") {
        return None;
    }

    let candidate = if rel.is_empty() || uri_path.ends_with('/') {
        root.join(rel).join("index.html")
    } else if rel.ends_with(".html") || rel.ends_with(".htm") {
        root.join(rel)
    } else {
        return None;
    };

    candidate.is_file().then_some(candidate)
}
