//! Local HTTP fixtures
//!
//! Serves canned feed bodies from an axum router bound to an ephemeral port.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Serve `router` on 127.0.0.1 with an OS-assigned port
pub async fn spawn_router(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

#[derive(Clone, Default)]
struct Feeds {
    bodies: Arc<Mutex<HashMap<String, (StatusCode, String)>>>,
    hits: Arc<AtomicUsize>,
}

async fn serve_feed(State(feeds): State<Feeds>, Path(name): Path<String>) -> (StatusCode, String) {
    feeds.hits.fetch_add(1, Ordering::SeqCst);
    feeds
        .bodies
        .lock()
        .unwrap()
        .get(&name)
        .cloned()
        .unwrap_or((StatusCode::NOT_FOUND, String::new()))
}

/// Mutable set of feeds served under `/feeds/<name>`
pub struct FeedServer {
    pub addr: SocketAddr,
    feeds: Feeds,
}

impl FeedServer {
    pub async fn start() -> Self {
        let feeds = Feeds::default();
        let router = Router::new()
            .route("/feeds/:name", get(serve_feed))
            .with_state(feeds.clone());
        let addr = spawn_router(router).await;
        Self { addr, feeds }
    }

    pub fn url(&self, name: &str) -> String {
        format!("http://{}/feeds/{}", self.addr, name)
    }

    pub fn set(&self, name: &str, body: impl Into<String>) {
        self.set_status(name, StatusCode::OK, body);
    }

    pub fn set_status(&self, name: &str, status: StatusCode, body: impl Into<String>) {
        self.feeds
            .bodies
            .lock()
            .unwrap()
            .insert(name.to_string(), (status, body.into()));
    }

    /// Requests served so far
    pub fn hits(&self) -> usize {
        self.feeds.hits.load(Ordering::SeqCst)
    }
}
