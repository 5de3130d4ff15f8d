// Small axum servers standing in for remote directories and sites.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// A server bound to an ephemeral local port.
pub struct StubServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
    shutdown: Option<tokio::sync::oneshot::Sender<()>>,
}

impl StubServer {
    pub async fn start(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            let server = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            );
            tokio::select! {
                _ = server => {},
                _ = shutdown_rx => {},
            }
        });

        Self {
            addr,
            handle,
            shutdown: Some(shutdown_tx),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("http://{}{}", self.addr, path)).unwrap()
    }

    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.abort();
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A local URL nobody listens on.
pub async fn dead_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    Url::parse(&format!("http://{}/", addr)).unwrap()
}

/// Bodies received by a stub directory's `POST /sites`.
#[derive(Clone, Default)]
pub struct Received(Arc<Mutex<Vec<Value>>>);

impl Received {
    pub fn bodies(&self) -> Vec<Value> {
        self.0.lock().clone()
    }
}

/// A directory that records registrations and answers `status`.
pub async fn stub_directory(status: StatusCode) -> (StubServer, Received) {
    let received = Received::default();
    let router = Router::new()
        .route(
            "/sites",
            post(
                move |State(received): State<Received>, Json(body): Json<Value>| async move {
                    received.0.lock().push(body);
                    status
                },
            ),
        )
        .with_state(received.clone());
    (StubServer::start(router).await, received)
}

/// Request details seen by a stub site's deploy route.
#[derive(Debug, Clone, PartialEq)]
pub struct SeenDeploy {
    pub workload: String,
    pub key: String,
    pub client_ip: Option<String>,
    pub location: Option<String>,
}

#[derive(Clone, Default)]
pub struct SeenDeploys(Arc<Mutex<Vec<SeenDeploy>>>);

impl SeenDeploys {
    pub fn all(&self) -> Vec<SeenDeploy> {
        self.0.lock().clone()
    }
}

/// A site whose deploy route answers `status` with `items`.
pub async fn stub_site(status: StatusCode, items: Value) -> (StubServer, SeenDeploys) {
    let seen = SeenDeploys::default();
    let router = Router::new()
        .route(
            "/api/v1/deploy/:workload/:key",
            post(
                move |State(seen): State<SeenDeploys>,
                      Path((workload, key)): Path<(String, String)>,
                      headers: HeaderMap| async move {
                    let header = |name: &str| {
                        headers
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string)
                    };
                    seen.0.lock().push(SeenDeploy {
                        workload,
                        key,
                        client_ip: header("X-ClientIP"),
                        location: header("X-Location"),
                    });
                    (status, Json(items))
                },
            ),
        )
        .with_state(seen.clone());
    (StubServer::start(router).await, seen)
}
