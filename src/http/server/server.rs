//! HTTP server.

use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info};

use crate::controller::controller::Controller;
use crate::middleware::middleware::Middleware;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait::async_trait]
pub trait Server: Send + Sync {
    /// Serves until the shutdown token fires.
    async fn listen_and_serve(&self) -> Result<()>;
}

/// Mounts every controller's routes, then wraps them in the middlewares.
/// The first middleware in the list is the outermost one.
pub fn build_router(
    controllers: Vec<Box<dyn Controller>>,
    middlewares: Vec<Box<dyn Middleware>>,
) -> Router {
    let mut router = Router::new();
    for controller in controllers {
        router = controller.add_route(router);
    }

    // layers applied later wrap the earlier ones
    for middleware in middlewares.iter().rev() {
        router = middleware.apply(router);
    }

    router.layer(TimeoutLayer::new(REQUEST_TIMEOUT))
}

pub struct HttpServer {
    shutdown_token: CancellationToken,
    name: String,
    port: u16,
    router: Router,
}

impl HttpServer {
    pub fn new(
        shutdown_token: CancellationToken,
        name: impl Into<String>,
        port: u16,
        controllers: Vec<Box<dyn Controller>>,
        middlewares: Vec<Box<dyn Middleware>>,
    ) -> Self {
        Self {
            shutdown_token,
            name: name.into(),
            port,
            router: build_router(controllers, middlewares),
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Binds `0.0.0.0:{port}` and serves on it.
    pub async fn listen_and_serve(&self) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr().context("listener has no local address")?;
        info!(
            component = "server",
            event = "started",
            name = %self.name,
            addr = %local,
            "server started"
        );

        let shutdown_token = self.shutdown_token.clone();
        let served = axum::serve(
            listener,
            self.router
                .clone()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await;

        if let Err(e) = served {
            error!(
                component = "server",
                event = "listen_and_serve_failed",
                name = %self.name,
                addr = %local,
                error = %e,
                "server failed to listen and serve"
            );
            return Err(e.into());
        }

        info!(
            component = "server",
            event = "stopped",
            name = %self.name,
            addr = %local,
            "server stopped"
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl Server for HttpServer {
    async fn listen_and_serve(&self) -> Result<()> {
        HttpServer::listen_and_serve(self).await
    }
}
