// HTTP server of the running role.

use anyhow::Result;
use axum::Router;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{Config, ConfigTrait};
use crate::controller;
use crate::http::{Controller, HttpServer, Middleware};
use crate::liveness;
use crate::middleware::{PanicRecoverMiddleware, TraceMiddleware};

use super::Role;

/// Wraps the HTTP server and tracks whether it is still serving.
pub struct AppServer {
    server: HttpServer,
    port: u16,
    is_server_alive: Arc<AtomicBool>,
}

impl AppServer {
    pub fn new(
        shutdown_token: CancellationToken,
        cfg: &Config,
        role: &dyn Role,
        probe: Arc<liveness::Probe>,
    ) -> Self {
        let name = cfg
            .api()
            .and_then(|api| api.name.clone())
            .unwrap_or_else(|| format!("cloudletd-{}", role.name()));

        let server = HttpServer::new(
            shutdown_token,
            name,
            cfg.port(),
            Self::controllers(role, probe),
            Self::middlewares(),
        );

        Self {
            server,
            port: cfg.port(),
            is_server_alive: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_alive(&self) -> bool {
        self.is_server_alive.load(Ordering::Relaxed)
    }

    pub fn router(&self) -> Router {
        self.server.router()
    }

    /// Serves on `listener` until shutdown.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.is_server_alive.store(true, Ordering::Relaxed);
        let result = self.server.serve(listener).await;
        self.is_server_alive.store(false, Ordering::Relaxed);
        result
    }

    fn controllers(role: &dyn Role, probe: Arc<liveness::Probe>) -> Vec<Box<dyn Controller>> {
        let mut controllers: Vec<Box<dyn Controller>> = vec![
            // Empty 200 at the root
            Box::new(controller::IndexController),
            // Healthcheck probe endpoint
            Box::new(controller::LivenessProbeController::new(probe)),
            // Metrics endpoint
            Box::new(controller::PrometheusMetricsController::new()),
        ];
        controllers.extend(role.controllers());
        controllers
    }

    /// Request middlewares, outermost first.
    fn middlewares() -> Vec<Box<dyn Middleware>> {
        vec![
            Box::new(TraceMiddleware::new()),
            Box::new(PanicRecoverMiddleware::new()),
        ]
    }
}
