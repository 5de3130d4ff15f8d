// Application lifecycle shared by both roles.

use anyhow::{Context, Result};
use axum::Router;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::http::Controller;
use crate::liveness;
use crate::shutdown::GracefulShutdown;

use super::server::AppServer;

/// What a role contributes to the process: routes and background jobs.
pub trait Role: Send + Sync {
    fn name(&self) -> &'static str;

    fn controllers(&self) -> Vec<Box<dyn Controller>>;

    /// Starts the role's periodic jobs; they stop when `shutdown` fires.
    fn spawn_workers(&self, shutdown: CancellationToken) -> Vec<JoinHandle<()>>;
}

#[derive(Clone)]
pub struct App {
    shutdown_token: CancellationToken,
    role: Arc<dyn Role>,
    server: Arc<AppServer>,
    workers: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl App {
    pub fn new(
        shutdown_token: CancellationToken,
        cfg: &Config,
        role: Arc<dyn Role>,
        probe: Arc<liveness::Probe>,
    ) -> Self {
        let server = Arc::new(AppServer::new(
            shutdown_token.clone(),
            cfg,
            role.as_ref(),
            probe,
        ));
        Self {
            shutdown_token,
            role,
            server,
            workers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn router(&self) -> Router {
        self.server.router()
    }

    /// Binds the configured port, then behaves like [`App::serve_on`].
    pub async fn serve(&self, gsh: GracefulShutdown) -> Result<()> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.server.port()));
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        self.serve_on(listener, gsh)
    }

    /// Starts the role's jobs and the server in the background. The
    /// shutdown handler is told once the server stopped and the jobs are
    /// closed; the caller registers that one task beforehand.
    pub fn serve_on(&self, listener: TcpListener, gsh: GracefulShutdown) -> Result<()> {
        self.workers
            .lock()
            .extend(self.role.spawn_workers(self.shutdown_token.clone()));

        let app = self.clone();
        tokio::spawn(async move {
            if let Err(e) = app.server.serve(listener).await {
                error!(
                    component = "app",
                    scope = "server",
                    event = "serve_failed",
                    error = %e,
                    "server failed to serve"
                );
            }
            app.close().await;
            gsh.done();
        });

        info!(
            component = "app",
            event = "started",
            role = self.role.name(),
            "application lifecycle"
        );
        Ok(())
    }

    pub fn is_alive(&self) -> bool {
        if !self.server.is_alive() {
            warn!(
                component = "app",
                scope = "http_server",
                event = "gone_away",
                "http server has gone away"
            );
            return false;
        }
        true
    }

    /// Cancels everything and waits for the role's jobs to stop.
    pub async fn close(&self) {
        self.shutdown_token.cancel();

        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if let Err(e) = handle.await {
                error!(
                    component = "app",
                    scope = "workers",
                    event = "close_failed",
                    error = %e,
                    "periodic job ended abnormally"
                );
            }
        }

        info!(
            component = "app",
            event = "stopped",
            role = self.role.name(),
            "application lifecycle"
        );
    }
}

impl liveness::Service for App {
    fn is_alive(&self, _timeout: Duration) -> bool {
        App::is_alive(self)
    }
}
