// Entrypoint of cloudletd: runs either the directory or the site role.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use cloudletd::app::{App, DirectoryRole, Role, SiteRole};
use cloudletd::config::{Api, Config, ConfigTrait};
use cloudletd::controller::init_prometheus_exporter;
use cloudletd::liveness;
use cloudletd::shutdown::GracefulShutdown;

const CONFIG_PATH: &str = "cfg/cloudletd.cfg.yaml";
const CONFIG_PATH_LOCAL: &str = "cfg/cloudletd.cfg.local.yaml";
const GRACEFUL_TIMEOUT: Duration = Duration::from_secs(30);

/// cloudletd - routes clients to nearby cloudlets and runs their workloads
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Custom config file path
    #[arg(short, long, value_name = "FILE", global = true)]
    cfg: Option<PathBuf>,

    /// Overrides api.port
    #[arg(short, long, global = true)]
    port: Option<u16>,

    #[command(subcommand)]
    role: RoleArg,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum RoleArg {
    /// Rank sites and fan deploy requests out to them
    Directory,
    /// Run workloads on the local cluster
    Site,
}

/// Loads the configuration: custom path, else the local file, else the default.
fn load_cfg(path: Option<PathBuf>) -> Result<Config> {
    if let Some(custom_path) = path {
        return Config::load(&custom_path)
            .with_context(|| format!("failed to load custom config from {:?}", custom_path));
    }

    match Config::load(CONFIG_PATH_LOCAL) {
        Ok(cfg) => Ok(cfg),
        Err(_) => Config::load(CONFIG_PATH)
            .with_context(|| format!("failed to load config from {}", CONFIG_PATH)),
    }
}

fn configure_logger(cfg: &Config) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let log_level = cfg
        .logs()
        .and_then(|logs| logs.level.as_deref())
        .unwrap_or("info");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    if cfg.is_prod() {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // the recorder must exist before anything records
    if let Err(e) = init_prometheus_exporter() {
        eprintln!("Warning: metrics endpoint will be empty: {:#}", e);
    }

    tokio::runtime::Runtime::new()
        .context("failed to create tokio runtime")?
        .block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    let shutdown_token = CancellationToken::new();

    let mut cfg = load_cfg(args.cfg)?;
    if let Some(port) = args.port {
        let api = cfg.cloudletd.api.get_or_insert(Api {
            name: None,
            port: None,
        });
        api.port = Some(port);
    }

    configure_logger(&cfg);
    info!(
        component = "config",
        event = "load_success",
        env = %cfg.cloudletd.env,
        port = cfg.port(),
        "config loaded"
    );

    let graceful_shutdown = GracefulShutdown::new(shutdown_token.clone());
    graceful_shutdown.set_graceful_timeout(GRACEFUL_TIMEOUT);

    let probe = Arc::new(liveness::Probe::new(cfg.probe_timeout()));

    let role: Arc<dyn Role> = match args.role {
        RoleArg::Directory => Arc::new(DirectoryRole::from_config(&cfg.directory()).await?),
        RoleArg::Site => Arc::new(SiteRole::from_config(&cfg.site()).await?),
    };

    let app = App::new(shutdown_token.clone(), &cfg, role, probe.clone());
    probe.watch(vec![Arc::new(app.clone()) as Arc<dyn liveness::Service>]);

    graceful_shutdown.add(1);
    if let Err(e) = app.serve(graceful_shutdown.clone()).await {
        error!(
            component = "main",
            scope = "app",
            event = "start_failed",
            error = %format!("{:#}", e),
            "failed to start app"
        );
        shutdown_token.cancel();
        return Err(e);
    }

    if let Err(e) = graceful_shutdown.await_shutdown().await {
        error!(
            component = "main",
            scope = "service",
            event = "graceful_shutdown_failed",
            error = %e,
            "failed to gracefully shut down service"
        );
        return Err(e);
    }

    Ok(())
}
