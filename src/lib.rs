#[path = "shared/geo/mod.rs"]
pub mod geo;
#[path = "k8s/probe/liveness/mod.rs"]
pub mod liveness;
#[path = "shared/naming/mod.rs"]
pub mod naming;
#[path = "shared/net/mod.rs"]
pub mod net;
#[cfg(test)]
mod tests;

#[cfg(test)]
pub use tests::support;

pub mod app;
pub mod cluster;
pub mod config;
pub mod controller;
pub mod deployment;
pub mod dispatch;
pub mod http;
pub mod matcher;
pub mod metrics;
pub mod middleware;
pub mod model;
pub mod registry;
pub mod repository;
pub mod shutdown;
pub mod workers;
