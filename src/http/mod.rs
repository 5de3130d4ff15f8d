// HTTP plumbing: outbound client, request header helpers and the server.

pub mod client;
pub mod header;
pub mod server;

pub use crate::controller::controller::Controller;
pub use crate::middleware::middleware::Middleware;
pub use server::{build_router, HttpServer, Server};
