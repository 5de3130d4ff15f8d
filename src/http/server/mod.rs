pub mod server;

pub use server::{build_router, HttpServer, Server, REQUEST_TIMEOUT};
