pub mod hyper_client;
pub mod request;

pub use hyper_client::{create_client, HyperClient};
pub use request::{get, make_method_request, post_json, to_uri, Exchange};
