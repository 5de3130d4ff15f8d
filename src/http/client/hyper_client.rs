//! Hyper HTTP client shared by outbound calls (site fan-out, recipe fetches,
//! metrics queries and directory reports).
//!
//! Pool settings:
//! - Max idle connections per host: 64
//! - Max idle connection duration: 30s
//! - Connection timeout: 3s
//! - TCP keep-alive: 30s
//! - TCP_NODELAY: enabled

use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::dns::GaiResolver;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tracing::warn;

pub const CONNS_PER_HOST: usize = 64;
pub const MAX_IDLE_CONN_DURATION: Duration = Duration::from_secs(30);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

pub type HyperClient =
    Client<HttpsConnector<HttpConnector<GaiResolver>>, BoxBody<Bytes, hyper::Error>>;

/// Creates a Hyper client speaking plain http and https.
///
/// Uses the platform trust store and falls back to the bundled web PKI roots
/// when the platform has none.
pub fn create_client() -> HyperClient {
    let mut http_connector = HttpConnector::new_with_resolver(GaiResolver::new());
    http_connector.enforce_http(false);
    http_connector.set_nodelay(true);
    http_connector.set_keepalive(Some(Duration::from_secs(30)));
    http_connector.set_connect_timeout(Some(CONNECT_TIMEOUT));

    let roots = match hyper_rustls::HttpsConnectorBuilder::new().with_native_roots() {
        Ok(builder) => builder,
        Err(e) => {
            warn!(
                component = "http_client",
                event = "native_roots_unavailable",
                error = %e,
                "falling back to bundled root certificates"
            );
            hyper_rustls::HttpsConnectorBuilder::new().with_webpki_roots()
        }
    };
    let tls = roots
        .https_or_http()
        .enable_http1()
        .wrap_connector(http_connector);

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(MAX_IDLE_CONN_DURATION)
        .pool_max_idle_per_host(CONNS_PER_HOST)
        .retry_canceled_requests(true)
        .build(tls)
}
