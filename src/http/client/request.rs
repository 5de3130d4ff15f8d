//! Request helpers on top of [`HyperClient`](super::HyperClient).

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::{Method, Request, Uri};
use std::time::Duration;
use tokio::time::timeout;

use super::HyperClient;

/// Status, headers and body of a finished exchange.
pub type Exchange = (u16, hyper::HeaderMap, Bytes);

/// Sends one request and collects the whole response within `timeout_duration`.
pub async fn make_method_request(
    client: &HyperClient,
    method: Method,
    uri: Uri,
    headers: &[(&str, &str)],
    body: Option<Bytes>,
    timeout_duration: Duration,
) -> Result<Exchange> {
    let uri_str = uri.to_string();

    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let req_body: BoxBody<Bytes, hyper::Error> = match body {
        Some(bytes) => Full::new(bytes)
            .map_err(|never: std::convert::Infallible| match never {})
            .boxed(),
        None => Empty::<Bytes>::new()
            .map_err(|never: std::convert::Infallible| match never {})
            .boxed(),
    };
    let req = builder.body(req_body).context("failed to build request")?;

    let exchange = async {
        let response = client
            .request(req)
            .await
            .with_context(|| format!("request to {} failed", uri_str))?;
        let status = response.status().as_u16();
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .with_context(|| format!("failed to read response body from {}", uri_str))?
            .to_bytes();
        Ok::<_, anyhow::Error>((status, parts.headers, body))
    };

    match timeout(timeout_duration, exchange).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!(
            "request to {} timed out after {:?}",
            uri_str,
            timeout_duration
        )),
    }
}

/// GET without a body.
pub async fn get(client: &HyperClient, uri: Uri, timeout_duration: Duration) -> Result<Exchange> {
    make_method_request(client, Method::GET, uri, &[], None, timeout_duration).await
}

/// POST with a JSON body.
pub async fn post_json(
    client: &HyperClient,
    uri: Uri,
    body: &serde_json::Value,
    timeout_duration: Duration,
) -> Result<Exchange> {
    let bytes = Bytes::from(serde_json::to_vec(body).context("failed to encode JSON body")?);
    make_method_request(
        client,
        Method::POST,
        uri,
        &[("content-type", "application/json")],
        Some(bytes),
        timeout_duration,
    )
    .await
}

/// Parses a `url::Url` into a hyper `Uri`.
pub fn to_uri(url: &url::Url) -> Result<Uri> {
    url.as_str()
        .parse::<Uri>()
        .with_context(|| format!("invalid request uri {}", url))
}
