// HTTP helpers and assertions shared by the integration cases.

use std::collections::HashMap;
use std::time::Duration;

use crate::model::ClientKey;

pub type H = HashMap<String, String>;

/// Builds a header map from literal pairs.
pub fn headers(pairs: &[(&str, &str)]) -> H {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Url-safe form of a key made of `n` repeated.
pub fn key_path(n: u8) -> String {
    ClientKey::from_bytes([n; 32]).urlsafe()
}

/// Sends `method url` with the given headers and an optional JSON body.
pub async fn do_request(
    method: &str,
    url: &str,
    headers: &H,
    body: Option<&[u8]>,
) -> Result<reqwest::Response, reqwest::Error> {
    let method = reqwest::Method::from_bytes(method.as_bytes())
        .unwrap_or_else(|_| panic!("bad method: {method}"));
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let request = headers
        .iter()
        .fold(client.request(method, url), |req, (name, value)| {
            req.header(name.as_str(), value.as_str())
        });
    match body {
        Some(json) => {
            request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(json.to_vec())
                .send()
                .await
        }
        None => request.send().await,
    }
}

/// Sends a request and returns the status, the raw body and the body parsed
/// as JSON when it is JSON.
pub async fn do_json(
    method: &str,
    url: &str,
    headers: &H,
    body: Option<&[u8]>,
) -> Result<(u16, Vec<u8>, Option<serde_json::Value>), reqwest::Error> {
    let resp = do_request(method, url, headers, body).await?;
    let status = resp.status().as_u16();
    let is_json = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("json"))
        .unwrap_or(false);

    let body = resp.bytes().await?.to_vec();
    let parsed = if is_json && !body.is_empty() {
        serde_json::from_slice(&body).ok()
    } else {
        None
    };
    Ok((status, body, parsed))
}

pub fn assert_ok<T, E: std::fmt::Display>(result: Result<T, E>) -> T {
    result.unwrap_or_else(|e| panic!("unexpected error: {}", e))
}

pub fn assert_equal<T: PartialEq + std::fmt::Debug>(want: T, got: T) {
    if want != got {
        panic!("want={:?} got={:?}", want, got);
    }
}
