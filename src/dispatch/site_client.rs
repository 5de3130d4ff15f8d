//! Outbound deploy calls from the directory to a site.

use async_trait::async_trait;
use hyper::Method;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::http::client::{self, HyperClient};
use crate::model::{ClientContext, Site};

use super::DispatchError;

pub const HEADER_CLIENT_IP: &str = "X-ClientIP";
pub const HEADER_LOCATION: &str = "X-Location";

/// Asks one site to deploy a workload for a client.
#[async_trait]
pub trait SiteClient: Send + Sync {
    /// Returns the site's instance descriptions, in the site's order.
    async fn deploy(
        &self,
        site: &Site,
        workload: Uuid,
        client: &ClientContext,
    ) -> Result<Vec<serde_json::Value>, DispatchError>;
}

/// `POST {endpoint}/{workload}/{key}` over the shared hyper client.
#[derive(Clone)]
pub struct HyperSiteClient {
    client: HyperClient,
    timeout: Duration,
}

impl HyperSiteClient {
    pub fn new(client: HyperClient, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

/// Deploy url for a workload and client key below the site's endpoint.
pub fn deploy_url(endpoint: &Url, workload: Uuid, client: &ClientContext) -> Result<Url, DispatchError> {
    let base = endpoint.as_str().trim_end_matches('/');
    let raw = format!("{}/{}/{}", base, workload, client.key.urlsafe());
    Url::parse(&raw).map_err(|e| DispatchError::Transport(e.to_string()))
}

#[async_trait]
impl SiteClient for HyperSiteClient {
    async fn deploy(
        &self,
        site: &Site,
        workload: Uuid,
        client: &ClientContext,
    ) -> Result<Vec<serde_json::Value>, DispatchError> {
        let url = deploy_url(&site.endpoint, workload, client)?;
        let uri = client::to_uri(&url).map_err(|e| DispatchError::Transport(e.to_string()))?;

        let address = client.address.to_string();
        let location = client.location.map(|loc| loc.to_header_value());
        let mut headers: Vec<(&str, &str)> = vec![(HEADER_CLIENT_IP, address.as_str())];
        if let Some(location) = location.as_deref() {
            headers.push((HEADER_LOCATION, location));
        }

        let (status, _, body) =
            client::make_method_request(&self.client, Method::POST, uri, &headers, None, self.timeout)
                .await
                .map_err(|e| DispatchError::Transport(format!("{:#}", e)))?;

        if !(200..300).contains(&status) {
            return Err(DispatchError::Status(status));
        }

        match serde_json::from_slice::<serde_json::Value>(&body)
            .map_err(|e| DispatchError::Malformed(e.to_string()))?
        {
            serde_json::Value::Array(items) => Ok(items),
            other => Err(DispatchError::Malformed(format!(
                "expected a list of instances, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}
