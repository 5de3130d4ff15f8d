use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::cluster::MetricsSource;
use crate::http::client::{post_json, to_uri, HyperClient};
use crate::metrics;
use crate::model::SiteRegistration;

use super::Job;

const REPORT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pushes this site's identity and resource snapshot to every directory.
pub struct Reporter {
    client: HyperClient,
    site_id: Uuid,
    endpoint: Url,
    directories: Vec<Url>,
    resources: Arc<dyn MetricsSource>,
}

impl Reporter {
    /// `public_url` is where clients reach this site; directories are told to
    /// deploy through `{public_url}/deploy`.
    pub fn new(
        client: HyperClient,
        site_id: Uuid,
        public_url: &Url,
        directories: Vec<Url>,
        resources: Arc<dyn MetricsSource>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client,
            site_id,
            endpoint: deploy_endpoint(public_url)?,
            directories,
            resources,
        })
    }

    pub async fn registration(&self) -> SiteRegistration {
        SiteRegistration {
            uuid: self.site_id,
            endpoint: self.endpoint.clone(),
            name: None,
            locations: None,
            local_networks: None,
            accepted_clients: None,
            rejected_clients: None,
            resources: Some(self.resources.resources().await),
        }
    }

    /// Returns how many directories accepted the report.
    pub async fn report(&self) -> usize {
        let body = match serde_json::to_value(self.registration().await) {
            Ok(body) => body,
            Err(e) => {
                warn!(component = "reporter", event = "encode_failed", error = %e);
                return 0;
            }
        };

        let pushes = self.directories.iter().map(|dir| {
            let body = &body;
            async move {
                match self.push(dir, body).await {
                    Ok(()) => true,
                    Err(e) => {
                        metrics::inc_report_failures();
                        warn!(component = "reporter", event = "report_failed", directory = %dir, error = %e);
                        false
                    }
                }
            }
        });
        join_all(pushes).await.into_iter().filter(|ok| *ok).count()
    }

    async fn push(&self, directory: &Url, body: &serde_json::Value) -> anyhow::Result<()> {
        let url = sites_url(directory)?;
        let (status, _, _) = post_json(&self.client, to_uri(&url)?, body, REPORT_TIMEOUT).await?;
        if !(200..300).contains(&status) {
            anyhow::bail!("directory answered {}", status);
        }
        debug!(component = "reporter", event = "reported", directory = %directory);
        Ok(())
    }
}

#[async_trait]
impl Job for Reporter {
    fn name(&self) -> &'static str {
        "reporter"
    }

    async fn tick(&self, _now: DateTime<Utc>) {
        self.report().await;
    }
}

fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

pub fn deploy_endpoint(public_url: &Url) -> anyhow::Result<Url> {
    Ok(with_trailing_slash(public_url).join("deploy")?)
}

pub fn sites_url(directory: &Url) -> anyhow::Result<Url> {
    Ok(with_trailing_slash(directory).join("sites")?)
}
