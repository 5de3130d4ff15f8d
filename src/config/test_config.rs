use std::net::Ipv4Addr;
use std::time::Duration;

use crate::net::IpNetwork;

use super::{Api, CloudletBox, Config, Directory, Dispatch, Eviction, Logs, Probe, SiteTier, K8S};

/// Creates a new test configuration.
pub fn new_test_config() -> Config {
    Config {
        cloudletd: CloudletBox {
            env: super::TEST.to_string(),
            logs: Some(Logs {
                level: Some("debug".to_string()),
            }),
            api: Some(Api {
                name: Some("cloudletd-test".to_string()),
                port: Some(0),
            }),
            k8s: Some(K8S {
                probe: Probe {
                    timeout: Some(Duration::from_secs(5)),
                },
            }),
            directory: Some(Directory {
                sites_file: None,
                matchers: None,
                max_results: Some(3),
                dispatch: Some(Dispatch {
                    timeout: Some(Duration::from_secs(2)),
                    concurrency: Some(16),
                }),
                eviction: Some(Eviction {
                    interval: Some(Duration::from_secs(60)),
                    max_age: Some(Duration::from_secs(300)),
                }),
                geo: None,
            }),
            site: Some(SiteTier {
                id: None,
                recipes: None,
                kubeconfig: None,
                kubecontext: None,
                prometheus: None,
                client_network: Some(IpNetwork::V4 {
                    addr: Ipv4Addr::new(10, 5, 0, 0),
                    prefix: 16,
                }),
                lease: Some(Duration::from_secs(300)),
                expiry_interval: Some(Duration::from_secs(60)),
                create_attempts: Some(3),
                report: None,
            }),
        },
    }
}
