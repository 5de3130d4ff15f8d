// Concurrent deploy requests against one site.

use futures::future::join_all;
use std::collections::HashSet;

use crate::support::recipes::HELLO_WORKLOAD;
use crate::support::{
    assert_equal, assert_ok, do_json, key_path, site_fixture, test_config, RunningApp, H,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_same_key_converge() {
    let cfg = test_config();
    let fixture = site_fixture(&cfg);
    let app = RunningApp::start(&cfg, fixture.role.clone()).await;
    let url = app.url(&format!("/deploy/{}/{}", HELLO_WORKLOAD, key_path(11)));

    let calls = (0..8).map(|_| {
        let url = url.clone();
        tokio::spawn(async move { do_json("POST", &url, &H::new(), None).await })
    });
    let answers = join_all(calls).await;

    let mut names = HashSet::new();
    let mut addresses = HashSet::new();
    for answer in answers {
        let (status, _, body) = assert_ok(answer.unwrap());
        assert_equal(200, status);
        let body = body.unwrap();
        names.insert(body[0]["DeploymentName"].as_str().unwrap().to_string());
        addresses.insert(body[0]["TunnelConfig"]["address"][0].as_str().unwrap().to_string());
    }

    assert_equal(1, names.len());
    assert_equal(1, addresses.len());
    assert_equal(1, fixture.cluster.peers().len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_different_keys_get_distinct_addresses() {
    let cfg = test_config();
    let fixture = site_fixture(&cfg);
    let app = RunningApp::start(&cfg, fixture.role.clone()).await;

    let calls = (20..30u8).map(|n| {
        let url = app.url(&format!("/deploy/{}/{}", HELLO_WORKLOAD, key_path(n)));
        tokio::spawn(async move { do_json("POST", &url, &H::new(), None).await })
    });
    let answers = join_all(calls).await;

    let mut names = HashSet::new();
    let mut addresses = HashSet::new();
    for answer in answers {
        let (status, _, body) = assert_ok(answer.unwrap());
        assert_equal(200, status);
        let body = body.unwrap();
        names.insert(body[0]["DeploymentName"].as_str().unwrap().to_string());
        addresses.insert(body[0]["TunnelConfig"]["address"][0].as_str().unwrap().to_string());
    }

    assert_equal(10, names.len());
    assert_equal(10, addresses.len());
    assert_equal(10, fixture.cluster.peers().len());
}
