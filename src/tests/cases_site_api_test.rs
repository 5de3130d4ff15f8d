// Site routes over a real socket, backed by the in-memory cluster.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::naming::human_name;
use crate::model::ClientKey;
use crate::net::IpNetwork;
use crate::support::recipes::{HELLO_WORKLOAD, SECRET_WORKLOAD};
use crate::support::{
    assert_equal, assert_ok, do_json, key_path, site_fixture, site_fixture_without_cluster,
    test_config, RunningApp, SiteFixture, H,
};

async fn site() -> (SiteFixture, RunningApp) {
    let cfg = test_config();
    let fixture = site_fixture(&cfg);
    let app = RunningApp::start(&cfg, fixture.role.clone()).await;
    (fixture, app)
}

fn instance_path(workload: Uuid, key: u8) -> String {
    format!("/deploy/{}/{}", workload, key_path(key))
}

#[tokio::test]
async fn test_create_returns_instance_with_tunnel() {
    let (fixture, app) = site().await;

    let (status, _, body) = assert_ok(
        do_json("POST", &app.url(&instance_path(HELLO_WORKLOAD, 1)), &H::new(), None).await,
    );
    assert_equal(200, status);
    let list: Vec<Value> = serde_json::from_value(body.unwrap()).unwrap();
    assert_equal(1, list.len());

    let info = &list[0];
    let key = ClientKey::from_bytes([1; 32]);
    let name = human_name(&[HELLO_WORKLOAD.as_bytes(), key.as_bytes()]);
    assert_equal(json!(name), info["DeploymentName"].clone());
    assert_equal(json!(HELLO_WORKLOAD.to_string()), info["UUID"].clone());
    assert_equal(json!(key.to_string()), info["ApplicationKey"].clone());
    assert_equal(json!("Deployed"), info["Status"].clone());

    let tunnel = &info["TunnelConfig"];
    assert_equal(json!(["0.0.0.0/0"]), tunnel["allowedIPs"].clone());
    assert_equal(json!("203.0.113.10:51820"), tunnel["endpoint"].clone());
    let address: std::net::IpAddr = tunnel["address"][0].as_str().unwrap().parse().unwrap();
    let client_network: IpNetwork = "10.5.0.0/16".parse().unwrap();
    assert!(client_network.contains(address));
    assert_equal(
        json!(format!("{}.svc.cluster.local", name)),
        tunnel["dns"][1].clone(),
    );

    assert_equal(1, fixture.cluster.peers().len());
    assert!(fixture.cluster.releases().contains_key(&name));
}

#[tokio::test]
async fn test_create_twice_returns_the_same_instance() {
    let (fixture, app) = site().await;
    let url = app.url(&instance_path(HELLO_WORKLOAD, 2));

    let (_, _, first) = assert_ok(do_json("POST", &url, &H::new(), None).await);
    let (_, _, second) = assert_ok(do_json("POST", &url, &H::new(), None).await);
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_equal(first[0]["DeploymentName"].clone(), second[0]["DeploymentName"].clone());
    assert_equal(
        first[0]["TunnelConfig"]["address"].clone(),
        second[0]["TunnelConfig"]["address"].clone(),
    );
    assert_equal(1, fixture.cluster.peers().len());
}

#[tokio::test]
async fn test_get_and_delete_lifecycle() {
    let (fixture, app) = site().await;
    let url = app.url(&instance_path(HELLO_WORKLOAD, 3));

    let (status, _, _) = assert_ok(do_json("GET", &url, &H::new(), None).await);
    assert_equal(404, status);
    let (status, _, _) = assert_ok(do_json("DELETE", &url, &H::new(), None).await);
    assert_equal(404, status);

    let (_, _, created) = assert_ok(do_json("POST", &url, &H::new(), None).await);
    let (status, _, got) = assert_ok(do_json("GET", &url, &H::new(), None).await);
    assert_equal(200, status);
    assert_equal(created.unwrap()[0]["DeploymentName"].clone(), got.unwrap()[0]["DeploymentName"].clone());

    let (status, body, _) = assert_ok(do_json("DELETE", &url, &H::new(), None).await);
    assert_equal(204, status);
    assert!(body.is_empty());
    assert!(fixture.cluster.peers().is_empty());
    assert!(fixture.cluster.releases().is_empty());

    let (status, _, _) = assert_ok(do_json("GET", &url, &H::new(), None).await);
    assert_equal(404, status);
}

#[tokio::test]
async fn test_bad_requests() {
    let (fixture, app) = site().await;

    let bad_key = app.url(&format!("/deploy/{}/short", HELLO_WORKLOAD));
    let (status, _, problem) = assert_ok(do_json("POST", &bad_key, &H::new(), None).await);
    assert_equal(400, status);
    assert_equal(json!(400), problem.unwrap()["status"].clone());

    let bad_workload = app.url(&format!("/deploy/nope/{}", key_path(1)));
    for method in ["POST", "GET", "DELETE"] {
        let (status, _, _) = assert_ok(do_json(method, &bad_workload, &H::new(), None).await);
        assert_equal(400, status);
    }

    let unknown = app.url(&instance_path(Uuid::new_v4(), 1));
    let (status, _, _) = assert_ok(do_json("POST", &unknown, &H::new(), None).await);
    assert_equal(404, status);

    assert!(fixture.cluster.peers().is_empty());
}

#[tokio::test]
async fn test_cluster_failure_is_400() {
    let (fixture, app) = site().await;
    fixture.cluster.set_failing(true);

    let url = app.url(&instance_path(HELLO_WORKLOAD, 4));
    let (status, _, problem) = assert_ok(do_json("POST", &url, &H::new(), None).await);
    assert_equal(400, status);
    assert_equal(json!("Bad Request"), problem.unwrap()["title"].clone());

    let (status, _, _) = assert_ok(do_json("GET", &url, &H::new(), None).await);
    assert_equal(400, status);
}

#[tokio::test]
async fn test_delete_keeps_instance_when_release_cannot_be_removed() {
    let (fixture, app) = site().await;
    let url = app.url(&instance_path(HELLO_WORKLOAD, 6));
    let (status, _, _) = assert_ok(do_json("POST", &url, &H::new(), None).await);
    assert_equal(200, status);

    fixture.cluster.set_uninstall_failing(true);
    let (status, _, _) = assert_ok(do_json("DELETE", &url, &H::new(), None).await);
    assert_equal(400, status);
    let (status, _, _) = assert_ok(do_json("GET", &url, &H::new(), None).await);
    assert_equal(200, status);

    fixture.cluster.set_uninstall_failing(false);
    let (status, _, _) = assert_ok(do_json("DELETE", &url, &H::new(), None).await);
    assert_equal(204, status);
    assert!(fixture.cluster.releases().is_empty());
}

#[tokio::test]
async fn test_without_cluster_instance_routes_are_unavailable() {
    let cfg = test_config();
    let fixture = site_fixture_without_cluster(&cfg);
    let app = RunningApp::start(&cfg, fixture.role.clone()).await;

    let url = app.url(&instance_path(HELLO_WORKLOAD, 5));
    for method in ["POST", "GET", "DELETE"] {
        let (status, _, _) = assert_ok(do_json(method, &url, &H::new(), None).await);
        assert_equal(503, status);
    }

    // recipes do not need the cluster
    let (status, _, _) = assert_ok(
        do_json("GET", &app.url(&format!("/recipes/{}", HELLO_WORKLOAD)), &H::new(), None).await,
    );
    assert_equal(200, status);
}

#[tokio::test]
async fn test_recipe_descriptions() {
    let (_fixture, app) = site().await;

    let (status, _, body) = assert_ok(
        do_json("GET", &app.url(&format!("/recipes/{}", HELLO_WORKLOAD)), &H::new(), None).await,
    );
    assert_equal(200, status);
    assert_equal(
        json!({
            "chart": "charts/helloworld",
            "version": "0.1.0",
            "description": "hello world",
            "values": {"replicas": 1}
        }),
        body.unwrap(),
    );

    for path in [
        format!("/recipes/{}", SECRET_WORKLOAD),
        format!("/recipes/{}", Uuid::new_v4()),
        "/recipes/not-a-uuid".to_string(),
    ] {
        let (status, _, _) = assert_ok(do_json("GET", &app.url(&path), &H::new(), None).await);
        assert_equal(404, status);
    }
}

#[tokio::test]
async fn test_service_routes() {
    let (_fixture, app) = site().await;

    for path in ["/", "/k8s/probe", "/metrics"] {
        let (status, _, _) = assert_ok(do_json("GET", &app.url(path), &H::new(), None).await);
        assert_equal(200, status);
    }
    assert!(app.app().is_alive());
}
