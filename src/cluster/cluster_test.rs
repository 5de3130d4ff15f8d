#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    use crate::cluster::kube::parse_peer_list;
    use crate::cluster::peer::{LABEL_CLIENT, LABEL_KEY, LABEL_MANAGED_BY, LABEL_WORKLOAD};
    use crate::cluster::prometheus::{parse_peer_keys, parse_scalar};
    use crate::cluster::{LabelSelector, PeerResource};
    use crate::model::ClientKey;

    fn key() -> ClientKey {
        ClientKey::from_bytes([7u8; 32])
    }

    fn peer() -> PeerResource {
        PeerResource::for_instance(
            "brave-otter-00c0de",
            Uuid::nil(),
            key(),
            "10.5.1.2".parse().unwrap(),
            "charts/hello-0.1.0.tgz",
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_peer_manifest_shape() {
        let manifest = peer().to_manifest();
        assert_eq!(manifest["apiVersion"], "kilo.squat.ai/v1alpha1");
        assert_eq!(manifest["kind"], "Peer");
        assert_eq!(manifest["metadata"]["name"], "brave-otter-00c0de");
        assert_eq!(manifest["metadata"]["labels"][LABEL_CLIENT], "10.5.1.2");
        assert_eq!(manifest["metadata"]["labels"][LABEL_KEY], key().label());
        assert_eq!(manifest["spec"]["allowedIPs"], json!(["10.5.1.2/32"]));
        assert_eq!(manifest["spec"]["publicKey"], key().to_string());
        assert_eq!(manifest["spec"]["persistentKeepalive"], 10);
    }

    #[test]
    fn test_peer_manifest_reads_back_as_record() {
        let original = peer();
        let parsed = PeerResource::from_manifest(&original.to_manifest()).unwrap();
        assert_eq!(parsed, original);

        let record = parsed.record().unwrap();
        assert_eq!(record.name, "brave-otter-00c0de");
        assert_eq!(record.workload, Uuid::nil());
        assert_eq!(record.key, key());
        assert_eq!(record.client_ip.to_string(), "10.5.1.2");
        assert_eq!(record.created, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_foreign_or_damaged_peers_have_no_record() {
        let mut foreign = peer();
        foreign.labels.remove(LABEL_MANAGED_BY);
        assert!(foreign.record().is_none());

        let mut damaged = peer();
        damaged.labels.insert(LABEL_WORKLOAD.to_string(), "not-a-uuid".to_string());
        assert!(damaged.record().is_none());

        let mut no_created = peer();
        no_created.annotations.clear();
        assert!(no_created.record().is_none());
    }

    #[test]
    fn test_label_selector() {
        let selector = LabelSelector::instance(Uuid::nil(), &key());
        assert_eq!(
            selector.to_string(),
            format!(
                "app.kubernetes.io/managed-by=cloudletd,cloudletd.io/workload={},cloudletd.io/key={}",
                Uuid::nil(),
                key().label()
            )
        );
        assert!(selector.matches(&peer().labels));

        let other = LabelSelector::instance(Uuid::new_v4(), &key());
        assert!(!other.matches(&peer().labels));
        assert!(LabelSelector::managed().matches(&peer().labels));
        assert!(LabelSelector::default().matches(&BTreeMap::new()));
    }

    #[test]
    fn test_parse_peer_list() {
        let list = json!({ "apiVersion": "v1", "items": [peer().to_manifest(), {"bogus": true}] });
        let peers = parse_peer_list(&list.to_string()).unwrap();
        assert_eq!(peers, vec![peer()]);

        assert!(parse_peer_list("").unwrap().is_empty());
        assert!(parse_peer_list("{}").is_err());
        assert!(parse_peer_list("not json").is_err());
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(parse_scalar(&json!({"resultType": "scalar", "result": [1.0, "0.25"]})), Some(0.25));
        assert_eq!(parse_scalar(&json!({"resultType": "scalar", "result": [1.0, "NaN"]})), None);
        assert_eq!(parse_scalar(&json!({"resultType": "scalar", "result": [1.0, "+Inf"]})), None);
        assert_eq!(parse_scalar(&json!({"resultType": "vector", "result": []})), None);
    }

    #[test]
    fn test_parse_peer_keys() {
        let data = json!({
            "resultType": "vector",
            "result": [
                {"metric": {"public_key": key().to_string()}, "value": [1.0, "1"]},
                {"metric": {"public_key": "garbage"}, "value": [1.0, "1"]},
                {"metric": {}, "value": [1.0, "1"]},
            ]
        });
        let keys = parse_peer_keys(&data).unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys.contains(&key()));

        assert!(parse_peer_keys(&json!({"resultType": "scalar", "result": [0, "1"]})).is_err());
    }
}
