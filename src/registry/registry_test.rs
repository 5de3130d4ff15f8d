#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;
    use uuid::Uuid;

    use crate::geo::{GeoLocation, StaticLocator};
    use crate::model::Site;
    use crate::net::IpNetwork;
    use crate::registry::{parse_sites, Registry, SiteResolver};

    fn site(name: &str) -> Site {
        let mut site = Site::new(
            Uuid::new_v4(),
            Url::parse(&format!("http://{name}/deploy")).unwrap(),
        );
        site.name = name.to_string();
        site
    }

    #[test]
    fn test_upsert_replaces_by_identity() {
        let registry = Registry::new();
        let mut a = site("a");
        registry.upsert(a.clone());
        assert_eq!(registry.len(), 1);

        a.name = "renamed".to_string();
        registry.upsert(a.clone());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&a.id).unwrap().name, "renamed");

        registry.upsert(site("b"));
        assert_eq!(registry.all().len(), 2);
    }

    #[test]
    fn test_evict_stale_keeps_static_and_fresh_sites() {
        let now = Utc::now();
        let static_site = site("static");
        let mut fresh = site("fresh");
        fresh.last_update = Some(now - ChronoDuration::seconds(10));
        let mut stale = site("stale");
        stale.last_update = Some(now - ChronoDuration::seconds(301));

        let registry = Registry::with_sites([static_site.clone(), fresh.clone(), stale.clone()]);
        let evicted = registry.evict_stale(now, Duration::from_secs(300));

        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, stale.id);
        assert!(registry.get(&static_site.id).is_some());
        assert!(registry.get(&fresh.id).is_some());
        assert!(registry.get(&stale.id).is_none());
    }

    #[test]
    fn test_parse_sites_skips_empty_documents() {
        let text = "---\nendpoint: http://one/deploy\n---\n---\nendpoint: http://two/deploy\nname: second\n";
        let sites = parse_sites(text).unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[1].name.as_deref(), Some("second"));
    }

    #[test]
    fn test_parse_sites_requires_endpoint() {
        assert!(parse_sites("name: orphan\n").is_err());
    }

    #[tokio::test]
    async fn test_resolver_fills_defaults_from_literal_address() {
        let here = GeoLocation::new(40.44, -79.94).unwrap();
        let locator = StaticLocator::new(vec![(
            "128.2.0.0/16".parse::<IpNetwork>().unwrap(),
            here,
        )]);
        let resolver = SiteResolver::new(Arc::new(locator));

        let desc = parse_sites("endpoint: http://128.2.0.1:8080/deploy\n")
            .unwrap()
            .remove(0);
        let site = resolver.resolve(desc.into_draft()).await;

        assert_eq!(site.name, "128.2.0.1");
        assert_eq!(site.locations, vec![here]);
        assert_eq!(site.local_networks[0].to_string(), "128.2.0.1/32");
    }

    #[tokio::test]
    async fn test_resolver_ignores_private_addresses() {
        let resolver = SiteResolver::new(Arc::new(StaticLocator::default()));
        let desc = parse_sites("endpoint: http://127.0.0.1:8080/deploy\n")
            .unwrap()
            .remove(0);
        let site = resolver.resolve(desc.into_draft()).await;
        assert!(site.local_networks.is_empty());
        assert!(site.locations.is_empty());
    }
}
