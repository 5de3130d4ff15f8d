#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use crate::geo::{GeoLocation, NoopLocator, StaticLocator};
    use crate::http::header::{client_address, client_location};

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    fn peer() -> Option<SocketAddr> {
        Some("198.51.100.7:40000".parse().unwrap())
    }

    #[test]
    fn test_header_address_overrides_peer() {
        let h = headers(&[("X-ClientIP", "203.0.113.5")]);
        assert_eq!(
            client_address(&h, peer()).unwrap(),
            IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5))
        );
        assert_eq!(
            client_address(&HeaderMap::new(), peer()).unwrap(),
            IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7))
        );
    }

    #[test]
    fn test_bad_address_header_falls_back_to_peer() {
        let h = headers(&[("X-ClientIP", "not-an-ip")]);
        assert_eq!(
            client_address(&h, peer()).unwrap(),
            IpAddr::V4(Ipv4Addr::new(198, 51, 100, 7))
        );
        assert!(client_address(&h, None).is_err());
        assert!(client_address(&HeaderMap::new(), None).is_err());
    }

    #[test]
    fn test_location_header_wins_over_locator() {
        let locator = StaticLocator::new([(
            "203.0.113.0/24".parse().unwrap(),
            GeoLocation::new(10.0, 10.0).unwrap(),
        )]);
        let addr: IpAddr = "203.0.113.5".parse().unwrap();

        let h = headers(&[("X-Location", "52.5,13.4")]);
        assert_eq!(
            client_location(&h, addr, &locator),
            Some(GeoLocation::new(52.5, 13.4).unwrap())
        );
        assert_eq!(
            client_location(&HeaderMap::new(), addr, &locator),
            Some(GeoLocation::new(10.0, 10.0).unwrap())
        );
    }

    #[test]
    fn test_out_of_range_location_is_ignored() {
        let addr: IpAddr = "203.0.113.5".parse().unwrap();
        for raw in ["91,0", "0,181", "north", "1,2,3"] {
            let h = headers(&[("X-Location", raw)]);
            assert_eq!(client_location(&h, addr, &NoopLocator), None, "{raw}");
        }
    }
}
