//! Prometheus metrics.
//
//! Counters are recorded through the `metrics` facade and rendered by the
//! exporter installed in `controller::metrics`.

// Metric name constants
pub const DEPLOY_REQUESTS: &str = "cloudletd_deploy_requests_total";
pub const CANDIDATE_FAILURES: &str = "cloudletd_candidate_failures_total";
pub const DISPATCH_FAILURES: &str = "cloudletd_dispatch_failures_total";
pub const SITES_REGISTERED: &str = "cloudletd_sites_registered_total";
pub const SITES_EVICTED: &str = "cloudletd_sites_evicted_total";
pub const INSTANCES_CREATED: &str = "cloudletd_instances_created_total";
pub const INSTANCES_EXPIRED: &str = "cloudletd_instances_expired_total";
pub const CREATE_CONFLICTS: &str = "cloudletd_create_conflicts_total";
pub const REPORT_FAILURES: &str = "cloudletd_report_failures_total";
pub const PANICKED: &str = "cloudletd_panics_total";

/// Counts one deploy request at the given tier.
pub fn inc_deploy_requests(tier: &'static str) {
    metrics::counter!(DEPLOY_REQUESTS, "tier" => tier).increment(1);
}

/// Counts one failed call to a candidate site.
pub fn inc_candidate_failures() {
    metrics::counter!(CANDIDATE_FAILURES).increment(1);
}

/// Counts one request where every candidate failed.
pub fn inc_dispatch_failures() {
    metrics::counter!(DISPATCH_FAILURES).increment(1);
}

pub fn inc_sites_registered() {
    metrics::counter!(SITES_REGISTERED).increment(1);
}

pub fn add_sites_evicted(value: u64) {
    metrics::counter!(SITES_EVICTED).increment(value);
}

pub fn inc_instances_created() {
    metrics::counter!(INSTANCES_CREATED).increment(1);
}

pub fn inc_instances_expired() {
    metrics::counter!(INSTANCES_EXPIRED).increment(1);
}

/// Counts a creation attempt that lost a race and was rolled back.
pub fn inc_create_conflicts() {
    metrics::counter!(CREATE_CONFLICTS).increment(1);
}

pub fn inc_report_failures() {
    metrics::counter!(REPORT_FAILURES).increment(1);
}

pub fn inc_panics() {
    metrics::counter!(PANICKED).increment(1);
}
