// Periodic maintenance for both tiers.

pub mod instance_reaper;
pub mod job;
pub mod reporter;
pub mod site_evictor;

pub use instance_reaper::{InstanceReaper, DEFAULT_LEASE};
pub use job::{spawn_periodic, Job};
pub use reporter::{deploy_endpoint, sites_url, Reporter};
pub use site_evictor::SiteEvictor;
