// Fan-out of deploy requests from the directory to candidate sites.

pub mod dispatcher;
pub mod merge;
pub mod site_client;

pub use dispatcher::{clamp_results, DispatchError, Dispatcher, MAX_RESULTS};
pub use merge::interleave;
pub use site_client::{deploy_url, HyperSiteClient, SiteClient, HEADER_CLIENT_IP, HEADER_LOCATION};
