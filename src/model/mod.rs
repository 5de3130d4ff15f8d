// Domain values shared by the directory and the site.

pub mod client;
pub mod instance;
pub mod key;
pub mod recipe;
pub mod site;

pub use client::ClientContext;
pub use instance::{
    Instance, InstanceInfo, InstanceRecord, InstanceStatus, SiteTunnel, TunnelConfig,
};
pub use key::{ClientKey, KeyError};
pub use recipe::{Recipe, RecipeDescription, RecipeError};
pub use site::{Site, SiteDescriptor, SiteDraft, SiteRegistration, SiteSummary};
