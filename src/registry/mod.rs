// Known sites: storage, static loading and default resolution.

pub mod loader;
pub mod registry;

pub use loader::{parse_sites, read_sites_file, SiteResolver};
pub use registry::Registry;

#[cfg(test)]
mod registry_test;
