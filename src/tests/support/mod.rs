// Fakes and helpers shared by unit and integration tests.

pub mod common;
pub mod fake_cluster;
pub mod harness;
pub mod recipes;
pub mod stub_http;

pub use common::*;
pub use harness::{
    directory_role, site_fixture, site_fixture_without_cluster, test_config, RunningApp, SiteFixture,
};
