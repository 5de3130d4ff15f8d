//! Integration cases: both roles served on ephemeral ports, with stub sites
//! and directories and an in-memory cluster.

mod cases_concurrent_test;
mod cases_site_api_test;

pub mod support;
