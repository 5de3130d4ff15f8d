pub mod client_info;

pub use client_info::{client_address, client_location};

#[cfg(test)]
mod client_info_test;
