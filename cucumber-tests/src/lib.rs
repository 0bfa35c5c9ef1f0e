//! Cucumber BDD suite for Leadpool
//!
//! Feature files live in `features/`; run them with
//! `cargo test -p cucumber-tests --test cucumber_tests`.

pub mod features;
