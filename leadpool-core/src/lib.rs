//! Leadpool - Core
//!
//! Lead distribution and dashboard aggregation for telemarketing teams.
//!
//! # Overview
//!
//! Lead generators create leads, telemarketers request batches of them to
//! call, and dashboards read rolled-up counters. Leadpool owns the two parts
//! of that workflow with real consistency concerns:
//!
//! - the [`distribution`] engine hands out unassigned leads using a two-tier
//!   priority scheme and claims each one with a conditional update, so two
//!   agents racing on the same pool never hold the same lead;
//! - the [`aggregation`] engine recomputes the inventory snapshot and the
//!   per-agent performance records from the live collections after every
//!   mutation.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use leadpool_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = LeadpoolConfig::load()?;
//!     let service = LeadService::from_config(&config).await?;
//!     LeadpoolServer::new(service, config.server).serve().await
//! }
//! ```
//!
//! # Architecture
//!
//! - [`classification`] - lead types, call dispositions, teams and tiers
//! - [`model`] - leads, users, bookings and summary documents
//! - [`store`] - store traits and the embedded `scc`-backed datastore
//! - [`distribution`] - working-set replenishment
//! - [`aggregation`] - inventory and performance rollups
//! - [`service`] - the operations exposed to the HTTP layer
//! - [`http`] - thin hyper handlers

pub mod aggregation;
pub mod classification;
pub mod clock;
pub mod config; // Configuration system with TOML support
pub mod distribution;
pub mod http;
pub mod logging; // Declarative logging built on the standard log crate
pub mod model;
pub mod service;
pub mod store;
pub mod testing;

// Prelude module for convenient imports
pub mod prelude;

pub use aggregation::AggregationEngine;
pub use classification::{CallDisposition, Classification, LeadType, Role, Team};
pub use distribution::{DistributionEngine, WorkingSet};
pub use http::LeadpoolServer;
pub use service::LeadService;

// Main result type for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Leadpool
///
/// The core is status-code agnostic; the HTTP layer maps each variant to a
/// response (see [`http::error`]).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Malformed or missing lead fields
    #[error("Validation failed for fields: {}", fields.join(", "))]
    Validation { fields: Vec<String> },
    /// Referenced record does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    /// A record with the same identifying fields already exists
    #[error("Duplicate: {0}")]
    Duplicate(String),
    /// The store or another collaborator failed mid-operation
    #[error("Dependency failure: {0}")]
    Dependency(String),
    /// Invalid configuration or classification tables
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound { entity, id: id.into() }
    }

    pub fn validation<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Error::Validation { fields: fields.into_iter().map(Into::into).collect() }
    }

    /// Stable snake_case code used in JSON error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation_error",
            Error::NotFound { .. } => "not_found",
            Error::Duplicate(_) => "duplicate",
            Error::Dependency(_) => "dependency_error",
            Error::Config(_) => "config_error",
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Dependency(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Dependency(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_fields() {
        let err = Error::validation(["name", "postcode"]);
        assert_eq!(err.to_string(), "Validation failed for fields: name, postcode");
        assert_eq!(err.code(), "validation_error");
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found("lead", "abc");
        assert_eq!(err.to_string(), "lead not found: abc");
    }
}
