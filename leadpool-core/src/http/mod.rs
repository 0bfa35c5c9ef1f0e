//! HTTP surface over [`crate::service::LeadService`]
//!
//! # Architecture
//!
//! - [`server`] - hyper accept loop and body limits
//! - [`router`] - route table and thin handlers
//! - [`request`] - identity headers and query parsing
//! - [`error`] - JSON error bodies and status mapping
//! - [`utils`] - response helpers

pub mod error;
pub mod request;
pub mod router;
pub mod server;
pub mod utils;

pub use error::{error_response, json_error};
pub use request::{identity_from_headers, window_from_query};
pub use server::{handle, LeadpoolServer};
pub use utils::{Resp, RespBody};
