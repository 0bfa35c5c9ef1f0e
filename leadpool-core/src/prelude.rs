//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use leadpool_core::prelude::*;
//! ```

// === Service and engines ===
pub use crate::aggregation::AggregationEngine;
pub use crate::distribution::{DistributionEngine, WorkingSet};
pub use crate::service::LeadService;

// === Server ===
pub use crate::http::LeadpoolServer;

// === Configuration and logging ===
pub use crate::config::LeadpoolConfig;
pub use crate::logging::{init_logging, LogFormat, LogOutput, LoggerConfig};

// === Domain ===
pub use crate::classification::{CallDisposition, Classification, LeadType, Role, Team};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::model::{
    AgentIdentity, AgentPerformance, Booking, EmailEntry, InventorySnapshot, Lead, LeadUpdate,
    NewEmail, NewLead, NewUser, Notification, TelemarketerPerformance, TimeWindow, User,
};

// === Storage ===
pub use crate::store::{LeadFilter, LeadSort, MemoryDatastore, Stores};

// === Errors ===
pub use crate::{Error, Result};
