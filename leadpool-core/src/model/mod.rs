//! Records held by the datastore
//!
//! All records serialize with camelCase field names, the shape dashboards
//! and the HTTP layer consume.

pub mod lead;
pub mod records;
pub mod summary;
pub mod user;

pub use lead::{Assignment, Lead, LeadPatch, LeadUpdate, NewLead};
pub use records::{Booking, EmailEntry, NewEmail, Notification, NotificationKind};
pub use summary::{AgentPerformance, InventorySnapshot, TelemarketerPerformance, TimeWindow};
pub use user::{AgentIdentity, NewUser, User};

/// Fresh opaque record id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Collect the names of blank required fields
pub(crate) fn blank_fields<'a>(fields: &[(&'a str, &str)]) -> Vec<&'a str> {
    fields.iter().filter(|(_, value)| value.trim().is_empty()).map(|(name, _)| *name).collect()
}
