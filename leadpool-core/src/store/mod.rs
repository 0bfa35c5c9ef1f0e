//! Store traits and the embedded datastore
//!
//! The engines only see these traits. Implement them to back Leadpool with
//! another document store; [`MemoryDatastore`] implements all of them on top
//! of lock-free `scc` maps with an optional CRC-checked journal.
//!
//! Every trait method fails with [`Error::Dependency`](crate::Error) when
//! the backend is unavailable. Nothing is retried at this layer.

mod collection;
pub mod filter;
pub mod journal;
pub mod memory;

pub use filter::{BookingFilter, LeadFilter, LeadSort, UserFilter};
pub use journal::{Journal, StoreEvent};
pub use memory::{DatastoreStats, MemoryDatastore};

use crate::model::{
    AgentPerformance, Booking, EmailEntry, InventorySnapshot, Lead, LeadPatch, Notification,
    TelemarketerPerformance, TimeWindow, User,
};
use crate::Result;
use std::sync::Arc;

/// Lead collection with atomic conditional updates
#[async_trait::async_trait]
pub trait LeadStore: Send + Sync {
    async fn count(&self, filter: &LeadFilter) -> Result<u64>;

    /// Matching leads in `sort` order, truncated to `limit`
    async fn find(&self, filter: &LeadFilter, sort: LeadSort, limit: Option<usize>)
        -> Result<Vec<Lead>>;

    async fn get(&self, id: &str) -> Result<Option<Lead>>;

    /// Insert a new lead
    ///
    /// Fails with `Duplicate` when the id is taken or another lead already
    /// has the same normalized name and phone number.
    async fn insert(&self, lead: Lead) -> Result<Lead>;

    /// Patch a lead by id, returning `(before, after)`
    ///
    /// Both documents are taken under the same write, so `before` is exactly
    /// the version the patch was applied to. A patch that would give the
    /// lead another lead's name and phone fails with `Duplicate`.
    async fn update_one_with_previous(&self, id: &str, patch: &LeadPatch)
        -> Result<Option<(Lead, Lead)>>;

    /// Patch a lead by id, returning the updated document
    async fn update_one(&self, id: &str, patch: &LeadPatch) -> Result<Option<Lead>> {
        Ok(self.update_one_with_previous(id, patch).await?.map(|(_, after)| after))
    }

    /// Atomically patch the first lead (in [`LeadSort::default`] order) that
    /// still matches `filter` at the moment of the write
    ///
    /// Returns `None` when every candidate was taken by a concurrent writer.
    async fn find_one_and_update(&self, filter: &LeadFilter, patch: &LeadPatch)
        -> Result<Option<Lead>>;

    /// Remove a lead, returning it; `None` if it was already gone
    async fn delete(&self, id: &str) -> Result<Option<Lead>>;
}

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn count(&self, filter: &UserFilter) -> Result<u64>;

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>>;

    async fn get(&self, id: &str) -> Result<Option<User>>;

    /// Insert or replace by id; an existing user keeps its `created_at`
    async fn upsert(&self, user: User) -> Result<User>;
}

#[async_trait::async_trait]
pub trait BookingStore: Send + Sync {
    async fn append(&self, booking: Booking) -> Result<Booking>;

    async fn count(&self, filter: &BookingFilter) -> Result<u64>;

    /// Newest first
    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>>;
}

#[async_trait::async_trait]
pub trait NotificationStore: Send + Sync {
    async fn append(&self, notification: Notification) -> Result<Notification>;

    /// Newest first
    async fn list(&self) -> Result<Vec<Notification>>;
}

#[async_trait::async_trait]
pub trait EmailLog: Send + Sync {
    async fn append(&self, entry: EmailEntry) -> Result<EmailEntry>;

    async fn count(&self, window: Option<TimeWindow>) -> Result<u64>;
}

/// Singleton inventory snapshot
#[async_trait::async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Replace the snapshot, stamping `updated_at`
    async fn upsert(&self, snapshot: InventorySnapshot) -> Result<InventorySnapshot>;

    async fn current(&self) -> Result<Option<InventorySnapshot>>;
}

/// Performance records keyed by agent name
#[async_trait::async_trait]
pub trait PerformanceStore: Send + Sync {
    async fn upsert_agent(&self, record: AgentPerformance) -> Result<AgentPerformance>;

    /// Most recently updated first
    async fn list_agents(&self) -> Result<Vec<AgentPerformance>>;

    async fn upsert_telemarketer(
        &self,
        record: TelemarketerPerformance,
    ) -> Result<TelemarketerPerformance>;

    /// Most recently updated first
    async fn list_telemarketers(&self) -> Result<Vec<TelemarketerPerformance>>;
}

/// Every store the engines need, as trait objects
///
/// Fields are public so tests can swap a single collaborator (for example
/// a lead store that fails on demand) while keeping the rest.
#[derive(Clone)]
pub struct Stores {
    pub leads: Arc<dyn LeadStore>,
    pub users: Arc<dyn UserStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub emails: Arc<dyn EmailLog>,
    pub snapshot: Arc<dyn SnapshotStore>,
    pub performance: Arc<dyn PerformanceStore>,
}

impl Stores {
    /// Use one datastore for every collection
    pub fn from_datastore<D>(datastore: Arc<D>) -> Self
    where
        D: LeadStore
            + UserStore
            + BookingStore
            + NotificationStore
            + EmailLog
            + SnapshotStore
            + PerformanceStore
            + 'static,
    {
        Self {
            leads: datastore.clone(),
            users: datastore.clone(),
            bookings: datastore.clone(),
            notifications: datastore.clone(),
            emails: datastore.clone(),
            snapshot: datastore.clone(),
            performance: datastore,
        }
    }

    pub fn in_memory(clock: Arc<dyn crate::clock::Clock>) -> Self {
        Self::from_datastore(Arc::new(MemoryDatastore::new(clock)))
    }
}
