//! Embedded datastore implementing every store trait
//!
//! Each collection is an `scc` map keyed by id. Conditional lead updates
//! re-check their filter under the entry lock, so concurrent claims on the
//! same lead resolve to exactly one winner. An identity index maps each
//! normalized (name, phone) pair to the lead holding it, and new leads claim
//! their slot before they are inserted. When opened with a journal path,
//! every primary mutation is appended to the journal under the same entry
//! lock that makes it visible, and the journal is replayed on open.

use super::collection::Collection;
use super::filter::{BookingFilter, LeadFilter, LeadSort, UserFilter};
use super::journal::{Journal, StoreEvent};
use super::{
    BookingStore, EmailLog, LeadStore, NotificationStore, PerformanceStore, SnapshotStore,
    UserStore,
};
use crate::clock::Clock;
use crate::model::{
    AgentPerformance, Booking, EmailEntry, InventorySnapshot, Lead, LeadPatch, Notification,
    TelemarketerPerformance, TimeWindow, User,
};
use crate::{Error, Result};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const SNAPSHOT_KEY: &str = "inventory";

/// Key of the identity index; phone digits never contain the separator
fn identity_slot(lead: &Lead) -> String {
    let (name, digits) = lead.identity_key();
    format!("{}|{}", name, digits)
}

#[derive(Debug, Default)]
pub struct DatastoreStats {
    pub reads: AtomicU64,
    pub writes: AtomicU64,
    /// Conditional updates that lost their candidate to a concurrent writer
    pub conflicts: AtomicU64,
}

impl DatastoreStats {
    fn read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    fn write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    fn conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct MemoryDatastore {
    leads: Collection<Lead>,
    users: Collection<User>,
    bookings: Collection<Booking>,
    notifications: Collection<Notification>,
    emails: Collection<EmailEntry>,
    snapshot: Collection<InventorySnapshot>,
    agent_performance: Collection<AgentPerformance>,
    telemarketer_performance: Collection<TelemarketerPerformance>,
    /// Normalized identity slot -> id of the lead holding it
    identities: Collection<String>,
    journal: Option<Journal>,
    clock: Arc<dyn Clock>,
    stats: DatastoreStats,
}

impl MemoryDatastore {
    /// Volatile datastore; contents are lost on drop
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            leads: Collection::new(),
            users: Collection::new(),
            bookings: Collection::new(),
            notifications: Collection::new(),
            emails: Collection::new(),
            snapshot: Collection::new(),
            agent_performance: Collection::new(),
            telemarketer_performance: Collection::new(),
            identities: Collection::new(),
            journal: None,
            clock,
            stats: DatastoreStats::default(),
        }
    }

    /// Journaled datastore: replay `path`, then append every mutation to it
    ///
    /// Derived documents (snapshot, performance) come back empty; run a
    /// recompute after opening.
    pub async fn open(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        let path = path.as_ref();
        let mut datastore = Self::new(clock);
        let events = Journal::replay(path)?;
        let replayed = events.len();
        for event in events {
            datastore.apply(event).await;
        }
        datastore.index_identities().await;
        datastore.journal = Some(Journal::open(path)?);
        log::info!(
            "Opened datastore at {} ({} events, {} leads, {} users)",
            path.display(),
            replayed,
            datastore.leads.len(),
            datastore.users.len()
        );
        Ok(datastore)
    }

    pub fn stats(&self) -> &DatastoreStats {
        &self.stats
    }

    pub fn is_journaled(&self) -> bool {
        self.journal.is_some()
    }

    async fn apply(&self, event: StoreEvent) {
        match event {
            StoreEvent::LeadUpserted(lead) => {
                let _ = self.leads.upsert_with::<()>(lead.id.clone(), |_| Ok(lead)).await;
            }
            StoreEvent::LeadDeleted { id } => {
                self.leads.remove(&id).await;
            }
            StoreEvent::UserUpserted(user) => {
                let _ = self.users.upsert_with::<()>(user.id.clone(), |_| Ok(user)).await;
            }
            StoreEvent::BookingAppended(booking) => {
                let _ = self.bookings.insert_new(booking.id.clone(), booking).await;
            }
            StoreEvent::NotificationAppended(notification) => {
                let _ = self.notifications.insert_new(notification.id.clone(), notification).await;
            }
            StoreEvent::EmailAppended(entry) => {
                let _ = self.emails.insert_new(entry.id.clone(), entry).await;
            }
        }
    }

    async fn index_identities(&self) {
        for lead in self.leads.collect(|_| true).await {
            if let Err(e) = self.claim_identity(&identity_slot(&lead), &lead).await {
                log::warn!("Replayed lead {} shares an identity: {}", lead.id, e);
            }
        }
    }

    /// Take `slot` for `lead`; `Ok(true)` when this call claimed it
    async fn claim_identity(&self, slot: &str, lead: &Lead) -> Result<bool> {
        let mut claimed = false;
        self.identities
            .upsert_with::<Error>(slot.to_string(), |owner| match owner {
                Some(owner) if owner != &lead.id => Err(Error::Duplicate(format!(
                    "a lead named '{}' with phone {} already exists",
                    lead.name, lead.phone_number
                ))),
                Some(owner) => Ok(owner.clone()),
                None => {
                    claimed = true;
                    Ok(lead.id.clone())
                }
            })
            .await?;
        Ok(claimed)
    }

    async fn release_identity(&self, slot: &str, id: &str) {
        let _ = self.identities.remove_with::<()>(slot, |owner| Ok(owner == id)).await;
    }

    /// Point the identity index at `after` once a lead write has landed
    async fn settle_identity(&self, before: &Lead, after: &Lead, claimed: Option<&str>) {
        let (old, new) = (identity_slot(before), identity_slot(after));
        if let Some(slot) = claimed.filter(|slot| *slot != new) {
            self.release_identity(slot, &after.id).await;
        }
        if old == new {
            return;
        }
        self.release_identity(&old, &after.id).await;
        if let Err(e) = self.claim_identity(&new, after).await {
            log::warn!("Lead {} was renamed onto a taken identity: {}", after.id, e);
        }
    }

    fn record(&self, event: &StoreEvent) -> Result<()> {
        self.stats.write();
        match &self.journal {
            Some(journal) => journal.append(event),
            None => Ok(()),
        }
    }

    /// Journal then insert a record that must not exist yet
    async fn append_new<V>(
        &self,
        collection: &Collection<V>,
        id: String,
        value: V,
        event: impl FnOnce(V) -> StoreEvent,
        entity: &str,
    ) -> Result<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        collection
            .upsert_with::<Error>(id.clone(), |existing| {
                if existing.is_some() {
                    return Err(Error::Duplicate(format!("{} {} already exists", entity, id)));
                }
                self.record(&event(value.clone()))?;
                Ok(value)
            })
            .await
    }
}

#[async_trait::async_trait]
impl LeadStore for MemoryDatastore {
    async fn count(&self, filter: &LeadFilter) -> Result<u64> {
        self.stats.read();
        Ok(self.leads.count(|lead| filter.matches(lead)).await)
    }

    async fn find(
        &self,
        filter: &LeadFilter,
        sort: LeadSort,
        limit: Option<usize>,
    ) -> Result<Vec<Lead>> {
        self.stats.read();
        let mut leads = self.leads.collect(|lead| filter.matches(lead)).await;
        leads.sort_by(|a, b| sort.compare(a, b));
        if let Some(limit) = limit {
            leads.truncate(limit);
        }
        Ok(leads)
    }

    async fn get(&self, id: &str) -> Result<Option<Lead>> {
        self.stats.read();
        Ok(self.leads.get(id).await)
    }

    async fn insert(&self, lead: Lead) -> Result<Lead> {
        let slot = identity_slot(&lead);
        let claimed = self.claim_identity(&slot, &lead).await?;
        let id = lead.id.clone();
        let inserted =
            self.append_new(&self.leads, id.clone(), lead, StoreEvent::LeadUpserted, "lead").await;
        if inserted.is_err() && claimed {
            self.release_identity(&slot, &id).await;
        }
        inserted
    }

    async fn update_one_with_previous(
        &self,
        id: &str,
        patch: &LeadPatch,
    ) -> Result<Option<(Lead, Lead)>> {
        let now = self.clock.now();

        // A new name or phone is claimed first so a collision leaves the lead untouched
        let mut claimed = None;
        if patch.name.is_some() || patch.phone_number.is_some() {
            let Some(mut preview) = self.leads.get(id).await else {
                return Ok(None);
            };
            let current = identity_slot(&preview);
            preview.apply(patch, now);
            let slot = identity_slot(&preview);
            if slot != current && self.claim_identity(&slot, &preview).await? {
                claimed = Some(slot);
            }
        }

        let outcome = self
            .leads
            .update(id, |lead| -> Result<(Lead, Lead)> {
                let before = lead.clone();
                let mut next = lead.clone();
                next.apply(patch, now);
                self.record(&StoreEvent::LeadUpserted(next.clone()))?;
                *lead = next.clone();
                Ok((before, next))
            })
            .await
            .transpose();

        match &outcome {
            Ok(Some((before, after))) => {
                self.settle_identity(before, after, claimed.as_deref()).await
            }
            _ => {
                if let Some(slot) = &claimed {
                    self.release_identity(slot, id).await;
                }
            }
        }
        outcome
    }

    async fn find_one_and_update(
        &self,
        filter: &LeadFilter,
        patch: &LeadPatch,
    ) -> Result<Option<Lead>> {
        let mut candidates = self.leads.collect(|lead| filter.matches(lead)).await;
        candidates.sort_by(|a, b| LeadSort::default().compare(a, b));

        for candidate in candidates {
            let now = self.clock.now();
            let outcome = self
                .leads
                .update(&candidate.id, |lead| -> Result<Option<(Lead, Lead)>> {
                    // Another writer may have claimed or changed it since the scan
                    if !filter.matches(lead) {
                        return Ok(None);
                    }
                    let before = lead.clone();
                    let mut next = lead.clone();
                    next.apply(patch, now);
                    self.record(&StoreEvent::LeadUpserted(next.clone()))?;
                    *lead = next.clone();
                    Ok(Some((before, next)))
                })
                .await;
            match outcome {
                Some(Ok(Some((before, updated)))) => {
                    self.settle_identity(&before, &updated, None).await;
                    return Ok(Some(updated));
                }
                Some(Err(e)) => return Err(e),
                Some(Ok(None)) | None => self.stats.conflict(),
            }
        }
        Ok(None)
    }

    async fn delete(&self, id: &str) -> Result<Option<Lead>> {
        // Journaled under the entry lock so no update can land between the
        // journal line and the removal
        let removed = self
            .leads
            .remove_with(id, |_| -> Result<bool> {
                self.record(&StoreEvent::LeadDeleted { id: id.to_string() })?;
                Ok(true)
            })
            .await?;
        if let Some(lead) = &removed {
            self.release_identity(&identity_slot(lead), id).await;
        }
        Ok(removed)
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryDatastore {
    async fn count(&self, filter: &UserFilter) -> Result<u64> {
        self.stats.read();
        Ok(self.users.count(|user| filter.matches(user)).await)
    }

    async fn list(&self, filter: &UserFilter) -> Result<Vec<User>> {
        self.stats.read();
        let mut users = self.users.collect(|user| filter.matches(user)).await;
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn get(&self, id: &str) -> Result<Option<User>> {
        self.stats.read();
        Ok(self.users.get(id).await)
    }

    async fn upsert(&self, user: User) -> Result<User> {
        let now = self.clock.now();
        self.users
            .upsert_with::<Error>(user.id.clone(), |existing| {
                let mut next = user;
                if let Some(existing) = existing {
                    next.created_at = existing.created_at;
                }
                next.updated_at = now;
                self.record(&StoreEvent::UserUpserted(next.clone()))?;
                Ok(next)
            })
            .await
    }
}

#[async_trait::async_trait]
impl BookingStore for MemoryDatastore {
    async fn append(&self, booking: Booking) -> Result<Booking> {
        self.append_new(
            &self.bookings,
            booking.id.clone(),
            booking,
            StoreEvent::BookingAppended,
            "booking",
        )
        .await
    }

    async fn count(&self, filter: &BookingFilter) -> Result<u64> {
        self.stats.read();
        Ok(self.bookings.count(|booking| filter.matches(booking)).await)
    }

    async fn list(&self, filter: &BookingFilter) -> Result<Vec<Booking>> {
        self.stats.read();
        let mut bookings = self.bookings.collect(|booking| filter.matches(booking)).await;
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(bookings)
    }
}

#[async_trait::async_trait]
impl NotificationStore for MemoryDatastore {
    async fn append(&self, notification: Notification) -> Result<Notification> {
        self.append_new(
            &self.notifications,
            notification.id.clone(),
            notification,
            StoreEvent::NotificationAppended,
            "notification",
        )
        .await
    }

    async fn list(&self) -> Result<Vec<Notification>> {
        self.stats.read();
        let mut notifications = self.notifications.collect(|_| true).await;
        notifications
            .sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(notifications)
    }
}

#[async_trait::async_trait]
impl EmailLog for MemoryDatastore {
    async fn append(&self, entry: EmailEntry) -> Result<EmailEntry> {
        self.append_new(&self.emails, entry.id.clone(), entry, StoreEvent::EmailAppended, "email")
            .await
    }

    async fn count(&self, window: Option<TimeWindow>) -> Result<u64> {
        self.stats.read();
        Ok(self.emails.count(|entry| window.map_or(true, |w| w.contains(entry.updated_at))).await)
    }
}

#[async_trait::async_trait]
impl SnapshotStore for MemoryDatastore {
    async fn upsert(&self, mut snapshot: InventorySnapshot) -> Result<InventorySnapshot> {
        self.stats.write();
        snapshot.updated_at = Some(self.clock.now());
        self.snapshot.upsert_with::<Error>(SNAPSHOT_KEY.to_string(), |_| Ok(snapshot)).await
    }

    async fn current(&self) -> Result<Option<InventorySnapshot>> {
        self.stats.read();
        Ok(self.snapshot.get(SNAPSHOT_KEY).await)
    }
}

#[async_trait::async_trait]
impl PerformanceStore for MemoryDatastore {
    async fn upsert_agent(&self, mut record: AgentPerformance) -> Result<AgentPerformance> {
        self.stats.write();
        record.updated_at = Some(self.clock.now());
        self.agent_performance.upsert_with::<Error>(record.agent_name.clone(), |_| Ok(record)).await
    }

    async fn list_agents(&self) -> Result<Vec<AgentPerformance>> {
        self.stats.read();
        let mut records = self.agent_performance.collect(|_| true).await;
        records.sort_by(|a, b| {
            b.updated_at.cmp(&a.updated_at).then_with(|| a.agent_name.cmp(&b.agent_name))
        });
        Ok(records)
    }

    async fn upsert_telemarketer(
        &self,
        mut record: TelemarketerPerformance,
    ) -> Result<TelemarketerPerformance> {
        self.stats.write();
        record.updated_at = Some(self.clock.now());
        self.telemarketer_performance
            .upsert_with::<Error>(record.agent_name.clone(), |_| Ok(record))
            .await
    }

    async fn list_telemarketers(&self) -> Result<Vec<TelemarketerPerformance>> {
        self.stats.read();
        let mut records = self.telemarketer_performance.collect(|_| true).await;
        records.sort_by(|a, b| {
            b.updated_at.cmp(&a.updated_at).then_with(|| a.agent_name.cmp(&b.agent_name))
        });
        Ok(records)
    }
}
