//! Inventory and performance rollups
//!
//! Every recompute rebuilds its documents from the live collections; nothing
//! is incremented in place. Reads within one recompute run concurrently and
//! the result is written only once every read has succeeded, so a failed
//! recompute leaves the previous documents untouched. Concurrent recomputes
//! are not ordered: the last upsert wins.

use crate::classification::{zero_filled, CallDisposition, LeadType, Role, Team};
use crate::clock::Clock;
use crate::model::{
    AgentPerformance, InventorySnapshot, Lead, TelemarketerPerformance, TimeWindow, User,
};
use crate::store::{BookingFilter, LeadFilter, LeadSort, Stores, UserFilter};
use crate::Result;
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct AggregationEngine {
    stores: Stores,
    clock: Arc<dyn Clock>,
}

impl AggregationEngine {
    pub fn new(stores: Stores, clock: Arc<dyn Clock>) -> Self {
        Self { stores, clock }
    }

    /// Rebuild and store the inventory snapshot
    ///
    /// Leads, users and emails are matched on `updatedAt`, bookings on
    /// `createdAt`.
    pub async fn recompute_all(&self, window: Option<TimeWindow>) -> Result<InventorySnapshot> {
        let leads = || LeadFilter::all().within(window);
        let agents = UserFilter::agents().within(window);

        let (
            total_leads,
            total_agents,
            total_emails,
            assigned_leads,
            unassigned_leads,
            updated_leads,
            by_type,
            by_disposition,
            by_team,
        ) = tokio::try_join!(
            self.count_leads(leads()),
            self.stores.users.count(&agents),
            self.stores.emails.count(window),
            self.count_leads(leads().assigned()),
            self.count_leads(leads().unassigned()),
            self.count_leads(leads().touched()),
            try_join_all(LeadType::ALL.iter().map(|t| self.count_leads(leads().of_type(*t)))),
            try_join_all(
                CallDisposition::ALL.iter().map(|d| self.count_leads(leads().with_disposition(*d)))
            ),
            try_join_all(
                Team::ALL.iter().map(|t| self.count_bookings(BookingFilter::for_team(*t).within(window)))
            ),
        )?;

        let mut total_leads = total_leads;
        if assigned_leads + unassigned_leads != total_leads {
            // A writer landed between the counts
            log::debug!(
                "Partition drift: {} assigned + {} unassigned vs {} total",
                assigned_leads,
                unassigned_leads,
                total_leads
            );
            total_leads = assigned_leads + unassigned_leads;
        }

        let snapshot = InventorySnapshot {
            total_leads,
            total_agents,
            total_emails,
            assigned_leads,
            unassigned_leads,
            updated_leads,
            leads_by_type: fold(LeadType::ALL, by_type),
            leads_by_disposition: fold(CallDisposition::ALL, by_disposition),
            bookings_by_team: fold(Team::ALL, by_team),
            window,
            updated_at: None,
        };

        let stored = self.stores.snapshot.upsert(snapshot).await?;
        log::debug!(
            "Inventory recomputed: {} leads ({} unassigned)",
            stored.total_leads,
            stored.unassigned_leads
        );
        Ok(stored)
    }

    /// Rebuild the record of every lead-generator
    pub async fn recompute_agent_performance(&self) -> Result<Vec<AgentPerformance>> {
        let agents = self.stores.users.list(&UserFilter::with_role(Role::LeadGeneration)).await?;
        let today = self.clock.start_of_day();

        let records = try_join_all(agents.iter().map(|agent| async move {
            let created = self
                .stores
                .leads
                .find(&LeadFilter::all().created_by(&agent.id), LeadSort::CreatedAsc, None)
                .await?;
            Ok::<_, crate::Error>(agent_record(agent, &created, today))
        }))
        .await?;

        try_join_all(records.into_iter().map(|r| self.stores.performance.upsert_agent(r))).await?;
        self.stores.performance.list_agents().await
    }

    /// Rebuild the record of every telemarketer
    pub async fn recompute_telemarketer_performance(&self) -> Result<Vec<TelemarketerPerformance>> {
        let agents = self.stores.users.list(&UserFilter::with_role(Role::Telemarketer)).await?;
        let today = self.clock.start_of_day();

        let records = try_join_all(agents.iter().map(|agent| async move {
            let held_filter = LeadFilter::all().assigned_to(&agent.id);
            let (held, bookings) = tokio::try_join!(
                self.stores.leads.find(&held_filter, LeadSort::default(), None),
                self.count_bookings(BookingFilter::for_telemarketer(&agent.id)),
            )?;
            Ok::<_, crate::Error>(telemarketer_record(agent, &held, bookings, today))
        }))
        .await?;

        try_join_all(records.into_iter().map(|r| self.stores.performance.upsert_telemarketer(r)))
            .await?;
        self.stores.performance.list_telemarketers().await
    }

    async fn count_leads(&self, filter: LeadFilter) -> Result<u64> {
        self.stores.leads.count(&filter).await
    }

    async fn count_bookings(&self, filter: BookingFilter) -> Result<u64> {
        self.stores.bookings.count(&filter).await
    }
}

fn fold<K: Ord + Copy>(keys: &[K], counts: Vec<u64>) -> BTreeMap<K, u64> {
    let mut map = zero_filled(keys);
    for (key, count) in keys.iter().zip(counts) {
        map.insert(*key, count);
    }
    map
}

fn agent_record(
    agent: &User,
    created: &[Lead],
    today: chrono::DateTime<chrono::Utc>,
) -> AgentPerformance {
    let mut leads_by_type = zero_filled(LeadType::ALL);
    for lead in created {
        *leads_by_type.entry(lead.lead_type).or_insert(0) += 1;
    }
    let leads_created = created.len() as u64;
    let leads_assigned = created.iter().filter(|l| l.is_assigned()).count() as u64;

    AgentPerformance {
        agent_name: agent.name.clone(),
        agent_id: agent.id.clone(),
        leads_created,
        leads_created_today: created.iter().filter(|l| l.created_at >= today).count() as u64,
        leads_assigned,
        leads_available: leads_created - leads_assigned,
        leads_by_type,
        updated_at: None,
    }
}

fn telemarketer_record(
    agent: &User,
    held: &[Lead],
    bookings: u64,
    today: chrono::DateTime<chrono::Utc>,
) -> TelemarketerPerformance {
    let mut leads_by_disposition = zero_filled(CallDisposition::ALL);
    for disposition in held.iter().filter_map(|l| l.call_disposition) {
        *leads_by_disposition.entry(disposition).or_insert(0) += 1;
    }

    TelemarketerPerformance {
        agent_name: agent.name.clone(),
        agent_id: agent.id.clone(),
        team: agent.team,
        leads_held: held.len() as u64,
        leads_worked: held.iter().filter(|l| l.is_worked()).count() as u64,
        leads_distributed_today: held
            .iter()
            .filter(|l| l.distributed_at.is_some_and(|at| at >= today))
            .count() as u64,
        bookings,
        leads_by_disposition,
        updated_at: None,
    }
}
