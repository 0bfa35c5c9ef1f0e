//! Operations exposed to the HTTP layer and the CLI
//!
//! Every mutation performs its primary write, then awaits the summary
//! refresh before returning, so a caller that reads the dashboard right
//! after a write sees its effect.

use crate::aggregation::AggregationEngine;
use crate::classification::{CallDisposition, Classification};
use crate::clock::{Clock, SystemClock};
use crate::config::LeadpoolConfig;
use crate::distribution::DistributionEngine;
use crate::model::{
    AgentIdentity, AgentPerformance, Booking, EmailEntry, InventorySnapshot, Lead, LeadUpdate,
    NewEmail, NewLead, NewUser, Notification, TelemarketerPerformance, TimeWindow, User,
};
use crate::store::{BookingFilter, MemoryDatastore, Stores};
use crate::{Error, Result};
use std::sync::Arc;

pub struct LeadService {
    stores: Stores,
    distribution: DistributionEngine,
    aggregation: AggregationEngine,
    classification: Arc<Classification>,
    clock: Arc<dyn Clock>,
}

impl LeadService {
    /// Wire the engines over existing stores
    pub fn with_stores(stores: Stores, config: &LeadpoolConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.distribution.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".to_string()));
        }
        let classification = Arc::new(config.distribution.classification()?);
        let distribution =
            DistributionEngine::new(stores.leads.clone(), classification.clone(), clock.clone())
                .with_batch_size(config.distribution.batch_size);
        let aggregation = AggregationEngine::new(stores.clone(), clock.clone());
        Ok(Self { stores, distribution, aggregation, classification, clock })
    }

    /// Build the service described by `config` on the system clock
    ///
    /// With a journal configured, the datastore is replayed and the summary
    /// documents are rebuilt before the service is returned.
    pub async fn from_config(config: &LeadpoolConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let datastore = match &config.storage.journal_path {
            Some(path) => MemoryDatastore::open(path, clock.clone()).await?,
            None => {
                log::warn!("No journal configured; data will not survive a restart");
                MemoryDatastore::new(clock.clone())
            }
        };
        let service = Self::with_stores(Stores::from_datastore(Arc::new(datastore)), config, clock)?;
        service.refresh().await?;
        Ok(service)
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Leads the agent should work on, replenished when needed
    pub async fn get_working_set(&self, agent_id: &str) -> Result<Vec<Lead>> {
        let set = self.distribution.fetch_working_set(agent_id).await?;
        if set.replenished {
            self.refresh().await?;
        }
        Ok(set.leads)
    }

    pub async fn recompute_inventory(&self, window: Option<TimeWindow>) -> Result<InventorySnapshot> {
        self.aggregation.recompute_all(window).await
    }

    pub async fn recompute_agent_performance(&self) -> Result<Vec<AgentPerformance>> {
        self.aggregation.recompute_agent_performance().await
    }

    pub async fn recompute_telemarketer_performance(&self) -> Result<Vec<TelemarketerPerformance>> {
        self.aggregation.recompute_telemarketer_performance().await
    }

    /// Rebuild the snapshot and every performance record
    pub async fn refresh(&self) -> Result<()> {
        tokio::try_join!(
            self.aggregation.recompute_all(None),
            self.aggregation.recompute_agent_performance(),
            self.aggregation.recompute_telemarketer_performance(),
        )?;
        Ok(())
    }

    pub async fn create_lead(&self, actor: &AgentIdentity, request: NewLead) -> Result<Lead> {
        let lead = request.into_lead(&actor.id, self.clock.now())?;
        // The store claims the normalized name and phone atomically
        let lead = self.stores.leads.insert(lead).await?;
        log::info!("{} created lead {} ({})", actor.name, lead.id, lead.lead_type);
        self.on_lead_mutated(actor, &lead, None).await?;
        Ok(lead)
    }

    pub async fn update_lead(
        &self,
        actor: &AgentIdentity,
        id: &str,
        update: LeadUpdate,
    ) -> Result<Lead> {
        let patch = update.into_patch()?;
        let (previous, lead) = self
            .stores
            .leads
            .update_one_with_previous(id, &patch)
            .await?
            .ok_or_else(|| Error::not_found("lead", id))?;
        self.on_lead_mutated(actor, &lead, previous.call_disposition).await?;
        Ok(lead)
    }

    pub async fn delete_lead(&self, actor: &AgentIdentity, id: &str) -> Result<Lead> {
        let removed =
            self.stores.leads.delete(id).await?.ok_or_else(|| Error::not_found("lead", id))?;
        log::info!("{} deleted lead {}", actor.name, id);
        self.on_lead_mutated(actor, &removed, removed.call_disposition).await?;
        Ok(removed)
    }

    pub async fn register_user(&self, request: NewUser) -> Result<User> {
        let user = self.stores.users.upsert(request.into_user(self.clock.now())?).await?;
        log::info!("Registered {} as {}", user.name, user.role);
        self.refresh().await?;
        Ok(user)
    }

    pub async fn log_email(&self, request: NewEmail) -> Result<EmailEntry> {
        let entry = self.stores.emails.append(request.into_entry(self.clock.now())?).await?;
        self.refresh().await?;
        Ok(entry)
    }

    /// Side effects of any lead write
    ///
    /// A lead that just became `Booked` gets one booking record, and a
    /// notification raised alongside the refresh. Notification failures are
    /// logged and swallowed; booking and refresh failures propagate.
    pub async fn on_lead_mutated(
        &self,
        actor: &AgentIdentity,
        lead: &Lead,
        previous: Option<CallDisposition>,
    ) -> Result<()> {
        let newly_booked = lead.is_booked() && previous != Some(CallDisposition::Booked);
        if !newly_booked {
            return self.refresh().await;
        }

        // Appended before the refresh so the team counts include it
        let booking = self.record_booking(actor, lead).await?;
        let (refreshed, _) = tokio::join!(self.refresh(), self.notify(&booking));
        refreshed
    }

    async fn record_booking(&self, actor: &AgentIdentity, lead: &Lead) -> Result<Booking> {
        let assignee = match &lead.assigned_to {
            Some(id) => self.stores.users.get(id).await?,
            None => None,
        };
        let telemarketer = assignee.map(|u| u.identity()).unwrap_or_else(|| actor.clone());

        let booking = Booking {
            id: crate::model::new_id(),
            lead_id: lead.id.clone(),
            lead_name: lead.name.clone(),
            telemarketer_id: telemarketer.id,
            telemarketer_name: telemarketer.name,
            team: telemarketer.team,
            created_at: self.clock.now(),
        };
        let booking = self.stores.bookings.append(booking).await?;
        log::info!("{} booked lead {}", booking.telemarketer_name, booking.lead_id);
        Ok(booking)
    }

    async fn notify(&self, booking: &Booking) {
        if let Err(e) = self.stores.notifications.append(Notification::for_booking(booking)).await {
            log::warn!("Booking notification for lead {} failed: {}", booking.lead_id, e);
        }
    }

    pub async fn get_lead(&self, id: &str) -> Result<Lead> {
        self.stores.leads.get(id).await?.ok_or_else(|| Error::not_found("lead", id))
    }

    pub async fn list_bookings(&self) -> Result<Vec<Booking>> {
        self.stores.bookings.list(&BookingFilter::default()).await
    }

    pub async fn list_notifications(&self) -> Result<Vec<Notification>> {
        self.stores.notifications.list().await
    }

    pub async fn current_snapshot(&self) -> Result<Option<InventorySnapshot>> {
        self.stores.snapshot.current().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::{LeadType, Role, Team};
    use crate::testing::{sample_request, Harness};

    fn generator() -> AgentIdentity {
        AgentIdentity::new("gen-1", "Avery", Role::LeadGeneration)
    }

    fn telemarketer() -> AgentIdentity {
        AgentIdentity::new("tm-1", "Robin", Role::Telemarketer).with_team(Team::Charlie)
    }

    #[tokio::test]
    async fn test_create_lead_refreshes_snapshot() {
        let harness = Harness::new();
        let lead = harness
            .service
            .create_lead(&generator(), sample_request("Harbor Hotel", LeadType::Hotel))
            .await
            .unwrap();
        assert_eq!(lead.created_by, "gen-1");

        let snapshot = harness.service.current_snapshot().await.unwrap().unwrap();
        assert_eq!(snapshot.total_leads, 1);
        assert_eq!(snapshot.unassigned_leads, 1);
        assert_eq!(snapshot.leads_by_type[&LeadType::Hotel], 1);
    }

    #[tokio::test]
    async fn test_duplicate_lead_rejected() {
        let harness = Harness::new();
        let service = &harness.service;
        service.create_lead(&generator(), sample_request("Corner Gym", LeadType::Gym)).await.unwrap();

        let mut again = sample_request("Corner Gym", LeadType::Gym);
        again.name = "  corner   GYM ".to_string();
        match service.create_lead(&generator(), again).await {
            Err(Error::Duplicate(_)) => {}
            other => panic!("expected duplicate, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_of_one_lead_keep_one() {
        use crate::store::LeadFilter;

        let harness = Harness::new();
        let service = &harness.service;
        let (generator_a, generator_b) = (generator(), generator());
        let (a, b) = tokio::join!(
            service.create_lead(&generator_a, sample_request("Corner Gym", LeadType::Gym)),
            service.create_lead(&generator_b, sample_request("Corner Gym", LeadType::Gym)),
        );

        let created = [&a, &b].iter().filter(|r| r.is_ok()).count();
        let rejected = [&a, &b].iter().filter(|r| matches!(r, Err(Error::Duplicate(_)))).count();
        assert_eq!((created, rejected), (1, 1));

        let request = sample_request("Corner Gym", LeadType::Gym);
        let same = LeadFilter::all().with_identity(&request.name, &request.phone_number);
        assert_eq!(service.stores().leads.count(&same).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_lead_is_not_found() {
        let harness = Harness::new();
        let err = harness
            .service
            .update_lead(&telemarketer(), "nope", LeadUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "lead", .. }));
    }

    #[tokio::test]
    async fn test_booking_uses_assignee_and_happens_once() {
        let harness = Harness::new();
        let service = &harness.service;
        service
            .register_user(NewUser {
                id: Some("tm-1".to_string()),
                name: "Robin".to_string(),
                email_address: "robin@example.com".to_string(),
                role: "Telemarketer".to_string(),
                team: Some("Bravo".to_string()),
            })
            .await
            .unwrap();
        harness.seed_unassigned(LeadType::Cafe, 1).await;
        let lead = service.get_working_set("tm-1").await.unwrap().remove(0);

        // Acting identity differs from the assignee on purpose
        let admin = AgentIdentity::new("admin-1", "Sam", Role::Admin);
        let booked = LeadUpdate {
            call_disposition: Some("Booked".to_string()),
            remarks: Some("Tuesday 10am".to_string()),
            ..LeadUpdate::default()
        };
        service.update_lead(&admin, &lead.id, booked.clone()).await.unwrap();
        service.update_lead(&admin, &lead.id, booked).await.unwrap();

        let bookings = service.list_bookings().await.unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].telemarketer_name, "Robin");
        assert_eq!(bookings[0].team, Some(Team::Bravo));
        assert_eq!(service.list_notifications().await.unwrap().len(), 1);

        let snapshot = service.current_snapshot().await.unwrap().unwrap();
        assert_eq!(snapshot.bookings_by_team[&Team::Bravo], 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_bookings_of_one_lead_book_once() {
        let harness = Harness::new();
        let service = &harness.service;
        let lead = harness.seed_unassigned(LeadType::Bakery, 1).await.remove(0);

        let booked = || LeadUpdate {
            call_disposition: Some("Booked".to_string()),
            remarks: Some("demo on Thursday".to_string()),
            ..LeadUpdate::default()
        };
        let (telemarketer_a, telemarketer_b) = (telemarketer(), telemarketer());
        let (a, b) = tokio::join!(
            service.update_lead(&telemarketer_a, &lead.id, booked()),
            service.update_lead(&telemarketer_b, &lead.id, booked()),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(service.list_bookings().await.unwrap().len(), 1);
        assert_eq!(service.list_notifications().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_lead_updates_counts() {
        let harness = Harness::new();
        let service = &harness.service;
        let lead = service
            .create_lead(&generator(), sample_request("Blue Door Cafe", LeadType::Cafe))
            .await
            .unwrap();
        service.delete_lead(&generator(), &lead.id).await.unwrap();

        assert!(matches!(service.get_lead(&lead.id).await, Err(Error::NotFound { .. })));
        let snapshot = service.current_snapshot().await.unwrap().unwrap();
        assert_eq!(snapshot.total_leads, 0);
        assert!(matches!(
            service.delete_lead(&generator(), &lead.id).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_register_user_and_email_move_counters() {
        let harness = Harness::new();
        let service = &harness.service;
        service
            .register_user(NewUser {
                name: "Avery".to_string(),
                email_address: "avery@example.com".to_string(),
                role: "Lead Generation".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap();
        service
            .log_email(NewEmail { recipient: "x@example.com".to_string(), subject: "Hi".to_string() })
            .await
            .unwrap();

        let snapshot = service.current_snapshot().await.unwrap().unwrap();
        assert_eq!(snapshot.total_agents, 1);
        assert_eq!(snapshot.total_emails, 1);
        let agents = service.recompute_agent_performance().await.unwrap();
        assert_eq!(agents[0].agent_name, "Avery");
    }
}
