//! Fixtures shared by unit tests, integration tests, BDD steps and benches

use crate::classification::{LeadType, Role, Team};
use crate::clock::{Clock, ManualClock};
use crate::config::LeadpoolConfig;
use crate::model::{Lead, NewLead, User};
use crate::service::LeadService;
use crate::store::{MemoryDatastore, Stores};
use chrono::{DateTime, TimeZone, Utc};
use std::path::Path;
use std::sync::Arc;

/// Monday 09:00 UTC, far from any DST boundary
pub fn fixed_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).single().unwrap_or_else(Utc::now)
}

/// A valid, unassigned lead with a phone number derived from its name
pub fn sample_lead(name: &str, lead_type: LeadType, at: DateTime<Utc>) -> Lead {
    let digits: u32 = name.bytes().fold(7u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    Lead {
        id: crate::model::new_id(),
        name: name.to_string(),
        lead_type,
        phone_number: format!("0{:010}", digits),
        street_address: "1 Market Street".to_string(),
        city: "Manchester".to_string(),
        postcode: "M1 1AA".to_string(),
        email_address: "owner@example.com".to_string(),
        call_disposition: None,
        remarks: None,
        created_by: "gen-1".to_string(),
        assigned_to: None,
        distributed_at: None,
        created_at: at,
        updated_at: at,
    }
}

/// Creation request matching [`sample_lead`]
pub fn sample_request(name: &str, lead_type: LeadType) -> NewLead {
    let lead = sample_lead(name, lead_type, fixed_start());
    NewLead {
        name: lead.name,
        lead_type: lead_type.label().to_string(),
        phone_number: lead.phone_number,
        street_address: lead.street_address,
        city: lead.city,
        postcode: lead.postcode,
        email_address: lead.email_address,
        remarks: None,
    }
}

pub fn sample_user(id: &str, name: &str, role: Role, team: Option<Team>, at: DateTime<Utc>) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email_address: format!("{}@example.com", id),
        role,
        team,
        created_at: at,
        updated_at: at,
    }
}

/// A service over a fresh in-memory datastore with a pinned clock
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub datastore: Arc<MemoryDatastore>,
    pub service: LeadService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(&LeadpoolConfig::default())
    }

    pub fn with_config(config: &LeadpoolConfig) -> Self {
        let clock = Arc::new(ManualClock::new(fixed_start()));
        let datastore = Arc::new(MemoryDatastore::new(clock.clone()));
        let stores = Stores::from_datastore(datastore.clone());
        let service = LeadService::with_stores(stores, config, clock.clone())
            .unwrap_or_else(|e| panic!("invalid test configuration: {}", e));
        Self { clock, datastore, service }
    }

    /// Like [`Harness::new`], replaying and then appending to `path`
    pub async fn journaled(path: &Path) -> crate::Result<Self> {
        let clock = Arc::new(ManualClock::new(fixed_start()));
        let datastore = Arc::new(MemoryDatastore::open(path, clock.clone()).await?);
        let stores = Stores::from_datastore(datastore.clone());
        let service = LeadService::with_stores(stores, &LeadpoolConfig::default(), clock.clone())?;
        service.refresh().await?;
        Ok(Self { clock, datastore, service })
    }

    /// Insert `count` unassigned leads of one type, each one second newer
    pub async fn seed_unassigned(&self, lead_type: LeadType, count: usize) -> Vec<Lead> {
        use crate::store::LeadStore;
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            self.clock.advance(chrono::Duration::seconds(1));
            let name = format!("{} {}", lead_type, crate::model::new_id());
            let lead = sample_lead(&name, lead_type, self.clock.now());
            match self.datastore.insert(lead).await {
                Ok(lead) => out.push(lead),
                Err(e) => panic!("seeding failed: {}", e),
            }
        }
        out
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
