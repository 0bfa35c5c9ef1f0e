//! Rollup documents written by the aggregation engine

use crate::classification::{CallDisposition, LeadType, Team};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Inclusive time range applied uniformly to every count of a recompute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> crate::Result<Self> {
        if start > end {
            return Err(crate::Error::validation(["start", "end"]));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Singleton snapshot of global counters
///
/// Maps are keyed by the full classification enumerations and zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub total_leads: u64,
    pub total_agents: u64,
    pub total_emails: u64,
    pub assigned_leads: u64,
    pub unassigned_leads: u64,
    /// Leads carrying any disposition
    pub updated_leads: u64,
    pub leads_by_type: BTreeMap<LeadType, u64>,
    pub leads_by_disposition: BTreeMap<CallDisposition, u64>,
    pub bookings_by_team: BTreeMap<Team, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<TimeWindow>,
    /// Set by the store on upsert
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Performance of one lead-generator, keyed by agent name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPerformance {
    pub agent_name: String,
    pub agent_id: String,
    pub leads_created: u64,
    pub leads_created_today: u64,
    /// Created leads that have left the unassigned pool
    pub leads_assigned: u64,
    /// Created minus assigned
    pub leads_available: u64,
    pub leads_by_type: BTreeMap<LeadType, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Performance of one telemarketer, keyed by agent name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemarketerPerformance {
    pub agent_name: String,
    pub agent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<Team>,
    pub leads_held: u64,
    pub leads_worked: u64,
    pub leads_distributed_today: u64,
    pub bookings: u64,
    pub leads_by_disposition: BTreeMap<CallDisposition, u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_window_bounds_are_inclusive() {
        let start = Utc::now();
        let window = TimeWindow::new(start, start + Duration::hours(1)).unwrap();
        assert!(window.contains(start));
        assert!(window.contains(start + Duration::hours(1)));
        assert!(!window.contains(start - Duration::seconds(1)));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let start = Utc::now();
        assert!(TimeWindow::new(start, start - Duration::minutes(1)).is_err());
    }

    #[test]
    fn test_snapshot_maps_serialize_with_labels() {
        let snapshot = InventorySnapshot {
            total_leads: 1,
            total_agents: 0,
            total_emails: 0,
            assigned_leads: 0,
            unassigned_leads: 1,
            updated_leads: 0,
            leads_by_type: BTreeMap::from([(LeadType::AutoRepair, 1)]),
            leads_by_disposition: BTreeMap::new(),
            bookings_by_team: BTreeMap::from([(Team::Alpha, 0)]),
            window: None,
            updated_at: None,
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["leadsByType"]["Auto Repair"], 1);
        assert_eq!(json["bookingsByTeam"]["Alpha"], 0);
        assert!(json.get("window").is_none());
    }
}
