//! Query predicates and orderings understood by the stores

use crate::classification::{CallDisposition, LeadType, Role, Team};
use crate::model::{Booking, Lead, TimeWindow, User};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Conjunctive lead predicate; unset fields match everything
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub id: Option<String>,
    /// `Some(true)` assigned only, `Some(false)` unassigned pool only
    pub assigned: Option<bool>,
    pub assigned_to: Option<String>,
    pub created_by: Option<String>,
    pub types: Option<Vec<LeadType>>,
    pub disposition: Option<CallDisposition>,
    /// `Some(true)` leads carrying any disposition
    pub touched: Option<bool>,
    pub exclude_ids: HashSet<String>,
    /// Normalized (name, phone digits)
    pub identity: Option<(String, String)>,
    pub updated_within: Option<TimeWindow>,
    pub created_since: Option<DateTime<Utc>>,
    pub distributed_since: Option<DateTime<Utc>>,
}

impl LeadFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()), ..Self::default() }
    }

    pub fn unassigned(mut self) -> Self {
        self.assigned = Some(false);
        self
    }

    pub fn assigned(mut self) -> Self {
        self.assigned = Some(true);
        self
    }

    pub fn assigned_to(mut self, agent_id: impl Into<String>) -> Self {
        self.assigned_to = Some(agent_id.into());
        self
    }

    pub fn created_by(mut self, agent_id: impl Into<String>) -> Self {
        self.created_by = Some(agent_id.into());
        self
    }

    pub fn of_types(mut self, types: &[LeadType]) -> Self {
        self.types = Some(types.to_vec());
        self
    }

    pub fn of_type(self, lead_type: LeadType) -> Self {
        self.of_types(&[lead_type])
    }

    pub fn with_disposition(mut self, disposition: CallDisposition) -> Self {
        self.disposition = Some(disposition);
        self
    }

    pub fn touched(mut self) -> Self {
        self.touched = Some(true);
        self
    }

    pub fn excluding<'a>(mut self, ids: impl IntoIterator<Item = &'a String>) -> Self {
        self.exclude_ids.extend(ids.into_iter().cloned());
        self
    }

    pub fn with_identity(mut self, name: &str, phone: &str) -> Self {
        self.identity = Some(crate::model::lead::identity_key(name, phone));
        self
    }

    pub fn within(mut self, window: Option<TimeWindow>) -> Self {
        self.updated_within = window;
        self
    }

    pub fn created_since(mut self, at: DateTime<Utc>) -> Self {
        self.created_since = Some(at);
        self
    }

    pub fn distributed_since(mut self, at: DateTime<Utc>) -> Self {
        self.distributed_since = Some(at);
        self
    }

    pub fn matches(&self, lead: &Lead) -> bool {
        if self.id.as_deref().is_some_and(|id| id != lead.id) {
            return false;
        }
        if self.assigned.is_some_and(|assigned| assigned != lead.is_assigned()) {
            return false;
        }
        if let Some(agent) = &self.assigned_to {
            if lead.assigned_to.as_ref() != Some(agent) {
                return false;
            }
        }
        if self.created_by.as_deref().is_some_and(|by| by != lead.created_by) {
            return false;
        }
        if self.types.as_ref().is_some_and(|types| !types.contains(&lead.lead_type)) {
            return false;
        }
        if let Some(disposition) = self.disposition {
            if lead.call_disposition != Some(disposition) {
                return false;
            }
        }
        if self.touched.is_some_and(|touched| touched != lead.is_touched()) {
            return false;
        }
        if self.exclude_ids.contains(&lead.id) {
            return false;
        }
        if self.identity.as_ref().is_some_and(|key| *key != lead.identity_key()) {
            return false;
        }
        if self.updated_within.is_some_and(|w| !w.contains(lead.updated_at)) {
            return false;
        }
        if self.created_since.is_some_and(|since| lead.created_at < since) {
            return false;
        }
        if let Some(since) = self.distributed_since {
            if !lead.distributed_at.is_some_and(|at| at >= since) {
                return false;
            }
        }
        true
    }
}

/// Result ordering for [`LeadStore::find`](super::LeadStore::find)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeadSort {
    /// Most recently distributed first; never-distributed leads sort as
    /// earliest. Ties go to the oldest lead, then the smallest id.
    #[default]
    RecentlyDistributed,
    /// Oldest first
    CreatedAsc,
    /// Most recently updated first
    UpdatedDesc,
}

impl LeadSort {
    pub fn compare(&self, a: &Lead, b: &Lead) -> Ordering {
        let primary = match self {
            LeadSort::RecentlyDistributed => b.distributed_at.cmp(&a.distributed_at),
            LeadSort::CreatedAsc => Ordering::Equal,
            LeadSort::UpdatedDesc => b.updated_at.cmp(&a.updated_at),
        };
        primary.then_with(|| a.created_at.cmp(&b.created_at)).then_with(|| a.id.cmp(&b.id))
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    /// Non-admin users only
    pub agents_only: bool,
    pub updated_within: Option<TimeWindow>,
}

impl UserFilter {
    pub fn agents() -> Self {
        Self { agents_only: true, ..Self::default() }
    }

    pub fn with_role(role: Role) -> Self {
        Self { role: Some(role), ..Self::default() }
    }

    pub fn within(mut self, window: Option<TimeWindow>) -> Self {
        self.updated_within = window;
        self
    }

    pub fn matches(&self, user: &User) -> bool {
        if self.role.is_some_and(|role| role != user.role) {
            return false;
        }
        if self.agents_only && !user.role.is_agent() {
            return false;
        }
        !self.updated_within.is_some_and(|w| !w.contains(user.updated_at))
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub team: Option<Team>,
    pub telemarketer_id: Option<String>,
    pub created_within: Option<TimeWindow>,
}

impl BookingFilter {
    pub fn for_team(team: Team) -> Self {
        Self { team: Some(team), ..Self::default() }
    }

    pub fn for_telemarketer(id: impl Into<String>) -> Self {
        Self { telemarketer_id: Some(id.into()), ..Self::default() }
    }

    pub fn within(mut self, window: Option<TimeWindow>) -> Self {
        self.created_within = window;
        self
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        if self.team.is_some_and(|team| booking.team != Some(team)) {
            return false;
        }
        if self.telemarketer_id.as_deref().is_some_and(|id| id != booking.telemarketer_id) {
            return false;
        }
        !self.created_within.is_some_and(|w| !w.contains(booking.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn lead(id: &str, lead_type: LeadType) -> Lead {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        Lead {
            id: id.to_string(),
            name: format!("Lead {}", id),
            lead_type,
            phone_number: "555 0100".to_string(),
            street_address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postcode: "12345".to_string(),
            email_address: "x@example.com".to_string(),
            call_disposition: None,
            remarks: None,
            created_by: "gen-1".to_string(),
            assigned_to: None,
            distributed_at: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_unassigned_tier_filter() {
        let filter = LeadFilter::all().unassigned().of_types(&[LeadType::Bar, LeadType::Cafe]);
        assert!(filter.matches(&lead("a", LeadType::Bar)));
        assert!(!filter.matches(&lead("b", LeadType::Spa)));

        let mut taken = lead("c", LeadType::Cafe);
        taken.assigned_to = Some("tm-1".to_string());
        assert!(!filter.matches(&taken));
    }

    #[test]
    fn test_excluded_ids_never_match() {
        let chosen = vec!["a".to_string()];
        let filter = LeadFilter::all().excluding(&chosen);
        assert!(!filter.matches(&lead("a", LeadType::Bar)));
        assert!(filter.matches(&lead("b", LeadType::Bar)));
    }

    #[test]
    fn test_recently_distributed_puts_unset_last() {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        let never = lead("never", LeadType::Gym);
        let mut old = lead("old", LeadType::Gym);
        old.distributed_at = Some(base);
        let mut recent = lead("recent", LeadType::Gym);
        recent.distributed_at = Some(base + Duration::hours(2));

        let mut leads = vec![never, old, recent];
        leads.sort_by(|a, b| LeadSort::RecentlyDistributed.compare(a, b));
        let ids: Vec<_> = leads.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["recent", "old", "never"]);
    }

    #[test]
    fn test_ties_break_on_creation_order() {
        let mut first = lead("z", LeadType::Gym);
        let mut second = lead("a", LeadType::Gym);
        second.created_at = first.created_at + Duration::seconds(1);
        first.updated_at = first.created_at;

        let mut leads = vec![second.clone(), first.clone()];
        leads.sort_by(|a, b| LeadSort::RecentlyDistributed.compare(a, b));
        assert_eq!(leads[0].id, "z");
    }

    #[test]
    fn test_distributed_since_requires_distribution() {
        let since = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let filter = LeadFilter::all().distributed_since(since);
        assert!(!filter.matches(&lead("a", LeadType::Bar)));

        let mut today = lead("b", LeadType::Bar);
        today.distributed_at = Some(since + Duration::hours(3));
        assert!(filter.matches(&today));
    }
}
