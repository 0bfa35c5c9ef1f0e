//! Working-set replenishment
//!
//! An agent asking for work gets back the leads it already holds, unless it
//! holds none or has worked every one of them. In that case a new batch is
//! drawn from the unassigned pool in three passes:
//!
//! 1. high-priority types,
//! 2. low-priority types for the shortfall,
//! 3. any remaining unassigned lead for what is still missing.
//!
//! Each pass orders candidates by most recent `distributedAt` (never
//! distributed counts as earliest), then oldest `createdAt`. Selected leads
//! are claimed one by one with a conditional update, so a lead taken by a
//! concurrent caller in the meantime is simply skipped.

use crate::classification::{Classification, LeadType};
use crate::clock::Clock;
use crate::model::{Lead, LeadPatch};
use crate::store::{LeadFilter, LeadSort, LeadStore};
use crate::Result;
use std::collections::HashSet;
use std::sync::Arc;

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Leads handed back to an agent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkingSet {
    pub leads: Vec<Lead>,
    /// A new batch was drawn; summaries need a refresh
    pub replenished: bool,
}

/// Per-pass breakdown of a replenishment, for logging
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub high_priority: usize,
    pub low_priority: usize,
    pub backfill: usize,
}

impl Selection {
    pub fn total(&self) -> usize {
        self.high_priority + self.low_priority + self.backfill
    }
}

/// Replenish when nothing is held or everything held has been worked
pub fn needs_replenishment(held: &[Lead]) -> bool {
    held.iter().all(Lead::is_worked)
}

pub struct DistributionEngine {
    leads: Arc<dyn LeadStore>,
    classification: Arc<Classification>,
    clock: Arc<dyn Clock>,
    batch_size: usize,
}

impl DistributionEngine {
    pub fn new(
        leads: Arc<dyn LeadStore>,
        classification: Arc<Classification>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { leads, classification, clock, batch_size: DEFAULT_BATCH_SIZE }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn fetch_working_set(&self, agent_id: &str) -> Result<WorkingSet> {
        let held = self
            .leads
            .find(&LeadFilter::all().assigned_to(agent_id), LeadSort::default(), None)
            .await?;

        if !needs_replenishment(&held) {
            log::debug!("Agent {} still working {} leads", agent_id, held.len());
            return Ok(WorkingSet { leads: held, replenished: false });
        }

        let (selected, selection) = self.select_batch().await?;
        let claimed = self.claim_all(agent_id, selected).await?;

        log::info!(
            "Replenished {}: {} leads ({} high, {} low, {} backfill selected)",
            agent_id,
            claimed.len(),
            selection.high_priority,
            selection.low_priority,
            selection.backfill
        );
        Ok(WorkingSet { leads: claimed, replenished: true })
    }

    /// Pick up to `batch_size` unassigned leads without claiming them
    pub async fn select_batch(&self) -> Result<(Vec<Lead>, Selection)> {
        let mut chosen: Vec<Lead> = Vec::with_capacity(self.batch_size);
        let mut chosen_ids: HashSet<String> = HashSet::new();
        let mut selection = Selection::default();

        let passes: [(Option<&[LeadType]>, &mut usize); 3] = [
            (Some(self.classification.high_priority()), &mut selection.high_priority),
            (Some(self.classification.low_priority()), &mut selection.low_priority),
            (None, &mut selection.backfill),
        ];

        for (types, picked) in passes {
            let remaining = self.batch_size.saturating_sub(chosen.len());
            if remaining == 0 {
                break;
            }
            let mut filter = LeadFilter::all().unassigned().excluding(&chosen_ids);
            if let Some(types) = types {
                if types.is_empty() {
                    continue;
                }
                filter = filter.of_types(types);
            }

            let found = self.leads.find(&filter, LeadSort::RecentlyDistributed, Some(remaining)).await?;
            for lead in found {
                if chosen_ids.insert(lead.id.clone()) {
                    *picked += 1;
                    chosen.push(lead);
                }
            }
        }

        Ok((chosen, selection))
    }

    async fn claim_all(&self, agent_id: &str, selected: Vec<Lead>) -> Result<Vec<Lead>> {
        let mut claimed = Vec::with_capacity(selected.len());
        for lead in selected {
            let filter = LeadFilter::by_id(&lead.id).unassigned();
            let patch = LeadPatch::assign(agent_id, self.clock.now());
            match self.leads.find_one_and_update(&filter, &patch).await? {
                Some(lead) => claimed.push(lead),
                None => log::debug!("Lead {} claimed by another agent first", lead.id),
            }
        }
        Ok(claimed)
    }
}
