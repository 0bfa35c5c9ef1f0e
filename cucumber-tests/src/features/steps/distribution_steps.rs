use crate::features::world::LeadpoolWorld;
use cucumber::{given, then, when};
use leadpool_core::classification::{Classification, LeadType, Role};
use leadpool_core::model::{AgentIdentity, LeadUpdate};
use leadpool_core::testing::Harness;
use std::collections::HashSet;

fn lead_type(label: &str) -> LeadType {
    label.parse().unwrap_or_else(|e| panic!("{}", e))
}

#[given(expr = "a fresh lead pool")]
async fn given_fresh_pool(world: &mut LeadpoolWorld) {
    world.harness = Harness::new();
}

#[given(expr = "{int} unassigned {string} lead(s)")]
async fn given_unassigned_leads(world: &mut LeadpoolWorld, count: usize, label: String) {
    world.harness.seed_unassigned(lead_type(&label), count).await;
}

#[given(expr = "agent {string} has requested a working set")]
async fn given_requested(world: &mut LeadpoolWorld, agent: String) {
    world.request_working_set(&agent).await.expect("working set request failed");
}

#[when(expr = "agent {string} requests a working set")]
async fn when_requests(world: &mut LeadpoolWorld, agent: String) {
    world.request_working_set(&agent).await.expect("working set request failed");
}

#[given(expr = "agent {string} works {int} of their leads")]
async fn given_works_leads(world: &mut LeadpoolWorld, agent: String, count: usize) {
    let actor = AgentIdentity::new(agent.as_str(), agent.as_str(), Role::Telemarketer);
    let ids: Vec<String> = world.held(&agent).iter().take(count).map(|l| l.id.clone()).collect();
    assert_eq!(ids.len(), count, "{} holds fewer than {} leads", agent, count);

    for id in ids {
        let update = LeadUpdate {
            call_disposition: Some("No Answer".to_string()),
            remarks: Some("try again after lunch".to_string()),
            ..LeadUpdate::default()
        };
        world.harness.service.update_lead(&actor, &id, update).await.expect("update failed");
    }
}

#[then(expr = "agent {string} holds {int} lead(s)")]
async fn then_holds(world: &mut LeadpoolWorld, agent: String, count: usize) {
    assert_eq!(world.held(&agent).len(), count);
}

#[then(expr = "agent {string} holds {int} {string} lead(s)")]
async fn then_holds_of_type(world: &mut LeadpoolWorld, agent: String, count: usize, label: String) {
    let wanted = lead_type(&label);
    let held = world.held(&agent).iter().filter(|l| l.lead_type == wanted).count();
    assert_eq!(held, count);
}

#[then(expr = "every lead held by {string} is high priority")]
async fn then_all_high_priority(world: &mut LeadpoolWorld, agent: String) {
    let tiers = Classification::default();
    for lead in world.held(&agent) {
        assert!(
            tiers.high_priority().contains(&lead.lead_type),
            "{} is not high priority",
            lead.lead_type
        );
    }
}

#[then(expr = "every lead held by {string} is assigned to them")]
async fn then_all_assigned(world: &mut LeadpoolWorld, agent: String) {
    for lead in world.held(&agent) {
        assert_eq!(lead.assigned_to.as_deref(), Some(agent.as_str()));
        assert!(lead.distributed_at.is_some());
    }
}

#[then(expr = "the working set of {string} is unchanged")]
async fn then_unchanged(world: &mut LeadpoolWorld, agent: String) {
    let ids = |leads: &[leadpool_core::model::Lead]| {
        leads.iter().map(|l| l.id.clone()).collect::<HashSet<_>>()
    };
    let previous = world.previous_sets.get(&agent).expect("only one request was made");
    assert_eq!(ids(previous), ids(world.held(&agent)));
}

#[then(expr = "unassigned leads dropped by {int}")]
async fn then_unassigned_dropped(world: &mut LeadpoolWorld, by: u64) {
    let before = world.snapshots.first().expect("no snapshot recorded before distribution");
    let after = world
        .harness
        .service
        .current_snapshot()
        .await
        .expect("snapshot read failed")
        .expect("no snapshot stored");
    assert_eq!(before.unassigned_leads - after.unassigned_leads, by);
}
