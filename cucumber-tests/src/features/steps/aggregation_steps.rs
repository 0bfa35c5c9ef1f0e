use crate::features::world::LeadpoolWorld;
use cucumber::{given, then, when};
use leadpool_core::classification::{CallDisposition, LeadType, Role, Team};
use leadpool_core::model::{AgentIdentity, LeadUpdate, NewUser};

#[given(expr = "the inventory has been recomputed")]
async fn given_recomputed(world: &mut LeadpoolWorld) {
    world.recompute().await.expect("recompute failed");
}

#[when(expr = "the inventory is recomputed")]
async fn when_recomputed(world: &mut LeadpoolWorld) {
    world.recompute().await.expect("recompute failed");
}

#[given(expr = "a telemarketer {string} named {string} on team {string}")]
async fn given_telemarketer(world: &mut LeadpoolWorld, id: String, name: String, team: String) {
    world
        .harness
        .service
        .register_user(NewUser {
            id: Some(id.clone()),
            email_address: format!("{}@example.com", id),
            name,
            role: Role::Telemarketer.label().to_string(),
            team: Some(team),
        })
        .await
        .expect("registration failed");
}

#[when(expr = "agent {string} books their first lead")]
async fn when_books_first(world: &mut LeadpoolWorld, agent: String) {
    let lead_id = world.held(&agent).first().map(|l| l.id.clone()).expect("agent holds no leads");
    let actor = AgentIdentity::new(agent.as_str(), agent.as_str(), Role::Telemarketer);
    let update = LeadUpdate {
        call_disposition: Some(CallDisposition::Booked.label().to_string()),
        remarks: Some("demo booked for Friday".to_string()),
        ..LeadUpdate::default()
    };
    world.harness.service.update_lead(&actor, &lead_id, update).await.expect("update failed");
}

#[then(expr = "the snapshot lists every lead type and disposition")]
async fn then_zero_filled(world: &mut LeadpoolWorld) {
    let snapshot = world.snapshots.last().expect("no snapshot recorded");
    assert_eq!(snapshot.leads_by_type.len(), LeadType::ALL.len());
    assert_eq!(snapshot.leads_by_disposition.len(), CallDisposition::ALL.len());
    assert_eq!(snapshot.bookings_by_team.len(), Team::ALL.len());
}

#[then(expr = "the snapshot partition holds")]
async fn then_partition(world: &mut LeadpoolWorld) {
    let snapshot = world.snapshots.last().expect("no snapshot recorded");
    assert_eq!(snapshot.assigned_leads + snapshot.unassigned_leads, snapshot.total_leads);
}

#[then(expr = "the last two snapshots have identical counters")]
async fn then_idempotent(world: &mut LeadpoolWorld) {
    let [.., first, second] = world.snapshots.as_slice() else {
        panic!("fewer than two snapshots recorded");
    };
    let counters = |s: &leadpool_core::model::InventorySnapshot| {
        serde_json::to_string(&(
            s.total_leads,
            s.assigned_leads,
            &s.leads_by_type,
            &s.leads_by_disposition,
            &s.bookings_by_team,
        ))
        .expect("snapshot serializes")
    };
    assert_eq!(counters(first), counters(second));
}

#[then(expr = "there is/are {int} booking(s) for team {string}")]
async fn then_bookings_for_team(world: &mut LeadpoolWorld, count: usize, team: String) {
    let team: Team = team.parse().expect("unknown team");
    let bookings = world.harness.service.list_bookings().await.expect("bookings read failed");
    assert_eq!(bookings.iter().filter(|b| b.team == Some(team)).count(), count);

    let snapshot = world.harness.service.current_snapshot().await.expect("read failed").expect("no snapshot");
    assert_eq!(snapshot.bookings_by_team[&team], count as u64);
}

#[then(expr = "there is/are {int} notification(s)")]
async fn then_notifications(world: &mut LeadpoolWorld, count: usize) {
    let notifications =
        world.harness.service.list_notifications().await.expect("notifications read failed");
    assert_eq!(notifications.len(), count);
}
