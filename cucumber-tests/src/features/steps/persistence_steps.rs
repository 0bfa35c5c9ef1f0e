use crate::features::world::LeadpoolWorld;
use cucumber::{given, then, when};
use leadpool_core::store::{LeadFilter, LeadStore};
use leadpool_core::testing::Harness;

#[given(expr = "a journaled lead pool")]
async fn given_journaled_pool(world: &mut LeadpoolWorld) {
    let dir = tempfile::tempdir().expect("temp dir");
    world.journal_dir = Some(dir);
    let path = world.journal_path().expect("journal path");
    world.harness = Harness::journaled(&path).await.expect("journal open failed");
}

#[when(expr = "the lead pool restarts")]
async fn when_restarts(world: &mut LeadpoolWorld) {
    world.reopen_journal().await.expect("reopen failed");
}

#[then(expr = "the snapshot shows {int} total lead(s)")]
async fn then_snapshot_total(world: &mut LeadpoolWorld, total: u64) {
    let snapshot = world
        .harness
        .service
        .current_snapshot()
        .await
        .expect("snapshot read failed")
        .expect("snapshot not rebuilt");
    assert_eq!(snapshot.total_leads, total);
}

#[then(expr = "agent {string} still holds {int} lead(s)")]
async fn then_still_holds(world: &mut LeadpoolWorld, agent: String, count: u64) {
    let held = LeadStore::count(
        world.harness.datastore.as_ref(),
        &LeadFilter::all().assigned_to(&agent),
    )
    .await
    .expect("count failed");
    assert_eq!(held, count);
}
