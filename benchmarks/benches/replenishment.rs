use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use futures::future::join_all;
use leadpool_core::classification::LeadType;
use leadpool_core::testing::Harness;
use std::hint::black_box;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Pool with a realistic tier mix: a third high priority
fn seeded(rt: &Runtime, pool_size: usize) -> Harness {
    let harness = Harness::new();
    rt.block_on(async {
        harness.seed_unassigned(LeadType::Restaurant, pool_size / 3).await;
        harness.seed_unassigned(LeadType::Pharmacy, pool_size - pool_size / 3).await;
    });
    harness
}

fn benchmark_single_agent(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("replenish_single_agent");

    for pool_size in [100, 1_000, 10_000] {
        group.throughput(Throughput::Elements(10));
        group.bench_with_input(BenchmarkId::new("pool", pool_size), &pool_size, |b, &pool_size| {
            b.iter_batched(
                || seeded(&rt, pool_size),
                |harness| {
                    rt.block_on(async move {
                        black_box(harness.service.get_working_set("tm-bench").await.unwrap())
                    })
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn benchmark_contended_agents(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("replenish_contended");
    group.sample_size(20);

    for agents in [4usize, 16, 64] {
        group.throughput(Throughput::Elements(agents as u64));
        group.bench_with_input(BenchmarkId::new("agents", agents), &agents, |b, &agents| {
            b.iter_batched(
                || Arc::new(seeded(&rt, agents * 10)),
                |harness| {
                    rt.block_on(async move {
                        let requests = (0..agents).map(|i| {
                            let harness = harness.clone();
                            tokio::spawn(async move {
                                harness.service.get_working_set(&format!("tm-{}", i)).await
                            })
                        });
                        black_box(join_all(requests).await)
                    })
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_single_agent, benchmark_contended_agents);
criterion_main!(benches);
