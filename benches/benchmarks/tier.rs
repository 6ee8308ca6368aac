use login_server::gateway_tier::{GatewayEndpoint, GatewayTierIndex};

use criterion::{criterion_group, BatchSize, Criterion};
use rand::{thread_rng, Rng};

const GATEWAY_CNT: usize = 1000;

fn endpoint(i: usize, weight: u32) -> GatewayEndpoint {
    GatewayEndpoint {
        id: format!("g{i}"),
        zone_id: 1,
        ip: "127.0.0.1".to_string(),
        inner_ip: "127.0.0.1".to_string(),
        port: 7000,
        weight,
    }
}

fn index() -> GatewayTierIndex {
    let mut rng = thread_rng();
    let mut index = GatewayTierIndex::new([100, 300, 700, 1000]);
    for i in 0..GATEWAY_CNT {
        index.update(endpoint(i, rng.gen_range(0..1200)));
    }
    index
}

fn from_elem(c: &mut Criterion) {
    let mut rng = thread_rng();

    // 一轮服务发现刷新全部gateway权重
    c.bench_function("tier_refresh", |b| {
        b.iter_batched(
            index,
            |mut index| {
                for i in 0..GATEWAY_CNT {
                    index.update(endpoint(i, rng.gen_range(0..1200)));
                }
                index
            },
            BatchSize::SmallInput,
        )
    });

    let index = index();
    c.bench_function("tier_pick_best", |b| {
        b.iter(|| index.pick_best().map(|endpoint| endpoint.port))
    });
}

criterion_group! {
    name = tier;
    config = Criterion::default();
    targets = from_elem
}
