use crate::LOGINED_ACCOUNT_ID;

use login_server::discovery::{ServiceInstance, StaticDiscovery};
use login_server::store::MemoryStore;
use login_server::util::{Config, SystemClock};
use login_server::{Collaborators, Dispatcher};

use common::proto::login_service::{login_service_server::LoginService, LoginRequest};
use common::{GATEWAY_SERVICE, WORLD_SERVICE};

use criterion::{criterion_group, Criterion};
use rand::{thread_rng, Rng};
use tokio::runtime::Builder;
use tonic::IntoRequest;

use std::sync::atomic::Ordering;
use std::sync::Arc;

const ZONE_CNT: u32 = 8;

fn instance(id: String, tag: String, weight: u32) -> ServiceInstance {
    ServiceInstance {
        id,
        address: "127.0.0.1".to_string(),
        port: 9000,
        tags: vec![tag],
        weight,
    }
}

/// 每个zone 4个gateway、8个world，权重和人数随机
fn dispatcher(runtime: &tokio::runtime::Runtime) -> Dispatcher {
    let clock = Arc::new(SystemClock);
    let discovery = Arc::new(StaticDiscovery::default());
    let mut rng = thread_rng();
    let mut gateways = vec![];
    let mut worlds = vec![];
    for zid in 1..=ZONE_CNT {
        for i in 0..4 {
            gateways.push(instance(
                format!("g{zid}-{i}"),
                format!(r#"{{"zid":{zid},"svrAddr":"10.0.{zid}.{i}:7000"}}"#),
                rng.gen_range(0..1200),
            ));
        }
        for i in 0..8 {
            let player_num = rng.gen_range(0..1000);
            worlds.push(instance(
                format!("w{zid}-{i}"),
                format!(r#"{{"zid":{zid},"PIdx":{i},"playerNum":{player_num},"maxPlayerNum":1000}}"#),
                0,
            ));
        }
    }
    discovery.set(GATEWAY_SERVICE, gateways);
    discovery.set(WORLD_SERVICE, worlds);

    let dispatcher = Dispatcher::new(
        Config {
            // 只测流程开销，不让窗口限流
            login_window_size: 1_000_000_000,
            ..Default::default()
        },
        Collaborators::new(Arc::new(MemoryStore::new(clock.clone())), discovery, clock),
    );
    runtime.block_on(dispatcher.discovery_sync.sync_once());
    dispatcher
}

fn from_elem(c: &mut Criterion) {
    let runtime = Builder::new_multi_thread().enable_all().build().unwrap();
    let dispatcher = dispatcher(&runtime);
    let now = std::time::Instant::now();

    c.bench_function("login", |b| {
        b.to_async(&runtime).iter(|| {
            let dispatcher = dispatcher.clone();
            async move {
                let id = LOGINED_ACCOUNT_ID.fetch_add(1, Ordering::Relaxed);
                dispatcher
                    .login(
                        LoginRequest {
                            account: format!("bench-{id}"),
                            sign: "sign".to_string(),
                            channel: "bench".to_string(),
                            ..Default::default()
                        }
                        .into_request(),
                    )
                    .await
                    .unwrap();
            }
        });
    });

    let elapsed = now.elapsed().as_millis().max(1);
    let accounts = LOGINED_ACCOUNT_ID.load(Ordering::Relaxed);
    println!(
        "Logined {accounts} accounts in {elapsed}ms, RPS: {}",
        (accounts * 1000) as u128 / elapsed
    );
}

criterion_group! {
    name = login;
    config = Criterion::default();
    targets = from_elem
}
