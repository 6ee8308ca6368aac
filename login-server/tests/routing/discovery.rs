use crate::{gateway, init_log, world, Fixture, START};

use login_server::discovery::{Discovery, FileDiscovery};
use login_server::store::MemoryStore;
use login_server::util::{Clock, Config, ManualClock};
use login_server::world_tracker::WorldStatus;
use login_server::{Collaborators, Dispatcher};

use common::proto::login_service::WorldStatus as WireStatus;
use common::{GATEWAY_SERVICE, WORLD_SERVICE};

use std::io::Write;
use std::sync::Arc;

#[tokio::test]
async fn stale_endpoints_removed() {
    let fixture = Fixture::with_zone(Config::default()).await;
    let zones = &fixture.dispatcher.zones;
    assert_eq!(zones.pick_gateway(1).unwrap().id, "g2");

    fixture
        .discovery
        .set(GATEWAY_SERVICE, vec![gateway("g1", 1, 500, "1.1.1.1:7001")]);
    let stats = fixture.dispatcher.discovery_sync.sync_once().await;
    assert_eq!(stats.gateways, 1);
    assert_eq!(stats.worlds, 1);
    assert_eq!(stats.removed, 1);
    assert_eq!(zones.pick_gateway(1).unwrap().id, "g1");
}

#[tokio::test]
async fn endpoint_moves_between_zones() {
    let fixture = Fixture::with_zone(Config::default()).await;
    let zones = &fixture.dispatcher.zones;

    fixture
        .discovery
        .set(GATEWAY_SERVICE, vec![gateway("g1", 2, 500, "1.1.1.1:7001")]);
    fixture.discovery.set(WORLD_SERVICE, vec![]);
    fixture.dispatcher.discovery_sync.sync_once().await;

    // zone 1已经没有任何endpoint
    assert!(zones.get(1).is_none());
    assert_eq!(zones.zone_ids(), vec![2]);
    assert_eq!(zones.pick_gateway(2).unwrap().id, "g1");
}

#[tokio::test]
async fn duplicate_id_across_zones_keeps_last() {
    let fixture = Fixture::new(Config::default());
    let zones = &fixture.dispatcher.zones;

    fixture.discovery.set(
        GATEWAY_SERVICE,
        vec![
            gateway("g1", 1, 10, "1.1.1.1:7001"),
            gateway("g1", 2, 10, "1.1.1.1:7001"),
        ],
    );
    fixture.discovery.set(
        WORLD_SERVICE,
        vec![
            world("w1", 1, 5, 0, 1000, 0),
            world("w1", 2, 5, 0, 1000, 0),
        ],
    );
    let stats = fixture.dispatcher.discovery_sync.sync_once().await;
    assert_eq!((stats.gateways, stats.worlds), (1, 1));
    assert!(zones.pick_gateway(1).is_err());
    assert_eq!(zones.pick_gateway(2).unwrap().id, "g1");
    assert_eq!(zones.zone_ids(), vec![2]);

    // 下线后两个zone都不能残留
    fixture.discovery.set(GATEWAY_SERVICE, vec![]);
    fixture.discovery.set(WORLD_SERVICE, vec![]);
    fixture.dispatcher.discovery_sync.sync_once().await;
    assert!(zones.pick_gateway(1).is_err());
    assert!(zones.pick_gateway(2).is_err());
    assert!(zones.is_empty());
}

#[tokio::test]
async fn gateway_changes_tier_with_weight() {
    let fixture = Fixture::with_zone(Config::default()).await;
    let zone = fixture.dispatcher.zones.get(1).unwrap();
    assert_eq!(zone.gateways.read().level_of_endpoint("g2"), Some(0));

    // g2变忙，g1变闲
    fixture.discovery.set(
        GATEWAY_SERVICE,
        vec![
            gateway("g1", 1, 250, "1.1.1.1:7001"),
            gateway("g2", 1, 600, "1.1.1.2:7002"),
        ],
    );
    fixture.dispatcher.discovery_sync.sync_once().await;
    assert_eq!(zone.gateways.read().level_of_endpoint("g1"), Some(1));
    assert_eq!(zone.gateways.read().level_of_endpoint("g2"), Some(2));
    assert_eq!(fixture.dispatcher.zones.pick_gateway(1).unwrap().id, "g1");
}

#[tokio::test]
async fn new_world_warmup() {
    let fixture = Fixture::new(Config::default());
    fixture.discovery.set(
        GATEWAY_SERVICE,
        vec![gateway("g1", 1, 10, "1.1.1.1:7001")],
    );
    fixture.discovery.set(
        WORLD_SERVICE,
        vec![
            world("w0", 1, 0, 0, 1000, START),
            world("w5", 1, 5, 0, 1000, START),
        ],
    );
    fixture.dispatcher.discovery_sync.sync_once().await;

    let zone = fixture.dispatcher.zones.get(1).unwrap();
    assert_eq!(zone.worlds.read().get("w0").unwrap().fake_warmup_count, 650);
    assert_eq!(zone.worlds.read().status("w0", START), WorldStatus::Ok);
    // 超出预热个数的world不受影响
    assert_eq!(zone.worlds.read().status("w5", START), WorldStatus::Empty);

    let (recommended, all) = fixture.dispatcher.world_infos(1, START);
    assert_eq!(all.len(), 2);
    assert_eq!(recommended[0].id, "w5");

    // 预热期结束后按真实人数
    fixture.clock.advance(2 * 3600);
    fixture.dispatcher.discovery_sync.sync_once().await;
    assert_eq!(zone.worlds.read().get("w0").unwrap().fake_warmup_count, 0);
    let (_, all) = fixture.dispatcher.world_infos(1, fixture.clock.now());
    assert!(all
        .iter()
        .all(|world| world.status == WireStatus::Empty as i32));
}

#[tokio::test]
async fn file_discovery_keeps_data_on_failure() {
    init_log();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let content = serde_json::json!({
        GATEWAY_SERVICE: [gateway("g1", 1, 10, "1.1.1.1:7001")],
        WORLD_SERVICE: [world("w1", 1, 0, 10, 1000, 0)],
    });
    write!(file, "{content}").unwrap();

    let discovery = FileDiscovery::new(file.path());
    assert_eq!(discovery.instances(GATEWAY_SERVICE).await.unwrap().len(), 1);
    assert!(discovery.instances("unknown").await.unwrap().is_empty());

    let clock = Arc::new(ManualClock::new(START));
    let dispatcher = Dispatcher::new(
        Config::default(),
        Collaborators::new(
            Arc::new(MemoryStore::new(clock.clone())),
            Arc::new(discovery),
            clock,
        ),
    );
    let stats = dispatcher.discovery_sync.sync_once().await;
    assert_eq!((stats.gateways, stats.worlds), (1, 1));

    // 文件损坏时保留上次结果
    std::fs::write(file.path(), "{ not json").unwrap();
    let stats = dispatcher.discovery_sync.sync_once().await;
    assert_eq!(stats.removed, 0);
    assert_eq!(dispatcher.zones.pick_gateway(1).unwrap().id, "g1");
    assert_eq!(dispatcher.metrics.snapshot().discovery_errors, 2);
}
