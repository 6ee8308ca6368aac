use crate::error::{LoginError, LoginResult};
use crate::gateway_tier::GatewayEndpoint;
use crate::metrics::LoginMetrics;
use crate::util::Clock;
use crate::world_tracker::WorldEndpoint;
use crate::zone::ZoneManager;

use common::{EndpointId, ZoneId, GATEWAY_SERVICE, WORLD_SERVICE};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::*;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub id: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub tags: Vec<String>,
    /// gateway的健康上报负载
    #[serde(default)]
    pub weight: u32,
}

/// 实例第一个tag里的性能数据
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerfInfo {
    pub zid: ZoneId,
    #[serde(rename = "PIdx", default)]
    pub shard_index: u32,
    #[serde(rename = "playerNum", default)]
    pub player_num: u32,
    #[serde(rename = "maxPlayerNum", default)]
    pub max_player_num: u32,
    #[serde(rename = "startTM", default)]
    pub start_tm: u64,
    #[serde(rename = "svrAddr", default)]
    pub svr_addr: String,
}

impl PerfInfo {
    pub fn parse(instance: &ServiceInstance) -> LoginResult<Self> {
        let tag = instance
            .tags
            .first()
            .ok_or_else(|| LoginError::Discovery(format!("{} has no perf tag", instance.id)))?;
        serde_json::from_str(tag)
            .map_err(|e| LoginError::Discovery(format!("{} bad perf tag: {e}", instance.id)))
    }

    /// 对外地址，svrAddr缺失或不完整时用实例注册地址补齐
    pub fn public_addr(&self, instance: &ServiceInstance) -> (String, u16) {
        match self.svr_addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() => (
                host.to_string(),
                port.parse().unwrap_or(instance.port),
            ),
            _ if !self.svr_addr.is_empty() => (self.svr_addr.clone(), instance.port),
            _ => (instance.address.clone(), instance.port),
        }
    }

    /// 兼容毫秒时间戳
    pub fn opened_at(&self) -> u64 {
        if self.start_tm > 1_000_000_000_000 {
            self.start_tm / 1000
        } else {
            self.start_tm
        }
    }
}

pub fn parse_gateway(instance: &ServiceInstance) -> LoginResult<GatewayEndpoint> {
    let perf = PerfInfo::parse(instance)?;
    let (ip, port) = perf.public_addr(instance);
    Ok(GatewayEndpoint {
        id: instance.id.clone(),
        zone_id: perf.zid,
        ip,
        inner_ip: instance.address.clone(),
        port,
        weight: instance.weight,
    })
}

pub fn parse_world(instance: &ServiceInstance) -> LoginResult<WorldEndpoint> {
    let perf = PerfInfo::parse(instance)?;
    let (ip, port) = perf.public_addr(instance);
    Ok(WorldEndpoint {
        id: instance.id.clone(),
        zone_id: perf.zid,
        ip,
        port,
        player_num: perf.player_num,
        max_players: perf.max_player_num,
        shard_index: perf.shard_index,
        opened_at: perf.opened_at(),
        fake_warmup_count: 0,
    })
}

#[async_trait]
pub trait Discovery: Send + Sync {
    async fn instances(&self, service: &str) -> LoginResult<Vec<ServiceInstance>>;
}

/// 内存中的服务列表，测试和单机部署使用
#[derive(Default)]
pub struct StaticDiscovery {
    services: RwLock<HashMap<String, Vec<ServiceInstance>>>,
}

impl StaticDiscovery {
    pub fn set(&self, service: &str, instances: Vec<ServiceInstance>) {
        self.services.write().insert(service.to_string(), instances);
    }
}

#[async_trait]
impl Discovery for StaticDiscovery {
    async fn instances(&self, service: &str) -> LoginResult<Vec<ServiceInstance>> {
        Ok(self
            .services
            .read()
            .get(service)
            .cloned()
            .unwrap_or_default())
    }
}

/// 每次查询重新读取由外部agent渲染的json：`{"GateWay-Tcp": [...], "World-http": [...]}`
pub struct FileDiscovery {
    path: PathBuf,
}

impl FileDiscovery {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Discovery for FileDiscovery {
    async fn instances(&self, service: &str) -> LoginResult<Vec<ServiceInstance>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| LoginError::Discovery(format!("read {:?}: {e}", self.path)))?;
        let mut services: HashMap<String, Vec<ServiceInstance>> = serde_json::from_str(&content)
            .map_err(|e| LoginError::Discovery(format!("parse {:?}: {e}", self.path)))?;
        Ok(services.remove(service).unwrap_or_default())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub gateways: usize,
    pub worlds: usize,
    pub removed: usize,
    pub parse_errors: usize,
}

#[derive(Default)]
struct Known {
    gateways: HashMap<EndpointId, ZoneId>,
    worlds: HashMap<EndpointId, ZoneId>,
}

/// 定期拉取服务发现，刷新各zone的gateway分档和world人数。各进程独立拉取，一个周期内收敛
pub struct DiscoverySync {
    discovery: Arc<dyn Discovery>,
    zones: Arc<ZoneManager>,
    clock: Arc<dyn Clock>,
    metrics: Arc<LoginMetrics>,
    known: Mutex<Known>,
}

impl DiscoverySync {
    pub fn new(
        discovery: Arc<dyn Discovery>,
        zones: Arc<ZoneManager>,
        clock: Arc<dyn Clock>,
        metrics: Arc<LoginMetrics>,
    ) -> Self {
        Self {
            discovery,
            zones,
            clock,
            metrics,
            known: Mutex::default(),
        }
    }

    pub async fn sync_once(&self) -> SyncStats {
        let mut stats = SyncStats::default();
        let now = self.clock.now();

        // 查询失败时保留旧数据，不做diff
        match self.discovery.instances(GATEWAY_SERVICE).await {
            Ok(instances) => {
                let mut fresh = HashMap::new();
                for instance in &instances {
                    match parse_gateway(instance) {
                        Ok(endpoint) => {
                            let (id, zone_id) = (endpoint.id.clone(), endpoint.zone_id);
                            self.zones.update_gateway(endpoint);
                            // 同一id在多个zone上报，以最后一条为准
                            if let Some(prev) = fresh.insert(id.clone(), zone_id) {
                                if prev != zone_id && self.zones.remove_gateway(prev, &id).is_some() {
                                    warn!(%id, prev, zone_id, "duplicate gateway id");
                                }
                            }
                        }
                        Err(e) => self.parse_failed(&mut stats, e),
                    }
                }
                stats.gateways = fresh.len();
                let stale = std::mem::replace(&mut self.known.lock().gateways, fresh.clone());
                for (id, zone_id) in stale {
                    if fresh.get(&id) != Some(&zone_id)
                        && self.zones.remove_gateway(zone_id, &id).is_some()
                    {
                        info!(%id, zone_id, "gateway removed");
                        stats.removed += 1;
                    }
                }
            }
            Err(e) => self.query_failed(GATEWAY_SERVICE, e),
        }

        match self.discovery.instances(WORLD_SERVICE).await {
            Ok(instances) => {
                let mut fresh = HashMap::new();
                for instance in &instances {
                    match parse_world(instance) {
                        Ok(endpoint) => {
                            let (id, zone_id) = (endpoint.id.clone(), endpoint.zone_id);
                            self.zones.update_world(endpoint, now);
                            // 同一id在多个zone上报，以最后一条为准
                            if let Some(prev) = fresh.insert(id.clone(), zone_id) {
                                if prev != zone_id && self.zones.remove_world(prev, &id).is_some() {
                                    warn!(%id, prev, zone_id, "duplicate world id");
                                }
                            }
                        }
                        Err(e) => self.parse_failed(&mut stats, e),
                    }
                }
                stats.worlds = fresh.len();
                let stale = std::mem::replace(&mut self.known.lock().worlds, fresh.clone());
                for (id, zone_id) in stale {
                    if fresh.get(&id) != Some(&zone_id)
                        && self.zones.remove_world(zone_id, &id).is_some()
                    {
                        info!(%id, zone_id, "world removed");
                        stats.removed += 1;
                    }
                }
            }
            Err(e) => self.query_failed(WORLD_SERVICE, e),
        }

        self.zones.expire_warmup(now);
        for zone_id in self.zones.remove_empty_zones() {
            info!(zone_id, "zone dropped");
        }
        debug!(?stats, "discovery synced");
        stats
    }

    fn parse_failed(&self, stats: &mut SyncStats, e: LoginError) {
        warn!(%e, "skip instance");
        stats.parse_errors += 1;
        LoginMetrics::incr(&self.metrics.discovery_errors);
    }

    fn query_failed(&self, service: &str, e: LoginError) {
        error!(service, %e, "discovery query failed");
        LoginMetrics::incr(&self.metrics.discovery_errors);
    }

    pub async fn run(self: Arc<Self>, interval: Duration) {
        info!(?interval, "discovery sync started");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.sync_once().await;
        }
    }
}
