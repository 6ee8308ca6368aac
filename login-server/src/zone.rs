use crate::error::{LoginError, LoginResult};
use crate::gateway_tier::{GatewayEndpoint, GatewayTierIndex, LEVEL_CNT};
use crate::world_tracker::{
    OccupancyPolicy, OccupancySummary, WorldEndpoint, WorldOccupancyTracker, WorldStatus,
};

use common::ZoneId;

use crossbeam_skiplist::SkipMap;
use parking_lot::RwLock;

use std::sync::Arc;

/// 一个zone的gateway和world，各自一把读写锁
pub struct Zone {
    pub zone_id: ZoneId,
    pub gateways: RwLock<GatewayTierIndex>,
    pub worlds: RwLock<WorldOccupancyTracker>,
}

impl Zone {
    fn new(zone_id: ZoneId, levels: [u32; LEVEL_CNT], policy: OccupancyPolicy) -> Self {
        Self {
            zone_id,
            gateways: RwLock::new(GatewayTierIndex::new(levels)),
            worlds: RwLock::new(WorldOccupancyTracker::new(policy)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.read().is_empty() && self.worlds.read().is_empty()
    }

    pub fn summary(&self, now: u64) -> OccupancySummary {
        self.worlds.read().summary(now)
    }

    /// 有可进入的world时为Ok/Empty，全部满员为Full，没有world为Closed
    pub fn status(&self, now: u64) -> WorldStatus {
        let summary = self.summary(now);
        if summary.empty > 0 {
            WorldStatus::Empty
        } else if summary.ok > 0 {
            WorldStatus::Ok
        } else if summary.full > 0 {
            WorldStatus::Full
        } else {
            WorldStatus::Closed
        }
    }
}

/// # 并发读写保证：
/// * 只有服务发现同步任务增删zone和endpoint；
/// * 登录请求只读，按zone加读锁；
/// * zone_map按zone_id有序，遍历顺序确定
pub struct ZoneManager {
    zone_map: SkipMap<ZoneId, Arc<Zone>>,
    gateway_levels: [u32; LEVEL_CNT],
    policy: OccupancyPolicy,
}

impl ZoneManager {
    pub fn new(gateway_levels: [u32; LEVEL_CNT], policy: OccupancyPolicy) -> Self {
        Self {
            zone_map: SkipMap::new(),
            gateway_levels,
            policy,
        }
    }

    pub fn get(&self, zone_id: ZoneId) -> Option<Arc<Zone>> {
        self.zone_map.get(&zone_id).map(|entry| entry.value().clone())
    }

    pub fn get_or_create(&self, zone_id: ZoneId) -> Arc<Zone> {
        self.zone_map
            .get_or_insert_with(zone_id, || {
                Arc::new(Zone::new(zone_id, self.gateway_levels, self.policy))
            })
            .value()
            .clone()
    }

    pub fn zones(&self) -> Vec<Arc<Zone>> {
        self.zone_map
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn zone_ids(&self) -> Vec<ZoneId> {
        self.zone_map.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.zone_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zone_map.is_empty()
    }

    pub fn update_gateway(&self, endpoint: GatewayEndpoint) -> usize {
        self.get_or_create(endpoint.zone_id)
            .gateways
            .write()
            .update(endpoint)
    }

    pub fn remove_gateway(&self, zone_id: ZoneId, id: &str) -> Option<GatewayEndpoint> {
        self.get(zone_id)?.gateways.write().remove(id)
    }

    pub fn update_world(&self, endpoint: WorldEndpoint, now: u64) {
        self.get_or_create(endpoint.zone_id)
            .worlds
            .write()
            .update_online(endpoint, now);
    }

    pub fn remove_world(&self, zone_id: ZoneId, id: &str) -> Option<WorldEndpoint> {
        self.get(zone_id)?.worlds.write().remove(id)
    }

    pub fn pick_gateway(&self, zone_id: ZoneId) -> LoginResult<GatewayEndpoint> {
        self.get(zone_id)
            .and_then(|zone| zone.gateways.read().pick_best().cloned())
            .ok_or(LoginError::NoEndpoint(zone_id))
    }

    pub fn expire_warmup(&self, now: u64) {
        self.zone_map
            .iter()
            .for_each(|entry| entry.value().worlds.write().expire_warmup(now));
    }

    /// 删除没有任何endpoint的zone，返回删除的zone_id
    pub fn remove_empty_zones(&self) -> Vec<ZoneId> {
        let empty = self
            .zone_map
            .iter()
            .filter(|entry| entry.value().is_empty())
            .map(|entry| *entry.key())
            .collect::<Vec<_>>();
        for zone_id in &empty {
            self.zone_map.remove(zone_id);
        }
        empty
    }
}
