use crate::util::Config;

use common::proto::login_service;
use common::{EndpointId, ZoneId};

use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorldStatus {
    Empty,
    Ok,
    Full,
    Closed,
}

impl From<WorldStatus> for login_service::WorldStatus {
    fn from(status: WorldStatus) -> Self {
        match status {
            WorldStatus::Empty => login_service::WorldStatus::Empty,
            WorldStatus::Ok => login_service::WorldStatus::Ok,
            WorldStatus::Full => login_service::WorldStatus::Full,
            WorldStatus::Closed => login_service::WorldStatus::Closed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldEndpoint {
    pub id: EndpointId,
    pub zone_id: ZoneId,
    pub ip: String,
    pub port: u16,
    pub player_num: u32,
    pub max_players: u32, // 0为不限
    pub shard_index: u32,
    pub opened_at: u64,
    pub fake_warmup_count: u32,
}

/// # 新服预热
/// 新开zone的前`players_server_cnt`个world在预热期内用虚拟人数代替真实人数，
/// 避免开服时所有玩家挤进头几个world。虚拟人数从首次发现起随剩余预热时间线性衰减，
/// 预热期过后清零，不再恢复
#[derive(Clone, Copy, Debug)]
pub struct OccupancyPolicy {
    pub empty_ratio: f64,
    pub busy_ratio: f64,
    pub players_server_cnt: u32,
    pub warmup_seconds: u64,
    pub world_max_coefficient: f64,
    pub players_delta_cnt: u32,
}

impl From<&Config> for OccupancyPolicy {
    fn from(config: &Config) -> Self {
        Self {
            empty_ratio: config.empty_ratio,
            busy_ratio: config.busy_ratio,
            players_server_cnt: config.players_server_cnt,
            warmup_seconds: config.warmup_seconds(),
            world_max_coefficient: config.world_max_coefficient,
            players_delta_cnt: config.players_delta_cnt,
        }
    }
}

impl OccupancyPolicy {
    #[inline]
    pub fn in_warmup(&self, world: &WorldEndpoint, now: u64) -> bool {
        world.shard_index < self.players_server_cnt
            && now.saturating_sub(world.opened_at) < self.warmup_seconds
    }

    #[inline]
    pub fn initial_fake_count(&self, max_players: u32) -> u32 {
        let fake = (max_players as f64 * self.world_max_coefficient).round() as u32;
        fake.saturating_sub(self.players_delta_cnt)
    }

    /// 首次发现时为`base`，预热结束时为0，中间按剩余时间线性递减
    pub fn decayed_fake_count(&self, warmup: &Warmup, world: &WorldEndpoint, now: u64) -> u32 {
        if !self.in_warmup(world, now) {
            return 0;
        }
        let end = world.opened_at + self.warmup_seconds;
        let span = end.saturating_sub(warmup.seen_at).max(1);
        let remaining = end.saturating_sub(now).min(span);
        (warmup.base as u64 * remaining / span) as u32
    }

    pub fn effective_player_num(&self, world: &WorldEndpoint, now: u64) -> u32 {
        if self.in_warmup(world, now) && world.fake_warmup_count > world.player_num {
            world.fake_warmup_count
        } else {
            world.player_num
        }
    }

    pub fn status(&self, world: Option<&WorldEndpoint>, now: u64) -> WorldStatus {
        let Some(world) = world else {
            return WorldStatus::Closed;
        };
        if world.max_players == 0 {
            return WorldStatus::Ok;
        }
        let rate = self.effective_player_num(world, now) as f64 / world.max_players as f64;
        if rate < self.empty_ratio {
            WorldStatus::Empty
        } else if rate >= self.busy_ratio {
            WorldStatus::Full
        } else {
            WorldStatus::Ok
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OccupancySummary {
    pub empty: u32,
    pub ok: u32,
    pub full: u32,
}

/// 首次发现时算出的虚拟人数
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Warmup {
    pub base: u32,
    pub seen_at: u64,
}

/// 单个zone内world的在线人数
pub struct WorldOccupancyTracker {
    policy: OccupancyPolicy,
    worlds: BTreeMap<EndpointId, WorldEndpoint>,
    warmups: HashMap<EndpointId, Warmup>,
}

impl WorldOccupancyTracker {
    pub fn new(policy: OccupancyPolicy) -> Self {
        Self {
            policy,
            worlds: BTreeMap::new(),
            warmups: HashMap::new(),
        }
    }

    pub fn policy(&self) -> &OccupancyPolicy {
        &self.policy
    }

    /// 合并服务发现快照，首次发现时计算虚拟人数，之后只衰减
    pub fn update_online(&mut self, mut snapshot: WorldEndpoint, now: u64) {
        if !self.policy.in_warmup(&snapshot, now) {
            self.warmups.remove(&snapshot.id);
            snapshot.fake_warmup_count = 0;
        } else {
            let first_sight = !self.worlds.contains_key(&snapshot.id);
            let policy = self.policy;
            let warmup = self
                .warmups
                .entry(snapshot.id.clone())
                .or_insert_with(|| Warmup {
                    base: if first_sight {
                        policy.initial_fake_count(snapshot.max_players)
                    } else {
                        0
                    },
                    seen_at: now,
                });
            snapshot.fake_warmup_count = policy.decayed_fake_count(warmup, &snapshot, now);
        }
        self.worlds.insert(snapshot.id.clone(), snapshot);
    }

    /// 按当前时间衰减虚拟人数，预热期结束的清零
    pub fn expire_warmup(&mut self, now: u64) {
        let policy = self.policy;
        let warmups = &mut self.warmups;
        for world in self.worlds.values_mut() {
            let Some(warmup) = warmups.get(&world.id) else {
                continue;
            };
            world.fake_warmup_count = policy.decayed_fake_count(warmup, world, now);
            if !policy.in_warmup(world, now) {
                warmups.remove(&world.id);
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<WorldEndpoint> {
        self.warmups.remove(id);
        self.worlds.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&WorldEndpoint> {
        self.worlds.get(id)
    }

    pub fn status(&self, id: &str, now: u64) -> WorldStatus {
        self.policy.status(self.worlds.get(id), now)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &WorldEndpoint> {
        self.worlds.values()
    }

    pub fn summary(&self, now: u64) -> OccupancySummary {
        self.worlds
            .values()
            .fold(OccupancySummary::default(), |mut summary, world| {
                match self.policy.status(Some(world), now) {
                    WorldStatus::Empty => summary.empty += 1,
                    WorldStatus::Ok => summary.ok += 1,
                    WorldStatus::Full => summary.full += 1,
                    WorldStatus::Closed => {}
                }
                summary
            })
    }

    /// 可进入的world，按有效人数从少到多，最多n个
    pub fn recommended(&self, now: u64, n: usize) -> Vec<(WorldEndpoint, WorldStatus)> {
        let mut worlds = self
            .worlds
            .values()
            .map(|world| (world, self.policy.status(Some(world), now)))
            .filter(|(_, status)| matches!(status, WorldStatus::Empty | WorldStatus::Ok))
            .collect::<Vec<_>>();
        worlds.sort_by_key(|(world, _)| {
            (
                self.policy.effective_player_num(world, now),
                world.shard_index,
            )
        });
        worlds
            .into_iter()
            .take(n)
            .map(|(world, status)| (world.clone(), status))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}
