use common::{EndpointId, ZoneId};

use std::collections::{BTreeMap, HashMap};

pub const LEVEL_CNT: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GatewayEndpoint {
    pub id: EndpointId,
    pub zone_id: ZoneId,
    pub ip: String,
    pub inner_ip: String,
    pub port: u16,
    pub weight: u32, // 负载信号，越大越忙
}

/// # 分档索引
/// 按权重把gateway分到4个档位，档位越低越空闲。每个gateway只属于一个档位。
/// 档内按进入顺序排列，`members`记录所在档位和序号，删除不需要扫描。
/// 同一zone的update/remove由外层写锁串行
pub struct GatewayTierIndex {
    levels: [u32; LEVEL_CNT],
    buckets: [BTreeMap<u64, EndpointId>; LEVEL_CNT],
    members: HashMap<EndpointId, (usize, u64)>,
    endpoints: HashMap<EndpointId, GatewayEndpoint>,
    seq: u64,
}

impl GatewayTierIndex {
    pub fn new(levels: [u32; LEVEL_CNT]) -> Self {
        Self {
            levels,
            buckets: Default::default(),
            members: HashMap::new(),
            endpoints: HashMap::new(),
            seq: 0,
        }
    }

    /// 第一个大于weight的阈值所在档位，超过最高阈值的也归入最高档
    #[inline]
    pub fn level_of(&self, weight: u32) -> usize {
        self.levels
            .iter()
            .position(|&threshold| weight < threshold)
            .unwrap_or(LEVEL_CNT - 1)
    }

    /// 返回所在档位。档位不变时保持原有顺序
    pub fn update(&mut self, endpoint: GatewayEndpoint) -> usize {
        let level = self.level_of(endpoint.weight);
        match self.members.get(&endpoint.id) {
            Some(&(current, _)) if current == level => {}
            Some(&(current, seq)) => {
                self.buckets[current].remove(&seq);
                self.insert(endpoint.id.clone(), level);
            }
            None => self.insert(endpoint.id.clone(), level),
        }
        self.endpoints.insert(endpoint.id.clone(), endpoint);
        level
    }

    fn insert(&mut self, id: EndpointId, level: usize) {
        self.seq += 1;
        self.buckets[level].insert(self.seq, id.clone());
        self.members.insert(id, (level, self.seq));
    }

    pub fn remove(&mut self, id: &str) -> Option<GatewayEndpoint> {
        let (level, seq) = self.members.remove(id)?;
        self.buckets[level].remove(&seq);
        self.endpoints.remove(id)
    }

    /// 从最空闲的档位取第一个
    pub fn pick_best(&self) -> Option<&GatewayEndpoint> {
        self.buckets
            .iter()
            .find_map(|bucket| bucket.values().next())
            .and_then(|id| self.endpoints.get(id))
    }

    pub fn level_members(&self, level: usize) -> Vec<EndpointId> {
        self.buckets
            .get(level)
            .map(|bucket| bucket.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn level_of_endpoint(&self, id: &str) -> Option<usize> {
        self.members.get(id).map(|&(level, _)| level)
    }

    pub fn get(&self, id: &str) -> Option<&GatewayEndpoint> {
        self.endpoints.get(id)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
