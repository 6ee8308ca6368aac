use crate::error::{LoginError, LoginResult};
use crate::world_tracker::OccupancySummary;
use crate::zone::ZoneManager;

use common::ZoneId;

use rand::Rng;

/// 按zone_id升序扫描：
/// 1. 空闲world数超过`recommend_world_max_cnt`的第一个zone；
/// 2. 有正常负载world的第一个zone；
/// 3. 都没有时在所有zone中随机
pub struct ZoneRecommender {
    recommend_world_max_cnt: u32,
}

impl ZoneRecommender {
    pub fn new(recommend_world_max_cnt: u32) -> Self {
        Self {
            recommend_world_max_cnt,
        }
    }

    pub fn recommend(&self, zones: &ZoneManager, now: u64) -> LoginResult<ZoneId> {
        let summaries = zones
            .zones()
            .into_iter()
            .map(|zone| (zone.zone_id, zone.summary(now)))
            .collect::<Vec<_>>();
        self.choose(&summaries, &mut rand::thread_rng())
            .ok_or(LoginError::NoZoneId)
    }

    /// `summaries`须按zone_id有序
    pub fn choose<R: Rng>(
        &self,
        summaries: &[(ZoneId, OccupancySummary)],
        rng: &mut R,
    ) -> Option<ZoneId> {
        summaries
            .iter()
            .find(|(_, summary)| summary.empty > self.recommend_world_max_cnt)
            .or_else(|| summaries.iter().find(|(_, summary)| summary.ok > 0))
            .map(|(zone_id, _)| *zone_id)
            .or_else(|| {
                (!summaries.is_empty())
                    .then(|| summaries[rng.gen_range(0..summaries.len())].0)
            })
    }
}
