use crate::score;
use crate::store::{LoginStore, StoreResult};
use crate::util::Clock;

use common::LOGIN_QUEUE_KEY;

use tracing::{debug, info};

use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RankInfo {
    pub rank: u64, // 从1开始
    pub score: u64,
    pub timestamp: u64,
    pub wait_time: u64,
}

/// 全局排队，所有login进程共享同一个sorted set。每个账号最多一个成员，重复入队只更新score
pub struct LoginQueue {
    store: Arc<dyn LoginStore>,
    clock: Arc<dyn Clock>,
}

impl LoginQueue {
    pub fn new(store: Arc<dyn LoginStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn enqueue(&self, account: &str) -> StoreResult<u64> {
        self.enqueue_with_wait(account, 0, 0, 0).await
    }

    /// `timestamp`为之前入队的时间戳，沿用以保留排队位置
    pub async fn enqueue_with_wait(
        &self,
        account: &str,
        timestamp: u64,
        last_wait_time: u64,
        add_wait_time: u64,
    ) -> StoreResult<u64> {
        let score = score::encode(timestamp, last_wait_time, add_wait_time, self.clock.now());
        self.store.zadd(LOGIN_QUEUE_KEY, account, score).await?;
        debug!(account, score, "enqueue");
        Ok(score)
    }

    pub async fn dequeue(&self, account: &str) -> StoreResult<bool> {
        self.store.zrem(LOGIN_QUEUE_KEY, account).await
    }

    /// 未排队返回None，调用方应先入队
    pub async fn rank(&self, account: &str) -> StoreResult<Option<RankInfo>> {
        Ok(self
            .store
            .zrank_with_score(LOGIN_QUEUE_KEY, account)
            .await?
            .map(|(rank, score)| {
                let (timestamp, wait_time) = score::decode(score);
                RankInfo {
                    rank: rank + 1,
                    score,
                    timestamp,
                    wait_time,
                }
            }))
    }

    pub async fn len(&self) -> StoreResult<u64> {
        self.store.zcard(LOGIN_QUEUE_KEY).await
    }

    /// 只扫描队首`scan_len`个成员，超过预计重试时间`wait_time_limit`秒仍未回来的视为放弃。
    /// 扫描后重新入队的成员score已变，不会被删除
    pub async fn sweep_expired(
        &self,
        now: u64,
        scan_len: usize,
        wait_time_limit: u64,
    ) -> StoreResult<usize> {
        if scan_len == 0 {
            return Ok(0);
        }
        let head = self
            .store
            .zrange_with_scores(LOGIN_QUEUE_KEY, 0, scan_len as isize - 1)
            .await?;
        let mut removed = 0;
        for (account, score) in head {
            let (timestamp, wait_time) = score::decode(score);
            if timestamp + wait_time + wait_time_limit < now
                && self
                    .store
                    .zrem_if_score(LOGIN_QUEUE_KEY, &account, score)
                    .await?
            {
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "sweep expired queue members");
        }
        Ok(removed)
    }
}
