use crate::queue::{LoginQueue, RankInfo};
use crate::store::{LoginStore, StoreResult};
use crate::util::{Clock, Config};
use crate::window::WindowAdmission;

use tracing::debug;

use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Admission {
    pub wait_level: u64, // 0为立即放行
    pub wait_time: u64,  // 客户端下次重试间隔(秒)
    pub rank: u64,
}

impl Admission {
    #[inline]
    pub fn admitted(&self) -> bool {
        self.wait_level == 0
    }
}

/// 一次登录尝试：Unqueued -> Ranked -> AdmittedNow | Queued
pub struct WaitLevelCalculator {
    queue: LoginQueue,
    window: WindowAdmission,
    clock: Arc<dyn Clock>,
    ratio: u64,
    retry_ratio: f64,
    max_retry_wait_time: u64,
    max_queue_len: u64,
}

impl WaitLevelCalculator {
    pub fn new(config: &Config, store: Arc<dyn LoginStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            queue: LoginQueue::new(store.clone(), clock.clone()),
            window: WindowAdmission::new(store, config.login_window_size, config.login_time_slice),
            clock,
            ratio: config.wait_level_ratio(),
            retry_ratio: config.retry_ratio,
            max_retry_wait_time: config.max_retry_wait_time,
            max_queue_len: config.max_login_queue_length,
        }
    }

    pub fn queue(&self) -> &LoginQueue {
        &self.queue
    }

    pub fn window(&self) -> &WindowAdmission {
        &self.window
    }

    #[inline]
    pub fn wait_level(&self, rank: u64) -> u64 {
        rank / self.window.window_size() as u64 / self.ratio + 1
    }

    #[inline]
    pub fn wait_time(&self, rank: u64) -> u64 {
        let per_round = self.window.window_size() as u64 * self.ratio;
        let rounds = rank.div_ceil(per_round);
        ((self.retry_ratio * rounds as f64).ceil() as u64).min(self.max_retry_wait_time)
    }

    pub async fn evaluate(&self, account: &str) -> StoreResult<Admission> {
        // 队伍过长直接拒绝，不再入队
        let len = self.queue.len().await?;
        if len > self.max_queue_len {
            debug!(account, len, "queue overflow");
            return Ok(Admission {
                wait_level: self.wait_level(len),
                wait_time: self.wait_time(len),
                rank: len,
            });
        }

        let info = match self.queue.rank(account).await? {
            Some(info) => info,
            None => {
                let score = self.queue.enqueue(account).await?;
                match self.queue.rank(account).await? {
                    Some(info) => info,
                    // 刚入队就被清理掉，按队尾处理
                    None => {
                        let (timestamp, wait_time) = crate::score::decode(score);
                        RankInfo {
                            rank: self.queue.len().await? + 1,
                            score,
                            timestamp,
                            wait_time,
                        }
                    }
                }
            }
        };

        let slice_id = self.window.slice_id(self.clock.now());
        let window_size = self.window.remaining(slice_id).await?;
        let wait_level = if window_size <= 0 || info.rank > window_size as u64 {
            self.wait_level(info.rank)
        } else if self.window.occupy(slice_id).await? {
            0
        } else {
            self.wait_level(info.rank)
        };

        if wait_level == 0 {
            self.queue.dequeue(account).await?;
            debug!(account, rank = info.rank, "admitted");
            return Ok(Admission {
                wait_level,
                wait_time: 0,
                rank: info.rank,
            });
        }

        // 带上本次等待时间重新入队，下次重试时score反映累计等待
        let wait_time = self.wait_time(info.rank);
        self.queue
            .enqueue_with_wait(account, info.timestamp, info.wait_time, wait_time)
            .await?;
        debug!(account, rank = info.rank, wait_level, wait_time, "queued");
        Ok(Admission {
            wait_level,
            wait_time,
            rank: info.rank,
        })
    }
}
