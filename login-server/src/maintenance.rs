use crate::dispatcher::Dispatcher;
use crate::metrics::LoginMetrics;

use anyhow::Result;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tonic::async_trait;
use tracing::*;

use std::sync::atomic::Ordering;

/// 只有1号进程执行，靠部署约定保证唯一，不加分布式锁
pub const LEADER_PROCESS_ID: u32 = 1;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub swept: usize,
    pub queue_len: u64,
    pub window_occupied: i64,
}

#[async_trait]
pub trait LeaderMaintenance {
    fn is_leader(&self) -> bool;
    /// 清理放弃排队的账号
    async fn sweep_queue(&self, now: u64) -> Result<usize>;
    /// 当前时间片的窗口占用和排队长度
    async fn report(&self, now: u64) -> Result<(i64, u64)>;
    async fn maintenance_once(&self) -> MaintenanceReport;
}

#[async_trait]
impl LeaderMaintenance for Dispatcher {
    fn is_leader(&self) -> bool {
        self.config.process_id == LEADER_PROCESS_ID
    }

    async fn sweep_queue(&self, now: u64) -> Result<usize> {
        let swept = self
            .calculator
            .queue()
            .sweep_expired(
                now,
                self.config.login_window_size as usize,
                self.config.wait_time_limit,
            )
            .await?;
        self.metrics.swept.fetch_add(swept as u64, Ordering::Relaxed);
        Ok(swept)
    }

    async fn report(&self, now: u64) -> Result<(i64, u64)> {
        let window = self.calculator.window();
        let occupied = window.occupied(window.slice_id(now)).await?;
        let queue_len = self.calculator.queue().len().await?;
        Ok((occupied, queue_len))
    }

    /// 出错只记录，下个周期重试
    async fn maintenance_once(&self) -> MaintenanceReport {
        let now = self.clock.now();
        let mut report = MaintenanceReport::default();
        match self.sweep_queue(now).await {
            Ok(swept) => report.swept = swept,
            Err(e) => {
                error!(?e, "sweep queue failed");
                LoginMetrics::incr(&self.metrics.store_errors);
            }
        }
        match self.report(now).await {
            Ok((occupied, queue_len)) => {
                report.window_occupied = occupied;
                report.queue_len = queue_len;
                info!(
                    window_occupied = occupied,
                    window_size = self.config.login_window_size,
                    queue_len,
                    "login load"
                );
            }
            Err(e) => {
                error!(?e, "report login load failed");
                LoginMetrics::incr(&self.metrics.store_errors);
            }
        }
        info!(metrics = ?self.metrics.snapshot(), zones = self.zones.len(), "login metrics");
        report
    }
}

impl Dispatcher {
    pub async fn maintenance_monitor(self) {
        if !self.is_leader() {
            info!(process_id = self.config.process_id, "not leader, skip maintenance");
            return;
        }
        let mut ticker = interval(Duration::from_millis(self.config.maintenance_interval));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.maintenance_once().await;
        }
    }
}
