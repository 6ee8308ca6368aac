use crate::error::{LoginError, LoginResult};
use crate::store::LoginStore;

use common::{daily_limit_field, daily_registered_field, DAILY_REGISTER_KEY};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use std::sync::Arc;

/// 每个渠道每日新注册上限。上限未配置时不限制
pub struct DailyRegisterLimit {
    store: Arc<dyn LoginStore>,
}

/// UTC日期`yyyy-mm-dd`
pub fn date_of(now: u64) -> String {
    DateTime::<Utc>::from_timestamp(now as i64, 0)
        .unwrap_or_default()
        .format("%Y-%m-%d")
        .to_string()
}

impl DailyRegisterLimit {
    pub fn new(store: Arc<dyn LoginStore>) -> Self {
        Self { store }
    }

    pub async fn limit(&self, channel: &str) -> LoginResult<Option<i64>> {
        Ok(self
            .store
            .hget_i64(DAILY_REGISTER_KEY, &daily_limit_field(channel))
            .await?)
    }

    pub async fn registered(&self, channel: &str, now: u64) -> LoginResult<i64> {
        Ok(self
            .store
            .hget_i64(DAILY_REGISTER_KEY, &daily_registered_field(channel, &date_of(now)))
            .await?
            .unwrap_or_default())
    }

    /// 先加后判，超限时回退计数
    pub async fn try_register(&self, channel: &str, now: u64) -> LoginResult<i64> {
        let Some(limit) = self.limit(channel).await? else {
            return Ok(0);
        };
        let field = daily_registered_field(channel, &date_of(now));
        let count = self.store.hincrby(DAILY_REGISTER_KEY, &field, 1).await?;
        if count > limit {
            if let Err(e) = self.store.hincrby(DAILY_REGISTER_KEY, &field, -1).await {
                warn!(%e, %field, "rollback daily register count failed");
            }
            info!(channel, limit, "daily register limit reached");
            return Err(LoginError::DailyIncrOver(channel.to_string()));
        }
        Ok(count)
    }
}
