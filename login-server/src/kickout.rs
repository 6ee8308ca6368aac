use crate::error::{LoginError, LoginResult, StoreError};
use crate::store::LoginStore;

use common::{ZoneId, KICK_OUT_CHANNEL, ONLINE_ZONE_KEY};

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use std::sync::Arc;

#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KickOutMessage {
    pub account: String,
    #[serde(rename = "zoneId")]
    pub zone_id: ZoneId,
}

/// 账号在其它zone在线时，通知对方gateway踢下线，并轮询等待下线完成。
/// 在线表`LoginOnlineZone`由gateway维护
pub struct KickOut {
    store: Arc<dyn LoginStore>,
    retry: u32,
    interval: Duration,
}

impl KickOut {
    pub fn new(store: Arc<dyn LoginStore>, retry: u32, interval: Duration) -> Self {
        Self {
            store,
            retry,
            interval,
        }
    }

    pub async fn online_zone(&self, account: &str) -> LoginResult<Option<ZoneId>> {
        match self.store.hget(ONLINE_ZONE_KEY, account).await? {
            Some(value) => value.trim().parse().map(Some).map_err(|_| {
                StoreError::BadValue {
                    key: format!("{ONLINE_ZONE_KEY}/{account}"),
                    value,
                }
                .into()
            }),
            None => Ok(None),
        }
    }

    pub async fn ensure_not_elsewhere(&self, account: &str, target: ZoneId) -> LoginResult<()> {
        let online = match self.online_zone(account).await? {
            Some(zone_id) if zone_id != target => zone_id,
            _ => return Ok(()),
        };

        let message = serde_json::to_string(&KickOutMessage {
            account: account.to_string(),
            zone_id: online,
        })
        .map_err(|e| LoginError::Internal(e.to_string()))?;
        self.store.publish(KICK_OUT_CHANNEL, &message).await?;
        info!(account, online, target, "kick out published");

        for attempt in 1..=self.retry {
            sleep(self.interval).await;
            match self.online_zone(account).await? {
                Some(zone_id) if zone_id != target => {
                    warn!(account, zone_id, attempt, "still online");
                }
                _ => return Ok(()),
            }
        }
        Err(LoginError::AlreadyOnline(online))
    }
}
