use crate::auth::{AcceptAll, AccountDirectory, MemoryAccounts, Verifier};
use crate::daily_limit::DailyRegisterLimit;
use crate::discovery::{Discovery, DiscoverySync};
use crate::error::{LoginError, LoginResult};
use crate::gateway_tier::GatewayEndpoint;
use crate::kickout::KickOut;
use crate::metrics::LoginMetrics;
use crate::recommend::ZoneRecommender;
use crate::store::LoginStore;
use crate::util::{Clock, Config};
use crate::wait_level::{Admission, WaitLevelCalculator};
use crate::world_tracker::{OccupancyPolicy, WorldEndpoint, WorldStatus};
use crate::zone::ZoneManager;

use common::proto::login_service::{
    LoginReply, LoginRequest, ResultCode, WorldInfo, ZoneInfo,
};
use common::ZoneId;

use tokio::time::Duration;
use tracing::*;

use std::ops::Deref;
use std::sync::Arc;

/// 外部协作者，启动时构造一次
pub struct Collaborators {
    pub store: Arc<dyn LoginStore>,
    pub discovery: Arc<dyn Discovery>,
    pub clock: Arc<dyn Clock>,
    pub verifier: Arc<dyn Verifier>,
    pub accounts: Arc<dyn AccountDirectory>,
}

impl Collaborators {
    pub fn new(
        store: Arc<dyn LoginStore>,
        discovery: Arc<dyn Discovery>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            discovery,
            clock,
            verifier: Arc::new(AcceptAll),
            accounts: Arc::new(MemoryAccounts::default()),
        }
    }
}

pub struct DispatcherInner {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub calculator: WaitLevelCalculator,
    pub zones: Arc<ZoneManager>,
    pub recommender: ZoneRecommender,
    pub daily_limit: DailyRegisterLimit,
    pub kick_out: KickOut,
    pub verifier: Arc<dyn Verifier>,
    pub accounts: Arc<dyn AccountDirectory>,
    pub metrics: Arc<LoginMetrics>,
    pub discovery_sync: Arc<DiscoverySync>,
}

#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Deref for Dispatcher {
    type Target = DispatcherInner;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// 放行后选出的目的地
#[derive(Clone, Debug)]
pub struct Route {
    pub zone_id: ZoneId,
    pub gateway: GatewayEndpoint,
}

impl Dispatcher {
    pub fn new(config: Config, collaborators: Collaborators) -> Self {
        let config = config.normalize();
        let Collaborators {
            store,
            discovery,
            clock,
            verifier,
            accounts,
        } = collaborators;
        let metrics = Arc::new(LoginMetrics::default());
        let zones = Arc::new(ZoneManager::new(
            config.gateway_levels(),
            OccupancyPolicy::from(&config),
        ));
        let discovery_sync = Arc::new(DiscoverySync::new(
            discovery,
            zones.clone(),
            clock.clone(),
            metrics.clone(),
        ));

        Self {
            inner: DispatcherInner {
                calculator: WaitLevelCalculator::new(&config, store.clone(), clock.clone()),
                recommender: ZoneRecommender::new(config.recommend_world_max_cnt),
                daily_limit: DailyRegisterLimit::new(store.clone()),
                kick_out: KickOut::new(
                    store,
                    config.kick_out_retry,
                    Duration::from_millis(config.kick_out_interval),
                ),
                config,
                clock,
                zones,
                verifier,
                accounts,
                metrics,
                discovery_sync,
            }
            .into(),
        }
    }

    /// 存储不可用时拒绝放行，让客户端按最长间隔重试
    pub async fn admit(&self, account: &str) -> Admission {
        match self.calculator.evaluate(account).await {
            Ok(admission) => {
                if admission.admitted() {
                    LoginMetrics::incr(&self.metrics.admitted);
                } else if admission.rank > self.config.max_login_queue_length {
                    LoginMetrics::incr(&self.metrics.rejected_fast);
                } else {
                    LoginMetrics::incr(&self.metrics.queued);
                }
                admission
            }
            Err(e) => {
                error!(account, %e, "admission failed");
                LoginMetrics::incr(&self.metrics.store_errors);
                Admission {
                    wait_level: 1,
                    wait_time: self.config.max_retry_wait_time,
                    rank: 0,
                }
            }
        }
    }

    pub fn route(&self, requested: Option<ZoneId>) -> LoginResult<Route> {
        let zone_id = match requested {
            Some(zone_id) if self.zones.get(zone_id).is_some() => zone_id,
            Some(zone_id) => {
                warn!(zone_id, "unknown zone requested");
                return Err(LoginError::NoZoneId);
            }
            None => self.recommender.recommend(&self.zones, self.clock.now())?,
        };
        let gateway = self.zones.pick_gateway(zone_id)?;
        Ok(Route { zone_id, gateway })
    }

    fn check_request(&self, request: &LoginRequest) -> LoginResult<()> {
        if request.account.trim().is_empty() {
            return Err(LoginError::Decode("empty account"));
        }
        if request.sign.is_empty() {
            return Err(LoginError::Decode("empty sign"));
        }
        if self.config.white_list_only && !self.config.in_white_list(&request.account) {
            return Err(LoginError::WhiteList);
        }
        Ok(())
    }

    /// 登录主流程，业务失败都以结果码返回
    pub async fn handle_login(&self, request: LoginRequest) -> LoginReply {
        if let Err(e) = self.check_request(&request) {
            info!(account = %request.account, %e, "reject");
            return error_reply(e.code());
        }
        if let Err(reason) = self.verifier.verify(&request).await {
            info!(account = %request.account, reason, "verify failed");
            return error_reply(LoginError::VerifyToken(reason).code());
        }

        let admission = self.admit(&request.account).await;
        if !admission.admitted() {
            return LoginReply {
                code: ResultCode::LoginBusy as i32,
                busy_level: admission.wait_level as u32,
                busy_wait_time: admission.wait_time as u32,
                ..Default::default()
            };
        }

        match self.finish_login(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                if let LoginError::Store(_) = e {
                    LoginMetrics::incr(&self.metrics.store_errors);
                }
                warn!(account = %request.account, %e, "login failed");
                error_reply(e.code())
            }
        }
    }

    async fn finish_login(&self, request: &LoginRequest) -> LoginResult<LoginReply> {
        let Route { zone_id, gateway } = self.route(request.zone_id)?;
        self.kick_out
            .ensure_not_elsewhere(&request.account, zone_id)
            .await?;

        if !self.accounts.is_registered(&request.account).await? {
            self.daily_limit
                .try_register(&request.channel, self.clock.now())
                .await?;
            self.accounts.register(&request.account).await?;
        }

        let now = self.clock.now();
        let (recommended_worlds, world_list) = self.world_infos(zone_id, now);
        info!(account = %request.account, zone_id, gateway = %gateway.id, "OUT");
        Ok(LoginReply {
            code: ResultCode::Succ as i32,
            ip: gateway.ip,
            port: gateway.port as u32,
            zone_id,
            zone_list: self.zone_infos(now),
            recommended_worlds,
            world_list,
            ..Default::default()
        })
    }

    pub fn zone_infos(&self, now: u64) -> Vec<ZoneInfo> {
        self.zones
            .zones()
            .into_iter()
            .map(|zone| {
                let summary = zone.summary(now);
                ZoneInfo {
                    zone_id: zone.zone_id,
                    status: proto_status(zone.status(now)),
                    empty_worlds: summary.empty,
                    ok_worlds: summary.ok,
                }
            })
            .collect()
    }

    /// 返回(推荐world, 全部world)
    pub fn world_infos(&self, zone_id: ZoneId, now: u64) -> (Vec<WorldInfo>, Vec<WorldInfo>) {
        let Some(zone) = self.zones.get(zone_id) else {
            return Default::default();
        };
        let worlds = zone.worlds.read();
        let recommended = worlds
            .recommended(now, self.config.recommend_world_max_cnt.max(1) as usize)
            .into_iter()
            .map(|(world, status)| world_info(&world, status))
            .collect();
        let all = worlds
            .endpoints()
            .map(|world| world_info(world, worlds.policy().status(Some(world), now)))
            .collect();
        (recommended, all)
    }
}

#[inline]
fn proto_status(status: WorldStatus) -> i32 {
    common::proto::login_service::WorldStatus::from(status) as i32
}

fn world_info(world: &WorldEndpoint, status: WorldStatus) -> WorldInfo {
    WorldInfo {
        id: world.id.clone(),
        zone_id: world.zone_id,
        ip: world.ip.clone(),
        port: world.port as u32,
        shard_index: world.shard_index,
        status: proto_status(status),
    }
}

fn error_reply(code: ResultCode) -> LoginReply {
    LoginReply {
        code: code as i32,
        ..Default::default()
    }
}
