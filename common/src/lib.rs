pub mod proto {
    pub mod login_service {
        tonic::include_proto!("login_service");
    }
}

use tonic::{Response, Status};

pub type RPCResult<T> = Result<Response<T>, Status>;

pub type ZoneId = u32;
pub type EndpointId = String;

pub const DEFAULT_LOGIN_PORT: u16 = 50061;

// 服务发现中的服务名
pub const GATEWAY_SERVICE: &str = "GateWay-Tcp";
pub const WORLD_SERVICE: &str = "World-http";

// Redis key，与其它进程共享，格式不可改动
pub const LOGIN_QUEUE_KEY: &str = "login-queue";
pub const LOGIN_WINDOW_KEY_PREFIX: &str = "LoginWindow-";
pub const DAILY_REGISTER_KEY: &str = "LoginDailyRegisterInfo";
pub const ONLINE_ZONE_KEY: &str = "LoginOnlineZone";
pub const KICK_OUT_CHANNEL: &str = "LoginKickOut";

#[inline]
pub fn login_window_key(slice_id: u64) -> String {
    format!("{LOGIN_WINDOW_KEY_PREFIX}{slice_id}")
}

#[inline]
pub fn daily_limit_field(channel: &str) -> String {
    format!("LimitCnt:{channel}")
}

/// `date`格式为`yyyy-mm-dd`
#[inline]
pub fn daily_registered_field(channel: &str, date: &str) -> String {
    format!("RegdCnt:{channel}:{date}")
}

pub trait MapErrUnknown {
    type S;
    fn map_err_unknown(self) -> std::result::Result<Self::S, Status>;
}

impl<T, E: std::fmt::Debug> MapErrUnknown for Result<T, E> {
    type S = T;
    fn map_err_unknown(self) -> Result<Self::S, Status> {
        self.map_err(|e| {
            let s = format!("{e:?}");
            log::error!("{}", s);
            Status::unknown(s)
        })
    }
}
