use common::proto::login_service::ResultCode;

use thiserror::Error;

pub type LoginResult<T> = Result<T, LoginError>;

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("no available endpoint in zone {0}")]
    NoEndpoint(common::ZoneId),
    #[error("no zone id")]
    NoZoneId,
    #[error("daily register limit reached for channel {0}")]
    DailyIncrOver(String),
    #[error("account still online in zone {0}")]
    AlreadyOnline(common::ZoneId),
    #[error("decode request: {0}")]
    Decode(&'static str),
    #[error("account not in white list")]
    WhiteList,
    #[error("verify token: {0}")]
    VerifyToken(String),
    #[error("discovery: {0}")]
    Discovery(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl LoginError {
    pub fn code(&self) -> ResultCode {
        match self {
            LoginError::Store(_) | LoginError::Discovery(_) | LoginError::Internal(_) => {
                ResultCode::ServerErr
            }
            LoginError::NoEndpoint(_) | LoginError::NoZoneId => ResultCode::ZoneError,
            LoginError::DailyIncrOver(_) => ResultCode::DailyIncrOver,
            LoginError::AlreadyOnline(_) => ResultCode::AlreadyOnline,
            LoginError::Decode(_) => ResultCode::DecodeErr,
            LoginError::WhiteList => ResultCode::WhiteListErr,
            LoginError::VerifyToken(_) => ResultCode::VerifyTokenErr,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Redis(#[from] redis::RedisError),
    #[error("unexpected value for {key}: {value}")]
    BadValue { key: String, value: String },
    #[error("store unavailable")]
    Unavailable,
}
