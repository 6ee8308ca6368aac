//! 外部依赖的接口：签名/token校验和账号目录，具体实现由部署方提供

use crate::error::LoginResult;

use common::proto::login_service::LoginRequest;

use async_trait::async_trait;
use parking_lot::RwLock;

use std::collections::HashSet;

#[async_trait]
pub trait Verifier: Send + Sync {
    /// 失败时返回原因
    async fn verify(&self, request: &LoginRequest) -> Result<(), String>;
}

/// 不校验，由前置网关完成鉴权时使用
#[derive(Default)]
pub struct AcceptAll;

#[async_trait]
impl Verifier for AcceptAll {
    async fn verify(&self, _request: &LoginRequest) -> Result<(), String> {
        Ok(())
    }
}

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn is_registered(&self, account: &str) -> LoginResult<bool>;
    async fn register(&self, account: &str) -> LoginResult<()>;
}

#[derive(Default)]
pub struct MemoryAccounts {
    accounts: RwLock<HashSet<String>>,
}

#[async_trait]
impl AccountDirectory for MemoryAccounts {
    async fn is_registered(&self, account: &str) -> LoginResult<bool> {
        Ok(self.accounts.read().contains(account))
    }

    async fn register(&self, account: &str) -> LoginResult<()> {
        self.accounts.write().insert(account.to_string());
        Ok(())
    }
}
