//! 跨进程共享状态只存在于KV存储中，所有操作都是单次往返的原子命令，不需要分布式锁。

mod memory;
mod redis_store;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

use crate::error::StoreError;

use async_trait::async_trait;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait LoginStore: Send + Sync {
    /// INCR后刷新TTL，返回自增后的值
    async fn incr_expire(&self, key: &str, ttl_secs: u64) -> StoreResult<i64>;
    /// 不存在时为0
    async fn get_i64(&self, key: &str) -> StoreResult<i64>;

    async fn zadd(&self, key: &str, member: &str, score: u64) -> StoreResult<()>;
    /// 返回(0起始排名, score)
    async fn zrank_with_score(&self, key: &str, member: &str) -> StoreResult<Option<(u64, u64)>>;
    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool>;
    /// score未变时才删除，和ZREM一样返回是否删除
    async fn zrem_if_score(&self, key: &str, member: &str, score: u64) -> StoreResult<bool>;
    async fn zcard(&self, key: &str) -> StoreResult<u64>;
    /// 闭区间，与ZRANGE一致
    async fn zrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> StoreResult<Vec<(String, u64)>>;

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>>;
    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()>;
    async fn hdel(&self, key: &str, field: &str) -> StoreResult<()>;
    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64>;

    async fn publish(&self, channel: &str, message: &str) -> StoreResult<()>;

    async fn hget_i64(&self, key: &str, field: &str) -> StoreResult<Option<i64>> {
        match self.hget(key, field).await? {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| StoreError::BadValue {
                    key: format!("{key}/{field}"),
                    value,
                }),
            None => Ok(None),
        }
    }
}
