use super::{LoginStore, StoreResult};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::info;

// ZSCORE与ZREM之间不能插入别的命令
const ZREM_IF_SCORE: &str = r#"
if tonumber(redis.call('ZSCORE', KEYS[1], ARGV[1])) == tonumber(ARGV[2]) then
    return redis.call('ZREM', KEYS[1], ARGV[1])
end
return 0
"#;

/// 多路复用连接可随意clone，每次命令clone一份即可
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(url, "redis connected");
        Ok(Self { conn })
    }
}

// sorted set的score是double，打包后的score不超过2^53，可无损转换
#[inline]
fn to_score(score: u64) -> f64 {
    score as f64
}

#[inline]
fn from_score(score: f64) -> u64 {
    score as u64
}

#[async_trait]
impl LoginStore for RedisStore {
    async fn incr_expire(&self, key: &str, ttl_secs: u64) -> StoreResult<i64> {
        let (count,): (i64,) = redis::pipe()
            .atomic()
            .cmd("INCR")
            .arg(key)
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl_secs)
            .ignore()
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(count)
    }

    async fn get_i64(&self, key: &str) -> StoreResult<i64> {
        let count: Option<i64> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(count.unwrap_or_default())
    }

    async fn zadd(&self, key: &str, member: &str, score: u64) -> StoreResult<()> {
        redis::cmd("ZADD")
            .arg(key)
            .arg(to_score(score))
            .arg(member)
            .query_async::<_, ()>(&mut self.conn.clone())
            .await?;
        Ok(())
    }

    async fn zrank_with_score(&self, key: &str, member: &str) -> StoreResult<Option<(u64, u64)>> {
        let (rank, score): (Option<u64>, Option<f64>) = redis::pipe()
            .cmd("ZRANK")
            .arg(key)
            .arg(member)
            .cmd("ZSCORE")
            .arg(key)
            .arg(member)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(rank.zip(score.map(from_score)))
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool> {
        let removed: i64 = redis::cmd("ZREM")
            .arg(key)
            .arg(member)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(removed > 0)
    }

    async fn zrem_if_score(&self, key: &str, member: &str, score: u64) -> StoreResult<bool> {
        let removed: i64 = redis::cmd("EVAL")
            .arg(ZREM_IF_SCORE)
            .arg(1)
            .arg(key)
            .arg(member)
            .arg(score)
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(removed > 0)
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        Ok(redis::cmd("ZCARD")
            .arg(key)
            .query_async(&mut self.conn.clone())
            .await?)
    }

    async fn zrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> StoreResult<Vec<(String, u64)>> {
        let members: Vec<(String, f64)> = redis::cmd("ZRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .arg("WITHSCORES")
            .query_async(&mut self.conn.clone())
            .await?;
        Ok(members
            .into_iter()
            .map(|(member, score)| (member, from_score(score)))
            .collect())
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        Ok(redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async(&mut self.conn.clone())
            .await?)
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        redis::cmd("HSET")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async::<_, ()>(&mut self.conn.clone())
            .await?;
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<()> {
        redis::cmd("HDEL")
            .arg(key)
            .arg(field)
            .query_async::<_, ()>(&mut self.conn.clone())
            .await?;
        Ok(())
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        Ok(redis::cmd("HINCRBY")
            .arg(key)
            .arg(field)
            .arg(delta)
            .query_async(&mut self.conn.clone())
            .await?)
    }

    async fn publish(&self, channel: &str, message: &str) -> StoreResult<()> {
        redis::cmd("PUBLISH")
            .arg(channel)
            .arg(message)
            .query_async::<_, ()>(&mut self.conn.clone())
            .await?;
        Ok(())
    }
}
