use super::{LoginStore, StoreResult};
use crate::error::StoreError;
use crate::util::Clock;

use async_trait::async_trait;
use parking_lot::Mutex;

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 单进程没有订阅方，只保留最近的消息
const PUBLISHED_CAP: usize = 1024;

/// 单进程内存实现，语义与redis命令一致。用于测试和单机部署
pub struct MemoryStore {
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
    available: AtomicBool,
}

#[derive(Default)]
struct Inner {
    counters: HashMap<String, Counter>,
    zsets: HashMap<String, SortedSet>,
    hashes: HashMap<String, HashMap<String, String>>,
    published: VecDeque<(String, String)>,
}

struct Counter {
    value: i64,
    expire_at: u64,
}

// score相同时按member字典序，与redis一致
#[derive(Default)]
struct SortedSet {
    ordered: BTreeSet<(u64, String)>,
    scores: HashMap<String, u64>,
}

impl SortedSet {
    fn insert(&mut self, member: &str, score: u64) {
        if let Some(old) = self.scores.insert(member.to_string(), score) {
            self.ordered.remove(&(old, member.to_string()));
        }
        self.ordered.insert((score, member.to_string()));
    }

    fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => self.ordered.remove(&(score, member.to_string())),
            None => false,
        }
    }

    fn rank(&self, member: &str) -> Option<(u64, u64)> {
        let score = *self.scores.get(member)?;
        let rank = self.ordered.range(..(score, member.to_string())).count();
        Some((rank as u64, score))
    }

    // 负数下标从尾部计
    fn range(&self, start: isize, stop: isize) -> Vec<(String, u64)> {
        let len = self.ordered.len() as isize;
        let start = if start < 0 { (len + start).max(0) } else { start };
        let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
        if start > stop {
            return Vec::new();
        }
        self.ordered
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .map(|(score, member)| (member.clone(), *score))
            .collect()
    }
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            inner: Mutex::default(),
            available: AtomicBool::new(true),
        }
    }

    /// 模拟存储宕机
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    /// 最近发布的消息，最多`PUBLISHED_CAP`条
    pub fn published(&self) -> Vec<(String, String)> {
        self.inner.lock().published.iter().cloned().collect()
    }

    fn check(&self) -> StoreResult<()> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

#[async_trait]
impl LoginStore for MemoryStore {
    async fn incr_expire(&self, key: &str, ttl_secs: u64) -> StoreResult<i64> {
        self.check()?;
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let counter = inner
            .counters
            .entry(key.to_string())
            .or_insert(Counter {
                value: 0,
                expire_at: 0,
            });
        if counter.expire_at <= now {
            counter.value = 0;
        }
        counter.value += 1;
        counter.expire_at = now + ttl_secs;
        Ok(counter.value)
    }

    async fn get_i64(&self, key: &str) -> StoreResult<i64> {
        self.check()?;
        let now = self.clock.now();
        Ok(self
            .inner
            .lock()
            .counters
            .get(key)
            .filter(|counter| counter.expire_at > now)
            .map(|counter| counter.value)
            .unwrap_or_default())
    }

    async fn zadd(&self, key: &str, member: &str, score: u64) -> StoreResult<()> {
        self.check()?;
        self.inner
            .lock()
            .zsets
            .entry(key.to_string())
            .or_default()
            .insert(member, score);
        Ok(())
    }

    async fn zrank_with_score(&self, key: &str, member: &str) -> StoreResult<Option<(u64, u64)>> {
        self.check()?;
        Ok(self
            .inner
            .lock()
            .zsets
            .get(key)
            .and_then(|set| set.rank(member)))
    }

    async fn zrem(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.check()?;
        Ok(self
            .inner
            .lock()
            .zsets
            .get_mut(key)
            .map(|set| set.remove(member))
            .unwrap_or(false))
    }

    async fn zrem_if_score(&self, key: &str, member: &str, score: u64) -> StoreResult<bool> {
        self.check()?;
        let mut inner = self.inner.lock();
        let Some(set) = inner.zsets.get_mut(key) else {
            return Ok(false);
        };
        if set.scores.get(member) != Some(&score) {
            return Ok(false);
        }
        Ok(set.remove(member))
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        self.check()?;
        Ok(self
            .inner
            .lock()
            .zsets
            .get(key)
            .map(|set| set.scores.len() as u64)
            .unwrap_or_default())
    }

    async fn zrange_with_scores(
        &self,
        key: &str,
        start: isize,
        stop: isize,
    ) -> StoreResult<Vec<(String, u64)>> {
        self.check()?;
        Ok(self
            .inner
            .lock()
            .zsets
            .get(key)
            .map(|set| set.range(start, stop))
            .unwrap_or_default())
    }

    async fn hget(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        self.check()?;
        Ok(self
            .inner
            .lock()
            .hashes
            .get(key)
            .and_then(|hash| hash.get(field).cloned()))
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> StoreResult<()> {
        self.check()?;
        self.inner
            .lock()
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hdel(&self, key: &str, field: &str) -> StoreResult<()> {
        self.check()?;
        if let Some(hash) = self.inner.lock().hashes.get_mut(key) {
            hash.remove(field);
        }
        Ok(())
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        self.check()?;
        let mut inner = self.inner.lock();
        let value = inner
            .hashes
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert_with(|| "0".to_string());
        let current: i64 = value.parse().map_err(|_| StoreError::BadValue {
            key: format!("{key}/{field}"),
            value: value.clone(),
        })?;
        *value = (current + delta).to_string();
        Ok(current + delta)
    }

    async fn publish(&self, channel: &str, message: &str) -> StoreResult<()> {
        self.check()?;
        let mut inner = self.inner.lock();
        if inner.published.len() >= PUBLISHED_CAP {
            inner.published.pop_front();
        }
        inner
            .published
            .push_back((channel.to_string(), message.to_string()));
        Ok(())
    }
}
