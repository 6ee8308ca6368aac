use std::sync::atomic::{AtomicU64, Ordering};

/// 进程内计数，由维护任务定期打印
#[derive(Debug, Default)]
pub struct LoginMetrics {
    pub admitted: AtomicU64,
    pub queued: AtomicU64,
    pub rejected_fast: AtomicU64,
    pub store_errors: AtomicU64,
    pub discovery_errors: AtomicU64,
    pub swept: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub admitted: u64,
    pub queued: u64,
    pub rejected_fast: u64,
    pub store_errors: u64,
    pub discovery_errors: u64,
    pub swept: u64,
}

impl LoginMetrics {
    #[inline]
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            admitted: self.admitted.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            rejected_fast: self.rejected_fast.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            discovery_errors: self.discovery_errors.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
        }
    }
}
