use crate::store::{LoginStore, StoreResult};

use common::login_window_key;

use std::sync::Arc;

/// 按时间片计数的放行窗口。计数只增不减，超发的部分随TTL在下个时间片自然恢复
pub struct WindowAdmission {
    store: Arc<dyn LoginStore>,
    window_size: i64,
    slice_seconds: u64,
}

impl WindowAdmission {
    pub fn new(store: Arc<dyn LoginStore>, window_size: i64, slice_seconds: u64) -> Self {
        Self {
            store,
            window_size: window_size.max(1),
            slice_seconds: slice_seconds.max(1),
        }
    }

    #[inline]
    pub fn window_size(&self) -> i64 {
        self.window_size
    }

    #[inline]
    pub fn slice_id(&self, now: u64) -> u64 {
        now / self.slice_seconds
    }

    pub async fn occupy(&self, slice_id: u64) -> StoreResult<bool> {
        let count = self
            .store
            .incr_expire(&login_window_key(slice_id), self.slice_seconds * 2)
            .await?;
        Ok(count <= self.window_size)
    }

    pub async fn occupied(&self, slice_id: u64) -> StoreResult<i64> {
        self.store.get_i64(&login_window_key(slice_id)).await
    }

    /// 窗口剩余可放行数量，不小于0
    pub async fn remaining(&self, slice_id: u64) -> StoreResult<i64> {
        Ok((self.window_size - self.occupied(slice_id).await?).max(0))
    }
}
