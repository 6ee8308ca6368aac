//! 排队score编码：高位为入队时间戳(秒)，低`WAIT_TIME_BIT_LEN`位为累计等待时间(秒)。
//!
//! 时间戳在高位，等待时间相同时score随入队时间单调递增，sorted set的排名即入队顺序。
//! 20位等待时间下`ts << 20`小于2^53，存入redis的double score不会丢精度。

pub const WAIT_TIME_BIT_LEN: u32 = 20;
pub const WAIT_TIME_MASK: u64 = (1 << WAIT_TIME_BIT_LEN) - 1;

#[inline]
pub fn pack(timestamp: u64, wait_time: u64) -> u64 {
    (timestamp << WAIT_TIME_BIT_LEN) | wait_time.min(WAIT_TIME_MASK)
}

/// 返回(timestamp, wait_time)
#[inline]
pub fn decode(score: u64) -> (u64, u64) {
    (score >> WAIT_TIME_BIT_LEN, score & WAIT_TIME_MASK)
}

/// `prev_score`为之前的入队时间戳，0表示首次入队；
/// `last_wait_time`非0时按当前时间重算已等待时长，修正客户端重试的时间偏差
pub fn encode(prev_score: u64, last_wait_time: u64, add_wait_time: u64, now: u64) -> u64 {
    let timestamp = if prev_score == 0 { now } else { prev_score };
    let last_wait_time = if last_wait_time != 0 {
        now.saturating_sub(timestamp)
    } else {
        0
    };
    pack(timestamp, last_wait_time.saturating_add(add_wait_time))
}
