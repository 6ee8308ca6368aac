use econf::LoadEnv;
use tracing::warn;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const HOUR_SECONDS: u64 = 3600;
pub const CONFIG_ENV_PREFIX: &str = "LOGIN";

/// 所有参数都可通过环境变量覆盖，如`LOGIN_LOGIN_WINDOW_SIZE=200`
#[derive(Clone, Debug, LoadEnv)]
pub struct Config {
    // 进程
    pub process_id: u32, // 1号进程负责清理过期排队和上报
    pub listen_port: u16,
    pub redis_url: String,
    pub discovery_file: String, // 为空时使用静态服务发现

    // 排队与窗口
    pub login_window_size: i64,
    pub login_time_slice: u64, // 窗口时间片(秒)
    pub login_timestamp_mcu: u64,
    pub max_login_queue_length: u64,
    pub retry_ratio: f64,
    pub max_retry_wait_time: u64,
    pub wait_time_limit: u64, // 超过预期重试时间多久视为放弃排队

    // gateway权重分档，左闭右开
    pub gateway_level0: u32,
    pub gateway_level1: u32,
    pub gateway_level2: u32,
    pub gateway_level3: u32,

    // world负载
    pub empty_ratio: f64,
    pub busy_ratio: f64,
    pub players_server_cnt: u32, // 每个zone前N个world做预热
    pub player_num_hour: u64,    // 预热时长(小时)
    pub world_max_coefficient: f64,
    pub players_delta_cnt: u32,
    pub recommend_world_max_cnt: u32,

    // 后台任务(毫秒)
    pub discovery_interval: u64,
    pub maintenance_interval: u64,

    // 跨zone踢人
    pub kick_out_retry: u32,
    pub kick_out_interval: u64, // 毫秒

    // 维护期白名单，逗号分隔
    pub white_list_only: bool,
    pub white_list: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            process_id: 1,
            listen_port: common::DEFAULT_LOGIN_PORT,
            redis_url: "redis://127.0.0.1:6379/".to_string(),
            discovery_file: String::new(),

            login_window_size: 100,
            login_time_slice: 5,
            login_timestamp_mcu: 60,
            max_login_queue_length: 100_000,
            retry_ratio: 5.0,
            max_retry_wait_time: 60,
            wait_time_limit: 30,

            gateway_level0: 100,
            gateway_level1: 300,
            gateway_level2: 700,
            gateway_level3: 1000,

            empty_ratio: 0.3,
            busy_ratio: 0.9,
            players_server_cnt: 2,
            player_num_hour: 2,
            world_max_coefficient: 0.7,
            players_delta_cnt: 50,
            recommend_world_max_cnt: 1,

            discovery_interval: 3000,
            maintenance_interval: 5000,

            kick_out_retry: 5,
            kick_out_interval: 2000,

            white_list_only: false,
            white_list: String::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        econf::load(Self::default(), CONFIG_ENV_PREFIX).normalize()
    }

    /// 修正非法配置，保证后续计算不会除零
    pub fn normalize(mut self) -> Self {
        if self.login_window_size < 1 {
            warn!(
                login_window_size = self.login_window_size,
                "login_window_size must be positive"
            );
            self.login_window_size = 1;
        }
        if self.login_timestamp_mcu == 0 {
            warn!("login_timestamp_mcu must be positive");
            self.login_timestamp_mcu = 1;
        }
        if self.login_time_slice == 0 || self.login_time_slice > self.login_timestamp_mcu {
            warn!(
                login_time_slice = self.login_time_slice,
                login_timestamp_mcu = self.login_timestamp_mcu,
                "login_time_slice clamped"
            );
            self.login_time_slice = self.login_time_slice.clamp(1, self.login_timestamp_mcu);
        }
        if self.busy_ratio < self.empty_ratio {
            warn!(
                empty_ratio = self.empty_ratio,
                busy_ratio = self.busy_ratio,
                "busy_ratio below empty_ratio"
            );
            self.busy_ratio = self.empty_ratio;
        }
        if self.discovery_interval == 0 || self.maintenance_interval == 0 {
            warn!("background intervals must be positive");
            self.discovery_interval = self.discovery_interval.max(1);
            self.maintenance_interval = self.maintenance_interval.max(1);
        }
        let mut levels = [
            self.gateway_level0,
            self.gateway_level1,
            self.gateway_level2,
            self.gateway_level3,
        ];
        if levels.windows(2).any(|w| w[0] > w[1]) {
            warn!(?levels, "gateway levels not ascending");
            levels.sort_unstable();
            self.gateway_level0 = levels[0];
            self.gateway_level1 = levels[1];
            self.gateway_level2 = levels[2];
            self.gateway_level3 = levels[3];
        }
        self
    }

    /// 一个统计周期包含的窗口数，至少为1
    #[inline]
    pub fn wait_level_ratio(&self) -> u64 {
        (self.login_timestamp_mcu / self.login_time_slice.max(1)).max(1)
    }

    #[inline]
    pub fn slice_id(&self, now: u64) -> u64 {
        now / self.login_time_slice.max(1)
    }

    #[inline]
    pub fn gateway_levels(&self) -> [u32; 4] {
        [
            self.gateway_level0,
            self.gateway_level1,
            self.gateway_level2,
            self.gateway_level3,
        ]
    }

    #[inline]
    pub fn warmup_seconds(&self) -> u64 {
        self.player_num_hour * HOUR_SECONDS
    }

    pub fn in_white_list(&self, account: &str) -> bool {
        self.white_list
            .split(',')
            .map(str::trim)
            .any(|name| !name.is_empty() && name == account)
    }
}

/// 秒级时钟，测试中用`ManualClock`控制时间
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
    }
}

#[derive(Default)]
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self(AtomicU64::new(now))
    }

    pub fn set(&self, now: u64) {
        self.0.store(now, Ordering::Relaxed);
    }

    pub fn advance(&self, secs: u64) {
        self.0.fetch_add(secs, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
