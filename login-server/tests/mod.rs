mod admission;
mod routing;

use login_server::discovery::{ServiceInstance, StaticDiscovery};
use login_server::store::MemoryStore;
use login_server::util::{Config, ManualClock};
use login_server::{Collaborators, Dispatcher};

use common::proto::login_service::{
    login_service_server::LoginService, LoginReply, LoginRequest, ResultCode,
};

use tonic::IntoRequest;

use std::sync::Arc;

// 60的整数倍，方便按时间片推进
pub const START: u64 = 1_699_999_980;

pub fn init_log() {
    use once_cell::sync::OnceCell;

    static CELL: OnceCell<()> = OnceCell::new();
    CELL.get_or_init(|| tracing_subscriber::fmt::init());
}

pub struct Fixture {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
    pub discovery: Arc<StaticDiscovery>,
    pub dispatcher: Dispatcher,
}

impl Fixture {
    pub fn new(config: Config) -> Self {
        init_log();
        let clock = Arc::new(ManualClock::new(START));
        let store = Arc::new(MemoryStore::new(clock.clone()));
        let discovery = Arc::new(StaticDiscovery::default());
        let dispatcher = Dispatcher::new(
            config,
            Collaborators::new(store.clone(), discovery.clone(), clock.clone()),
        );
        Self {
            clock,
            store,
            discovery,
            dispatcher,
        }
    }

    /// zone 1：两个gateway，一个world
    pub async fn with_zone(config: Config) -> Self {
        let fixture = Self::new(config);
        fixture.discovery.set(
            common::GATEWAY_SERVICE,
            vec![
                gateway("g1", 1, 500, "1.1.1.1:7001"),
                gateway("g2", 1, 50, "1.1.1.2:7002"),
            ],
        );
        fixture.discovery.set(
            common::WORLD_SERVICE,
            vec![world("w1", 1, 0, 10, 1000, 0)],
        );
        fixture.dispatcher.discovery_sync.sync_once().await;
        fixture
    }

    pub async fn login(&self, request: LoginRequest) -> LoginReply {
        self.dispatcher
            .login(request.into_request())
            .await
            .unwrap()
            .into_inner()
    }
}

pub fn request(account: &str) -> LoginRequest {
    LoginRequest {
        account: account.to_string(),
        password: "pwd".to_string(),
        sign: "sign".to_string(),
        channel: "web".to_string(),
        ..Default::default()
    }
}

pub fn code_of(reply: &LoginReply) -> Option<ResultCode> {
    ResultCode::from_i32(reply.code)
}

pub fn gateway(id: &str, zone_id: u32, weight: u32, svr_addr: &str) -> ServiceInstance {
    ServiceInstance {
        id: id.to_string(),
        address: "10.0.0.1".to_string(),
        port: 9000,
        tags: vec![format!(r#"{{"zid":{zone_id},"svrAddr":"{svr_addr}"}}"#)],
        weight,
    }
}

pub fn world(
    id: &str,
    zone_id: u32,
    shard_index: u32,
    player_num: u32,
    max_player_num: u32,
    start_tm: u64,
) -> ServiceInstance {
    ServiceInstance {
        id: id.to_string(),
        address: "10.0.0.2".to_string(),
        port: 8000,
        tags: vec![format!(
            r#"{{"zid":{zone_id},"PIdx":{shard_index},"playerNum":{player_num},"maxPlayerNum":{max_player_num},"startTM":{start_tm}}}"#
        )],
        weight: 0,
    }
}
