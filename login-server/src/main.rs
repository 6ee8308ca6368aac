use login_server::discovery::{Discovery, FileDiscovery, StaticDiscovery};
use login_server::store::RedisStore;
use login_server::util::{Config, SystemClock};
use login_server::{Collaborators, Dispatcher};

use common::proto::login_service::login_service_server::LoginServiceServer;

use anyhow::Result;
use tonic::transport::Server;
use tracing::*;

use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let config = Config::from_env();
    let addr = format!("0.0.0.0:{}", config.listen_port).parse()?;
    info!(process_id = config.process_id, "starting at {addr}");

    let store = Arc::new(RedisStore::connect(&config.redis_url).await?);
    let discovery: Arc<dyn Discovery> = if config.discovery_file.is_empty() {
        warn!("no discovery file configured, routing table stays empty");
        Arc::new(StaticDiscovery::default())
    } else {
        Arc::new(FileDiscovery::new(&config.discovery_file))
    };
    let discovery_interval = Duration::from_millis(config.discovery_interval);

    let dispatcher = Dispatcher::new(
        config,
        Collaborators::new(store, discovery, Arc::new(SystemClock)),
    );
    // 首次同步完成后再接请求，避免启动瞬间全部返回ZoneError
    dispatcher.discovery_sync.sync_once().await;
    tokio::spawn(dispatcher.discovery_sync.clone().run(discovery_interval));
    tokio::spawn(dispatcher.clone().maintenance_monitor());

    Server::builder()
        .add_service(LoginServiceServer::new(dispatcher))
        .serve_with_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(?e, "listen ctrl_c failed");
            }
        })
        .await?;

    info!("exit");
    Ok(())
}
