use crate::dispatcher::Dispatcher;

use common::proto::login_service::login_service_server::LoginService;
use common::proto::login_service::*;
use common::{MapErrUnknown, RPCResult};

use tonic::{async_trait, Request, Response};
use tracing::*;

#[async_trait]
impl LoginService for Dispatcher {
    /// 业务结果都放在`code`里，gRPC层只在内部panic时失败
    #[instrument(skip_all, fields(account = %request.get_ref().account))]
    async fn login(&self, request: Request<LoginRequest>) -> RPCResult<LoginReply> {
        debug!("IN");
        let request = request.into_inner();
        let dispatcher = self.clone();
        // 客户端断开时请求future会被丢弃，放到独立任务中保证排队和窗口计数的一致
        let reply = tokio::spawn(async move { dispatcher.handle_login(request).await })
            .await
            .map_err_unknown()?;
        debug!(code = reply.code, busy_level = reply.busy_level, "OUT");
        Ok(Response::new(reply))
    }

    #[instrument(skip_all)]
    async fn zone_list(&self, _request: Request<ZoneListRequest>) -> RPCResult<ZoneListReply> {
        Ok(Response::new(ZoneListReply {
            zone_list: self.zone_infos(self.clock.now()),
        }))
    }
}
