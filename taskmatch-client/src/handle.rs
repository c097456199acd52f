use async_trait::async_trait;
use taskmatch_rpc::{Channel, ClientConnectError, RpcClient, Status};

use crate::cache::HandleFactory;
use crate::context::CallContext;
use crate::messages::{
    AddActivityTaskRequest,
    AddDecisionTaskRequest,
    PollForActivityTaskRequest,
    PollForActivityTaskResponse,
    PollForDecisionTaskRequest,
    PollForDecisionTaskResponse,
};
use crate::resolver::HostAddress;
use crate::service::MatchingService;

#[async_trait]
/// The remote operations of a single matching host.
///
/// Every call is given the routed call's context, implementations should
/// stop waiting once the context is cancelled or its deadline passes.
pub trait MatchingHandle: Send + Sync + 'static {
    async fn add_activity_task(
        &self,
        ctx: &CallContext,
        request: &AddActivityTaskRequest,
    ) -> Result<(), Status>;

    async fn add_decision_task(
        &self,
        ctx: &CallContext,
        request: &AddDecisionTaskRequest,
    ) -> Result<(), Status>;

    async fn poll_for_activity_task(
        &self,
        ctx: &CallContext,
        request: &PollForActivityTaskRequest,
    ) -> Result<PollForActivityTaskResponse, Status>;

    async fn poll_for_decision_task(
        &self,
        ctx: &CallContext,
        request: &PollForDecisionTaskRequest,
    ) -> Result<PollForDecisionTaskResponse, Status>;
}

#[derive(Clone)]
/// A [MatchingHandle] talking to a matching host over RPC.
pub struct RpcMatchingHandle {
    inner: RpcClient<MatchingService>,
}

impl RpcMatchingHandle {
    /// Binds a handle to the host using the shared channel.
    pub fn new(channel: Channel, host: &HostAddress) -> Result<Self, ClientConnectError> {
        Ok(Self {
            inner: RpcClient::new(channel, host.as_str())?,
        })
    }

    #[inline]
    pub fn host(&self) -> &str {
        self.inner.host()
    }
}

#[async_trait]
impl MatchingHandle for RpcMatchingHandle {
    async fn add_activity_task(
        &self,
        ctx: &CallContext,
        request: &AddActivityTaskRequest,
    ) -> Result<(), Status> {
        self.inner.send(request, Some(ctx.remaining())).await
    }

    async fn add_decision_task(
        &self,
        ctx: &CallContext,
        request: &AddDecisionTaskRequest,
    ) -> Result<(), Status> {
        self.inner.send(request, Some(ctx.remaining())).await
    }

    async fn poll_for_activity_task(
        &self,
        ctx: &CallContext,
        request: &PollForActivityTaskRequest,
    ) -> Result<PollForActivityTaskResponse, Status> {
        self.inner.send(request, Some(ctx.remaining())).await
    }

    async fn poll_for_decision_task(
        &self,
        ctx: &CallContext,
        request: &PollForDecisionTaskRequest,
    ) -> Result<PollForDecisionTaskResponse, Status> {
        self.inner.send(request, Some(ctx.remaining())).await
    }
}

#[derive(Clone, Default)]
/// Builds [RpcMatchingHandle]s which share a single [Channel].
pub struct RpcHandleFactory {
    channel: Channel,
}

impl RpcHandleFactory {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

impl HandleFactory for RpcHandleFactory {
    type Handle = RpcMatchingHandle;

    fn new_handle(&self, host: &HostAddress) -> Result<Self::Handle, ClientConnectError> {
        RpcMatchingHandle::new(self.channel.clone(), host)
    }
}
