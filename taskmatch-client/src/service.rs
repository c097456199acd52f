use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use taskmatch_rpc::{Handler, Request, RpcService, ServiceRegistry, Status};

use crate::config::MATCHING_SERVICE_NAME;
use crate::messages::{
    AddActivityTaskRequest,
    AddDecisionTaskRequest,
    PollForActivityTaskRequest,
    PollForActivityTaskResponse,
    PollForDecisionTaskRequest,
    PollForDecisionTaskResponse,
};

#[async_trait]
/// The task lists served by a single matching shard.
///
/// Polls are given the caller's deadline, a backend should answer with an
/// empty response rather than let the deadline pass.
pub trait MatchingBackend: Send + Sync + 'static {
    async fn add_activity_task(&self, request: AddActivityTaskRequest) -> Result<(), Status>;

    async fn add_decision_task(&self, request: AddDecisionTaskRequest) -> Result<(), Status>;

    async fn poll_for_activity_task(
        &self,
        request: PollForActivityTaskRequest,
        deadline: Option<Duration>,
    ) -> Result<PollForActivityTaskResponse, Status>;

    async fn poll_for_decision_task(
        &self,
        request: PollForDecisionTaskRequest,
        deadline: Option<Duration>,
    ) -> Result<PollForDecisionTaskResponse, Status>;
}

/// Exposes a [MatchingBackend] through the RPC server.
pub struct MatchingService {
    backend: Arc<dyn MatchingBackend>,
}

impl MatchingService {
    pub fn new(backend: impl MatchingBackend) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }
}

impl RpcService for MatchingService {
    fn service_name() -> &'static str {
        MATCHING_SERVICE_NAME
    }

    fn register_handlers(registry: &mut ServiceRegistry<Self>) {
        registry.add_handler::<AddActivityTaskRequest>();
        registry.add_handler::<AddDecisionTaskRequest>();
        registry.add_handler::<PollForActivityTaskRequest>();
        registry.add_handler::<PollForDecisionTaskRequest>();
    }
}

#[async_trait]
impl Handler<AddActivityTaskRequest> for MatchingService {
    type Reply = ();

    fn path() -> &'static str {
        "AddActivityTask"
    }

    async fn on_message(
        &self,
        msg: Request<AddActivityTaskRequest>,
    ) -> Result<Self::Reply, Status> {
        self.backend.add_activity_task(msg.into_inner()).await
    }
}

#[async_trait]
impl Handler<AddDecisionTaskRequest> for MatchingService {
    type Reply = ();

    fn path() -> &'static str {
        "AddDecisionTask"
    }

    async fn on_message(
        &self,
        msg: Request<AddDecisionTaskRequest>,
    ) -> Result<Self::Reply, Status> {
        self.backend.add_decision_task(msg.into_inner()).await
    }
}

#[async_trait]
impl Handler<PollForActivityTaskRequest> for MatchingService {
    type Reply = PollForActivityTaskResponse;

    fn path() -> &'static str {
        "PollForActivityTask"
    }

    async fn on_message(
        &self,
        msg: Request<PollForActivityTaskRequest>,
    ) -> Result<Self::Reply, Status> {
        let deadline = msg.deadline();
        self.backend
            .poll_for_activity_task(msg.into_inner(), deadline)
            .await
    }
}

#[async_trait]
impl Handler<PollForDecisionTaskRequest> for MatchingService {
    type Reply = PollForDecisionTaskResponse;

    fn path() -> &'static str {
        "PollForDecisionTask"
    }

    async fn on_message(
        &self,
        msg: Request<PollForDecisionTaskRequest>,
    ) -> Result<Self::Reply, Status> {
        let deadline = msg.deadline();
        self.backend
            .poll_for_decision_task(msg.into_inner(), deadline)
            .await
    }
}
