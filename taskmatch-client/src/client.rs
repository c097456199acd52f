use std::sync::Arc;

use taskmatch_rpc::Channel;

use crate::cache::{ConnectionCache, HandleFactory};
use crate::config::{ClientConfig, TimeoutPolicy};
use crate::context::{CallContext, OperationKind};
use crate::error::{LookupError, MatchingError};
use crate::handle::{MatchingHandle, RpcHandleFactory};
use crate::messages::{
    AddActivityTaskRequest,
    AddDecisionTaskRequest,
    PollForActivityTaskRequest,
    PollForActivityTaskResponse,
    PollForDecisionTaskRequest,
    PollForDecisionTaskResponse,
    RoutedRequest,
};
use crate::resolver::{HostAddress, MembershipMonitor, ServiceResolver};
use crate::statistics::{ClientStatistics, ClientStatisticsInner};

/// Routes task list requests to the matching host which owns the task list.
///
/// Every call resolves the current owner of the task list, reuses (or creates)
/// the handle for that host and issues the call with a deadline chosen by the
/// kind of call. Errors are returned as they are produced, the client never
/// retries.
///
/// The client is cheap to clone, clones share the same connection cache.
pub struct MatchingClient<F = RpcHandleFactory>
where
    F: HandleFactory,
{
    resolver: Arc<dyn ServiceResolver>,
    cache: Arc<ConnectionCache<F>>,
    timeouts: TimeoutPolicy,
    statistics: ClientStatistics,
}

impl<F> Clone for MatchingClient<F>
where
    F: HandleFactory,
{
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            cache: self.cache.clone(),
            timeouts: self.timeouts,
            statistics: self.statistics.clone(),
        }
    }
}

impl MatchingClient<RpcHandleFactory> {
    /// Creates a client talking RPC over the shared channel, resolving hosts
    /// with the monitor's resolver for the configured service.
    pub fn from_monitor(
        channel: Channel,
        monitor: &dyn MembershipMonitor,
        config: ClientConfig,
    ) -> Result<Self, LookupError> {
        let resolver = monitor.get_resolver(&config.service_name)?;
        Ok(Self::new(resolver, RpcHandleFactory::new(channel), config))
    }
}

impl<F> MatchingClient<F>
where
    F: HandleFactory,
    F::Handle: MatchingHandle,
{
    /// Creates a new client from a resolver and the factory building handles.
    pub fn new(
        resolver: Arc<dyn ServiceResolver>,
        factory: F,
        config: ClientConfig,
    ) -> Self {
        let statistics = ClientStatistics::default();
        let cache = ConnectionCache::with_statistics(factory, statistics.clone());

        Self {
            resolver,
            cache: Arc::new(cache),
            timeouts: config.timeouts,
            statistics,
        }
    }

    #[inline]
    /// Gets the live client statistics.
    pub fn statistics(&self) -> ClientStatistics {
        self.statistics.clone()
    }

    #[inline]
    /// The timeouts applied to calls.
    pub fn timeouts(&self) -> TimeoutPolicy {
        self.timeouts
    }

    #[inline]
    /// Get access to the connection cache.
    pub fn connections(&self) -> &ConnectionCache<F> {
        &self.cache
    }

    /// Drops the cached handle for a host.
    ///
    /// The client never does this on its own, it is left to callers which
    /// observe the host leaving the topology.
    pub fn invalidate_host(&self, host: &HostAddress) -> bool {
        self.cache.invalidate(host)
    }

    /// Submits an activity task to the task list's owner.
    pub async fn add_activity_task(
        &self,
        request: AddActivityTaskRequest,
    ) -> Result<(), MatchingError> {
        let handle = self.get_handle_for_request(&request).await?;
        let ctx = self.create_context(OperationKind::AddActivityTask);
        let res = ctx.run(handle.add_activity_task(&ctx, &request)).await;
        self.observe(&ctx, res)
    }

    /// Submits a decision task to the task list's owner.
    pub async fn add_decision_task(
        &self,
        request: AddDecisionTaskRequest,
    ) -> Result<(), MatchingError> {
        let handle = self.get_handle_for_request(&request).await?;
        let ctx = self.create_context(OperationKind::AddDecisionTask);
        let res = ctx.run(handle.add_decision_task(&ctx, &request)).await;
        self.observe(&ctx, res)
    }

    /// Long polls the task list's owner for an activity task.
    ///
    /// An empty response means no task arrived, running out of time is
    /// reported as [MatchingError::DeadlineExceeded].
    pub async fn poll_for_activity_task(
        &self,
        request: PollForActivityTaskRequest,
    ) -> Result<PollForActivityTaskResponse, MatchingError> {
        let handle = self.get_handle_for_request(&request).await?;
        let ctx = self.create_context(OperationKind::PollForActivityTask);
        let res = ctx.run(handle.poll_for_activity_task(&ctx, &request)).await;
        self.observe(&ctx, res)
    }

    /// Long polls the task list's owner for a decision task.
    ///
    /// An empty response means no task arrived, running out of time is
    /// reported as [MatchingError::DeadlineExceeded].
    pub async fn poll_for_decision_task(
        &self,
        request: PollForDecisionTaskRequest,
    ) -> Result<PollForDecisionTaskResponse, MatchingError> {
        let handle = self.get_handle_for_request(&request).await?;
        let ctx = self.create_context(OperationKind::PollForDecisionTask);
        let res = ctx.run(handle.poll_for_decision_task(&ctx, &request)).await;
        self.observe(&ctx, res)
    }

    /// Resolves the request's owner and gets the handle for it.
    async fn get_handle_for_request(
        &self,
        request: &impl RoutedRequest,
    ) -> Result<Arc<F::Handle>, MatchingError> {
        ClientStatisticsInner::incr(&self.statistics.num_requests);

        let key = request.routing_key();
        if key.is_empty() {
            return Err(MatchingError::InvalidRequest(
                "Task list name must not be empty.".to_string(),
            ));
        }

        let host = match self.resolver.lookup(key).await {
            Ok(host) => host,
            Err(e) => {
                ClientStatisticsInner::incr(&self.statistics.num_lookup_failures);
                debug!(task_list = %key, error = %e, "Failed to resolve task list owner.");
                return Err(e.into());
            },
        };

        trace!(task_list = %key, host = %host, "Resolved task list owner.");

        self.cache
            .get_or_create(&host)
            .map_err(|source| MatchingError::Connection { host, source })
    }

    fn create_context(&self, operation: OperationKind) -> CallContext {
        CallContext::new(operation, self.timeouts.timeout_for(operation))
    }

    fn observe<T>(
        &self,
        ctx: &CallContext,
        res: Result<T, MatchingError>,
    ) -> Result<T, MatchingError> {
        if let Err(MatchingError::DeadlineExceeded { .. }) = &res {
            ClientStatisticsInner::incr(&self.statistics.num_deadlines_exceeded);
            debug!(
                operation = %ctx.operation(),
                timeout = ?ctx.timeout(),
                "Call did not complete before its deadline."
            );
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use taskmatch_rpc::{ClientConnectError, Status};
    use tokio::time::Instant;

    use super::*;
    use crate::context::CancelSignal;
    use crate::messages::TaskList;
    use crate::resolver::StaticResolver;

    struct RecordedCall {
        host: HostAddress,
        operation: OperationKind,
        timeout: Duration,
        deadline: Instant,
        signal: CancelSignal,
        cancelled_on_completion: bool,
    }

    #[derive(Default)]
    struct MockState {
        created: AtomicUsize,
        fail_next_connect: AtomicBool,
        hang: AtomicBool,
        reply_error: Mutex<Option<Status>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    #[derive(Clone, Default)]
    struct MockFactory {
        state: Arc<MockState>,
    }

    impl HandleFactory for MockFactory {
        type Handle = MockHandle;

        fn new_handle(&self, host: &HostAddress) -> Result<Self::Handle, ClientConnectError> {
            if self.state.fail_next_connect.swap(false, Ordering::SeqCst) {
                return Err(ClientConnectError::Refused(host.to_string()));
            }

            self.state.created.fetch_add(1, Ordering::SeqCst);
            Ok(MockHandle {
                host: host.clone(),
                state: self.state.clone(),
            })
        }
    }

    struct MockHandle {
        host: HostAddress,
        state: Arc<MockState>,
    }

    impl MockHandle {
        async fn call(&self, ctx: &CallContext, delay: Duration) -> Result<(), Status> {
            if self.state.hang.load(Ordering::SeqCst) {
                self.record(ctx, false);
                std::future::pending::<()>().await;
            }

            tokio::time::sleep(delay).await;
            self.record(ctx, ctx.is_cancelled());

            let err = self.state.reply_error.lock().clone();
            match err {
                Some(status) => Err(status),
                None => Ok(()),
            }
        }

        fn record(&self, ctx: &CallContext, cancelled_on_completion: bool) {
            self.state.calls.lock().push(RecordedCall {
                host: self.host.clone(),
                operation: ctx.operation(),
                timeout: ctx.timeout(),
                deadline: ctx.deadline(),
                signal: ctx.signal(),
                cancelled_on_completion,
            });
        }

        fn task_token(&self) -> Vec<u8> {
            self.host.as_str().as_bytes().to_vec()
        }
    }

    #[async_trait]
    impl MatchingHandle for MockHandle {
        async fn add_activity_task(
            &self,
            ctx: &CallContext,
            request: &AddActivityTaskRequest,
        ) -> Result<(), Status> {
            let delay = Duration::from_secs(request.schedule_id as u64);
            self.call(ctx, delay).await
        }

        async fn add_decision_task(
            &self,
            ctx: &CallContext,
            _request: &AddDecisionTaskRequest,
        ) -> Result<(), Status> {
            self.call(ctx, Duration::from_millis(50)).await
        }

        async fn poll_for_activity_task(
            &self,
            ctx: &CallContext,
            _request: &PollForActivityTaskRequest,
        ) -> Result<PollForActivityTaskResponse, Status> {
            self.call(ctx, Duration::from_millis(50)).await?;
            Ok(PollForActivityTaskResponse {
                task_token: self.task_token(),
                ..Default::default()
            })
        }

        async fn poll_for_decision_task(
            &self,
            ctx: &CallContext,
            _request: &PollForDecisionTaskRequest,
        ) -> Result<PollForDecisionTaskResponse, Status> {
            self.call(ctx, Duration::from_millis(50)).await?;
            Ok(PollForDecisionTaskResponse {
                task_token: self.task_token(),
                ..Default::default()
            })
        }
    }

    fn setup() -> (MatchingClient<MockFactory>, Arc<StaticResolver>, Arc<MockState>) {
        let resolver = Arc::new(StaticResolver::new([
            ("orders-tasklist", "10.0.0.5:7941"),
            ("billing-tasklist", "10.0.0.6:7941"),
        ]));
        let factory = MockFactory::default();
        let state = factory.state.clone();
        let client = MatchingClient::new(resolver.clone(), factory, ClientConfig::default());
        (client, resolver, state)
    }

    fn add_activity(task_list: &str) -> AddActivityTaskRequest {
        AddActivityTaskRequest {
            task_list: TaskList::new(task_list),
            ..Default::default()
        }
    }

    fn poll_activity(task_list: &str) -> PollForActivityTaskRequest {
        PollForActivityTaskRequest {
            task_list: TaskList::new(task_list),
            identity: "worker-1".to_string(),
            ..Default::default()
        }
    }

    fn host(addr: &str) -> HostAddress {
        HostAddress::new(addr).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_uses_short_timeout() {
        let (client, _, state) = setup();
        let start = Instant::now();

        client
            .add_activity_task(add_activity("orders-tasklist"))
            .await
            .expect("Submit should succeed");

        let calls = state.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].host, host("10.0.0.5:7941"));
        assert_eq!(calls[0].operation, OperationKind::AddActivityTask);
        assert_eq!(calls[0].timeout, Duration::from_secs(10));
        assert_eq!(calls[0].deadline.duration_since(start), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_uses_long_timeout() {
        let (client, _, state) = setup();
        let start = Instant::now();

        let req = PollForDecisionTaskRequest {
            task_list: TaskList::new("billing-tasklist"),
            ..Default::default()
        };
        let resp = client
            .poll_for_decision_task(req)
            .await
            .expect("Poll should succeed");
        assert_eq!(resp.task_token, b"10.0.0.6:7941");

        let calls = state.calls.lock();
        assert_eq!(calls[0].operation, OperationKind::PollForDecisionTask);
        assert_eq!(calls[0].timeout, Duration::from_secs(180));
        assert_eq!(calls[0].deadline.duration_since(start), Duration::from_secs(180));
    }

    #[tokio::test]
    async fn test_lookup_failure_passes_through() {
        let (client, _, state) = setup();

        let err = client
            .add_decision_task(AddDecisionTaskRequest {
                task_list: TaskList::new("tl-unknown"),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            MatchingError::Lookup(LookupError::NoOwner { ref key }) if key == "tl-unknown"
        ));
        assert!(client.connections().is_empty());
        assert_eq!(state.created.load(Ordering::SeqCst), 0);
        assert!(state.calls.lock().is_empty());
        assert_eq!(client.statistics().num_lookup_failures(), 1);
    }

    #[tokio::test]
    async fn test_empty_task_list_is_rejected() {
        let (client, _, state) = setup();

        let err = client
            .poll_for_activity_task(poll_activity(""))
            .await
            .unwrap_err();

        assert!(matches!(err, MatchingError::InvalidRequest(_)));
        assert_eq!(state.created.load(Ordering::SeqCst), 0);
        assert_eq!(client.statistics().num_requests(), 1);
        assert_eq!(client.statistics().num_lookup_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_deadline_exceeded() {
        let (client, _, state) = setup();
        state.hang.store(true, Ordering::SeqCst);
        let start = Instant::now();

        let err = client
            .poll_for_activity_task(poll_activity("orders-tasklist"))
            .await
            .unwrap_err();

        assert!(err.is_deadline_exceeded());
        assert!(matches!(
            err,
            MatchingError::DeadlineExceeded {
                operation: OperationKind::PollForActivityTask,
                ..
            }
        ));
        assert!(start.elapsed() >= Duration::from_secs(180));
        assert!(start.elapsed() < Duration::from_secs(181));

        let calls = state.calls.lock();
        assert!(
            calls[0].signal.is_cancelled(),
            "The call's context should be released once it expires"
        );
        assert_eq!(client.statistics().num_deadlines_exceeded(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submits_share_handle() {
        let (client, _, state) = setup();

        let mut quick = add_activity("orders-tasklist");
        quick.schedule_id = 1;
        let mut slow = add_activity("orders-tasklist");
        slow.schedule_id = 5;

        let (a, b) = tokio::join!(
            client.add_activity_task(quick),
            client.add_activity_task(slow),
        );
        a.expect("First submit should succeed");
        b.expect("Second submit should succeed");

        assert_eq!(state.created.load(Ordering::SeqCst), 1);
        assert_eq!(client.connections().len(), 1);

        let calls = state.calls.lock();
        assert_eq!(calls.len(), 2);
        for call in calls.iter() {
            assert_eq!(call.timeout, Duration::from_secs(10));
            assert!(
                !call.cancelled_on_completion,
                "Finishing one call must not cancel the other"
            );
            assert!(call.signal.is_cancelled());
        }
    }

    #[tokio::test]
    async fn test_remote_error_passes_through() {
        let (client, _, state) = setup();
        *state.reply_error.lock() = Some(Status::ownership_lost("orders-tasklist"));

        let err = client
            .add_activity_task(add_activity("orders-tasklist"))
            .await
            .unwrap_err();

        match err {
            MatchingError::Remote(status) => {
                assert_eq!(status, Status::ownership_lost("orders-tasklist"))
            },
            other => panic!("Unexpected error {other:?}"),
        }
        assert_eq!(client.connections().len(), 1, "Remote errors keep the handle");
    }

    #[tokio::test]
    async fn test_connection_error_is_not_cached() {
        let (client, _, state) = setup();
        state.fail_next_connect.store(true, Ordering::SeqCst);

        let err = client
            .add_activity_task(add_activity("orders-tasklist"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MatchingError::Connection { ref host, .. } if host.as_str() == "10.0.0.5:7941"
        ));
        assert!(client.connections().is_empty());

        client
            .add_activity_task(add_activity("orders-tasklist"))
            .await
            .expect("Submit should succeed once the handle can be created");
        assert_eq!(state.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_topology_change_routes_to_new_owner() {
        let (client, resolver, state) = setup();

        let resp = client
            .poll_for_activity_task(poll_activity("orders-tasklist"))
            .await
            .unwrap();
        assert_eq!(resp.task_token, b"10.0.0.5:7941");

        resolver.set_owner("orders-tasklist", host("10.0.0.7:7941"));

        let resp = client
            .poll_for_activity_task(poll_activity("orders-tasklist"))
            .await
            .unwrap();
        assert_eq!(resp.task_token, b"10.0.0.7:7941");

        assert_eq!(state.created.load(Ordering::SeqCst), 2);
        assert_eq!(client.connections().len(), 2, "Old handles stay cached");
    }

    #[tokio::test]
    async fn test_invalidate_host() {
        let (client, _, state) = setup();

        client
            .add_activity_task(add_activity("orders-tasklist"))
            .await
            .unwrap();
        assert!(client.invalidate_host(&host("10.0.0.5:7941")));
        assert!(client.connections().is_empty());

        client
            .add_activity_task(add_activity("orders-tasklist"))
            .await
            .unwrap();
        assert_eq!(state.created.load(Ordering::SeqCst), 2);
        assert_eq!(client.statistics().num_handles_created(), 2);
    }
}
