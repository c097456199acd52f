//! A client routing task list requests to the matching shard owning the task list.
//!
//! Each request is resolved to its current owner through a [ServiceResolver],
//! the handle for that host is created once and reused by later calls, and
//! the call is bounded by a deadline picked from the kind of call.
//!
//! ```ignore
//! use taskmatch_client::{ClientConfig, MatchingClient, StaticMonitor, StaticResolver};
//! use taskmatch_rpc::Channel;
//!
//! let resolver = StaticResolver::new([("orders-tasklist", "10.0.0.5:7941")]);
//! let monitor = StaticMonitor::default()
//!     .with_resolver("cadence-matching", std::sync::Arc::new(resolver));
//!
//! let config = ClientConfig::default();
//! let client = MatchingClient::from_monitor(Channel::default(), &monitor, config)?;
//! let resp = client.poll_for_activity_task(request).await?;
//! ```

#[macro_use]
extern crate tracing;

mod cache;
mod client;
mod config;
mod context;
mod error;
mod handle;
pub mod messages;
mod resolver;
mod service;
mod statistics;

pub use cache::{ConnectionCache, HandleFactory};
pub use client::MatchingClient;
pub use config::{
    ClientConfig,
    TimeoutPolicy,
    DEFAULT_LONG_POLL_TIMEOUT,
    DEFAULT_SHORT_TIMEOUT,
    MATCHING_SERVICE_NAME,
};
pub use context::{CallContext, CancelSignal, OperationKind};
pub use error::{LookupError, MatchingError};
pub use handle::{MatchingHandle, RpcHandleFactory, RpcMatchingHandle};
pub use messages::{
    AddActivityTaskRequest,
    AddDecisionTaskRequest,
    PollForActivityTaskRequest,
    PollForActivityTaskResponse,
    PollForDecisionTaskRequest,
    PollForDecisionTaskResponse,
    RoutedRequest,
    TaskList,
    TaskListKind,
    WorkflowExecution,
};
pub use resolver::{
    HostAddress,
    MembershipMonitor,
    ServiceResolver,
    StaticMonitor,
    StaticResolver,
};
pub use service::{MatchingBackend, MatchingService};
pub use statistics::{ClientStatistics, ClientStatisticsInner};
