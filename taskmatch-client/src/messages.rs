//! Requests and replies exchanged with the matching service.
//!
//! Every request carries the [TaskList] it targets, the name of the task list
//! is what requests are routed by.

use rkyv::{Archive, Deserialize, Serialize};

#[derive(Serialize, Deserialize, Archive, Debug, Clone, Copy, PartialEq, Eq)]
#[archive(check_bytes)]
#[archive_attr(derive(Debug))]
pub enum TaskListKind {
    Normal,
    /// A task list bound to a single worker which holds the workflow's cached state.
    Sticky,
}

impl Default for TaskListKind {
    fn default() -> Self {
        Self::Normal
    }
}

#[derive(Serialize, Deserialize, Archive, Debug, Clone, PartialEq, Eq, Default)]
#[archive(check_bytes)]
#[archive_attr(derive(Debug))]
/// A named queue of activity or decision tasks within a domain.
pub struct TaskList {
    pub name: String,
    pub kind: TaskListKind,
}

impl TaskList {
    /// Creates a new normal task list.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TaskListKind::Normal,
        }
    }

    /// Creates a new sticky task list.
    pub fn sticky(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TaskListKind::Sticky,
        }
    }
}

#[derive(Serialize, Deserialize, Archive, Debug, Clone, PartialEq, Eq, Default)]
#[archive(check_bytes)]
#[archive_attr(derive(Debug))]
pub struct WorkflowExecution {
    pub workflow_id: String,
    pub run_id: String,
}

#[derive(Serialize, Deserialize, Archive, Debug, Clone, PartialEq, Eq, Default)]
#[archive(check_bytes)]
#[archive_attr(derive(Debug))]
/// Submits an activity task to the task list.
pub struct AddActivityTaskRequest {
    pub domain_uuid: String,
    /// The domain of the workflow which scheduled the activity.
    pub source_domain_uuid: String,
    pub execution: WorkflowExecution,
    pub task_list: TaskList,
    pub schedule_id: i64,
    pub schedule_to_start_timeout_seconds: i32,
}

#[derive(Serialize, Deserialize, Archive, Debug, Clone, PartialEq, Eq, Default)]
#[archive(check_bytes)]
#[archive_attr(derive(Debug))]
/// Submits a decision task to the task list.
pub struct AddDecisionTaskRequest {
    pub domain_uuid: String,
    pub execution: WorkflowExecution,
    pub task_list: TaskList,
    pub schedule_id: i64,
    pub schedule_to_start_timeout_seconds: i32,
}

#[derive(Serialize, Deserialize, Archive, Debug, Clone, PartialEq, Eq, Default)]
#[archive(check_bytes)]
#[archive_attr(derive(Debug))]
pub struct PollForActivityTaskRequest {
    pub domain_uuid: String,
    pub task_list: TaskList,
    /// The identity of the worker polling.
    pub identity: String,
}

#[derive(Serialize, Deserialize, Archive, Debug, Clone, PartialEq, Eq, Default)]
#[archive(check_bytes)]
#[archive_attr(derive(Debug))]
pub struct PollForDecisionTaskRequest {
    pub domain_uuid: String,
    pub task_list: TaskList,
    pub identity: String,
}

#[derive(Serialize, Deserialize, Archive, Debug, Clone, PartialEq, Eq, Default)]
#[archive(check_bytes)]
#[archive_attr(derive(Debug))]
/// An activity task handed to a poller.
///
/// A response with an empty task token means no task became available
/// before the poll ended.
pub struct PollForActivityTaskResponse {
    pub task_token: Vec<u8>,
    pub workflow_execution: Option<WorkflowExecution>,
    pub activity_id: String,
    pub activity_type: String,
    pub input: Vec<u8>,
    pub scheduled_timestamp: i64,
    pub attempt: i32,
}

impl PollForActivityTaskResponse {
    #[inline]
    /// Returns `true` if the poll did not receive a task.
    pub fn is_empty(&self) -> bool {
        self.task_token.is_empty()
    }
}

#[derive(Serialize, Deserialize, Archive, Debug, Clone, PartialEq, Eq, Default)]
#[archive(check_bytes)]
#[archive_attr(derive(Debug))]
/// A decision task handed to a poller.
///
/// A response with an empty task token means no task became available
/// before the poll ended.
pub struct PollForDecisionTaskResponse {
    pub task_token: Vec<u8>,
    pub workflow_execution: Option<WorkflowExecution>,
    pub workflow_type: String,
    pub previous_started_event_id: i64,
    pub started_event_id: i64,
    pub attempt: i64,
    pub backlog_count_hint: i64,
}

impl PollForDecisionTaskResponse {
    #[inline]
    /// Returns `true` if the poll did not receive a task.
    pub fn is_empty(&self) -> bool {
        self.task_token.is_empty()
    }
}

/// A request which is routed to the shard owning its task list.
pub trait RoutedRequest {
    /// The task list targeted by the request.
    fn task_list(&self) -> &TaskList;

    #[inline]
    /// The key the owning host is resolved by.
    fn routing_key(&self) -> &str {
        &self.task_list().name
    }
}

macro_rules! impl_routed_request {
    ($($req:ty),* $(,)?) => {
        $(
            impl RoutedRequest for $req {
                fn task_list(&self) -> &TaskList {
                    &self.task_list
                }
            }
        )*
    };
}

impl_routed_request!(
    AddActivityTaskRequest,
    AddDecisionTaskRequest,
    PollForActivityTaskRequest,
    PollForDecisionTaskRequest,
);
