use std::time::Duration;

use taskmatch_rpc::{ClientConnectError, Status};
use thiserror::Error;

use crate::context::OperationKind;
use crate::resolver::HostAddress;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// The membership resolver could not produce a host for a routing key.
pub enum LookupError {
    #[error("No host currently owns routing key {key:?}")]
    /// No host owns the key, the topology may not be known yet.
    NoOwner { key: String },

    #[error("Membership resolver is unavailable: {0}")]
    /// The resolver itself could not be reached.
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("Invalid request: {0}")]
    /// The request was rejected locally and never reached the network.
    InvalidRequest(String),

    #[error(transparent)]
    /// The owning host could not be resolved.
    Lookup(#[from] LookupError),

    #[error("Failed to create client for host {host}: {source}")]
    /// A handle for the resolved host could not be constructed.
    Connection {
        host: HostAddress,
        #[source]
        source: ClientConnectError,
    },

    #[error("{operation} did not complete within {timeout:?}")]
    /// The remote call did not complete before its deadline.
    ///
    /// For polls this is the normal outcome of no task becoming available.
    DeadlineExceeded {
        operation: OperationKind,
        timeout: Duration,
    },

    #[error("Transport error: {0}")]
    /// The request or its reply could not be carried between the client
    /// and the host.
    Transport(Status),

    #[error("Remote error: {0}")]
    /// The backend shard returned an error.
    Remote(Status),
}

impl MatchingError {
    #[inline]
    /// Returns `true` if the call ran out of time rather than failing.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }
}
