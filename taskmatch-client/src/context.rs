use std::fmt::{Display, Formatter};
use std::future::Future;
use std::time::Duration;

use taskmatch_rpc::{ErrorCode, Status};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::MatchingError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// The four calls the matching client routes.
pub enum OperationKind {
    AddActivityTask,
    AddDecisionTask,
    PollForActivityTask,
    PollForDecisionTask,
}

impl OperationKind {
    #[inline]
    /// Returns `true` for the blocking poll operations.
    pub fn is_long_poll(self) -> bool {
        matches!(self, Self::PollForActivityTask | Self::PollForDecisionTask)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddActivityTask => "AddActivityTask",
            Self::AddDecisionTask => "AddDecisionTask",
            Self::PollForActivityTask => "PollForActivityTask",
            Self::PollForDecisionTask => "PollForDecisionTask",
        }
    }
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone)]
/// A cheap to clone, read only view of a [CallContext]'s cancellation.
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Returns `true` once the owning call has been released.
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

/// The deadline and cancellation scope of a single routed call.
///
/// A context is created for every call and cancelled when it is dropped,
/// so every exit path of the call releases it.
pub struct CallContext {
    operation: OperationKind,
    timeout: Duration,
    deadline: Instant,
    cancel_tx: watch::Sender<bool>,
    signal: CancelSignal,
}

impl CallContext {
    /// Creates a new context expiring `timeout` from now.
    pub fn new(operation: OperationKind, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        let (cancel_tx, rx) = watch::channel(false);

        Self {
            operation,
            timeout,
            deadline,
            cancel_tx,
            signal: CancelSignal { rx },
        }
    }

    #[inline]
    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    #[inline]
    /// The timeout the context was created with.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[inline]
    /// The instant the call expires.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// The time left before the deadline passes.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Gets a signal which observes this context's cancellation.
    pub fn signal(&self) -> CancelSignal {
        self.signal.clone()
    }

    /// Cancels the context.
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Drives the remote call until it completes or the deadline passes.
    ///
    /// When the deadline passes the call future is dropped, aborting the
    /// in-flight request, and the context is cancelled. A host giving up on
    /// the forwarded deadline is reported the same way as the local expiry.
    pub(crate) async fn run<T, F>(&self, call: F) -> Result<T, MatchingError>
    where
        F: Future<Output = Result<T, Status>>,
    {
        let status = match tokio::time::timeout_at(self.deadline, call).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(status)) => status,
            Err(_) => return Err(self.expire()),
        };

        match status.code {
            ErrorCode::Timeout => Err(self.expire()),
            ErrorCode::ConnectionError => Err(MatchingError::Transport(status)),
            _ => Err(MatchingError::Remote(status)),
        }
    }

    fn expire(&self) -> MatchingError {
        self.cancel();
        MatchingError::DeadlineExceeded {
            operation: self.operation,
            timeout: self.timeout,
        }
    }
}

impl Drop for CallContext {
    fn drop(&mut self) {
        self.cancel();
    }
}
