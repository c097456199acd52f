use std::borrow::Cow;
use std::time::Duration;

use crate::context::OperationKind;

/// The name the matching service is registered under.
pub static MATCHING_SERVICE_NAME: &str = "cadence-matching";

pub const DEFAULT_SHORT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_LONG_POLL_TIMEOUT: Duration = Duration::from_secs(3 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The deadlines applied to routed calls.
///
/// Submissions use the short timeout, polls block on the server for up to
/// the long timeout.
pub struct TimeoutPolicy {
    pub short: Duration,
    pub long: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            short: DEFAULT_SHORT_TIMEOUT,
            long: DEFAULT_LONG_POLL_TIMEOUT,
        }
    }
}

impl TimeoutPolicy {
    /// Set the timeout used for submitting tasks.
    pub fn with_short_timeout(mut self, timeout: Duration) -> Self {
        self.short = timeout;
        self
    }

    /// Set the timeout used for long polls.
    pub fn with_long_poll_timeout(mut self, timeout: Duration) -> Self {
        self.long = timeout;
        self
    }

    /// The timeout for the given kind of call.
    pub fn timeout_for(&self, operation: OperationKind) -> Duration {
        if operation.is_long_poll() {
            self.long
        } else {
            self.short
        }
    }
}

#[derive(Debug, Clone)]
/// Configuration for the matching client.
pub struct ClientConfig {
    /// The service name resolvers are requested for.
    pub service_name: Cow<'static, str>,

    /// The deadlines applied to each kind of call.
    pub timeouts: TimeoutPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            service_name: Cow::Borrowed(MATCHING_SERVICE_NAME),
            timeouts: TimeoutPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Set the service name to resolve hosts for.
    pub fn with_service_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Set the timeouts applied to calls.
    pub fn with_timeouts(mut self, timeouts: TimeoutPolicy) -> Self {
        self.timeouts = timeouts;
        self
    }
}
