use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub type Counter = AtomicU64;

#[derive(Debug, Clone, Default)]
/// Live counters of the matching client.
pub struct ClientStatistics(Arc<ClientStatisticsInner>);

impl Deref for ClientStatistics {
    type Target = ClientStatisticsInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Default)]
pub struct ClientStatisticsInner {
    /// The number of calls routed by the client.
    pub(crate) num_requests: Counter,
    /// The number of connection handles constructed.
    pub(crate) num_handles_created: Counter,
    /// The number of times an existing handle was reused.
    pub(crate) num_cache_hits: Counter,
    /// The number of routing keys which could not be resolved to a host.
    pub(crate) num_lookup_failures: Counter,
    /// The number of calls which ran past their deadline.
    pub(crate) num_deadlines_exceeded: Counter,
}

impl ClientStatisticsInner {
    /// The number of calls routed by the client.
    pub fn num_requests(&self) -> u64 {
        self.num_requests.load(Ordering::Relaxed)
    }

    /// The number of connection handles constructed.
    pub fn num_handles_created(&self) -> u64 {
        self.num_handles_created.load(Ordering::Relaxed)
    }

    /// The number of times an existing handle was reused.
    pub fn num_cache_hits(&self) -> u64 {
        self.num_cache_hits.load(Ordering::Relaxed)
    }

    /// The number of routing keys which could not be resolved to a host.
    pub fn num_lookup_failures(&self) -> u64 {
        self.num_lookup_failures.load(Ordering::Relaxed)
    }

    /// The number of calls which ran past their deadline.
    pub fn num_deadlines_exceeded(&self) -> u64 {
        self.num_deadlines_exceeded.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn incr(counter: &Counter) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
