use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use taskmatch_rpc::ClientConnectError;

use crate::resolver::HostAddress;
use crate::statistics::{ClientStatistics, ClientStatisticsInner};

/// Constructs the handle used to talk to a single host.
pub trait HandleFactory: Send + Sync + 'static {
    type Handle: Send + Sync + 'static;

    /// Creates a new handle bound to the host.
    fn new_handle(&self, host: &HostAddress) -> Result<Self::Handle, ClientConnectError>;
}

/// A collection of per-host handles which are created once and reused.
///
/// At most one handle exists per host. Lookups only take a shared lock,
/// creation takes the exclusive lock and checks again before constructing
/// so concurrent first calls for a host build a single handle.
///
/// Entries are never evicted by the cache itself, see [ConnectionCache::invalidate].
pub struct ConnectionCache<F: HandleFactory> {
    factory: F,
    handles: RwLock<HashMap<HostAddress, Arc<F::Handle>>>,
    statistics: ClientStatistics,
}

impl<F: HandleFactory> ConnectionCache<F> {
    /// Creates a new, empty cache using the factory to build handles.
    pub fn new(factory: F) -> Self {
        Self::with_statistics(factory, ClientStatistics::default())
    }

    pub(crate) fn with_statistics(factory: F, statistics: ClientStatistics) -> Self {
        Self {
            factory,
            handles: RwLock::new(HashMap::new()),
            statistics,
        }
    }

    /// Gets the existing handle for the host or creates a new one.
    ///
    /// A failure to create the handle is not remembered, the next call for
    /// the same host tries again.
    pub fn get_or_create(
        &self,
        host: &HostAddress,
    ) -> Result<Arc<F::Handle>, ClientConnectError> {
        if let Some(handle) = self.get(host) {
            return Ok(handle);
        }

        let mut guard = self.handles.write();

        // Another caller may have created the handle while we waited on the lock.
        if let Some(handle) = guard.get(host) {
            ClientStatisticsInner::incr(&self.statistics.num_cache_hits);
            return Ok(handle.clone());
        }

        trace!(host = %host, "Creating client for host.");
        let handle = Arc::new(self.factory.new_handle(host)?);
        guard.insert(host.clone(), handle.clone());
        ClientStatisticsInner::incr(&self.statistics.num_handles_created);

        Ok(handle)
    }

    /// Gets the handle for the host if one has already been created.
    pub fn get(&self, host: &HostAddress) -> Option<Arc<F::Handle>> {
        let handle = self.handles.read().get(host).cloned()?;
        ClientStatisticsInner::incr(&self.statistics.num_cache_hits);
        Some(handle)
    }

    /// Removes the handle for the host, returning `true` if one existed.
    ///
    /// Requests already holding the handle keep using it, the next
    /// [ConnectionCache::get_or_create] for the host builds a new handle.
    pub fn invalidate(&self, host: &HostAddress) -> bool {
        let removed = self.handles.write().remove(host).is_some();
        if removed {
            debug!(host = %host, "Invalidated client for host.");
        }
        removed
    }

    #[inline]
    /// The number of hosts with a handle.
    pub fn len(&self) -> usize {
        self.handles.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    /// The factory handles are built with.
    pub fn factory(&self) -> &F {
        &self.factory
    }
}
