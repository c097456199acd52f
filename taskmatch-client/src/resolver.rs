use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::LookupError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// The `host:port` of a matching service shard.
pub struct HostAddress(Arc<str>);

impl HostAddress {
    /// Creates a new host address.
    ///
    /// Returns `None` if the address is empty.
    pub fn new(addr: impl AsRef<str>) -> Option<Self> {
        let addr = addr.as_ref();
        if addr.is_empty() {
            return None;
        }

        Some(Self(Arc::from(addr)))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for HostAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for HostAddress {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[async_trait]
/// Resolves which host currently owns a routing key.
///
/// Implementations must be safe to call concurrently. Each call reflects the
/// resolver's current view of the topology, two lookups of the same key may
/// return different hosts.
pub trait ServiceResolver: Send + Sync + 'static {
    async fn lookup(&self, key: &str) -> Result<HostAddress, LookupError>;
}

/// The membership system which hands out resolvers for a named service.
pub trait MembershipMonitor: Send + Sync {
    fn get_resolver(&self, service: &str) -> Result<Arc<dyn ServiceResolver>, LookupError>;
}

#[derive(Default)]
/// A resolver backed by a fixed routing table.
///
/// The table can be changed at runtime to reflect topology changes.
pub struct StaticResolver {
    owners: RwLock<HashMap<String, HostAddress>>,
}

impl StaticResolver {
    /// Creates a resolver from a set of `(routing_key, host)` pairs.
    ///
    /// Pairs with an empty host are skipped.
    pub fn new(
        owners: impl IntoIterator<Item = (impl Into<String>, impl AsRef<str>)>,
    ) -> Self {
        let owners = owners
            .into_iter()
            .filter_map(|(key, host)| Some((key.into(), HostAddress::new(host)?)))
            .collect();

        Self {
            owners: RwLock::new(owners),
        }
    }

    /// Assigns the routing key to a new owner, returning the previous owner.
    pub fn set_owner(
        &self,
        key: impl Into<String>,
        host: HostAddress,
    ) -> Option<HostAddress> {
        self.owners.write().insert(key.into(), host)
    }

    /// Removes the owner of a routing key.
    pub fn remove_owner(&self, key: &str) -> Option<HostAddress> {
        self.owners.write().remove(key)
    }
}

#[async_trait]
impl ServiceResolver for StaticResolver {
    async fn lookup(&self, key: &str) -> Result<HostAddress, LookupError> {
        self.owners
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| LookupError::NoOwner {
                key: key.to_string(),
            })
    }
}

#[derive(Default)]
/// A monitor handing out pre-registered resolvers by service name.
pub struct StaticMonitor {
    resolvers: HashMap<String, Arc<dyn ServiceResolver>>,
}

impl StaticMonitor {
    /// Registers the resolver used for a service.
    pub fn with_resolver(
        mut self,
        service: impl Into<String>,
        resolver: Arc<dyn ServiceResolver>,
    ) -> Self {
        self.resolvers.insert(service.into(), resolver);
        self
    }
}

impl MembershipMonitor for StaticMonitor {
    fn get_resolver(&self, service: &str) -> Result<Arc<dyn ServiceResolver>, LookupError> {
        self.resolvers.get(service).cloned().ok_or_else(|| {
            LookupError::Unavailable(format!("No resolver known for service {service}"))
        })
    }
}
