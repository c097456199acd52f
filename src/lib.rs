//! # taskmatch
//! Routing of task list requests to the matching service shard which owns them.
//!
//! This is a convenience package which includes the sub-projects:
//!
//! ### Features
//! - `client` - The routing client with its per-host connection cache.
//! - `rpc` - The HTTP/2 RPC transport the client talks to matching shards with.

#[cfg(feature = "client")]
pub use taskmatch_client as client;
#[cfg(feature = "rpc")]
pub use taskmatch_rpc as rpc;
