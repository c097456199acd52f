//! # taskmatch-rpc
//! A small request/reply RPC transport over HTTP/2 using rkyv encoded messages.
//!
//! A single [Channel] is shared by the whole process, every remote host gets its own
//! [RpcClient] bound to it. Services are exposed through a [Server] by registering
//! [Handler]s for each message type the service understands.
#[macro_use]
extern crate tracing;

mod channel;
mod client;
mod handler;
mod request;
mod server;
mod status;
mod utils;

pub const SCRATCH_SPACE: usize = 4096;

pub use async_trait::async_trait;
pub use channel::{Channel, ChannelConfig};
pub use client::{ClientConnectError, RpcClient};
pub use handler::{Handler, RpcService, ServiceRegistry};
pub use request::{Request, DEADLINE_HEADER};
pub use server::Server;
pub use status::{ArchivedErrorCode, ArchivedStatus, ErrorCode, Status};
