use std::collections::BTreeMap;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::{Request, Response, StatusCode};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Body;
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::handler::{OpaqueMessageHandler, RpcService, ServiceRegistry};
use crate::request::DEADLINE_HEADER;
use crate::{utils, Status};

/// A RPC server instance.
///
/// This allows for dynamic adding and removal of services.
pub struct Server {
    state: ServerState,
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl Server {
    /// Binds to the given address and spawns the RPC server task.
    pub async fn listen(addr: SocketAddr) -> io::Result<Self> {
        let state = ServerState::default();
        let (local_addr, handle) = start_rpc_server(addr, state.clone())?;

        info!(listen_addr = %local_addr, "RPC server is listening.");

        Ok(Self {
            state,
            local_addr,
            handle,
        })
    }

    /// The address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Adds a new service to the live RPC server.
    pub fn add_service<Svc>(&self, service: Svc)
    where
        Svc: RpcService + Send + Sync + 'static,
    {
        let mut registry = ServiceRegistry::new(service);
        Svc::register_handlers(&mut registry);
        self.state.add_handlers(registry.into_handlers());
    }

    /// Removes all handlers linked with the given service name.
    pub fn remove_service(&self, service_name: &str) {
        self.state.remove_handlers(service_name);
    }

    /// Signals the server to shutdown.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Clone, Default)]
/// Represents the shared state of the RPC server.
pub(crate) struct ServerState {
    handlers: Arc<RwLock<BTreeMap<String, Arc<dyn OpaqueMessageHandler>>>>,
}

impl ServerState {
    /// Adds a new set of handlers to the server state.
    ///
    /// Handlers newly added will then be able to handle messages received by
    /// the already running RPC system.
    pub(crate) fn add_handlers(
        &self,
        handlers: BTreeMap<String, Arc<dyn OpaqueMessageHandler>>,
    ) {
        let mut lock = self.handlers.write();
        lock.extend(handlers);
    }

    /// Removes every handler belonging to the service.
    pub(crate) fn remove_handlers(&self, service: &str) {
        let prefix = format!("/{service}/");

        let mut lock = self.handlers.write();
        lock.retain(|key, _| !key.starts_with(&prefix));
    }

    /// Attempts to get the message handler for a specific URI path.
    pub(crate) fn get_handler(&self, uri_path: &str) -> Option<Arc<dyn OpaqueMessageHandler>> {
        let lock = self.handlers.read();
        lock.get(uri_path).cloned()
    }
}

/// Binds the server socket and spawns the task driving it.
fn start_rpc_server(
    bind_addr: SocketAddr,
    state: ServerState,
) -> io::Result<(SocketAddr, JoinHandle<()>)> {
    let make_service = make_service_fn(move |socket: &AddrStream| {
        let remote_addr = socket.remote_addr();
        let state = state.clone();

        async move {
            let service = move |req| handle_connection(req, state.clone(), remote_addr);
            Ok::<_, Infallible>(service_fn(service))
        }
    });

    let builder = hyper::Server::try_bind(&bind_addr)
        .map_err(|e| io::Error::new(io::ErrorKind::AddrNotAvailable, e))?;
    let server = builder
        .http2_only(true)
        .http2_adaptive_window(true)
        .serve(make_service);
    let local_addr = server.local_addr();

    let handle = tokio::spawn(async move {
        if let Err(e) = server.await {
            error!(error = ?e, "Server failed to handle requests.");
        }
    });

    Ok((local_addr, handle))
}

/// A single request handler.
async fn handle_connection(
    req: Request<Body>,
    state: ServerState,
    remote_addr: SocketAddr,
) -> Result<Response<Body>, Infallible> {
    match handle_message(req, state, remote_addr).await {
        Ok(r) => Ok(r),
        Err(e) => {
            let buffer = utils::encode_status(&Status::internal(e));
            Ok(response(StatusCode::INTERNAL_SERVER_ERROR, buffer.into_vec()))
        },
    }
}

async fn handle_message(
    req: Request<Body>,
    state: ServerState,
    remote_addr: SocketAddr,
) -> anyhow::Result<Response<Body>> {
    let (parts, body) = req.into_parts();
    let uri = parts.uri.path();

    let handler = match state.get_handler(uri) {
        Some(handler) => handler,
        None => {
            let status = Status::unavailable(format!("Unknown service {uri}"));
            let buffer = utils::encode_status(&status);
            return Ok(response(StatusCode::BAD_REQUEST, buffer.into_vec()));
        },
    };

    let deadline = parts
        .headers
        .get(DEADLINE_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis);

    let data = hyper::body::to_bytes(body).await?;

    let resp = match handler.try_handle(remote_addr, deadline, &data).await {
        Ok(buffer) => response(StatusCode::OK, buffer.into_vec()),
        Err(buffer) => response(StatusCode::BAD_REQUEST, buffer.into_vec()),
    };

    Ok(resp)
}

fn response(code: StatusCode, body: Vec<u8>) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    (*response.status_mut()) = code;
    response
}
