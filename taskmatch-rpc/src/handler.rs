use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rkyv::bytecheck::CheckBytes;
use rkyv::de::deserializers::SharedDeserializeMap;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::validation::validators::DefaultValidator;
use rkyv::{AlignedVec, Archive, Deserialize, Serialize};

use crate::request::Request;
use crate::status::Status;
use crate::{utils, SCRATCH_SPACE};

/// A registry system used for linking a service's message handlers
/// with the RPC system at runtime.
///
/// Handlers are keyed by the URI path `/{service_name}/{handler_path}`,
/// not registering a handler means messages sent to it are answered with
/// [crate::ErrorCode::ServiceUnavailable].
pub struct ServiceRegistry<Svc> {
    handlers: BTreeMap<String, Arc<dyn OpaqueMessageHandler>>,
    service: Arc<Svc>,
}

impl<Svc> ServiceRegistry<Svc>
where
    Svc: RpcService + Send + Sync + 'static,
{
    pub(crate) fn new(service: Svc) -> Self {
        Self {
            handlers: BTreeMap::new(),
            service: Arc::new(service),
        }
    }

    /// Consumes the registry into the produced handlers.
    pub(crate) fn into_handlers(self) -> BTreeMap<String, Arc<dyn OpaqueMessageHandler>> {
        self.handlers
    }

    /// Adds a new handler to the registry.
    ///
    /// This is done in the form of specifying what message types are handled
    /// by the service via the generic.
    pub fn add_handler<Msg>(&mut self)
    where
        Msg: Archive + Send + Sync + 'static,
        Msg::Archived: for<'a> CheckBytes<DefaultValidator<'a>>
            + Deserialize<Msg, SharedDeserializeMap>,
        Svc: Handler<Msg>,
    {
        let phantom = PhantomHandler {
            handler: self.service.clone(),
            _msg: PhantomData::<fn() -> Msg>,
        };

        self.handlers.insert(
            utils::to_uri_path(Svc::service_name(), <Svc as Handler<Msg>>::path()),
            Arc::new(phantom),
        );
    }
}

/// A standard RPC service that handles messages.
pub trait RpcService: Sized {
    /// The name of the service.
    ///
    /// Two services may handle the same message but behave differently,
    /// the service name is part of the path used to reach a handler so
    /// they never clash.
    fn service_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Register all message handlers for this service with the registry.
    ///
    /// See [ServiceRegistry] for more information.
    fn register_handlers(registry: &mut ServiceRegistry<Self>);
}

#[async_trait]
/// A generic RPC message handler.
pub trait Handler<Msg>: RpcService + Send + Sync
where
    Msg: Archive + Send + 'static,
    Msg::Archived:
        for<'a> CheckBytes<DefaultValidator<'a>> + Deserialize<Msg, SharedDeserializeMap>,
{
    type Reply: Archive + Serialize<AllocSerializer<SCRATCH_SPACE>> + Send;

    fn path() -> &'static str {
        std::any::type_name::<Msg>()
    }

    /// Process a message.
    async fn on_message(&self, msg: Request<Msg>) -> Result<Self::Reply, Status>;
}

#[async_trait]
pub(crate) trait OpaqueMessageHandler: Send + Sync {
    /// Decodes and handles the message, producing either an encoded reply
    /// or an encoded [Status].
    async fn try_handle(
        &self,
        remote_addr: SocketAddr,
        deadline: Option<Duration>,
        data: &[u8],
    ) -> Result<AlignedVec, AlignedVec>;
}

struct PhantomHandler<H, Msg> {
    handler: Arc<H>,
    _msg: PhantomData<fn() -> Msg>,
}

#[async_trait]
impl<H, Msg> OpaqueMessageHandler for PhantomHandler<H, Msg>
where
    Msg: Archive + Send + Sync + 'static,
    Msg::Archived:
        for<'a> CheckBytes<DefaultValidator<'a>> + Deserialize<Msg, SharedDeserializeMap>,
    H: Handler<Msg> + Send + Sync + 'static,
{
    async fn try_handle(
        &self,
        remote_addr: SocketAddr,
        deadline: Option<Duration>,
        data: &[u8],
    ) -> Result<AlignedVec, AlignedVec> {
        let msg = utils::decode::<Msg>(data).map_err(|s| utils::encode_status(&s))?;
        let request = Request::new(remote_addr, deadline, msg);

        let fut = self.handler.on_message(request);
        let result = match deadline {
            None => fut.await,
            Some(deadline) => tokio::time::timeout(deadline, fut)
                .await
                .unwrap_or_else(|_| Err(Status::timeout())),
        };

        match result {
            Ok(reply) => utils::encode(&reply).map_err(|s| utils::encode_status(&s)),
            Err(status) => Err(utils::encode_status(&status)),
        }
    }
}
