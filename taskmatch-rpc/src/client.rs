use std::marker::PhantomData;
use std::time::Duration;

use http::uri::{Authority, InvalidUri};
use http::{Method, Request, StatusCode, Uri};
use hyper::Body;
use rkyv::bytecheck::CheckBytes;
use rkyv::de::deserializers::SharedDeserializeMap;
use rkyv::ser::serializers::AllocSerializer;
use rkyv::validation::validators::DefaultValidator;
use rkyv::{Archive, Deserialize, Serialize};

use crate::handler::{Handler, RpcService};
use crate::request::{deadline_header_value, DEADLINE_HEADER};
use crate::{utils, Channel, Status, SCRATCH_SPACE};

#[derive(Debug, thiserror::Error)]
/// The client could not be bound to the remote host.
pub enum ClientConnectError {
    #[error("Host address must not be empty.")]
    EmptyAddress,

    #[error("Invalid host address {addr:?}: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: InvalidUri,
    },

    #[error("Connection to host was refused: {0}")]
    Refused(String),
}

/// A RPC client handle for a given service on a single remote host.
///
/// Creating the client does not perform any IO, connections are made on
/// demand by the shared [Channel].
pub struct RpcClient<Svc> {
    channel: Channel,
    authority: Authority,
    _p: PhantomData<fn() -> Svc>,
}

impl<Svc> Clone for RpcClient<Svc> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
            authority: self.authority.clone(),
            _p: PhantomData,
        }
    }
}

impl<Svc> RpcClient<Svc>
where
    Svc: RpcService,
{
    /// Binds a new client for the service to the given `host:port`.
    pub fn new(channel: Channel, host: &str) -> Result<Self, ClientConnectError> {
        if host.is_empty() {
            return Err(ClientConnectError::EmptyAddress);
        }

        let authority = host.parse::<Authority>().map_err(|source| {
            ClientConnectError::InvalidAddress {
                addr: host.to_string(),
                source,
            }
        })?;

        Ok(Self {
            channel,
            authority,
            _p: PhantomData,
        })
    }

    /// The `host:port` this client sends messages to.
    pub fn host(&self) -> &str {
        self.authority.as_str()
    }

    /// Sends a message to the server and wait for a reply.
    ///
    /// If a timeout is provided it is forwarded to the server which will abort
    /// handling the message once it elapses.
    pub async fn send<Msg>(
        &self,
        msg: &Msg,
        timeout: Option<Duration>,
    ) -> Result<<Svc as Handler<Msg>>::Reply, Status>
    where
        Msg: Archive + Serialize<AllocSerializer<SCRATCH_SPACE>> + Send + 'static,
        Msg::Archived: for<'a> CheckBytes<DefaultValidator<'a>>
            + Deserialize<Msg, SharedDeserializeMap>,
        Svc: Handler<Msg>,
        <<Svc as Handler<Msg>>::Reply as Archive>::Archived:
            for<'a> CheckBytes<DefaultValidator<'a>>
                + Deserialize<<Svc as Handler<Msg>>::Reply, SharedDeserializeMap>,
    {
        let uri = Uri::builder()
            .scheme("http")
            .authority(self.authority.clone())
            .path_and_query(utils::to_uri_path(
                Svc::service_name(),
                <Svc as Handler<Msg>>::path(),
            ))
            .build()
            .map_err(Status::internal)?;

        let body = utils::encode(msg)?;

        let mut request = Request::builder().method(Method::POST).uri(uri);
        if let Some(timeout) = timeout {
            request = request.header(DEADLINE_HEADER, deadline_header_value(timeout));
        }
        let request = request
            .body(Body::from(body.into_vec()))
            .map_err(Status::internal)?;

        let resp = self
            .channel
            .request(request)
            .await
            .map_err(Status::connection)?;

        let (parts, body) = resp.into_parts();
        let data = hyper::body::to_bytes(body)
            .await
            .map_err(Status::connection)?;

        if parts.status == StatusCode::OK {
            utils::decode(&data)
        } else {
            Err(utils::decode::<Status>(&data)?)
        }
    }
}
