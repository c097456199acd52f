use std::time::Duration;

use http::{Request, Response};
use hyper::client::HttpConnector;
use hyper::{Body, Client};

#[derive(Debug, Clone)]
/// Settings applied to the shared [Channel].
pub struct ChannelConfig {
    /// How long to wait for a TCP connection to be established to a host.
    pub connect_timeout: Option<Duration>,

    /// How often HTTP/2 pings are sent to keep idle connections alive.
    pub keep_alive_interval: Option<Duration>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(2)),
            keep_alive_interval: Some(Duration::from_secs(30)),
        }
    }
}

impl ChannelConfig {
    /// Set the TCP connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the HTTP/2 keep alive interval.
    pub fn with_keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = Some(interval);
        self
    }
}

#[derive(Clone)]
/// A shared HTTP/2 connection pool.
///
/// A process normally creates one channel and hands it to every
/// [crate::RpcClient] it builds, connections to each host are established
/// lazily and multiplexed by the pool.
pub struct Channel {
    inner: Client<HttpConnector, Body>,
}

impl Default for Channel {
    fn default() -> Self {
        Self::new(ChannelConfig::default())
    }
}

impl Channel {
    /// Creates a new channel with the given settings.
    pub fn new(config: ChannelConfig) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        connector.set_connect_timeout(config.connect_timeout);

        let inner = Client::builder()
            .http2_only(true)
            .http2_keep_alive_interval(config.keep_alive_interval)
            .http2_adaptive_window(true)
            .build(connector);

        Self { inner }
    }

    pub(crate) async fn request(
        &self,
        req: Request<Body>,
    ) -> Result<Response<Body>, hyper::Error> {
        self.inner.request(req).await
    }
}
