use std::net::SocketAddr;
use std::ops::Deref;
use std::time::Duration;

/// The header carrying the caller's remaining deadline in milliseconds.
pub const DEADLINE_HEADER: &str = "x-taskmatch-deadline-ms";

/// Formats the caller's remaining time for the deadline header.
///
/// Partial milliseconds are rounded up so the server never gives up on a
/// request before the caller does.
pub(crate) fn deadline_header_value(timeout: Duration) -> String {
    let partial = timeout.subsec_nanos() % 1_000_000 != 0;
    (timeout.as_millis() + u128::from(partial)).to_string()
}

/// A decoded message and any additional metadata provided by the RPC system.
pub struct Request<Msg> {
    pub(crate) remote_addr: SocketAddr,
    pub(crate) deadline: Option<Duration>,
    pub(crate) msg: Msg,
}

impl<Msg> Request<Msg> {
    pub(crate) fn new(
        remote_addr: SocketAddr,
        deadline: Option<Duration>,
        msg: Msg,
    ) -> Self {
        Self {
            remote_addr,
            deadline,
            msg,
        }
    }

    /// The remote address of the incoming message.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// The time the caller is willing to wait for a reply, if it set one.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Consumes the request returning the message.
    pub fn into_inner(self) -> Msg {
        self.msg
    }
}

impl<Msg> Deref for Request<Msg> {
    type Target = Msg;

    fn deref(&self) -> &Self::Target {
        &self.msg
    }
}

#[cfg(feature = "test-utils")]
impl<Msg> Request<Msg> {
    /// A test utility for creating a mocked request.
    ///
    /// This should be used for testing only.
    pub fn using_owned(msg: Msg, deadline: Option<Duration>) -> Self {
        use std::net::{Ipv4Addr, SocketAddrV4};

        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::from([127, 0, 0, 1]), 80));
        Self::new(addr, deadline, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request() {
        let addr = "127.0.0.1:8000".parse::<SocketAddr>().unwrap();
        let req = Request::new(addr, Some(Duration::from_secs(10)), "orders".to_string());
        assert_eq!(req.remote_addr(), addr);
        assert_eq!(req.deadline(), Some(Duration::from_secs(10)));
        assert_eq!(req.len(), 6, "Request should deref to the message");
        assert_eq!(req.into_inner(), "orders");
    }

    #[test]
    fn test_deadline_rounds_up() {
        assert_eq!(deadline_header_value(Duration::ZERO), "0");
        assert_eq!(deadline_header_value(Duration::from_millis(150)), "150");
        assert_eq!(deadline_header_value(Duration::from_micros(149_001)), "150");
        assert_eq!(deadline_header_value(Duration::from_nanos(1)), "1");
        assert_eq!(deadline_header_value(Duration::from_secs(180)), "180000");
    }
}
