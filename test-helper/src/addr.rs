use std::net::{SocketAddr, TcpListener};

/// Gets a new socket address allocated by the OS.
pub fn get_unused_addr() -> SocketAddr {
    let socket = TcpListener::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap()
}

/// Gets a new `host:port` string allocated by the OS.
pub fn get_unused_host() -> String {
    get_unused_addr().to_string()
}
