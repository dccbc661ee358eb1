//! Test helpers shared across server modules.

use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};

use rstest::fixture;
use tokio::task::JoinHandle;

use super::{RpcServer, ServerConfig, ServerError};

#[fixture]
/// Returns a bound [`StdTcpListener`] on a free local port.
///
/// Keeping the listener bound holds the port for the duration of the test.
pub fn free_listener() -> StdTcpListener {
    let addr = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0);
    StdTcpListener::bind(addr).expect("Failed to bind free port listener")
}

#[fixture]
/// Configuration listening on an ephemeral localhost port.
pub fn local_config() -> ServerConfig {
    ServerConfig::new(0).with_bind_addr(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0))
}

/// Start `server` on a background task and wait until it is listening.
pub async fn spawn_server(server: &RpcServer) -> (SocketAddr, JoinHandle<Result<(), ServerError>>) {
    let handle = tokio::spawn({
        let server = server.clone();
        async move { server.start().await }
    });
    let addr = server.listening().await.expect("server failed to listen");
    (addr, handle)
}
