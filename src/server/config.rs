//! Configuration for [`RpcServer`](super::RpcServer).

use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use super::BackoffConfig;
use crate::frame::DEFAULT_MAX_FRAME_LENGTH;

/// Default time a worker may keep writing a response after shutdown begins.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Settings fixed when a server is constructed.
///
/// Connections have no idle timeout by default: a persistent session may sit
/// between requests indefinitely, and a client that connects but never sends
/// holds its worker until it disconnects or the server stops. Set
/// [`ServerConfig::idle_timeout`] to bound that wait.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: SocketAddr,
    /// How long a connection may wait for the next request, if bounded.
    pub idle_timeout: Option<Duration>,
    /// Largest request payload accepted, in bytes.
    pub max_frame_length: usize,
    /// Pacing for retries after failed accepts.
    pub accept_backoff: BackoffConfig,
    /// How long a response write may continue once shutdown is requested.
    ///
    /// A peer that stops reading cannot hold [`RpcServer::stop`](super::RpcServer::stop)
    /// open for longer than this; its connection is dropped mid-write.
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    /// Listen on every IPv4 interface at `port`.
    ///
    /// Port `0` asks the operating system for an ephemeral port; see
    /// [`RpcServer::listening`](super::RpcServer::listening) for the bound address.
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            idle_timeout: None,
            max_frame_length: DEFAULT_MAX_FRAME_LENGTH,
            accept_backoff: BackoffConfig::default(),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    /// Listen on `addr` instead.
    #[must_use]
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Close connections that wait longer than `limit` for a request.
    #[must_use]
    pub fn with_idle_timeout(mut self, limit: Duration) -> Self {
        self.idle_timeout = Some(limit);
        self
    }

    /// Reject request payloads longer than `max` bytes.
    #[must_use]
    pub fn with_max_frame_length(mut self, max: usize) -> Self {
        self.max_frame_length = max;
        self
    }

    /// Use `backoff` when `accept()` fails.
    #[must_use]
    pub fn with_accept_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.accept_backoff = backoff;
        self
    }

    /// Let in-flight response writes continue for `grace` after `stop`.
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_everywhere_without_idle_timeout() {
        let config = ServerConfig::new(8080);
        assert_eq!(config.bind_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(config.idle_timeout, None);
        assert_eq!(config.max_frame_length, DEFAULT_MAX_FRAME_LENGTH);
        assert_eq!(config.accept_backoff, BackoffConfig::default());
        assert_eq!(config.shutdown_grace, DEFAULT_SHUTDOWN_GRACE);
    }

    #[test]
    fn setters_override_defaults() {
        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let config = ServerConfig::new(1)
            .with_bind_addr(addr)
            .with_idle_timeout(Duration::from_secs(30))
            .with_max_frame_length(512)
            .with_shutdown_grace(Duration::from_millis(50));
        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.max_frame_length, 512);
        assert_eq!(config.shutdown_grace, Duration::from_millis(50));
    }
}
