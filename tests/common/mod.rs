//! Shared utilities for integration tests.
//!
//! Provides a running server preloaded with the built-in functions, a
//! localhost configuration fixture, and exclusive access to the global
//! `log` capture.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::{Mutex, MutexGuard, OnceLock, PoisonError},
};

use logtest::Logger;
use rstest::fixture;
use tokio::task::JoinHandle;
use wirecall::{
    builtins::register_builtins,
    server::{RpcServer, ServerConfig, ServerError},
};

/// Configuration listening on an ephemeral localhost port.
#[fixture]
pub fn local_config() -> ServerConfig {
    ServerConfig::new(0).with_bind_addr(SocketAddr::new(Ipv4Addr::LOCALHOST.into(), 0))
}

/// A server running on a background task.
pub struct TestServer {
    pub server: RpcServer,
    pub addr: SocketAddr,
    task: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    /// Start `server` and wait until it is listening.
    pub async fn start(server: RpcServer) -> Self {
        let task = tokio::spawn({
            let server = server.clone();
            async move { server.start().await }
        });
        let addr = server.listening().await.expect("server failed to listen");
        Self { server, addr, task }
    }

    /// Start a server with the built-in functions registered.
    pub async fn with_builtins(config: ServerConfig) -> Self {
        let server = RpcServer::with_config(config);
        register_builtins(&server).expect("register built-in functions");
        Self::start(server).await
    }

    /// Stop the server and check that `start` returned cleanly.
    pub async fn shutdown(self) {
        self.server.stop().await;
        self.task
            .await
            .expect("join server task")
            .expect("server exited with an error");
    }
}

/// Handle to the global logger with exclusive access.
///
/// Serialises access to a [`logtest::Logger`] so tests do not observe each
/// other's records.
pub struct LoggerHandle {
    guard: MutexGuard<'static, Logger>,
}

impl LoggerHandle {
    /// Acquire the global [`Logger`] instance and discard earlier records.
    pub fn new() -> Self {
        static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

        let logger = LOGGER.get_or_init(|| Mutex::new(Logger::start()));
        let mut guard = logger.lock().unwrap_or_else(PoisonError::into_inner);
        while guard.pop().is_some() {}

        Self { guard }
    }

    /// Whether any captured record at `level` contains `needle`.
    pub fn contains(&mut self, level: log::Level, needle: &str) -> bool {
        let mut found = false;
        while let Some(record) = self.guard.pop() {
            found |= record.level() == level && record.args().contains(needle);
        }
        found
    }
}

impl std::ops::Deref for LoggerHandle {
    type Target = Logger;

    fn deref(&self) -> &Self::Target { &self.guard }
}

impl std::ops::DerefMut for LoggerHandle {
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.guard }
}

#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
pub fn logger() -> LoggerHandle { LoggerHandle::new() }
