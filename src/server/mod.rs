//! The RPC server: registry, lifecycle, accept loop, and workers.
//!
//! An [`RpcServer`] moves through three states. While `Created` it accepts
//! function registrations. [`RpcServer::start`] binds the listening socket,
//! freezes the registry, and runs the accept loop until [`RpcServer::stop`]
//! is called from another task. Once `Stopped` the server cannot be
//! restarted or reconfigured.
//!
//! ```no_run
//! use serde_json::{Value, json};
//! use wirecall::{registry::HandlerResult, server::RpcServer};
//!
//! # async fn run() -> Result<(), wirecall::server::ServerError> {
//! let server = RpcServer::new(8080);
//! server.register("ping", |_: &[Value]| -> HandlerResult { Ok(json!("pong")) })?;
//!
//! let handle = server.clone();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     handle.stop().await;
//! });
//! server.start().await
//! # }
//! ```

mod accept;
mod backoff;
mod config;
mod error;
#[cfg(test)]
mod test_util;
mod worker;

use std::{
    net::{SocketAddr, TcpListener as StdTcpListener},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use accept::{AcceptLoopOptions, accept_loop};
pub use backoff::BackoffConfig;
pub use config::{DEFAULT_SHUTDOWN_GRACE, ServerConfig};
pub use error::ServerError;
use log::{debug, info};
use tokio::{net::TcpListener, sync::watch, task::JoinHandle};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use worker::WorkerOptions;

use crate::registry::{Handler, Registration, RegistryBuilder};

/// Observable lifecycle state of an [`RpcServer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServerState {
    /// Accepting registrations; not yet listening.
    Created,
    /// Bound and accepting connections on the given address.
    Listening(SocketAddr),
    /// Shut down; terminal.
    Stopped,
}

enum Lifecycle {
    Created(RegistryBuilder),
    Listening,
    Stopped,
}

struct Shared {
    config: ServerConfig,
    lifecycle: Mutex<Lifecycle>,
    state: watch::Sender<ServerState>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Drop for Shared {
    fn drop(&mut self) { self.shutdown.cancel(); }
}

/// Cloneable handle to one server.
///
/// Clones share the same registry and lifecycle, so one handle can await
/// [`RpcServer::start`] while another calls [`RpcServer::stop`]. Dropping
/// the last handle signals the accept loop and workers to shut down.
#[derive(Clone)]
pub struct RpcServer {
    shared: Arc<Shared>,
}

impl RpcServer {
    /// Create a server that will listen on every IPv4 interface at `port`.
    #[must_use]
    pub fn new(port: u16) -> Self { Self::with_config(ServerConfig::new(port)) }

    /// Create a server from explicit settings.
    #[must_use]
    pub fn with_config(config: ServerConfig) -> Self {
        let (state, _) = watch::channel(ServerState::Created);
        Self {
            shared: Arc::new(Shared {
                config,
                lifecycle: Mutex::new(Lifecycle::Created(RegistryBuilder::new())),
                state,
                shutdown: CancellationToken::new(),
                tracker: TaskTracker::new(),
            }),
        }
    }

    /// Settings this server was created with.
    #[must_use]
    pub fn config(&self) -> &ServerConfig { &self.shared.config }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState { *self.shared.state.borrow() }

    /// Bound address while listening.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match self.state() {
            ServerState::Listening(addr) => Some(addr),
            ServerState::Created | ServerState::Stopped => None,
        }
    }

    /// Wait until the server leaves the `Created` state.
    ///
    /// Resolves to the bound address once listening, or `None` if the server
    /// was stopped first. A failed bind leaves the server `Created`, so a
    /// waiter stays pending until a later `start` succeeds or `stop` is
    /// called; the error itself is returned only to the caller of
    /// [`RpcServer::start`].
    pub async fn listening(&self) -> Option<SocketAddr> {
        let mut state = self.shared.state.subscribe();
        let reached = *state
            .wait_for(|state| !matches!(state, ServerState::Created))
            .await
            .ok()?;
        match reached {
            ServerState::Listening(addr) => Some(addr),
            ServerState::Created | ServerState::Stopped => None,
        }
    }

    /// Register `handler` under `name`.
    ///
    /// Registering a name twice keeps the first handler, logs a warning, and
    /// returns [`Registration::AlreadyRegistered`].
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::AlreadyRunning`] once the server is listening
    /// and [`ServerError::Stopped`] after it has been stopped.
    pub fn register<H>(&self, name: impl Into<String>, handler: H) -> Result<Registration, ServerError>
    where
        H: Handler,
    {
        match &mut *self.lifecycle() {
            Lifecycle::Created(builder) => Ok(builder.register(name, handler)),
            Lifecycle::Listening => Err(ServerError::AlreadyRunning),
            Lifecycle::Stopped => Err(ServerError::Stopped),
        }
    }

    /// Bind the listening socket and serve connections until stopped.
    ///
    /// Returns once [`RpcServer::stop`] has been called. Calling `start` while
    /// already listening returns immediately without effect.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the socket cannot be bound, leaving
    /// the server in the `Created` state; [`ServerError::Stopped`] if the
    /// server was already stopped; and [`ServerError::AcceptTask`] if the
    /// accept loop ends abnormally.
    pub async fn start(&self) -> Result<(), ServerError> {
        let Some(accept_task) = self.begin_listening()? else {
            return Ok(());
        };
        accept_task.await?;
        Ok(())
    }

    /// Stop accepting, close every connection, and wait for workers to exit.
    ///
    /// A worker still writing a response gets
    /// [`ServerConfig::shutdown_grace`] to finish before its connection is
    /// dropped. Idempotent; may be called before `start` or from any clone.
    pub async fn stop(&self) {
        {
            let mut lifecycle = self.lifecycle();
            if !matches!(*lifecycle, Lifecycle::Stopped) {
                *lifecycle = Lifecycle::Stopped;
                self.shared.state.send_replace(ServerState::Stopped);
                info!("server stopping");
            }
        }
        self.shared.shutdown.cancel();
        self.shared.tracker.close();
        self.shared.tracker.wait().await;
        debug!("server stopped");
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.shared
            .lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Bind, freeze the registry, and spawn the accept loop under the
    /// lifecycle lock so that a concurrent `stop` always waits for it.
    fn begin_listening(&self) -> Result<Option<JoinHandle<()>>, ServerError> {
        let mut lifecycle = self.lifecycle();
        let builder = match std::mem::replace(&mut *lifecycle, Lifecycle::Listening) {
            Lifecycle::Created(builder) => builder,
            Lifecycle::Listening => {
                debug!("start called while already listening");
                return Ok(None);
            }
            Lifecycle::Stopped => {
                *lifecycle = Lifecycle::Stopped;
                return Err(ServerError::Stopped);
            }
        };
        let (listener, local_addr) = match bind(self.shared.config.bind_addr) {
            Ok(bound) => bound,
            Err(e) => {
                *lifecycle = Lifecycle::Created(builder);
                return Err(e);
            }
        };

        let registry = Arc::new(builder.freeze());
        info!(
            "server listening: addr={local_addr}, functions={:?}",
            registry.names()
        );
        self.shared
            .state
            .send_replace(ServerState::Listening(local_addr));

        let config = &self.shared.config;
        let options = AcceptLoopOptions {
            shutdown: self.shared.shutdown.clone(),
            tracker: self.shared.tracker.clone(),
            backoff: config.accept_backoff,
            worker: WorkerOptions {
                shutdown: self.shared.shutdown.clone(),
                idle_timeout: config.idle_timeout,
                max_frame_length: config.max_frame_length,
                shutdown_grace: config.shutdown_grace,
            },
        };
        Ok(Some(
            self.shared
                .tracker
                .spawn(accept_loop(listener, registry, options)),
        ))
    }
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer")
            .field("config", &self.shared.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn bind(addr: SocketAddr) -> Result<(TcpListener, SocketAddr), ServerError> {
    let bind_error = move |source| ServerError::Bind { addr, source };
    let std_listener = StdTcpListener::bind(addr).map_err(bind_error)?;
    std_listener.set_nonblocking(true).map_err(bind_error)?;
    let local_addr = std_listener.local_addr().map_err(bind_error)?;
    let listener = TcpListener::from_std(std_listener).map_err(bind_error)?;
    Ok((listener, local_addr))
}
