//! The accept loop: one worker task per inbound connection.

use std::{io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::{
    net::{TcpListener, TcpStream},
    select,
    time::{Duration, sleep},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{
    BackoffConfig,
    worker::{WorkerOptions, spawn_connection_task},
};
use crate::registry::Registry;

/// Source of inbound connections consumed by [`accept_loop`].
///
/// Dropping a pending `accept()` future must not leak the connection.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub(super) trait AcceptListener: Send + Sync {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

#[async_trait]
impl AcceptListener for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> { TcpListener::local_addr(self) }
}

#[derive(Debug)]
pub(super) struct AcceptLoopOptions {
    pub shutdown: CancellationToken,
    pub tracker: TaskTracker,
    pub backoff: BackoffConfig,
    pub worker: WorkerOptions,
}

/// Accept connections until `options.shutdown` is cancelled.
///
/// Each accepted stream is served by its own task on `options.tracker`.
/// Accept failures are logged and retried after an exponential back-off.
/// The listener is dropped, releasing the port, before this returns.
pub(super) async fn accept_loop<L>(listener: L, registry: Arc<Registry>, options: AcceptLoopOptions)
where
    L: AcceptListener + 'static,
{
    let backoff = options.backoff.normalized();
    let mut delay = backoff.initial_delay;
    while let Some(next) = accept_iteration(&listener, &registry, &options, &backoff, delay).await {
        delay = next;
    }
    drop(listener);
    debug!("accept loop finished; listener released");
}

async fn accept_iteration<L>(
    listener: &L,
    registry: &Arc<Registry>,
    options: &AcceptLoopOptions,
    backoff: &BackoffConfig,
    delay: Duration,
) -> Option<Duration>
where
    L: AcceptListener,
{
    select! {
        biased;

        () = options.shutdown.cancelled() => None,
        res = listener.accept() => match res {
            Ok((stream, peer_addr)) => {
                debug!("accepted connection: peer_addr={peer_addr}");
                spawn_connection_task(
                    stream,
                    peer_addr,
                    Arc::clone(registry),
                    options.worker.clone(),
                    &options.tracker,
                );
                Some(backoff.initial_delay)
            }
            Err(e) => {
                let local_addr = listener.local_addr().ok();
                warn!("accept error: error={e:?}, local_addr={local_addr:?}");
                select! {
                    biased;

                    () = options.shutdown.cancelled() => None,
                    () = sleep(delay) => Some(backoff.next_delay(delay)),
                }
            }
        },
    }
}
