//! Per-connection request loop.

use std::{net::SocketAddr, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use futures::FutureExt;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
    select,
    time::{sleep, timeout},
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::{
    connection::{Connection, ConnectionError},
    dispatch::dispatch,
    panic::PanicMessage,
    registry::Registry,
};

#[derive(Clone, Debug)]
pub(super) struct WorkerOptions {
    pub shutdown: CancellationToken,
    pub idle_timeout: Option<Duration>,
    pub max_frame_length: usize,
    pub shutdown_grace: Duration,
}

#[cfg(test)]
impl WorkerOptions {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            shutdown,
            idle_timeout: None,
            max_frame_length: crate::frame::DEFAULT_MAX_FRAME_LENGTH,
            shutdown_grace: super::config::DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Spawn a task serving `stream`, logging and discarding any panic.
pub(super) fn spawn_connection_task(
    stream: TcpStream,
    peer_addr: SocketAddr,
    registry: Arc<Registry>,
    options: WorkerOptions,
    tracker: &TaskTracker,
) {
    let span = info_span!("connection", %peer_addr);
    tracker.spawn(
        async move {
            let served = AssertUnwindSafe(serve_connection(stream, &registry, &options))
                .catch_unwind()
                .await;
            if let Err(panic) = served {
                let panic_msg = PanicMessage::new(&*panic);
                error!(panic = %panic_msg, %peer_addr, "connection task panicked");
            }
        }
        .instrument(span),
    );
}

enum Inbound {
    Request(Vec<u8>),
    Disconnected,
    IdleTimeout,
}

/// Answer requests on `stream` in order until the peer leaves, an I/O error
/// occurs, the idle timeout elapses, or the server shuts down.
///
/// Returns the number of responses sent.
pub(super) async fn serve_connection<T>(stream: T, registry: &Registry, options: &WorkerOptions) -> u64
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let mut connection = Connection::new(stream).with_max_frame_length(options.max_frame_length);
    let mut served = 0;
    while connection.is_open() {
        let inbound = select! {
            biased;

            () = options.shutdown.cancelled() => {
                debug!("server stopping; closing connection");
                break;
            }
            inbound = next_request(&mut connection, options.idle_timeout) => inbound,
        };
        let payload = match inbound {
            Ok(Inbound::Request(payload)) => payload,
            Ok(Inbound::Disconnected) => {
                debug!("client disconnected");
                break;
            }
            Ok(Inbound::IdleTimeout) => {
                info!(timeout = ?options.idle_timeout, "idle timeout elapsed; closing connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "failed to read request");
                break;
            }
        };
        let response = dispatch(registry, &payload);
        let sent = select! {
            biased;

            sent = connection.send(&response) => sent,
            () = grace_elapsed(options) => {
                warn!(
                    grace = ?options.shutdown_grace,
                    "peer not reading during shutdown; dropping connection"
                );
                return served;
            }
        };
        if let Err(e) = sent {
            warn!(error = %e, "failed to send response");
            break;
        }
        served += 1;
    }
    connection.close().await;
    debug!(responses = served, "connection closed");
    served
}

/// Resolves once shutdown has been requested and the grace period has passed.
async fn grace_elapsed(options: &WorkerOptions) {
    options.shutdown.cancelled().await;
    sleep(options.shutdown_grace).await;
}

/// Read the next request payload.
///
/// The idle timeout covers only the wait for a length prefix; once a prefix
/// arrives the payload is read to completion.
async fn next_request<T>(
    connection: &mut Connection<T>,
    idle_timeout: Option<Duration>,
) -> Result<Inbound, ConnectionError>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    let prefix = match idle_timeout {
        Some(limit) => match timeout(limit, connection.receive_length_prefix()).await {
            Ok(prefix) => prefix,
            Err(_) => return Ok(Inbound::IdleTimeout),
        },
        None => connection.receive_length_prefix().await,
    };
    let len = match prefix {
        Ok(len) => len,
        Err(ConnectionError::PeerClosed { received: 0, .. }) => return Ok(Inbound::Disconnected),
        Err(e) => return Err(e),
    };
    connection.receive_payload(len).await.map(Inbound::Request)
}
