//! A client for calling functions on an [`RpcServer`](crate::server::RpcServer).
//!
//! [`RpcClient`] holds one persistent connection and issues calls on it
//! strictly one at a time: each call sends one request frame and waits for
//! exactly one response frame.
//!
//! ```no_run
//! use serde_json::json;
//! use wirecall::client::RpcClient;
//!
//! # async fn run() -> Result<(), wirecall::client::ClientError> {
//! let mut client = RpcClient::connect("127.0.0.1:8080").await?;
//! let sum = client.call("add", vec![json!(2), json!(3)]).await?;
//! assert_eq!(sum, json!(5));
//! client.disconnect().await;
//! # Ok(())
//! # }
//! ```

mod error;

pub use error::ClientError;
use log::debug;
use serde_json::Value;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpStream, ToSocketAddrs},
};

use crate::{
    connection::Connection,
    envelope::{Request, Response, decode_response, encode_request},
};

/// A connected RPC client.
#[derive(Debug)]
pub struct RpcClient<T = TcpStream> {
    connection: Connection<T>,
}

impl RpcClient<TcpStream> {
    /// Open a TCP connection to `addr`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the connection cannot be established.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await.map_err(ClientError::Connect)?;
        if let Err(e) = stream.set_nodelay(true) {
            debug!("failed to set TCP_NODELAY: error={e}");
        }
        Ok(Self::new(stream))
    }
}

impl<T> RpcClient<T> {
    /// Wrap an already connected transport.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            connection: Connection::new(transport),
        }
    }

    /// Whether the underlying connection is still open.
    #[must_use]
    pub const fn is_connected(&self) -> bool { self.connection.is_open() }
}

impl<T> RpcClient<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Call `function` with positional `args` and return its result.
    ///
    /// # Errors
    ///
    /// Transport and envelope failures are returned as
    /// [`ClientError::Connection`], [`ClientError::Encode`], or
    /// [`ClientError::Protocol`]. Error responses are classified by
    /// [`ClientError::from_remote`].
    pub async fn call(&mut self, function: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        let payload = encode_request(&Request::new(function, args))?;
        match self.call_raw(&payload).await? {
            Response::Success { result } => Ok(result),
            Response::Error { message } => Err(ClientError::from_remote(function, message)),
        }
    }

    /// Send `payload` as one frame, unvalidated, and return the decoded reply.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connection`] if the exchange fails and
    /// [`ClientError::Protocol`] if the reply is not a response envelope.
    pub async fn call_raw(&mut self, payload: &[u8]) -> Result<Response, ClientError> {
        self.connection.send_frame(payload).await?;
        let reply = self.connection.receive_frame().await?;
        Ok(decode_response(&reply)?)
    }

    /// Close the connection. Later calls fail with a connection error.
    pub async fn disconnect(&mut self) { self.connection.close().await; }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::io::{DuplexStream, duplex};

    use super::*;
    use crate::{connection::ConnectionError, envelope::encode_response};

    /// Answer each request on `server` with the next canned response.
    async fn scripted_server(server: DuplexStream, replies: Vec<Response>) -> Vec<Value> {
        let mut connection = Connection::new(server);
        let mut seen = Vec::new();
        for reply in replies {
            let request = connection.receive_frame().await.expect("receive request");
            seen.push(serde_json::from_slice(&request).expect("request is JSON"));
            let frame = encode_response(&reply).expect("encode reply");
            connection.send(&frame).await.expect("send reply");
        }
        seen
    }

    #[tokio::test]
    async fn call_sends_request_and_returns_result() {
        let (client_end, server_end) = duplex(256);
        let server = tokio::spawn(scripted_server(server_end, vec![Response::success(json!(5))]));
        let mut client = RpcClient::new(client_end);

        let result = client
            .call("add", vec![json!(2), json!(3)])
            .await
            .expect("call succeeds");

        assert_eq!(result, json!(5));
        let seen = server.await.expect("join scripted server");
        assert_eq!(seen, vec![json!({"function": "add", "args": [2, 3]})]);
    }

    #[tokio::test]
    async fn error_responses_are_classified() {
        let (client_end, server_end) = duplex(256);
        tokio::spawn(scripted_server(
            server_end,
            vec![
                Response::error("Function not found"),
                Response::error("Execution error: Division by zero"),
            ],
        ));
        let mut client = RpcClient::new(client_end);

        let missing = client.call("nope", vec![]).await.expect_err("unknown function");
        assert!(matches!(missing, ClientError::FunctionNotFound(ref name) if name == "nope"));
        let failed = client
            .call("divide", vec![json!(1), json!(0)])
            .await
            .expect_err("division by zero");
        assert!(matches!(failed, ClientError::Execution(_)));
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn server_hangup_is_a_connection_error() {
        let (client_end, server_end) = duplex(256);
        drop(server_end);
        let mut client = RpcClient::new(client_end);

        let err = client.call("add", vec![]).await.expect_err("peer gone");

        assert!(matches!(err, ClientError::Connection(_)));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn calls_after_disconnect_fail() {
        let (client_end, _server_end) = duplex(256);
        let mut client = RpcClient::new(client_end);
        client.disconnect().await;

        let err = client.call_raw(b"{}").await.expect_err("closed client");

        assert!(matches!(err, ClientError::Connection(ConnectionError::Closed)));
    }
}
