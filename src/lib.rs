#![doc(html_root_url = "https://docs.rs/wirecall/latest")]
//! Public API for the `wirecall` library.
//!
//! `wirecall` serves remote procedure calls over persistent TCP
//! connections. Every message is a 4-byte big-endian length followed by a
//! UTF-8 JSON envelope; requests name a registered function and carry its
//! positional arguments, and each request receives exactly one success or
//! error response, in order, on the same connection.

pub mod builtins;
pub mod client;
pub mod connection;
pub mod dispatch;
pub mod envelope;
pub mod frame;
pub mod panic;
pub mod registry;
pub mod server;

pub use client::{ClientError, RpcClient};
pub use connection::{Connection, ConnectionError};
pub use envelope::{Request, Response};
pub use registry::{Handler, HandlerError, HandlerResult, Registration};
pub use server::{RpcServer, ServerConfig, ServerError, ServerState};
