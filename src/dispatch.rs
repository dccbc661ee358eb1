//! Request dispatch: decode, resolve, invoke, encode.
//!
//! [`dispatch`] is the failure boundary between the transport and handler
//! code. Every path through it yields exactly one framed response; decode
//! failures, unknown functions, handler errors, and handler panics all
//! become [`Response::Error`] values rather than propagating.

use std::panic::{AssertUnwindSafe, catch_unwind};

use bytes::Bytes;
use log::{debug, error};
use serde_json::Value;
use thiserror::Error;

use crate::{
    envelope::{DecodeError, Response, decode_request, encode_response},
    frame::encode_frame,
    panic::PanicMessage,
    registry::{Handler, HandlerError, Registry},
};

/// Fixed payload sent when a response cannot be encoded.
const ENCODE_FAILURE_PAYLOAD: &[u8] =
    br#"{"status":"error","message":"Internal error: failed to encode response"}"#;

/// Reasons a request did not produce a result.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The payload is not a well-formed request.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// No handler is registered under the requested name.
    #[error("Function not found")]
    FunctionNotFound(String),
    /// The handler rejected the argument count or types.
    #[error("Execution error: invalid arguments: {0}")]
    InvalidArguments(String),
    /// The handler failed, or panicked, during an otherwise valid call.
    #[error("Execution error: {0}")]
    ExecutionFailed(String),
}

impl From<HandlerError> for DispatchError {
    fn from(error: HandlerError) -> Self {
        match error {
            HandlerError::InvalidArguments(message) => Self::InvalidArguments(message),
            HandlerError::ExecutionFailed(message) => Self::ExecutionFailed(message),
        }
    }
}

impl From<DispatchError> for Response {
    fn from(error: DispatchError) -> Self { Response::error(error.to_string()) }
}

/// Handle one raw request payload and return the framed response bytes.
///
/// ```
/// use serde_json::{Value, json};
/// use wirecall::{dispatch::dispatch, registry::RegistryBuilder};
///
/// let registry = RegistryBuilder::new().freeze();
/// let frame = dispatch(&registry, br#"{"function":"add","args":[2,3]}"#);
/// let body: Value = serde_json::from_slice(&frame[4..]).expect("response is JSON");
/// assert_eq!(body, json!({"status": "error", "message": "Function not found"}));
/// ```
#[must_use]
pub fn dispatch(registry: &Registry, payload: &[u8]) -> Bytes {
    let response = handle_request(registry, payload);
    encode_response(&response).unwrap_or_else(|e| {
        error!("failed to encode response: error={e}");
        fallback_frame()
    })
}

/// Handle one raw request payload and return the logical response.
#[must_use]
pub fn handle_request(registry: &Registry, payload: &[u8]) -> Response {
    match execute(registry, payload) {
        Ok(result) => Response::success(result),
        Err(e) => {
            debug!("request failed: error={e}");
            e.into()
        }
    }
}

fn execute(registry: &Registry, payload: &[u8]) -> Result<Value, DispatchError> {
    let request = decode_request(payload)?;
    let Some(handler) = registry.get(&request.function) else {
        debug!("function not found: name={}", request.function);
        return Err(DispatchError::FunctionNotFound(request.function));
    };
    invoke(handler, &request.function, &request.args)
}

/// Call `handler`, converting a panic into [`DispatchError::ExecutionFailed`].
fn invoke(handler: &dyn Handler, name: &str, args: &[Value]) -> Result<Value, DispatchError> {
    match catch_unwind(AssertUnwindSafe(|| handler.call(args))) {
        Ok(result) => Ok(result?),
        Err(panic) => {
            let message = PanicMessage::new(&*panic).to_string();
            error!("handler panicked: name={name}, panic={message}");
            Err(DispatchError::ExecutionFailed(message))
        }
    }
}

fn fallback_frame() -> Bytes {
    encode_frame(ENCODE_FAILURE_PAYLOAD)
        .unwrap_or_else(|_| Bytes::from_static(&[0, 0, 0, 0]))
}
