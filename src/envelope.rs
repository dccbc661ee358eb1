//! JSON envelopes carried inside each frame.
//!
//! A request is `{"function": <string>, "args": [<value>, ...]}`. A response
//! is either `{"status": "success", "result": <value>}` or
//! `{"status": "error", "message": <string>}`. Values are
//! [`serde_json::Value`] trees, so any JSON result is representable.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::frame::{FramingError, encode_frame};

/// A decoded call: the function name and its positional arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Registered name of the function to invoke.
    pub function: String,
    /// Positional arguments in call order.
    pub args: Vec<Value>,
}

impl Request {
    /// Build a request for `function` with `args`.
    #[must_use]
    pub fn new(function: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            function: function.into(),
            args,
        }
    }
}

/// Outcome of exactly one request.
///
/// ```
/// use serde_json::json;
/// use wirecall::envelope::Response;
///
/// let ok = serde_json::to_value(Response::success(json!(5))).expect("serialise");
/// assert_eq!(ok, json!({"status": "success", "result": 5}));
///
/// let err = serde_json::to_value(Response::error("Function not found")).expect("serialise");
/// assert_eq!(err, json!({"status": "error", "message": "Function not found"}));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    /// The handler returned a value.
    Success {
        /// Value produced by the handler; absent on the wire decodes as `null`.
        #[serde(default)]
        result: Value,
    },
    /// The request failed; `message` describes why.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl Response {
    /// Wrap a handler result.
    #[must_use]
    pub fn success(result: Value) -> Self { Self::Success { result } }

    /// Build an error response.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether this is a success response.
    #[must_use]
    pub const fn is_success(&self) -> bool { matches!(self, Self::Success { .. }) }
}

/// Reasons a payload could not be decoded into an envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not valid UTF-8 JSON.
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    /// The payload is valid JSON but not an object.
    #[error("Invalid request: expected a JSON object")]
    NotAnObject,
    /// `function` or `args` is absent.
    #[error("Missing 'function' or 'args' field")]
    MissingField,
    /// A required field has the wrong JSON type.
    #[error("Invalid request: '{field}' must be {expected}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the expected JSON type.
        expected: &'static str,
    },
    /// A response payload does not match either response shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(#[source] serde_json::Error),
}

/// Reasons an envelope could not be encoded into a frame.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// JSON serialisation failed.
    #[error("failed to serialise envelope: {0}")]
    Json(#[from] serde_json::Error),
    /// The serialised envelope does not fit in one frame.
    #[error(transparent)]
    Framing(#[from] FramingError),
}

/// Decode a request payload (the bytes after the length prefix).
///
/// Field presence is checked before field types so that a payload missing
/// either field always reports [`DecodeError::MissingField`].
///
/// # Errors
///
/// Returns the [`DecodeError`] variant describing the first problem found.
pub fn decode_request(payload: &[u8]) -> Result<Request, DecodeError> {
    let value: Value = serde_json::from_slice(payload).map_err(DecodeError::InvalidJson)?;
    let Value::Object(mut fields) = value else {
        return Err(DecodeError::NotAnObject);
    };
    let (Some(function), Some(args)) = (fields.remove("function"), fields.remove("args")) else {
        return Err(DecodeError::MissingField);
    };
    let Value::String(function) = function else {
        return Err(DecodeError::InvalidField {
            field: "function",
            expected: "a string",
        });
    };
    let Value::Array(args) = args else {
        return Err(DecodeError::InvalidField {
            field: "args",
            expected: "an array",
        });
    };
    Ok(Request { function, args })
}

/// Serialise `response` and wrap it in a length-prefixed frame.
///
/// # Errors
///
/// Returns an [`EncodeError`] if serialisation or framing fails.
pub fn encode_response(response: &Response) -> Result<Bytes, EncodeError> {
    let payload = serde_json::to_vec(response)?;
    Ok(encode_frame(&payload)?)
}

/// Serialise `request` into a JSON payload, without a length prefix.
///
/// # Errors
///
/// Returns [`EncodeError::Json`] if serialisation fails.
pub fn encode_request(request: &Request) -> Result<Vec<u8>, EncodeError> {
    Ok(serde_json::to_vec(request)?)
}

/// Decode a response payload (the bytes after the length prefix).
///
/// # Errors
///
/// Returns [`DecodeError::InvalidJson`] for malformed JSON and
/// [`DecodeError::InvalidResponse`] when the JSON has neither response shape.
pub fn decode_response(payload: &[u8]) -> Result<Response, DecodeError> {
    let value: Value = serde_json::from_slice(payload).map_err(DecodeError::InvalidJson)?;
    Response::deserialize(value).map_err(DecodeError::InvalidResponse)
}
