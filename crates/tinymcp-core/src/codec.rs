//! Envelope codec: pure, side-effect-free message encoding and decoding.
//!
//! [`encode`] and [`decode`] transform between [`Message`] values and a
//! transport-agnostic byte stream. Decoding validates structural
//! well-formedness strictly and rejects:
//!
//! - malformed JSON and non-object payloads
//! - a missing or wrong `jsonrpc` version field
//! - unknown outer fields beyond the defined envelope
//! - responses carrying both `result` and `error`, or neither
//! - ids with an unpairable shape (null, bool, float, array, object)
//!
//! The codec never touches registry or session state. Protocol-level
//! duplicate-id detection is stateful by nature and lives in the session's
//! in-flight table; the codec's contribution is rejecting id shapes that
//! could never be paired at all.
//!
//! `Message` deserializes through the same strict path, so
//! `serde_json::from_slice::<Message>` and [`decode`] agree exactly.

use crate::error::{EngineError, RpcError};
use crate::protocol::{Message, Notification, Request, RequestId, Response, JSONRPC_VERSION};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::borrow::Cow;

/// Encode a message to bytes.
pub fn encode(message: &Message) -> Result<Vec<u8>, EngineError> {
    serde_json::to_vec(message).map_err(EngineError::from)
}

/// Decode bytes into a message, validating the envelope strictly.
pub fn decode(bytes: &[u8]) -> Result<Message, EngineError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| EngineError::parse(e.to_string()))?;
    message_from_value(&value)
}

/// Validate a parsed JSON value as a protocol envelope.
pub fn message_from_value(value: &Value) -> Result<Message, EngineError> {
    let object = value
        .as_object()
        .ok_or_else(|| EngineError::invalid_request("envelope must be a JSON object"))?;

    match object.get("jsonrpc").and_then(Value::as_str) {
        Some(JSONRPC_VERSION) => {}
        Some(other) => {
            return Err(EngineError::invalid_request(format!(
                "unsupported jsonrpc version '{other}'"
            )));
        }
        None => {
            return Err(EngineError::invalid_request(
                "missing or non-string 'jsonrpc' field",
            ));
        }
    }

    if object.contains_key("method") {
        decode_call(object)
    } else {
        decode_response(object)
    }
}

fn decode_call(object: &serde_json::Map<String, Value>) -> Result<Message, EngineError> {
    for key in object.keys() {
        if !matches!(key.as_str(), "jsonrpc" | "id" | "method" | "params") {
            return Err(EngineError::invalid_request(format!(
                "unknown envelope field '{key}'"
            )));
        }
    }

    let method = object
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::invalid_request("'method' must be a string"))?
        .to_string();

    let params = match object.get("params") {
        None => None,
        Some(p @ (Value::Object(_) | Value::Array(_))) => Some(p.clone()),
        Some(_) => {
            return Err(EngineError::invalid_request(
                "'params' must be a structured value",
            ));
        }
    };

    if let Some(id_value) = object.get("id") {
        let id = decode_id(id_value)?;
        Ok(Message::Request(Request {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id,
            method: method.into(),
            params,
        }))
    } else {
        Ok(Message::Notification(Notification {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            method: method.into(),
            params,
        }))
    }
}

fn decode_response(object: &serde_json::Map<String, Value>) -> Result<Message, EngineError> {
    for key in object.keys() {
        if !matches!(key.as_str(), "jsonrpc" | "id" | "result" | "error") {
            return Err(EngineError::invalid_request(format!(
                "unknown envelope field '{key}'"
            )));
        }
    }

    let id = object
        .get("id")
        .ok_or_else(|| EngineError::invalid_request("response without an 'id' pairs with nothing"))
        .and_then(decode_id)?;

    let result = object.get("result").cloned();
    let error = object.get("error").map(decode_rpc_error).transpose()?;

    match (&result, &error) {
        (Some(_), Some(_)) => Err(EngineError::invalid_request(
            "response carries both 'result' and 'error'",
        )),
        (None, None) => Err(EngineError::invalid_request(
            "response carries neither 'result' nor 'error'",
        )),
        _ => Ok(Message::Response(Response {
            jsonrpc: Cow::Borrowed(JSONRPC_VERSION),
            id,
            result,
            error,
        })),
    }
}

/// Reject id shapes that could never be paired with an outstanding request.
fn decode_id(value: &Value) -> Result<RequestId, EngineError> {
    match value {
        Value::Number(n) => n.as_u64().map(RequestId::Number).ok_or_else(|| {
            EngineError::invalid_request("numeric id must be a non-negative integer")
        }),
        Value::String(s) => Ok(RequestId::String(s.clone())),
        _ => Err(EngineError::invalid_request(
            "id must be an integer or a string",
        )),
    }
}

fn decode_rpc_error(value: &Value) -> Result<RpcError, EngineError> {
    let object = value
        .as_object()
        .ok_or_else(|| EngineError::invalid_request("'error' must be a JSON object"))?;

    for key in object.keys() {
        if !matches!(key.as_str(), "code" | "message" | "data") {
            return Err(EngineError::invalid_request(format!(
                "unknown error field '{key}'"
            )));
        }
    }

    let code = object
        .get("code")
        .and_then(Value::as_i64)
        .ok_or_else(|| EngineError::invalid_request("'error.code' must be an integer"))?
        as i32;
    let message = object
        .get("message")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::invalid_request("'error.message' must be a string"))?
        .to_string();

    Ok(RpcError {
        code,
        message,
        data: object.get("data").cloned(),
    })
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        message_from_value(&value).map_err(serde::de::Error::custom)
    }
}
