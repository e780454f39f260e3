//! Method-call message types and argument decoding.
//!
//! A host issues a [`MethodCall`] (method name plus JSON arguments) and
//! receives either a JSON value or a [`CallError`].
//!
//! # Format
//!
//! ```json
//! { "method": "connect", "arguments": { "serverUrl": "wss://...", "options": { ... } } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::session::{CloseRequest, ConnectOptions, MAX_PING_INTERVAL};

use super::event::WEBSOCKET_ERROR_CODE;

// ============================================================================
// Constants
// ============================================================================

/// Error code for malformed or missing call input.
pub const INVALID_ARGUMENTS_CODE: &str = "INVALID_ARGUMENTS";

/// Error code for calls made without a live transport.
pub const NOT_CONNECTED_CODE: &str = "NOT_CONNECTED";

/// Error code for unknown methods.
pub const NOT_IMPLEMENTED_CODE: &str = "NOT_IMPLEMENTED";

// ============================================================================
// MethodCall
// ============================================================================

/// A method call from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Method name, e.g. `sendTextMessage`.
    pub method: String,

    /// Argument container, if any.
    #[serde(default)]
    pub arguments: Option<Value>,
}

impl MethodCall {
    /// Creates a call with arguments.
    #[inline]
    #[must_use]
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments: Some(arguments),
        }
    }

    /// Creates a call with no argument container.
    #[inline]
    #[must_use]
    pub fn bare(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: None,
        }
    }

    /// Parses a call from its JSON envelope.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// CallError
// ============================================================================

/// Error result of a method call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallError {
    /// Stable error code.
    pub code: String,

    /// Human-readable description.
    pub message: String,

    /// Optional extra data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl CallError {
    /// Creates a call error without details.
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a `NOT_IMPLEMENTED` error for an unknown method.
    #[inline]
    #[must_use]
    pub fn not_implemented(method: &str) -> Self {
        Self::new(NOT_IMPLEMENTED_CODE, format!("Unknown method: {method}"))
    }
}

impl From<Error> for CallError {
    fn from(err: Error) -> Self {
        let code = if err.is_invalid_argument() {
            INVALID_ARGUMENTS_CODE
        } else if matches!(err, Error::NotConnected) {
            NOT_CONNECTED_CODE
        } else {
            WEBSOCKET_ERROR_CODE
        };

        match err {
            Error::InvalidArgument { message } => Self::new(code, message),
            other => Self::new(code, other.to_string()),
        }
    }
}

// ============================================================================
// Argument Decoding
// ============================================================================

/// Decodes `connect` arguments.
///
/// `serverUrl` is required. Malformed `headers` entries are skipped.
pub fn decode_connect(arguments: Option<&Value>) -> Result<ConnectOptions> {
    let args = arguments
        .and_then(Value::as_object)
        .ok_or_else(|| Error::invalid_argument("Missing serverUrl"))?;

    let server_url = args
        .get("serverUrl")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::invalid_argument("Missing serverUrl"))?;

    let mut options = ConnectOptions::parse(server_url)?;

    let Some(extra) = args.get("options").and_then(Value::as_object) else {
        return Ok(options);
    };

    if let Some(headers) = extra.get("headers").and_then(Value::as_object) {
        let headers: FxHashMap<String, String> = headers
            .iter()
            .filter_map(|(name, value)| value.as_str().map(|v| (name.clone(), v.to_string())))
            .collect();
        options = options.with_headers(headers);
    }

    match extra.get("pingInterval") {
        None | Some(Value::Null) => {}
        Some(value) => {
            let secs = value
                .as_u64()
                .filter(|secs| (1..=MAX_PING_INTERVAL.as_secs()).contains(secs))
                .ok_or_else(|| {
                    Error::invalid_argument(format!(
                        "pingInterval must be between 1 and {} seconds",
                        MAX_PING_INTERVAL.as_secs()
                    ))
                })?;
            options = options.with_ping_interval(Duration::from_secs(secs));
        }
    }

    Ok(options)
}

/// Decodes `disconnect` arguments.
///
/// The container is required; `code` and `reason` fall back to defaults.
pub fn decode_disconnect(arguments: Option<&Value>) -> Result<CloseRequest> {
    let args = arguments
        .and_then(Value::as_object)
        .ok_or_else(|| Error::invalid_argument("Missing arguments"))?;

    let mut request = CloseRequest::default();

    if let Some(code) = args.get("code").and_then(Value::as_i64) {
        request.code = u16::try_from(code)
            .map_err(|_| Error::invalid_argument(format!("Close code out of range: {code}")))?;
    }

    if let Some(reason) = args.get("reason").and_then(Value::as_str) {
        request.reason = reason.to_string();
    }

    Ok(request)
}

/// Decodes `sendTextMessage` arguments.
pub fn decode_text(arguments: Option<&Value>) -> Result<String> {
    arguments
        .and_then(|args| args.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_argument("Missing message"))
}

/// Decodes `sendByteMessage` arguments.
///
/// Accepts either an array of byte values or a base64 string.
pub fn decode_bytes(arguments: Option<&Value>) -> Result<Vec<u8>> {
    let message = arguments
        .and_then(|args| args.get("message"))
        .ok_or_else(|| Error::invalid_argument("Missing message"))?;

    match message {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| Error::invalid_argument("Byte values must be 0-255"))
            })
            .collect(),
        Value::String(encoded) => BASE64
            .decode(encoded)
            .map_err(|e| Error::invalid_argument(format!("Invalid base64 message: {e}"))),
        _ => Err(Error::invalid_argument("Missing message")),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_method_call_from_json() {
        let call = MethodCall::from_json(r#"{"method":"sendTextMessage","arguments":{"message":"hi"}}"#)
            .expect("envelope");
        assert_eq!(call.method, "sendTextMessage");
        assert_eq!(call.arguments, Some(json!({ "message": "hi" })));

        let call = MethodCall::from_json(r#"{"method":"disconnect"}"#).expect("bare envelope");
        assert_eq!(call.arguments, None);
    }

    #[test]
    fn test_method_call_from_bad_json() {
        let err = MethodCall::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert_eq!(CallError::from(err).code, INVALID_ARGUMENTS_CODE);
    }

    #[test]
    fn test_decode_connect_full() {
        let args = json!({
            "serverUrl": "wss://echo.example/socket",
            "options": {
                "headers": { "Authorization": "Bearer t", "X-Bad": 5 },
                "pingInterval": 15
            }
        });

        let options = decode_connect(Some(&args)).expect("valid args");
        assert_eq!(options.server_url.as_str(), "wss://echo.example/socket");
        assert_eq!(options.headers.len(), 1);
        assert_eq!(options.headers["Authorization"], "Bearer t");
        assert_eq!(options.ping_interval, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_decode_connect_missing_url() {
        let err = decode_connect(Some(&json!({}))).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = decode_connect(None).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_decode_connect_empty_url() {
        let err = decode_connect(Some(&json!({ "serverUrl": "" }))).unwrap_err();
        assert_eq!(CallError::from(err).code, INVALID_ARGUMENTS_CODE);
    }

    #[test]
    fn test_decode_connect_rejects_non_positive_ping() {
        let args = json!({ "serverUrl": "ws://h/", "options": { "pingInterval": 0 } });
        assert!(decode_connect(Some(&args)).is_err());
    }

    #[test]
    fn test_decode_connect_rejects_out_of_range_ping() {
        for ping in [json!(-5), json!(i64::MAX), json!(u64::MAX), json!(1.5)] {
            let args = json!({ "serverUrl": "ws://h/", "options": { "pingInterval": ping } });
            let err = decode_connect(Some(&args)).unwrap_err();
            assert_eq!(CallError::from(err).code, INVALID_ARGUMENTS_CODE);
        }

        let max = MAX_PING_INTERVAL.as_secs();
        let args = json!({ "serverUrl": "ws://h/", "options": { "pingInterval": max } });
        let options = decode_connect(Some(&args)).expect("max accepted");
        assert_eq!(options.ping_interval, Some(MAX_PING_INTERVAL));
    }

    #[test]
    fn test_decode_disconnect_defaults() {
        let request = decode_disconnect(Some(&json!({}))).expect("defaults");
        assert_eq!(request, CloseRequest::default());

        let request =
            decode_disconnect(Some(&json!({ "code": 1001, "reason": "bye" }))).expect("custom");
        assert_eq!(request.code, 1001);
        assert_eq!(request.reason, "bye");
    }

    #[test]
    fn test_decode_disconnect_requires_container() {
        let err = decode_disconnect(None).unwrap_err();
        assert_eq!(CallError::from(err).message, "Missing arguments");
    }

    #[test]
    fn test_decode_text() {
        assert_eq!(
            decode_text(Some(&json!({ "message": "hi" }))).expect("text"),
            "hi"
        );
        assert!(decode_text(Some(&json!({ "message": 1 }))).is_err());
    }

    #[test]
    fn test_decode_bytes_array_and_base64() {
        let from_array = decode_bytes(Some(&json!({ "message": [1, 2, 255] }))).expect("array");
        assert_eq!(from_array, vec![1, 2, 255]);

        let from_b64 = decode_bytes(Some(&json!({ "message": "AQL/" }))).expect("base64");
        assert_eq!(from_b64, vec![1, 2, 255]);

        assert!(decode_bytes(Some(&json!({ "message": [256] }))).is_err());
    }

    #[test]
    fn test_call_error_from_not_connected() {
        let err = CallError::from(Error::NotConnected);
        assert_eq!(err.code, NOT_CONNECTED_CODE);
    }
}
