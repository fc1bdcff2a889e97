//! Wire-level types for the W3C WebDriver HTTP protocol and the BiDi
//! WebSocket protocol.
//!
//! This crate deliberately only depends on `serde`/`serde_json`: everything
//! here is a direct transcription of what travels on the wire, shared by the
//! HTTP command dispatcher and the BiDi multiplexer in the `oxidriver`
//! crate.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The fixed key the remote end uses to tag a DOM element reference in JSON,
/// in both directions.
///
/// <https://www.w3.org/TR/webdriver/#elements>
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// The key tagging a shadow root reference.
pub const SHADOW_ROOT_KEY: &str = "shadow-6066-11e4-a52e-4f735466cecf";

/// Identifier of a protocol method, e.g. `session.subscribe`.
pub type MethodId = Cow<'static, str>;

/// Identifier correlating a BiDi request with its response.
///
/// Ids are assigned monotonically per connection and are always positive.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(u64);

impl CallId {
    pub fn new(id: u64) -> Self {
        CallId(id)
    }

    pub fn inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallId({})", self.0)
    }
}

/// The W3C error payload as it appears on the wire, either at the top level
/// of a reply or embedded inside `value`.
///
/// <https://www.w3.org/TR/webdriver/#errors>
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    /// The W3C error code string, e.g. `"no such element"`.
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<String>,
    /// Arbitrary additional payload some drivers attach.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl WireError {
    /// Extracts a wire error from a `value` payload.
    ///
    /// A payload only counts as an error when it carries both an `error`
    /// string and a `message` string.
    pub fn from_value(value: &Value) -> Option<WireError> {
        let error = value.get("error")?.as_str()?;
        let message = value.get("message")?.as_str()?;
        Some(WireError {
            error: error.to_string(),
            message: message.to_string(),
            stacktrace: value
                .get("stacktrace")
                .and_then(Value::as_str)
                .map(str::to_string),
            data: value.get("data").cloned(),
        })
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for WireError {}

/// The top-level reply envelope of a W3C remote end.
///
/// Modern drivers put everything of interest into `value`; some grids still
/// report `sessionId` (and, on failure, the error triple) at the top level,
/// so all of those fields are kept.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerReply {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    #[serde(default)]
    pub value: Value,
    pub error: Option<String>,
    pub message: Option<String>,
    pub stacktrace: Option<String>,
}

impl ServerReply {
    /// The error carried at the top level of the envelope, if any.
    pub fn top_level_error(&self) -> Option<WireError> {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => Some(WireError {
                error: error.clone(),
                message: message.clone(),
                stacktrace: self.stacktrace.clone(),
                data: None,
            }),
            _ => None,
        }
    }

    /// The error embedded in `value`, if any.
    pub fn value_error(&self) -> Option<WireError> {
        WireError::from_value(&self.value)
    }
}

/// A BiDi command frame sent by the local end.
///
/// <https://w3c.github.io/webdriver-bidi/#protocol-definition>
#[derive(Debug, Serialize)]
pub struct BidiCommand<'a> {
    pub id: CallId,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<&'a Value>,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

/// A BiDi response frame, matched to an in-flight command by `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct BidiResponse {
    pub id: CallId,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub message: Option<String>,
    pub stacktrace: Option<String>,
}

impl BidiResponse {
    pub fn wire_error(&self) -> Option<WireError> {
        let error = self.error.as_ref()?;
        Some(WireError {
            error: error.clone(),
            message: self.message.clone().unwrap_or_default(),
            stacktrace: self.stacktrace.clone(),
            data: None,
        })
    }
}

/// A BiDi event frame, fanned out by `method`.
#[derive(Debug, Clone, Deserialize)]
pub struct BidiEvent {
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// An incoming BiDi frame: either a response to a previously submitted
/// command, identified by `id`, or a server-initiated event.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BidiMessage {
    Response(BidiResponse),
    Event(BidiEvent),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reply_value_error_requires_both_fields() {
        let reply: ServerReply = serde_json::from_value(json!({
            "value": {"error": "no such element", "message": "m", "stacktrace": "s"}
        }))
        .unwrap();
        let err = reply.value_error().unwrap();
        assert_eq!(err.error, "no such element");
        assert_eq!(err.message, "m");
        assert_eq!(err.stacktrace.as_deref(), Some("s"));

        let reply: ServerReply =
            serde_json::from_value(json!({"value": {"error": "looks-like"}})).unwrap();
        assert!(reply.value_error().is_none());
    }

    #[test]
    fn reply_top_level_error() {
        let reply: ServerReply = serde_json::from_value(json!({
            "error": "invalid session id",
            "message": "no session",
        }))
        .unwrap();
        let err = reply.top_level_error().unwrap();
        assert_eq!(err.error, "invalid session id");
        assert!(reply.value.is_null());
    }

    #[test]
    fn bidi_frame_discrimination() {
        let msg: BidiMessage =
            serde_json::from_str(r#"{"id":3,"result":{"ok":true}}"#).unwrap();
        match msg {
            BidiMessage::Response(resp) => {
                assert_eq!(resp.id, CallId::new(3));
                assert!(resp.error.is_none());
            }
            BidiMessage::Event(_) => panic!("expected a response"),
        }

        let msg: BidiMessage =
            serde_json::from_str(r#"{"method":"log.entryAdded","params":{"level":"info"}}"#)
                .unwrap();
        match msg {
            BidiMessage::Event(ev) => assert_eq!(ev.method, "log.entryAdded"),
            BidiMessage::Response(_) => panic!("expected an event"),
        }
    }

    #[test]
    fn bidi_command_serialization_omits_empty_fields() {
        let cmd = BidiCommand {
            id: CallId::new(1),
            method: "session.status",
            params: None,
            session_id: None,
        };
        assert_eq!(
            serde_json::to_string(&cmd).unwrap(),
            r#"{"id":1,"method":"session.status"}"#
        );
    }
}
