use std::io;
use std::time::Duration;

use async_tungstenite::tungstenite;
use base64::DecodeError;
use serde_json::Value;
use thiserror::Error;

use oxidriver_types::WireError;

pub type Result<T, E = WebDriverError> = std::result::Result<T, E>;

/// The closed set of failure kinds a W3C remote end reports, mirrored by
/// their wire code strings.
///
/// <https://www.w3.org/TR/webdriver/#errors>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    ElementClickIntercepted,
    ElementNotInteractable,
    InsecureCertificate,
    InvalidArgument,
    InvalidCookieDomain,
    InvalidElementState,
    InvalidSelector,
    InvalidSessionId,
    JavaScriptError,
    MoveTargetOutOfBounds,
    NoSuchAlert,
    NoSuchCookie,
    NoSuchElement,
    NoSuchFrame,
    NoSuchShadowRoot,
    NoSuchWindow,
    ScriptTimeout,
    SessionNotCreated,
    StaleElementReference,
    DetachedShadowRoot,
    Timeout,
    UnableToSetCookie,
    UnableToCaptureScreen,
    UnexpectedAlertOpen,
    UnknownCommand,
    UnknownError,
    UnknownMethod,
    UnsupportedOperation,
}

impl ErrorKind {
    /// The W3C wire code for this kind.
    pub fn as_w3c(self) -> &'static str {
        match self {
            ErrorKind::ElementClickIntercepted => "element click intercepted",
            ErrorKind::ElementNotInteractable => "element not interactable",
            ErrorKind::InsecureCertificate => "insecure certificate",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::InvalidCookieDomain => "invalid cookie domain",
            ErrorKind::InvalidElementState => "invalid element state",
            ErrorKind::InvalidSelector => "invalid selector",
            ErrorKind::InvalidSessionId => "invalid session id",
            ErrorKind::JavaScriptError => "javascript error",
            ErrorKind::MoveTargetOutOfBounds => "move target out of bounds",
            ErrorKind::NoSuchAlert => "no such alert",
            ErrorKind::NoSuchCookie => "no such cookie",
            ErrorKind::NoSuchElement => "no such element",
            ErrorKind::NoSuchFrame => "no such frame",
            ErrorKind::NoSuchShadowRoot => "no such shadow root",
            ErrorKind::NoSuchWindow => "no such window",
            ErrorKind::ScriptTimeout => "script timeout",
            ErrorKind::SessionNotCreated => "session not created",
            ErrorKind::StaleElementReference => "stale element reference",
            ErrorKind::DetachedShadowRoot => "detached shadow root",
            ErrorKind::Timeout => "timeout",
            ErrorKind::UnableToSetCookie => "unable to set cookie",
            ErrorKind::UnableToCaptureScreen => "unable to capture screen",
            ErrorKind::UnexpectedAlertOpen => "unexpected alert open",
            ErrorKind::UnknownCommand => "unknown command",
            ErrorKind::UnknownError => "unknown error",
            ErrorKind::UnknownMethod => "unknown method",
            ErrorKind::UnsupportedOperation => "unsupported operation",
        }
    }

    /// Maps a wire code back to a kind. Unrecognised codes become
    /// [`ErrorKind::UnknownError`].
    pub fn from_w3c(code: &str) -> ErrorKind {
        match code {
            "element click intercepted" => ErrorKind::ElementClickIntercepted,
            "element not interactable" => ErrorKind::ElementNotInteractable,
            "insecure certificate" => ErrorKind::InsecureCertificate,
            "invalid argument" => ErrorKind::InvalidArgument,
            "invalid cookie domain" => ErrorKind::InvalidCookieDomain,
            "invalid element state" => ErrorKind::InvalidElementState,
            "invalid selector" => ErrorKind::InvalidSelector,
            "invalid session id" => ErrorKind::InvalidSessionId,
            "javascript error" => ErrorKind::JavaScriptError,
            "move target out of bounds" => ErrorKind::MoveTargetOutOfBounds,
            "no such alert" => ErrorKind::NoSuchAlert,
            "no such cookie" => ErrorKind::NoSuchCookie,
            "no such element" => ErrorKind::NoSuchElement,
            "no such frame" => ErrorKind::NoSuchFrame,
            "no such shadow root" => ErrorKind::NoSuchShadowRoot,
            "no such window" => ErrorKind::NoSuchWindow,
            "script timeout" => ErrorKind::ScriptTimeout,
            "session not created" => ErrorKind::SessionNotCreated,
            "stale element reference" => ErrorKind::StaleElementReference,
            "detached shadow root" => ErrorKind::DetachedShadowRoot,
            "timeout" => ErrorKind::Timeout,
            "unable to set cookie" => ErrorKind::UnableToSetCookie,
            "unable to capture screen" => ErrorKind::UnableToCaptureScreen,
            "unexpected alert open" => ErrorKind::UnexpectedAlertOpen,
            "unknown command" => ErrorKind::UnknownCommand,
            "unknown error" => ErrorKind::UnknownError,
            "unknown method" => ErrorKind::UnknownMethod,
            "unsupported operation" => ErrorKind::UnsupportedOperation,
            _ => ErrorKind::UnknownError,
        }
    }
}

/// A W3C protocol failure reported by the remote end, preserved verbatim:
/// kind, message, optional stacktrace and data payload, plus the HTTP status
/// the reply arrived with (0 for BiDi and locally raised failures).
#[derive(Debug, Clone, Error)]
#[error("{}: {message}", .kind.as_w3c())]
pub struct ProtocolError {
    pub kind: ErrorKind,
    pub message: String,
    pub stacktrace: Option<String>,
    pub data: Option<Value>,
    pub http_status: u16,
}

impl ProtocolError {
    pub fn new(wire: WireError, http_status: u16) -> Self {
        ProtocolError {
            kind: ErrorKind::from_w3c(&wire.error),
            message: wire.message,
            stacktrace: wire.stacktrace,
            data: wire.data,
            http_status,
        }
    }

    /// A failure raised locally, never received from the wire.
    pub fn local(kind: ErrorKind, message: impl Into<String>) -> Self {
        ProtocolError {
            kind,
            message: message.into(),
            stacktrace: None,
            data: None,
            http_status: 0,
        }
    }
}

#[derive(Debug, Error)]
pub enum WebDriverError {
    /// A named W3C failure from the remote end.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("{0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Ws(#[from] tungstenite::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    Decode(#[from] DecodeError),
    #[error("got content type {0:?}, expected \"application/json\"")]
    NotJson(String),
    #[error("bad server reply status: {0}")]
    BadStatus(u16),
    #[error("no active session")]
    NoSession,
    #[error("a session already exists")]
    SessionExists,
    #[error("session is closed")]
    SessionClosed,
    #[error("wait condition not met after {0:?}")]
    WaitTimeout(Duration),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("driver process exited during startup with status {0:?}")]
    DriverExited(Option<i32>),
    #[error("driver did not become reachable on port {0}")]
    DriverUnreachable(u16),
    /// A reply that parsed but did not have the expected shape.
    #[error("unexpected reply shape: {0}")]
    UnexpectedReply(String),
}

impl WebDriverError {
    /// The protocol error kind, when this is a remote W3C failure.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            WebDriverError::Protocol(err) => Some(err.kind),
            _ => None,
        }
    }

    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        WebDriverError::InvalidArgument(msg.into())
    }

    pub(crate) fn unexpected(msg: impl Into<String>) -> Self {
        WebDriverError::UnexpectedReply(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn w3c_codes_round_trip() {
        for kind in [
            ErrorKind::NoSuchElement,
            ErrorKind::StaleElementReference,
            ErrorKind::UnexpectedAlertOpen,
            ErrorKind::DetachedShadowRoot,
            ErrorKind::UnsupportedOperation,
        ] {
            assert_eq!(ErrorKind::from_w3c(kind.as_w3c()), kind);
        }
    }

    #[test]
    fn unknown_code_maps_to_unknown_error() {
        assert_eq!(
            ErrorKind::from_w3c("some future failure"),
            ErrorKind::UnknownError
        );
    }

    #[test]
    fn protocol_error_preserves_wire_fields() {
        let wire = WireError {
            error: "no such element".into(),
            message: "m".into(),
            stacktrace: Some("s".into()),
            data: None,
        };
        let err = ProtocolError::new(wire, 404);
        assert_eq!(err.kind, ErrorKind::NoSuchElement);
        assert_eq!(err.message, "m");
        assert_eq!(err.stacktrace.as_deref(), Some("s"));
        assert_eq!(err.http_status, 404);
        assert_eq!(err.to_string(), "no such element: m");
    }
}
