//! # Error Definitions
//!
//! Two kinds of failure live here. `Error` is this side of the wire failing
//! to produce or read bytes. `FailureReason` is the far side reporting that
//! the execution itself failed; it is data, carried inside a Reply.

use serde::Deserialize;
use serde::Serialize;

use crate::gid::GlobalAddress;

/// Codec failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A value could not be serialized.
    Encode(String),
    /// Bytes could not be read back as the expected value.
    Decode(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(msg) => write!(f, "encode error: {}", msg),
            Self::Decode(msg) => write!(f, "decode error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

/// A specialized Result type for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A domain error raised by an action's own code.
///
/// The payload is delivered to the caller byte-for-byte as it was raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFault {
    /// Short machine-readable kind, e.g. `"uninitialized"`.
    pub code: String,
    pub message: String,
}

impl ActionFault {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ActionFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ActionFault {}

/// Reasons for a remote failure (the "Err" side of a Reply).
///
/// These are distinct from `Error`; these represent the *remote* execution
/// failing, whereas `Error` represents the local codec failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The destination does not host the addressed entity.
    UnknownTarget(GlobalAddress),
    /// The action tag is not registered at the destination, or does not
    /// apply to the addressed component.
    UnknownAction(String),
    /// A creation request names a component type the destination never registered.
    UnknownComponent(String),
    /// A shipped callable names a tag the destination never registered.
    UnregisteredCallableType(String),
    /// The destination could not decode the arguments.
    Decode(String),
    /// The destination could not encode the result.
    Encode(String),
    /// The action ran and returned a domain error.
    Action(ActionFault),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTarget(gid) => write!(f, "unknown target {}", gid),
            Self::UnknownAction(tag) => write!(f, "unknown action '{}'", tag),
            Self::UnknownComponent(name) => write!(f, "unknown component '{}'", name),
            Self::UnregisteredCallableType(tag) => write!(f, "unregistered callable type '{}'", tag),
            Self::Decode(msg) => write!(f, "remote decode error: {}", msg),
            Self::Encode(msg) => write!(f, "remote encode error: {}", msg),
            Self::Action(fault) => write!(f, "action failed: {}", fault),
        }
    }
}

impl From<Error> for FailureReason {
    fn from(e: Error) -> Self {
        match e {
            Error::Encode(msg) => Self::Encode(msg),
            Error::Decode(msg) => Self::Decode(msg),
        }
    }
}
