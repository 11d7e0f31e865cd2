//! # Error Definitions
//!
//! Every way an invocation can fail, seen from the caller. Remote failures
//! arrive as `FailureReason` data and are mapped onto the same variants a
//! local failure would produce, so callers never need to know where the
//! target lived.

use neoparcel::ActionFault;
use neoparcel::FailureReason;
use neoparcel::GlobalAddress;

use crate::transport::TransportError;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Invocation of an empty `Function`.
    EmptyInvocation,
    /// A callable tag that was never registered.
    UnregisteredCallableType(String),
    /// A callable tag registered under a different call signature.
    SignatureMismatch(String),
    /// An action tag that was never registered, or that does not apply to
    /// the addressed component.
    UnknownAction(String),
    /// A component name that was never registered.
    UnknownComponent(String),
    /// The address does not resolve to a live entity.
    UnknownTarget(GlobalAddress),
    /// Argument, result or callable serialization failed.
    Encode(String),
    /// Argument, result, callable or frame deserialization failed.
    Decode(String),
    /// The action itself returned an error; the payload is untouched.
    RemoteAction(ActionFault),
    /// The transport failed; passed through as reported.
    Communication(TransportError),
    /// A second completion for an already resolved invocation.
    DuplicateResult(u64),
    /// A second, different registration under an existing tag.
    DuplicateRegistration(String),
    /// The promise was dropped without ever being completed.
    BrokenPromise,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyInvocation => write!(f, "invoked an empty function"),
            Self::UnregisteredCallableType(tag) => write!(f, "callable type '{}' is not registered", tag),
            Self::SignatureMismatch(tag) => write!(f, "callable type '{}' has a different signature", tag),
            Self::UnknownAction(tag) => write!(f, "unknown action '{}'", tag),
            Self::UnknownComponent(name) => write!(f, "unknown component '{}'", name),
            Self::UnknownTarget(gid) => write!(f, "unknown target {}", gid),
            Self::Encode(msg) => write!(f, "encode error: {}", msg),
            Self::Decode(msg) => write!(f, "decode error: {}", msg),
            Self::RemoteAction(fault) => write!(f, "remote action error: {}", fault),
            Self::Communication(e) => write!(f, "communication error: {}", e),
            Self::DuplicateResult(id) => write!(f, "duplicate result for invocation {}", id),
            Self::DuplicateRegistration(tag) => write!(f, "tag '{}' is already registered", tag),
            Self::BrokenPromise => write!(f, "promise dropped before completion"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RemoteAction(fault) => Some(fault),
            Self::Communication(e) => Some(e),
            _ => None,
        }
    }
}

impl From<neoparcel::Error> for Error {
    fn from(e: neoparcel::Error) -> Self {
        match e {
            neoparcel::Error::Encode(msg) => Self::Encode(msg),
            neoparcel::Error::Decode(msg) => Self::Decode(msg),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Communication(e)
    }
}

impl From<ActionFault> for Error {
    fn from(fault: ActionFault) -> Self {
        Self::RemoteAction(fault)
    }
}

impl From<FailureReason> for Error {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::UnknownTarget(gid) => Self::UnknownTarget(gid),
            FailureReason::UnknownAction(tag) => Self::UnknownAction(tag),
            FailureReason::UnknownComponent(name) => Self::UnknownComponent(name),
            FailureReason::UnregisteredCallableType(tag) => Self::UnregisteredCallableType(tag),
            FailureReason::Decode(msg) => Self::Decode(msg),
            FailureReason::Encode(msg) => Self::Encode(msg),
            FailureReason::Action(fault) => Self::RemoteAction(fault),
        }
    }
}

impl Error {
    /// The reason to report back over the wire when this error ends a
    /// remote execution.
    pub fn to_failure(&self) -> FailureReason {
        match self {
            Self::UnknownTarget(gid) => FailureReason::UnknownTarget(*gid),
            Self::UnknownAction(tag) => FailureReason::UnknownAction(tag.clone()),
            Self::UnknownComponent(name) => FailureReason::UnknownComponent(name.clone()),
            Self::UnregisteredCallableType(tag) => FailureReason::UnregisteredCallableType(tag.clone()),
            Self::Encode(msg) => FailureReason::Encode(msg.clone()),
            Self::Decode(msg) => FailureReason::Decode(msg.clone()),
            Self::RemoteAction(fault) => FailureReason::Action(fault.clone()),
            other => FailureReason::Action(ActionFault::new("runtime", other.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
