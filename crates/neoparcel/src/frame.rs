//! # Protocol Frames
//!
//! Defines the envelope of a remote invocation (Parcel vs Reply).
//!
//! ## Invariants
//! - **Panic Safety**: All decoding paths return `Result`, never panicking on unknown data.
//! - **Opaque Payloads**: Arguments and results stay encoded inside the frame;
//!   only the side that knows the action signature decodes them.
//! - **Return Path**: A Parcel without a return path is fire-and-forget and
//!   never produces a Reply.

use serde::Deserialize;
use serde::Serialize;

use crate::codec;
use crate::error::FailureReason;
use crate::error::Result;
use crate::gid::GlobalAddress;
use crate::gid::LocalityId;

/// Where the outcome of an invocation must be delivered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReturnPath {
    /// The locality holding the pending invocation.
    pub locality: LocalityId,
    /// The invocation id, unique per origin locality.
    pub invocation: u64,
}

impl ReturnPath {
    pub fn new(locality: LocalityId, invocation: u64) -> Self {
        Self { locality, invocation }
    }
}

/// An outbound call: run `action` against `destination`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub destination: GlobalAddress,
    /// Registered wire tag of the action.
    pub action: String,
    /// Encoded `Action::Args`.
    pub args: Vec<u8>,
    pub return_path: Option<ReturnPath>,
}

/// The outcome of one invocation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Encoded `Action::Output`.
    Value(Vec<u8>),
    Failed(FailureReason),
}

/// The answer to a Parcel, addressed by its return path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub return_path: ReturnPath,
    pub outcome: Outcome,
}

/// Top-level frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    Parcel(Parcel),
    Reply(Reply),
}

/// Serializes exactly like `Frame`, without owning the parcel.
#[derive(Serialize)]
enum FrameRef<'a> {
    Parcel(&'a Parcel),
}

impl Frame {
    /// Encode this frame into a transport payload.
    pub fn encode(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    /// Decode a frame from a transport payload.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }

    /// The locality this frame has to travel to.
    pub fn destination(&self) -> LocalityId {
        match self {
            Frame::Parcel(parcel) => parcel.destination.locality,
            Frame::Reply(reply) => reply.return_path.locality,
        }
    }
}

impl Parcel {
    pub fn new(destination: GlobalAddress, action: impl Into<String>, args: Vec<u8>) -> Self {
        Self {
            destination,
            action: action.into(),
            args,
            return_path: None,
        }
    }

    pub fn with_return_path(mut self, return_path: ReturnPath) -> Self {
        self.return_path = Some(return_path);
        self
    }

    /// Size of the payload `Frame::Parcel(self).encode()` would produce.
    pub fn framed_len(&self) -> Result<usize> {
        codec::encoded_len(&FrameRef::Parcel(self))
    }

    /// Builds the reply for this parcel, if anyone is waiting for one.
    pub fn reply(&self, outcome: Outcome) -> Option<Reply> {
        self.return_path.map(|return_path| Reply { return_path, outcome })
    }
}

impl From<Parcel> for Frame {
    fn from(parcel: Parcel) -> Self {
        Frame::Parcel(parcel)
    }
}

impl From<Reply> for Frame {
    fn from(reply: Reply) -> Self {
        Frame::Reply(reply)
    }
}
