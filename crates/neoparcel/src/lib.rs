//! # Neoparcel
//!
//! The wire vocabulary of remote action invocation.
//!
//! ## Architecture
//!
//! A locality talks to another locality with exactly two kinds of frames:
//!
//! - **Parcel**: "run action `tag` on `destination` with these encoded
//!   arguments, and reply to this return path".
//! - **Reply**: "the invocation named by this return path finished with this
//!   outcome".
//!
//! This crate knows nothing about components, registries or scheduling. It
//! names things (`GlobalAddress`, `LocalityId`), moves their encodings in and
//! out of frames, and describes the ways a remote execution can fail
//! (`FailureReason`).

pub mod codec;
pub mod error;
pub mod frame;
pub mod gid;

pub use codec::decode;
pub use codec::encode;
pub use error::ActionFault;
pub use error::Error;
pub use error::FailureReason;
pub use error::Result;
pub use frame::Frame;
pub use frame::Outcome;
pub use frame::Parcel;
pub use frame::Reply;
pub use frame::ReturnPath;
pub use gid::GlobalAddress;
pub use gid::LocalityId;

#[cfg(test)]
mod tests;
