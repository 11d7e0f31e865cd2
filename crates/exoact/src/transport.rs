//! # Transport Abstraction
//!
//! A minimal, async interface for moving bytes between localities.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: The Transport knows nothing about parcels, actions or
//!   components. It moves opaque buffers to a named locality.
//! - **One-Way**: Sending does not wait for an answer. Replies are ordinary
//!   inbound messages, correlated by the runtime through return paths.
//! - **At-Most-Once**: A payload is delivered once or not at all; the runtime
//!   never retries.

use std::fmt;

use neoparcel::LocalityId;

/// Errors that occur at the network/transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peer is unreachable or the connection was dropped.
    ConnectionLost(String),
    /// The destination locality is not known to this transport.
    UnknownLocality(LocalityId),
    /// The payload exceeds the configured frame size.
    PayloadTooLarge { size: usize, limit: usize },
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "Connection lost: {}", msg),
            Self::UnknownLocality(id) => write!(f, "No route to {}", id),
            Self::PayloadTooLarge { size, limit } => {
                write!(f, "Payload of {} bytes exceeds limit of {} bytes", size, limit)
            }
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

pub type Result<T> = std::result::Result<T, TransportError>;

/// A mechanism to ship byte buffers between localities.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Hands a payload to the network for delivery to `destination`.
    ///
    /// # invariants
    /// - Returns once the payload is accepted, not once it is processed.
    /// - Must return `Err` if the payload cannot be delivered.
    /// - Should not interpret the payload content.
    async fn send(&self, destination: LocalityId, payload: Vec<u8>) -> Result<()>;

    /// Waits for the next inbound payload.
    ///
    /// Returns `Ok(None)` once the transport is closed for good.
    async fn recv(&self) -> Result<Option<Vec<u8>>>;
}
