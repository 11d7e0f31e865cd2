//! In-process transports.
//!
//! A `MemoryNetwork` connects any number of localities living in one process
//! through tokio mpsc channels. It is what the test suite runs on, and it is
//! enough to embed several localities in a single binary.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

use neoparcel::LocalityId;

use crate::transport;
use crate::transport::Transport;
use crate::transport::TransportError;

/// A switchboard routing payloads to localities by id.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    routes: Arc<DashMap<LocalityId, mpsc::UnboundedSender<Vec<u8>>>>,
    max_payload: Option<usize>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// A network refusing payloads larger than `limit` bytes.
    pub fn with_max_payload(limit: usize) -> Self {
        Self {
            routes: Arc::default(),
            max_payload: Some(limit),
        }
    }

    /// Attaches a locality to the network and returns its endpoint.
    ///
    /// Attaching the same locality twice replaces the previous route; the old
    /// endpoint stops receiving.
    pub fn endpoint(&self, locality: LocalityId) -> MemoryTransport {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes.insert(locality, tx);
        MemoryTransport {
            locality,
            network: self.clone(),
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Removes a locality from the network.
    ///
    /// Payloads addressed to it fail with `UnknownLocality`, and its endpoint's
    /// `recv` returns `None` once the queue drains.
    pub fn disconnect(&self, locality: LocalityId) {
        self.routes.remove(&locality);
    }

    /// The localities currently attached.
    pub fn localities(&self) -> Vec<LocalityId> {
        let mut ids: Vec<LocalityId> = self.routes.iter().map(|e| *e.key()).collect();
        ids.sort();
        ids
    }

    fn route(&self, destination: LocalityId, payload: Vec<u8>) -> transport::Result<()> {
        if let Some(limit) = self.max_payload.filter(|limit| payload.len() > *limit) {
            return Err(TransportError::PayloadTooLarge {
                size: payload.len(),
                limit,
            });
        }

        let sender = self
            .routes
            .get(&destination)
            .map(|entry| entry.value().clone())
            .ok_or(TransportError::UnknownLocality(destination))?;

        sender
            .send(payload)
            .map_err(|_| TransportError::ConnectionLost(format!("{} stopped receiving", destination)))
    }
}

/// One locality's view of a `MemoryNetwork`.
pub struct MemoryTransport {
    locality: LocalityId,
    network: MemoryNetwork,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, destination: LocalityId, payload: Vec<u8>) -> transport::Result<()> {
        if !self.network.routes.contains_key(&self.locality) {
            return Err(TransportError::ConnectionLost(format!("{} is disconnected", self.locality)));
        }
        self.network.route(destination, payload)
    }

    async fn recv(&self) -> transport::Result<Option<Vec<u8>>> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await)
    }
}
