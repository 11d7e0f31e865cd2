//! # Runtime Builder
//!
//! Provides a fluent API for bringing up the runtime of one locality.

use std::sync::Arc;

use neoparcel::LocalityId;

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::mock_transport::MemoryNetwork;
use crate::naming::Directory;
use crate::naming::StaticDirectory;
use crate::registry::Registry;
use crate::registry::RegistryBuilder;
use crate::runtime::Runtime;
use crate::transport::Transport;

/// Fluent builder for a locality runtime.
///
/// Unset parts default to a registry holding only the built-in support
/// component, a directory that knows only this locality, and a loopback
/// in-memory transport.
pub struct RuntimeBuilder {
    config: Config,
    registry: Option<Arc<Registry>>,
    transport: Option<Arc<dyn Transport>>,
    directory: Option<Arc<dyn Directory>>,
}

impl RuntimeBuilder {
    pub fn new(locality: LocalityId) -> Self {
        Self {
            config: Config::new(locality),
            registry: None,
            transport: None,
            directory: None,
        }
    }

    pub fn registry(mut self, registry: impl Into<Arc<Registry>>) -> Self {
        self.registry = Some(registry.into());
        self
    }

    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn directory(mut self, directory: impl Directory) -> Self {
        self.directory = Some(Arc::new(directory));
        self
    }

    pub fn max_parcel_bytes(mut self, limit: usize) -> Self {
        self.config.max_parcel_bytes = limit;
        self
    }

    /// Starts the runtime on the current tokio runtime.
    pub async fn start(self) -> Result<Runtime> {
        let locality = self.config.locality;
        if !locality.is_valid() {
            return Err(Error::UnknownTarget(locality.address()));
        }

        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(RegistryBuilder::new().build()?),
        };
        let directory: Arc<dyn Directory> = match self.directory {
            Some(directory) => directory,
            None => Arc::new(StaticDirectory::new([locality])),
        };
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(MemoryNetwork::new().endpoint(locality)),
        };

        Ok(Runtime::launch(self.config, registry, directory, transport))
    }
}
