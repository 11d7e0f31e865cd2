//! # Locality Runtime
//!
//! One `Runtime` per locality. It owns the component instances living here,
//! the frozen registry, the transport endpoint, and the table of outbound
//! invocations still waiting for a reply. The invocation entry points
//! (`invoke`, `call`, `post`) live in `invoker`.
//!
//! `Runtime` is a cheap handle: clones share the same locality. When the
//! last handle is dropped the receive pump is stopped.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use neoparcel::GlobalAddress;
use neoparcel::LocalityId;

use crate::builder::RuntimeBuilder;
use crate::component::Component;
use crate::component::ComponentTable;
use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::function::Function;
use crate::future::EagerFuture;
use crate::naming::AddressAllocator;
use crate::naming::Destination;
use crate::naming::Directory;
use crate::pending::PendingTable;
use crate::registry::Registry;
use crate::support::ApplyFunction;
use crate::support::ApplyRequest;
use crate::support::CreateComponent;
use crate::support::LocalitySupport;
use crate::transport::Transport;

/// Traffic counters of one locality.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Frames handed to the transport successfully.
    pub frames_sent: u64,
    /// Parcels received and dispatched.
    pub parcels_dispatched: u64,
    /// Replies that completed a pending invocation.
    pub replies_accepted: u64,
    /// Replies for invocations that had already completed.
    pub duplicate_replies: u64,
    /// Inbound frames that could not be decoded or matched.
    pub dropped_frames: u64,
}

#[derive(Default)]
pub(crate) struct Counters {
    pub frames_sent: AtomicU64,
    pub parcels_dispatched: AtomicU64,
    pub replies_accepted: AtomicU64,
    pub duplicate_replies: AtomicU64,
    pub dropped_frames: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> Stats {
        Stats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            parcels_dispatched: self.parcels_dispatched.load(Ordering::Relaxed),
            replies_accepted: self.replies_accepted.load(Ordering::Relaxed),
            duplicate_replies: self.duplicate_replies.load(Ordering::Relaxed),
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
        }
    }
}

pub(crate) struct Inner {
    pub config: Config,
    pub registry: Arc<Registry>,
    pub directory: Arc<dyn Directory>,
    pub transport: Arc<dyn Transport>,
    pub allocator: AddressAllocator,
    pub components: ComponentTable,
    pub pending: PendingTable,
    pub counters: Counters,
    pub handle: Handle,
    pump: Mutex<Option<AbortHandle>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(slot) = self.pump.get_mut() {
            if let Some(pump) = slot.take() {
                pump.abort();
            }
        }
    }
}

/// Handle to the runtime of one locality.
#[derive(Clone)]
pub struct Runtime {
    pub(crate) inner: Arc<Inner>,
}

impl Runtime {
    /// Starts configuring the runtime of `locality`.
    pub fn builder(locality: LocalityId) -> RuntimeBuilder {
        RuntimeBuilder::new(locality)
    }

    /// Brings a locality up: installs the support component at the locality
    /// address and starts the receive pump on the current tokio runtime.
    pub(crate) fn launch(
        config: Config,
        registry: Arc<Registry>,
        directory: Arc<dyn Directory>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let locality = config.locality;
        let inner = Arc::new(Inner {
            allocator: AddressAllocator::new(locality),
            config,
            registry,
            directory,
            transport,
            components: ComponentTable::default(),
            pending: PendingTable::default(),
            counters: Counters::default(),
            handle: Handle::current(),
            pump: Mutex::new(None),
        });

        inner.components.insert(
            locality.address(),
            LocalitySupport::NAME,
            Arc::new(LocalitySupport::default()),
        );

        let pump = inner
            .handle
            .spawn(crate::invoker::pump(Arc::downgrade(&inner), inner.transport.clone()));
        if let Ok(mut slot) = inner.pump.lock() {
            *slot = Some(pump.abort_handle());
        }

        tracing::debug!(%locality, "runtime started");
        Self { inner }
    }

    pub fn locality(&self) -> LocalityId {
        self.inner.config.locality
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn stats(&self) -> Stats {
        self.inner.counters.snapshot()
    }

    /// Remote invocations still waiting for a reply.
    pub fn pending_invocations(&self) -> usize {
        self.inner.pending.len()
    }

    /// Component instances hosted here, the support component included.
    pub fn component_count(&self) -> usize {
        self.inner.components.len()
    }

    pub(crate) fn components(&self) -> &ComponentTable {
        &self.inner.components
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    /// Issues a fresh address on this locality.
    pub fn allocate(&self) -> GlobalAddress {
        self.inner.allocator.allocate()
    }

    /// Decides where an invocation on `target` has to run.
    ///
    /// Fails with `UnknownTarget` for the invalid address, for addresses the
    /// directory cannot route, and for local addresses naming no live
    /// component.
    pub fn resolve(&self, target: GlobalAddress) -> Result<Destination> {
        if !target.is_valid() {
            return Err(Error::UnknownTarget(target));
        }

        let locality = self
            .inner
            .directory
            .resolve(target)
            .ok_or(Error::UnknownTarget(target))?;

        if locality != self.locality() {
            return Ok(Destination::Remote(locality));
        }

        if self.inner.components.contains(&target) {
            Ok(Destination::Local)
        } else {
            Err(Error::UnknownTarget(target))
        }
    }

    /// Creates a default-constructed `C` on `locality` and returns its address.
    ///
    /// The instance still has to be initialized through its own actions.
    pub fn create<C: Component>(&self, locality: LocalityId) -> Result<EagerFuture<GlobalAddress>> {
        self.create_named(locality, C::NAME)
    }

    /// Like `create`, for a component known only by its registered name.
    pub(crate) fn create_named(&self, locality: LocalityId, name: &str) -> Result<EagerFuture<GlobalAddress>> {
        self.invoke::<CreateComponent>(locality.address(), name.to_string())
    }

    /// Ships a serializable callable to `locality`, calls it there with
    /// `args` and returns its result.
    pub fn apply<A, R>(&self, locality: LocalityId, function: &Function<A, R>, args: A) -> Result<EagerFuture<R>>
    where
        A: Serialize,
        R: DeserializeOwned + Send + 'static,
    {
        let request = ApplyRequest {
            function: function.encode()?,
            args: neoparcel::encode(&args)?,
        };
        let future = self.invoke::<ApplyFunction>(locality.address(), request)?;
        Ok(future.then(self.handle(), |bytes| Ok(neoparcel::decode::<R>(&bytes)?)))
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("locality", &self.locality())
            .field("components", &self.component_count())
            .field("pending", &self.pending_invocations())
            .finish()
    }
}
