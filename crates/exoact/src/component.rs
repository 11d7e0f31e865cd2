//! # Components & Actions
//!
//! A component type is described once, by implementing `Component` for its
//! server state and `Action` for each of its operations. The registry turns
//! that schema into remote dispatch entries; stubs use the same `Action`
//! types to make typed calls, so a stub cannot drift from its server.
//!
//! ## Ownership
//!
//! A component instance is an `Arc<C>` owned by the component table of the
//! locality that created it. Actions receive a shared reference: guarding
//! state against concurrent actions is the component author's job, the
//! runtime never locks an instance on a caller's behalf.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::Serialize;
use serde::de::DeserializeOwned;

use neoparcel::GlobalAddress;
use neoparcel::LocalityId;

use crate::error::Error;
use crate::error::Result;
use crate::registry::RegistryBuilder;
use crate::runtime::Runtime;

/// Server side of a distributed component type.
///
/// Instances start from `Default` when created and are configured by the
/// component's own initialization action.
pub trait Component: Default + Send + Sync + 'static {
    /// Registered name, identical on every locality.
    const NAME: &'static str;

    /// Registers every action of this component.
    fn register(registry: &mut RegistryBuilder) -> Result<()>;
}

/// A named operation on a component.
pub trait Action: Send + Sync + 'static {
    type Component: Component;
    type Args: Serialize + DeserializeOwned + Send + 'static;
    type Output: Serialize + DeserializeOwned + Send + 'static;

    /// Wire tag, identical on every locality.
    const NAME: &'static str;

    /// Runs the action against a live instance.
    ///
    /// Domain failures are reported as `Error::RemoteAction`; any other error
    /// (for instance from a nested invocation) travels back to the caller as
    /// well.
    fn execute(
        server: Arc<Self::Component>,
        ctx: Context,
        args: Self::Args,
    ) -> BoxFuture<'static, Result<Self::Output>>;
}

/// What an executing action knows about where it runs.
#[derive(Clone)]
pub struct Context {
    runtime: Runtime,
    this: GlobalAddress,
}

impl Context {
    pub(crate) fn new(runtime: Runtime, this: GlobalAddress) -> Self {
        Self { runtime, this }
    }

    /// The runtime hosting the instance, for nested invocations.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The address of the instance the action runs against.
    pub fn this(&self) -> GlobalAddress {
        self.this
    }

    pub fn locality(&self) -> LocalityId {
        self.runtime.locality()
    }
}

struct Slot {
    name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
}

/// The live component instances of one locality.
#[derive(Default)]
pub(crate) struct ComponentTable {
    slots: DashMap<GlobalAddress, Slot>,
}

impl ComponentTable {
    pub fn insert(&self, gid: GlobalAddress, name: &'static str, instance: Arc<dyn Any + Send + Sync>) {
        self.slots.insert(gid, Slot { name, instance });
    }

    pub fn contains(&self, gid: &GlobalAddress) -> bool {
        self.slots.contains_key(gid)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Looks up the instance an action has to run against.
    ///
    /// Fails with `UnknownTarget` if nothing lives at `gid`, and with
    /// `UnknownAction` if the instance is of another component type.
    pub fn instance<A: Action>(&self, gid: GlobalAddress) -> Result<Arc<A::Component>> {
        let (name, instance) = self
            .slots
            .get(&gid)
            .map(|slot| (slot.name, slot.instance.clone()))
            .ok_or(Error::UnknownTarget(gid))?;

        instance
            .downcast::<A::Component>()
            .map_err(|_| Error::UnknownAction(format!("{} does not apply to {} at {}", A::NAME, name, gid)))
    }
}
