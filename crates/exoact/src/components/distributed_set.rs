//! # Distributed Set
//!
//! A set of global addresses spread over localities. Each item is kept by
//! the `LocalSet` on the item's own locality; the `DistributedSet` server
//! only knows which local set serves which locality, and creates a local set
//! the first time a locality is asked for.
//!
//! Items are instances of one registered component, named at `init`. Adding
//! `GlobalAddress::INVALID` creates a fresh instance on the set's locality.
//!
//! ```text
//!             DistributedSet (locality 0)
//!             locals: { 0 -> ls_a, 1 -> ls_b }
//!                 /                   \
//!   LocalSet ls_a (locality 0)   LocalSet ls_b (locality 1)
//!   items on locality 0          items on locality 1
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::future::try_join_all;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::Mutex;

use neoparcel::ActionFault;
use neoparcel::GlobalAddress;
use neoparcel::LocalityId;

use crate::component::Action;
use crate::component::Component;
use crate::component::Context;
use crate::components::local_set;
use crate::components::local_set::LocalSet;
use crate::error::Error;
use crate::error::Result;
use crate::future::EagerFuture;
use crate::registry::RegistryBuilder;
use crate::runtime::Runtime;

struct State {
    item: &'static str,
    capacity_hint: u32,
    locals: BTreeMap<LocalityId, GlobalAddress>,
}

#[derive(Default)]
pub struct DistributedSet {
    state: Mutex<Option<State>>,
}

fn uninitialized() -> Error {
    Error::RemoteAction(ActionFault::new("uninitialized", "distributed set used before init"))
}

impl DistributedSet {
    /// The local set serving `locality`, created and bound on first use.
    ///
    /// The state lock is held across creation so concurrent callers agree on
    /// one local set per locality.
    async fn local_for(&self, ctx: &Context, locality: LocalityId) -> Result<GlobalAddress> {
        let mut state = self.state.lock().await;
        let state = state.as_mut().ok_or_else(uninitialized)?;

        if let Some(gid) = state.locals.get(&locality) {
            return Ok(*gid);
        }

        let runtime = ctx.runtime();
        let gid = runtime.create::<LocalSet>(locality)?.await?;
        runtime
            .call::<local_set::Init>(gid, (ctx.this(), state.capacity_hint))
            .await?;
        state.locals.insert(locality, gid);

        tracing::debug!(set = %ctx.this(), %locality, local = %gid, "local set created");
        Ok(gid)
    }

    /// Creates a new item instance next to the set.
    async fn fresh_item(&self, ctx: &Context) -> Result<GlobalAddress> {
        let component = {
            let state = self.state.lock().await;
            state.as_ref().ok_or_else(uninitialized)?.item
        };

        let item = ctx.runtime().create_named(ctx.locality(), component)?.await?;
        tracing::debug!(set = %ctx.this(), component, %item, "item created");
        Ok(item)
    }
}

impl Component for DistributedSet {
    const NAME: &'static str = "exoact/distributed-set";

    fn register(registry: &mut RegistryBuilder) -> Result<()> {
        registry
            .component::<LocalSet>()?
            .action::<Init>()?
            .action::<AddItem>()?
            .action::<GetLocal>()?
            .action::<Locals>()?
            .action::<Size>()?;
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InitArgs {
    /// Registered name of the item component.
    pub item: String,
    /// Expected number of items; pre-sizes every local set.
    pub capacity_hint: u32,
}

/// Initializes the set.
///
/// Fails with `UnknownComponent` if the item component is not registered
/// here.
pub struct Init;

impl Action for Init {
    type Component = DistributedSet;
    type Args = InitArgs;
    type Output = ();

    const NAME: &'static str = "distributed-set/init";

    fn execute(server: Arc<DistributedSet>, ctx: Context, args: InitArgs) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            let item = ctx.runtime().registry().component(&args.item)?.name();
            let mut state = server.state.lock().await;
            if state.is_some() {
                return Err(Error::RemoteAction(ActionFault::new(
                    "already-initialized",
                    "distributed set initialized twice",
                )));
            }
            *state = Some(State {
                item,
                capacity_hint: args.capacity_hint,
                locals: BTreeMap::new(),
            });
            Ok(())
        })
    }
}

/// Adds an item and returns its address.
///
/// Adding `GlobalAddress::INVALID` creates a fresh item on the set's
/// locality and adds that.
pub struct AddItem;

impl Action for AddItem {
    type Component = DistributedSet;
    type Args = GlobalAddress;
    type Output = GlobalAddress;

    const NAME: &'static str = "distributed-set/add-item";

    fn execute(server: Arc<DistributedSet>, ctx: Context, item: GlobalAddress) -> BoxFuture<'static, Result<GlobalAddress>> {
        Box::pin(async move {
            let item = if item.is_valid() { item } else { server.fresh_item(&ctx).await? };
            let local = server.local_for(&ctx, item.locality).await?;
            ctx.runtime().call::<local_set::Insert>(local, item).await?;
            Ok(item)
        })
    }
}

/// The local set serving a locality.
pub struct GetLocal;

impl Action for GetLocal {
    type Component = DistributedSet;
    type Args = LocalityId;
    type Output = GlobalAddress;

    const NAME: &'static str = "distributed-set/get-local";

    fn execute(server: Arc<DistributedSet>, ctx: Context, locality: LocalityId) -> BoxFuture<'static, Result<GlobalAddress>> {
        Box::pin(async move { server.local_for(&ctx, locality).await })
    }
}

/// Every local set, in locality order.
pub struct Locals;

impl Action for Locals {
    type Component = DistributedSet;
    type Args = ();
    type Output = Vec<GlobalAddress>;

    const NAME: &'static str = "distributed-set/locals";

    fn execute(server: Arc<DistributedSet>, _: Context, _: ()) -> BoxFuture<'static, Result<Vec<GlobalAddress>>> {
        Box::pin(async move {
            let state = server.state.lock().await;
            let state = state.as_ref().ok_or_else(uninitialized)?;
            Ok(state.locals.values().copied().collect())
        })
    }
}

/// Number of items over all local sets.
pub struct Size;

impl Action for Size {
    type Component = DistributedSet;
    type Args = ();
    type Output = u64;

    const NAME: &'static str = "distributed-set/size";

    fn execute(server: Arc<DistributedSet>, ctx: Context, _: ()) -> BoxFuture<'static, Result<u64>> {
        Box::pin(async move {
            let locals: Vec<GlobalAddress> = {
                let state = server.state.lock().await;
                let state = state.as_ref().ok_or_else(uninitialized)?;
                tracing::trace!(set = %ctx.this(), hint = state.capacity_hint, locals = state.locals.len(), "sizing");
                state.locals.values().copied().collect()
            };

            // all counts are in flight before the first one is awaited
            let counts = locals
                .into_iter()
                .map(|local| ctx.runtime().invoke::<local_set::Count>(local, ()))
                .collect::<Result<Vec<_>>>()?;

            Ok(try_join_all(counts).await?.into_iter().sum())
        })
    }
}

/// Client side of a `DistributedSet`.
#[derive(Clone, Debug)]
pub struct DistributedSetStub {
    runtime: Runtime,
    gid: GlobalAddress,
}

impl DistributedSetStub {
    pub fn new(runtime: Runtime, gid: GlobalAddress) -> Self {
        Self { runtime, gid }
    }

    /// Creates a new, uninitialized set on `locality`.
    pub async fn create(runtime: Runtime, locality: LocalityId) -> Result<Self> {
        let gid = runtime.create::<DistributedSet>(locality)?.await?;
        Ok(Self::new(runtime, gid))
    }

    pub fn gid(&self) -> GlobalAddress {
        self.gid
    }

    /// Initializes the set to hold instances of `C`.
    pub async fn init<C: Component>(&self, capacity_hint: u32) -> Result<()> {
        let args = InitArgs {
            item: C::NAME.to_string(),
            capacity_hint,
        };
        self.runtime.call::<Init>(self.gid, args).await
    }

    pub async fn add_item(&self, item: GlobalAddress) -> Result<GlobalAddress> {
        self.runtime.call::<AddItem>(self.gid, item).await
    }

    pub async fn get_local(&self, locality: LocalityId) -> Result<GlobalAddress> {
        self.runtime.call::<GetLocal>(self.gid, locality).await
    }

    pub async fn locals(&self) -> Result<Vec<GlobalAddress>> {
        self.runtime.call::<Locals>(self.gid, ()).await
    }

    pub async fn size(&self) -> Result<u64> {
        self.invoke_size()?.await
    }

    /// Starts a size query without waiting for it.
    pub fn invoke_size(&self) -> Result<EagerFuture<u64>> {
        self.runtime.invoke::<Size>(self.gid, ())
    }
}
