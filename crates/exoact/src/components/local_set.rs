//! The per-locality part of a distributed set.
//!
//! A `LocalSet` holds the items of one distributed set that live on its own
//! locality. It remembers the set that owns it.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::Mutex;

use neoparcel::ActionFault;
use neoparcel::GlobalAddress;

use crate::component::Action;
use crate::component::Component;
use crate::component::Context;
use crate::error::Error;
use crate::error::Result;
use crate::registry::RegistryBuilder;
use crate::runtime::Runtime;

/// Largest item table pre-sized from a capacity hint.
const PRESIZE_LIMIT: usize = 1 << 12;

struct State {
    owner: GlobalAddress,
    items: HashSet<GlobalAddress>,
}

#[derive(Default)]
pub struct LocalSet {
    state: Mutex<Option<State>>,
}

fn uninitialized() -> Error {
    Error::RemoteAction(ActionFault::new("uninitialized", "local set used before init"))
}

impl Component for LocalSet {
    const NAME: &'static str = "exoact/local-set";

    fn register(registry: &mut RegistryBuilder) -> Result<()> {
        registry
            .action::<Init>()?
            .action::<Insert>()?
            .action::<Count>()?
            .action::<Items>()?
            .action::<Owner>()?;
        Ok(())
    }
}

/// Binds the local set to the distributed set that owns it; the second
/// argument is the owner's capacity hint.
pub struct Init;

impl Action for Init {
    type Component = LocalSet;
    type Args = (GlobalAddress, u32);
    type Output = ();

    const NAME: &'static str = "local-set/init";

    fn execute(server: Arc<LocalSet>, _: Context, (owner, capacity_hint): (GlobalAddress, u32)) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            let mut state = server.state.lock().await;
            if state.is_some() {
                return Err(Error::RemoteAction(ActionFault::new(
                    "already-initialized",
                    "local set initialized twice",
                )));
            }
            *state = Some(State {
                owner,
                items: HashSet::with_capacity((capacity_hint as usize).min(PRESIZE_LIMIT)),
            });
            Ok(())
        })
    }
}

/// Adds an item; returns false if it was already present.
pub struct Insert;

impl Action for Insert {
    type Component = LocalSet;
    type Args = GlobalAddress;
    type Output = bool;

    const NAME: &'static str = "local-set/insert";

    fn execute(server: Arc<LocalSet>, _: Context, item: GlobalAddress) -> BoxFuture<'static, Result<bool>> {
        Box::pin(async move {
            let mut state = server.state.lock().await;
            let state = state.as_mut().ok_or_else(uninitialized)?;
            Ok(state.items.insert(item))
        })
    }
}

pub struct Count;

impl Action for Count {
    type Component = LocalSet;
    type Args = ();
    type Output = u64;

    const NAME: &'static str = "local-set/count";

    fn execute(server: Arc<LocalSet>, _: Context, _: ()) -> BoxFuture<'static, Result<u64>> {
        Box::pin(async move {
            let state = server.state.lock().await;
            let state = state.as_ref().ok_or_else(uninitialized)?;
            Ok(state.items.len() as u64)
        })
    }
}

/// The items, in address order.
pub struct Items;

impl Action for Items {
    type Component = LocalSet;
    type Args = ();
    type Output = Vec<GlobalAddress>;

    const NAME: &'static str = "local-set/items";

    fn execute(server: Arc<LocalSet>, _: Context, _: ()) -> BoxFuture<'static, Result<Vec<GlobalAddress>>> {
        Box::pin(async move {
            let state = server.state.lock().await;
            let state = state.as_ref().ok_or_else(uninitialized)?;
            let mut items: Vec<GlobalAddress> = state.items.iter().copied().collect();
            items.sort();
            Ok(items)
        })
    }
}

pub struct Owner;

impl Action for Owner {
    type Component = LocalSet;
    type Args = ();
    type Output = GlobalAddress;

    const NAME: &'static str = "local-set/owner";

    fn execute(server: Arc<LocalSet>, _: Context, _: ()) -> BoxFuture<'static, Result<GlobalAddress>> {
        Box::pin(async move {
            let state = server.state.lock().await;
            Ok(state.as_ref().ok_or_else(uninitialized)?.owner)
        })
    }
}

/// Client side of a `LocalSet`.
#[derive(Clone, Debug)]
pub struct LocalSetStub {
    runtime: Runtime,
    gid: GlobalAddress,
}

impl LocalSetStub {
    pub fn new(runtime: Runtime, gid: GlobalAddress) -> Self {
        Self { runtime, gid }
    }

    pub fn gid(&self) -> GlobalAddress {
        self.gid
    }

    pub async fn insert(&self, item: GlobalAddress) -> Result<bool> {
        self.runtime.call::<Insert>(self.gid, item).await
    }

    pub async fn count(&self) -> Result<u64> {
        self.runtime.call::<Count>(self.gid, ()).await
    }

    pub async fn items(&self) -> Result<Vec<GlobalAddress>> {
        self.runtime.call::<Items>(self.gid, ()).await
    }

    pub async fn owner(&self) -> Result<GlobalAddress> {
        self.runtime.call::<Owner>(self.gid, ()).await
    }
}
