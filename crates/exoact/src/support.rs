//! The runtime-support component.
//!
//! Every locality hosts one `LocalitySupport` instance at its locality
//! address (`LocalityId::address()`). It is how other localities create
//! components here and run shipped callables here.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use serde::Serialize;

use neoparcel::GlobalAddress;

use crate::component::Action;
use crate::component::Component;
use crate::component::Context;
use crate::error::Result;
use crate::function::EncodedFunction;
use crate::registry::RegistryBuilder;

#[derive(Default)]
pub struct LocalitySupport;

impl Component for LocalitySupport {
    const NAME: &'static str = "exoact/locality";

    fn register(registry: &mut RegistryBuilder) -> Result<()> {
        registry.action::<CreateComponent>()?.action::<ApplyFunction>()?;
        Ok(())
    }
}

/// Default-constructs a registered component here and returns its address.
pub struct CreateComponent;

impl Action for CreateComponent {
    type Component = LocalitySupport;
    type Args = String;
    type Output = GlobalAddress;

    const NAME: &'static str = "exoact/create-component";

    fn execute(_: Arc<LocalitySupport>, ctx: Context, name: String) -> BoxFuture<'static, Result<GlobalAddress>> {
        Box::pin(async move {
            let runtime = ctx.runtime();
            let entry = runtime.registry().component(&name)?;
            let gid = runtime.allocate();
            runtime.components().insert(gid, entry.name(), entry.create());
            tracing::debug!(component = entry.name(), %gid, "component created");
            Ok(gid)
        })
    }
}

/// An encoded `Function` and its encoded arguments.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApplyRequest {
    pub function: Vec<u8>,
    pub args: Vec<u8>,
}

/// Decodes a shipped callable, calls it once and returns the encoded result.
pub struct ApplyFunction;

impl Action for ApplyFunction {
    type Component = LocalitySupport;
    type Args = ApplyRequest;
    type Output = Vec<u8>;

    const NAME: &'static str = "exoact/apply-function";

    fn execute(_: Arc<LocalitySupport>, ctx: Context, request: ApplyRequest) -> BoxFuture<'static, Result<Vec<u8>>> {
        Box::pin(async move {
            let encoded: EncodedFunction = neoparcel::decode(&request.function)?;
            let entry = ctx.runtime().registry().function(&encoded.tag)?;
            entry.apply(&encoded.payload, &request.args)
        })
    }
}
